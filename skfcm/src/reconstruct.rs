//! Turning final memberships and centers into an output image.

use common::Buffer2;

use crate::centers::ClusterCenters;
use crate::config::Reconstruction;
use crate::membership::MembershipMatrix;

/// Index of the highest membership; the first maximum wins ties.
#[inline]
fn dominant_class(memberships: &[f64]) -> usize {
    let mut best = 0;
    for (class, &value) in memberships.iter().enumerate().skip(1) {
        if value > memberships[best] {
            best = class;
        }
    }
    best
}

/// Hard label map: the dominant class of every pixel.
pub fn class_labels(memberships: &MembershipMatrix) -> Buffer2<usize> {
    Buffer2::from_fn(memberships.width(), memberships.height(), |x, y| {
        dominant_class(memberships.pixel(x, y))
    })
}

/// Build the segmented image in the requested mode.
///
/// Exclusive mode yields at most `n_classes` distinct values; shared mode is
/// the membership-weighted blend of all centers.
pub fn reconstruct(
    memberships: &MembershipMatrix,
    centers: &ClusterCenters,
    mode: Reconstruction,
) -> Buffer2<f64> {
    assert_eq!(centers.len(), memberships.n_classes(), "center count mismatch");
    let (width, height) = (memberships.width(), memberships.height());

    match mode {
        Reconstruction::Exclusive => Buffer2::from_fn(width, height, |x, y| {
            centers[dominant_class(memberships.pixel(x, y))]
        }),
        Reconstruction::Shared => Buffer2::from_fn(width, height, |x, y| {
            memberships
                .pixel(x, y)
                .iter()
                .zip(centers.as_slice())
                .map(|(u, v)| u * v)
                .sum()
        }),
    }
}

/// Linearly stretch `image` so its values span `[min, max]`.
///
/// A constant image maps to `min` everywhere.
pub fn normalize_range(image: &Buffer2<f64>, min: f64, max: f64) -> Buffer2<f64> {
    let (lo, hi) = image
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    if image.is_empty() || hi <= lo {
        return image.map(|_| min);
    }

    let scale = (max - min) / (hi - lo);
    image.map(|&v| min + (v - lo) * scale)
}

//! Cluster centers and the kernel-weighted center update.

use std::ops::Index;

use common::Buffer2;

use crate::config::Config;
use crate::error::Instability;
use crate::kernel::gaussian_kernel;
use crate::membership::MembershipMatrix;

/// Upper end of the conventional 8-bit intensity range, used to seed centers.
pub const MAX_INTENSITY: f64 = 255.0;

/// Representative intensity of every class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterCenters {
    values: Vec<f64>,
}

impl ClusterCenters {
    /// Equal starting centers, `255 / n_classes` each.
    ///
    /// The first center update pulls them apart before they influence
    /// memberships.
    pub fn initial(n_classes: usize) -> Self {
        assert!(n_classes > 0, "n_classes must be at least 1");
        Self {
            values: vec![MAX_INTENSITY / n_classes as f64; n_classes],
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl Index<usize> for ClusterCenters {
    type Output = f64;

    #[inline]
    fn index(&self, class: usize) -> &Self::Output {
        &self.values[class]
    }
}

/// Recompute every center as the kernel-weighted mean intensity of its class:
///
/// `V[c] = sum(U^m * K(img, V_old[c]) * img) / sum(U^m * K(img, V_old[c]))`
///
/// The kernel is evaluated against the center from the previous iteration,
/// so the update depends on both `memberships` and the incoming `centers`.
/// Classes are independent; each is overwritten in place.
pub fn update_centers(
    image: &Buffer2<f64>,
    memberships: &MembershipMatrix,
    config: &Config,
    centers: &mut ClusterCenters,
) -> Result<(), Instability> {
    assert_eq!(
        image.dimensions(),
        (memberships.width(), memberships.height()),
        "image shape mismatch"
    );
    assert_eq!(centers.len(), memberships.n_classes(), "center count mismatch");

    for (class, center) in centers.values.iter_mut().enumerate() {
        let previous = *center;
        let mut numerator = 0.0;
        let mut denominator = 0.0;

        for (x, y, &intensity) in image.enumerate_pixels() {
            let weight = memberships.get(x, y, class).powf(config.fuzziness)
                * gaussian_kernel(intensity, previous, config.sigma);
            numerator += weight * intensity;
            denominator += weight;
        }

        let updated = numerator / denominator;
        if !(denominator > 0.0) || !updated.is_finite() {
            return Err(Instability::DegenerateCenter { class });
        }
        *center = updated;
    }

    Ok(())
}

//! Fuzzy membership matrix and its spatially regularized update.
//!
//! Memberships are stored pixel-major: the `n_classes` values of one pixel
//! are contiguous, so per-pixel normalization and arg-max read a single slice.


use common::buffer2::clamp_coordinate;
use common::Buffer2;

use crate::centers::ClusterCenters;
use crate::config::{Config, NEIGHBOR_COUNT};
use crate::error::Instability;
use crate::init::ClassIndexSource;
use crate::kernel::gaussian_kernel;

/// Offsets of the 3x3 window around a pixel, center excluded.
const NEIGHBOR_OFFSETS: [(isize, isize); NEIGHBOR_COUNT] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Dense `width x height x n_classes` grid of membership degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipMatrix {
    values: Vec<f64>,
    width: usize,
    height: usize,
    n_classes: usize,
}

impl MembershipMatrix {
    pub fn new_filled(width: usize, height: usize, n_classes: usize, value: f64) -> Self {
        Self {
            values: vec![value; width * height * n_classes],
            width,
            height,
            n_classes,
        }
    }

    /// Every pixel shares its membership equally among all classes.
    pub fn uniform(width: usize, height: usize, n_classes: usize) -> Self {
        assert!(n_classes > 0, "n_classes must be at least 1");
        Self::new_filled(width, height, n_classes, 1.0 / n_classes as f64)
    }

    /// Random hard start: one class index is drawn per pixel and that class
    /// gets membership 1, every other class 0.
    pub fn one_hot(
        width: usize,
        height: usize,
        n_classes: usize,
        source: &mut dyn ClassIndexSource,
    ) -> Self {
        assert!(n_classes > 0, "n_classes must be at least 1");
        let mut matrix = Self::new_filled(width, height, n_classes, 0.0);
        for y in 0..height {
            for x in 0..width {
                let class = source.next_class_index(n_classes);
                assert!(
                    class < n_classes,
                    "class index {} out of range 0..{}",
                    class,
                    n_classes
                );
                matrix.pixel_mut(x, y)[class] = 1.0;
            }
        }
        matrix
    }

    /// Build a matrix by evaluating `f(x, y, class)` for every entry.
    pub fn from_fn(
        width: usize,
        height: usize,
        n_classes: usize,
        mut f: impl FnMut(usize, usize, usize) -> f64,
    ) -> Self {
        let mut values = Vec::with_capacity(width * height * n_classes);
        for y in 0..height {
            for x in 0..width {
                for class in 0..n_classes {
                    values.push(f(x, y, class));
                }
            }
        }
        Self {
            values,
            width,
            height,
            n_classes,
        }
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({}, {}) out of bounds {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        (y * self.width + x) * self.n_classes
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, class: usize) -> f64 {
        self.pixel(x, y)[class]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, class: usize, value: f64) {
        self.pixel_mut(x, y)[class] = value;
    }

    /// Memberships of all classes at one pixel.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[f64] {
        let start = self.offset(x, y);
        &self.values[start..start + self.n_classes]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [f64] {
        let start = self.offset(x, y);
        &mut self.values[start..start + self.n_classes]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// `(width, height, n_classes)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.width, self.height, self.n_classes)
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Overwrite with another matrix of the same shape, reusing the allocation.
    pub fn copy_from(&mut self, other: &Self) {
        assert_eq!(self.shape(), other.shape(), "shape mismatch");
        self.values.copy_from_slice(&other.values);
    }

    /// Sum over classes at every pixel.
    pub fn pixel_sums(&self) -> Buffer2<f64> {
        Buffer2::from_fn(self.width, self.height, |x, y| self.pixel(x, y).iter().sum())
    }

    /// `sum over the 8 neighbors of (1 - U[n, class])^m`, with out-of-bounds
    /// neighbors replicated from the nearest edge pixel.
    fn neighborhood_penalty(&self, x: usize, y: usize, class: usize, fuzziness: f64) -> f64 {
        NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| {
                let nx = clamp_coordinate(x as isize + dx, self.width);
                let ny = clamp_coordinate(y as isize + dy, self.height);
                // Rounding can leave a membership a hair above 1.
                (1.0 - self.get(nx, ny, class)).max(0.0).powf(fuzziness)
            })
            .sum()
    }
}

/// Outcome of normalizing one pixel's raw memberships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelNormalization {
    Regular,
    /// Raw values were infinite for some classes; they split the membership.
    Singular,
    /// Every raw value underflowed to zero; uniform memberships were used.
    UniformFallback,
}

/// Recompute memberships from the new centers and the frozen previous matrix.
///
/// For each pixel and class the base
/// `(1 - K(img, V[c])) + alpha / Nr * sum_n (1 - U_prev[n, c])^m`
/// is raised to `-1 / (m - 1)`, then the pixel is normalized to sum to 1.
/// `previous` must not alias `memberships`: neighborhoods always read the
/// state from before this update.
pub fn update_memberships(
    image: &Buffer2<f64>,
    previous: &MembershipMatrix,
    centers: &ClusterCenters,
    config: &Config,
    memberships: &mut MembershipMatrix,
) -> Result<(), Instability> {
    let (width, height, n_classes) = memberships.shape();
    assert_eq!(previous.shape(), memberships.shape(), "shape mismatch");
    assert_eq!(image.dimensions(), (width, height), "image shape mismatch");
    assert_eq!(centers.len(), n_classes, "center count mismatch");

    let exponent = config.membership_exponent();
    let neighbor_weight = config.neighbor_weight();
    let mut fallback_pixels = 0usize;

    for y in 0..height {
        for x in 0..width {
            let intensity = image[(x, y)];
            let raw = memberships.pixel_mut(x, y);

            for (class, value) in raw.iter_mut().enumerate() {
                let similarity = gaussian_kernel(intensity, centers[class], config.sigma);
                let penalty =
                    neighbor_weight * previous.neighborhood_penalty(x, y, class, config.fuzziness);
                let base = (1.0 - similarity) + penalty;
                *value = base.powf(exponent);
            }

            match normalize_pixel(raw) {
                Some(PixelNormalization::UniformFallback) => fallback_pixels += 1,
                Some(_) => {}
                None => {
                    let class = raw.iter().position(|v| !v.is_finite()).unwrap_or(0);
                    return Err(Instability::NonFiniteMembership { x, y, class });
                }
            }
        }
    }

    if fallback_pixels > 0 {
        tracing::warn!(
            pixels = fallback_pixels,
            "Membership sum underflowed, using uniform memberships"
        );
    }

    Ok(())
}

/// Normalize one pixel's raw memberships in place so they sum to 1.
///
/// Returns `None` when a raw value is NaN.
fn normalize_pixel(raw: &mut [f64]) -> Option<PixelNormalization> {
    if raw.iter().any(|v| v.is_nan()) {
        return None;
    }

    // A zero base (pixel sits exactly on a center with no neighborhood
    // penalty) yields +inf; those classes split the membership.
    let singular = raw.iter().filter(|v| v.is_infinite()).count();
    if singular > 0 {
        let share = 1.0 / singular as f64;
        for value in raw.iter_mut() {
            *value = if value.is_infinite() { share } else { 0.0 };
        }
        return Some(PixelNormalization::Singular);
    }

    let max = raw.iter().copied().fold(0.0f64, f64::max);
    if max == 0.0 {
        let share = 1.0 / raw.len() as f64;
        raw.fill(share);
        return Some(PixelNormalization::UniformFallback);
    }

    // Scale by the largest value first so the sum cannot overflow.
    let sum: f64 = raw.iter().map(|v| v / max).sum();
    for value in raw.iter_mut() {
        *value = *value / max / sum;
    }
    if raw.iter().all(|v| v.is_finite()) {
        Some(PixelNormalization::Regular)
    } else {
        None
    }
}

/// Largest absolute per-entry change between two membership matrices.
pub fn max_abs_difference(previous: &MembershipMatrix, current: &MembershipMatrix) -> f64 {
    assert_eq!(previous.shape(), current.shape(), "shape mismatch");
    previous
        .values
        .iter()
        .zip(&current.values)
        .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()))
}

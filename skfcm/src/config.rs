//! Configuration for a segmentation run.
//!
//! [`Config`] carries every tunable of the algorithm. Defaults reproduce the
//! reference parameter set (4 classes, sigma 100, m = 2, alpha = 4).

use strum_macros::Display;

use crate::error::Error;

/// Number of neighbors in the 3x3 window around a pixel, center excluded.
pub const NEIGHBOR_COUNT: usize = 8;

/// How final memberships are turned into an output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Reconstruction {
    /// Each pixel takes the center of its highest-membership class.
    #[default]
    Exclusive,
    /// Each pixel is the membership-weighted blend of all centers.
    Shared,
}

/// Parameters of one SKFCM run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Gaussian kernel dispersion. Must be positive.
    pub sigma: f64,
    /// Number of clusters.
    pub n_classes: usize,
    /// Fuzziness exponent `m`. Must be greater than 1.
    pub fuzziness: f64,
    /// Weight of the 8-neighborhood regularization term.
    /// Zero disables spatial coupling.
    pub alpha: f64,
    /// Iteration cap. The loop always performs at least one iteration and at
    /// most `max_iterations + 1`.
    pub max_iterations: usize,
    /// Convergence threshold on the largest per-entry membership change.
    pub epsilon: f64,
    /// Output mode of the segmented image.
    pub reconstruction: Reconstruction,
    /// Seed of the class-index generator used for initialization.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sigma: 100.0,
            n_classes: 4,
            fuzziness: 2.0,
            alpha: 4.0,
            max_iterations: 250,
            epsilon: 1e-7,
            reconstruction: Reconstruction::Exclusive,
            seed: 4_567_890,
        }
    }
}

impl Config {
    pub fn with_classes(mut self, n_classes: usize) -> Self {
        self.n_classes = n_classes;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    pub fn with_fuzziness(mut self, fuzziness: f64) -> Self {
        self.fuzziness = fuzziness;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_reconstruction(mut self, reconstruction: Reconstruction) -> Self {
        self.reconstruction = reconstruction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Exponent applied to the raw membership base, `-1 / (m - 1)`.
    #[inline]
    pub(crate) fn membership_exponent(&self) -> f64 {
        -1.0 / (self.fuzziness - 1.0)
    }

    /// Per-neighbor weight of the regularization term, `alpha / Nr`.
    #[inline]
    pub(crate) fn neighbor_weight(&self) -> f64 {
        self.alpha / NEIGHBOR_COUNT as f64
    }

    /// Reject parameter sets the update equations are undefined for.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(Error::invalid(
                "sigma",
                format!("must be positive and finite, got {}", self.sigma),
            ));
        }
        if self.n_classes == 0 {
            return Err(Error::invalid("n_classes", "must be at least 1"));
        }
        if !(self.fuzziness.is_finite() && self.fuzziness > 1.0) {
            return Err(Error::invalid(
                "fuzziness",
                format!("must be finite and greater than 1, got {}", self.fuzziness),
            ));
        }
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(Error::invalid(
                "alpha",
                format!("must be non-negative and finite, got {}", self.alpha),
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::invalid(
                "epsilon",
                format!("must be positive and finite, got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

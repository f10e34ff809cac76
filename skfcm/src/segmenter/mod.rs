//! The SKFCM optimization loop.
//!
//! A run owns its membership matrix and centers exclusively. Each iteration:
//! 1. Snapshot the memberships
//! 2. Update the centers from the snapshot
//! 3. Update the memberships from the new centers and the snapshot
//! 4. Measure the largest membership change against the snapshot
//!
//! The loop stops once the change drops to `epsilon` or the iteration cap is
//! exceeded. Both checks run after the body, so at least one iteration is
//! always performed.

#[cfg(test)]
mod tests;

use common::Buffer2;
use strum_macros::Display;

use crate::centers::{update_centers, ClusterCenters};
use crate::config::{Config, Reconstruction};
use crate::error::Error;
use crate::init::{ClassIndexSource, SeededClassIndices};
use crate::membership::{max_abs_difference, update_memberships, MembershipMatrix};
use crate::reconstruct::{class_labels, reconstruct};

/// Tolerance on the per-pixel sum of caller-supplied memberships.
const MEMBERSHIP_SUM_TOLERANCE: f64 = 1e-6;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Termination {
    /// The largest membership change fell to `epsilon` or below.
    Converged,
    /// The iteration cap was exceeded before convergence.
    IterationCapReached,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Final memberships, normalized per pixel.
    pub memberships: MembershipMatrix,
    /// Final class centers.
    pub centers: ClusterCenters,
    /// Number of iterations performed (at least 1).
    pub iterations: usize,
    /// Largest membership change of the last iteration.
    pub divergence: f64,
    /// Largest membership change of every iteration, in order.
    pub divergence_history: Vec<f64>,
    pub termination: Termination,
    /// Segmented image in the configured reconstruction mode.
    pub image: Buffer2<f64>,
}

impl Segmentation {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Reconstruct the result in any mode without rerunning.
    pub fn reconstruct(&self, mode: Reconstruction) -> Buffer2<f64> {
        reconstruct(&self.memberships, &self.centers, mode)
    }

    /// Dominant class of every pixel.
    pub fn labels(&self) -> Buffer2<usize> {
        class_labels(&self.memberships)
    }
}

/// Runs SKFCM segmentations with a fixed, validated configuration.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: Config,
}

impl Segmenter {
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Segment `image`, initializing memberships from `config.seed`.
    pub fn segment(&self, image: &Buffer2<f64>) -> Result<Segmentation, Error> {
        let mut source = SeededClassIndices::new(self.config.seed);
        self.segment_with_source(image, &mut source)
    }

    /// Segment `image` with a caller-provided class index source for the
    /// random one-hot start.
    pub fn segment_with_source(
        &self,
        image: &Buffer2<f64>,
        source: &mut dyn ClassIndexSource,
    ) -> Result<Segmentation, Error> {
        validate_image(image)?;
        let memberships =
            MembershipMatrix::one_hot(image.width(), image.height(), self.config.n_classes, source);
        self.run(image, memberships)
    }

    /// Segment `image` starting from the given memberships.
    pub fn segment_from(
        &self,
        image: &Buffer2<f64>,
        initial: MembershipMatrix,
    ) -> Result<Segmentation, Error> {
        validate_image(image)?;
        self.validate_initial(image, &initial)?;
        self.run(image, initial)
    }

    fn validate_initial(&self, image: &Buffer2<f64>, initial: &MembershipMatrix) -> Result<(), Error> {
        let expected = (image.width(), image.height(), self.config.n_classes);
        if initial.shape() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: initial.shape(),
            });
        }

        for y in 0..initial.height() {
            for x in 0..initial.width() {
                let pixel = initial.pixel(x, y);
                if pixel.iter().any(|u| !u.is_finite() || *u < 0.0) {
                    return Err(Error::invalid(
                        "initial_memberships",
                        format!("pixel ({}, {}) has a negative or non-finite entry", x, y),
                    ));
                }
                let sum: f64 = pixel.iter().sum();
                if (sum - 1.0).abs() > MEMBERSHIP_SUM_TOLERANCE {
                    return Err(Error::invalid(
                        "initial_memberships",
                        format!("pixel ({}, {}) sums to {}, expected 1", x, y, sum),
                    ));
                }
            }
        }

        Ok(())
    }

    fn run(
        &self,
        image: &Buffer2<f64>,
        mut memberships: MembershipMatrix,
    ) -> Result<Segmentation, Error> {
        let config = &self.config;
        tracing::info!(
            width = image.width(),
            height = image.height(),
            n_classes = config.n_classes,
            sigma = config.sigma,
            fuzziness = config.fuzziness,
            alpha = config.alpha,
            max_iterations = config.max_iterations,
            epsilon = config.epsilon,
            reconstruction = %config.reconstruction,
            "Starting SKFCM segmentation"
        );

        let mut centers = ClusterCenters::initial(config.n_classes);
        let mut previous = memberships.clone();
        let mut divergence_history = Vec::new();
        let mut iteration = 0usize;

        let termination = loop {
            previous.copy_from(&memberships);

            update_centers(image, &previous, config, &mut centers)
                .map_err(|cause| Error::NumericInstability { iteration, cause })?;
            update_memberships(image, &previous, &centers, config, &mut memberships)
                .map_err(|cause| Error::NumericInstability { iteration, cause })?;

            let divergence = max_abs_difference(&previous, &memberships);
            divergence_history.push(divergence);
            iteration += 1;

            tracing::debug!(
                iteration,
                divergence,
                centers = ?centers.as_slice(),
                "SKFCM iteration finished"
            );

            if divergence <= config.epsilon {
                break Termination::Converged;
            }
            if iteration > config.max_iterations {
                break Termination::IterationCapReached;
            }
        };

        let divergence = divergence_history.last().copied().unwrap_or(0.0);
        match termination {
            Termination::Converged => tracing::info!(
                iterations = iteration,
                divergence,
                centers = ?centers.as_slice(),
                "SKFCM converged"
            ),
            Termination::IterationCapReached => tracing::warn!(
                iterations = iteration,
                divergence,
                epsilon = config.epsilon,
                "SKFCM stopped at the iteration cap without converging"
            ),
        }

        let segmented = reconstruct(&memberships, &centers, config.reconstruction);
        Ok(Segmentation {
            memberships,
            centers,
            iterations: iteration,
            divergence,
            divergence_history,
            termination,
            image: segmented,
        })
    }
}

fn validate_image(image: &Buffer2<f64>) -> Result<(), Error> {
    if image.is_empty() {
        return Err(Error::EmptyImage);
    }
    if let Some((x, y, value)) = image.enumerate_pixels().find(|(_, _, v)| !v.is_finite()) {
        return Err(Error::invalid(
            "image",
            format!("pixel ({}, {}) is not finite: {}", x, y, value),
        ));
    }
    Ok(())
}

/// Segment `image` with `config`, seeding the initialization from `config.seed`.
pub fn segment(image: &Buffer2<f64>, config: &Config) -> Result<Segmentation, Error> {
    Segmenter::new(config.clone())?.segment(image)
}

//! SKFCM - Spatial Kernelized Fuzzy C-Means segmentation of grayscale images.
//!
//! Every pixel gets a degree of membership to each of a fixed number of
//! classes. Memberships and class centers are refined alternately, using a
//! Gaussian kernel as the intensity similarity and the 8-neighborhood of each
//! pixel as a spatial regularizer, until memberships stop changing. The result
//! is rendered as a hard (exclusive) or soft (shared) segmentation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use skfcm::{Buffer2, Config, Reconstruction, segment};
//!
//! let image = Buffer2::new(width, height, intensities);
//! let config = Config::default()
//!     .with_classes(3)
//!     .with_reconstruction(Reconstruction::Shared);
//!
//! let result = segment(&image, &config)?;
//! println!("{} after {} iterations", result.termination, result.iterations);
//! ```
//!
//! Decoding, displaying and saving images is left to the caller; the crate
//! works on plain `f64` grids.

mod centers;
mod config;
mod error;
mod init;
mod kernel;
mod membership;
mod reconstruct;
mod segmenter;

#[cfg(test)]
pub(crate) mod testing;

pub use common::Buffer2;

// ============================================================================
// Configuration and errors
// ============================================================================

pub use config::{Config, Reconstruction, NEIGHBOR_COUNT};
pub use error::{Error, Instability};

// ============================================================================
// Algorithm building blocks
// ============================================================================

pub use centers::{update_centers, ClusterCenters, MAX_INTENSITY};
pub use init::{ClassIndexSource, CyclicClassIndices, SeededClassIndices};
pub use kernel::gaussian_kernel;
pub use membership::{max_abs_difference, update_memberships, MembershipMatrix};

// ============================================================================
// Running and reconstructing
// ============================================================================

pub use reconstruct::{class_labels, normalize_range, reconstruct};
pub use segmenter::{segment, Segmentation, Segmenter, Termination};

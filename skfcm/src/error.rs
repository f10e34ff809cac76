//! Error types for segmentation runs.

use thiserror::Error;

/// Numeric breakdown detected while iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instability {
    /// No pixel carries kernel-weighted membership for this class, so its
    /// center has a zero denominator.
    DegenerateCenter { class: usize },
    /// A membership became NaN or infinite after normalization.
    NonFiniteMembership { x: usize, y: usize, class: usize },
}

impl std::fmt::Display for Instability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instability::DegenerateCenter { class } => {
                write!(f, "class {} lost all weighted support", class)
            }
            Instability::NonFiniteMembership { x, y, class } => {
                write!(
                    f,
                    "membership of class {} at ({}, {}) is not finite",
                    class, x, y
                )
            }
        }
    }
}

/// Errors that can occur when configuring or running a segmentation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Image has no pixels")]
    EmptyImage,

    #[error("Dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("Numeric instability at iteration {iteration}: {cause}")]
    NumericInstability {
        iteration: usize,
        cause: Instability,
    },
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

//! Sources of class indices for the random one-hot membership start.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Supplies uniformly distributed class indices in `0..n_classes`.
pub trait ClassIndexSource {
    fn next_class_index(&mut self, n_classes: usize) -> usize;
}

/// Reproducible source backed by a seeded ChaCha8 generator.
#[derive(Debug, Clone)]
pub struct SeededClassIndices {
    rng: ChaCha8Rng,
}

impl SeededClassIndices {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl ClassIndexSource for SeededClassIndices {
    fn next_class_index(&mut self, n_classes: usize) -> usize {
        debug_assert!(n_classes > 0);
        self.rng.random_range(0..n_classes)
    }
}

/// Deterministic round-robin source: 0, 1, ..., n-1, 0, 1, ...
///
/// Guarantees every class gets pixels as long as the image has at least
/// `n_classes` of them.
#[derive(Debug, Clone, Default)]
pub struct CyclicClassIndices {
    next: usize,
}

impl CyclicClassIndices {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClassIndexSource for CyclicClassIndices {
    fn next_class_index(&mut self, n_classes: usize) -> usize {
        let index = self.next % n_classes;
        self.next = self.next.wrapping_add(1);
        index
    }
}

//! Testing utilities for skfcm.

#![allow(dead_code)]

use common::Buffer2;

use crate::membership::MembershipMatrix;

/// Initialize tracing subscriber for tests.
/// Safe to call multiple times - will only initialize once.
/// Respects RUST_LOG env var, defaults to "info".
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Image whose left half is `left` and right half is `right`.
pub fn two_region_image(width: usize, height: usize, left: f64, right: f64) -> Buffer2<f64> {
    Buffer2::from_fn(width, height, |x, _| if x < width / 2 { left } else { right })
}

/// Assert every pixel's memberships sum to 1 and lie in `[0, 1]`.
pub fn assert_normalized(memberships: &MembershipMatrix) {
    for y in 0..memberships.height() {
        for x in 0..memberships.width() {
            let pixel = memberships.pixel(x, y);
            let sum: f64 = pixel.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "pixel ({}, {}) sums to {}: {:?}",
                x,
                y,
                sum,
                pixel
            );
            assert!(
                pixel.iter().all(|&u| (0.0..=1.0 + 1e-12).contains(&u)),
                "pixel ({}, {}) has entries outside [0, 1]: {:?}",
                x,
                y,
                pixel
            );
        }
    }
}

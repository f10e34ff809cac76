//! Tests for the SKFCM optimization loop.

use super::*;
use crate::error::Instability;
use crate::init::CyclicClassIndices;
use crate::testing::{assert_normalized, init_tracing, two_region_image};

fn run_cyclic(image: &Buffer2<f64>, config: Config) -> Result<Segmentation, Error> {
    Segmenter::new(config)?.segment_with_source(image, &mut CyclicClassIndices::new())
}

#[test]
fn test_constant_image_converges_to_its_value() {
    init_tracing();
    let image = Buffer2::new_filled(2, 2, 100.0);
    let config = Config::default()
        .with_classes(2)
        .with_fuzziness(2.0)
        .with_sigma(10.0)
        .with_alpha(0.0)
        .with_max_iterations(50)
        .with_epsilon(1e-6);

    let result = run_cyclic(&image, config).unwrap();

    assert!(result.converged(), "terminated with {}", result.termination);
    for &center in result.centers.as_slice() {
        assert!((center - 100.0).abs() < 1e-9, "center {}", center);
    }
    for mode in [Reconstruction::Exclusive, Reconstruction::Shared] {
        let out = result.reconstruct(mode);
        assert_eq!(out.dimensions(), (2, 2));
        for &v in out.iter() {
            assert!((v - 100.0).abs() < 1e-9, "{} pixel {}", mode, v);
        }
    }
    assert_normalized(&result.memberships);
}

#[test]
fn test_two_pixels_split_to_extremes() {
    let image = Buffer2::new(2, 1, vec![0.0, 255.0]);
    let config = Config::default().with_classes(2).with_alpha(0.0);

    let result = run_cyclic(&image, config).unwrap();

    assert!(result.converged());
    assert!(result.centers[0].abs() < 1e-9, "center {}", result.centers[0]);
    assert!((result.centers[1] - 255.0).abs() < 1e-9, "center {}", result.centers[1]);
    assert_eq!(result.labels().pixels(), &[0, 1]);
    assert_eq!(result.image.pixels(), result.centers.as_slice());
}

#[test]
fn test_two_pixels_split_with_regularization() {
    let image = Buffer2::new(2, 1, vec![0.0, 255.0]);
    let config = Config::default().with_classes(2).with_alpha(4.0);

    let result = run_cyclic(&image, config).unwrap();

    assert!(result.centers[0] < 10.0, "center {}", result.centers[0]);
    assert!(result.centers[1] > 245.0, "center {}", result.centers[1]);
    assert_eq!(result.labels().pixels(), &[0, 1]);
    assert_normalized(&result.memberships);
}

#[test]
fn test_single_class_reconstructions_are_identical_constants() {
    let image = Buffer2::from_fn(4, 4, |x, y| (x * 50 + y * 10) as f64);
    let config = Config::default().with_classes(1);

    let result = Segmenter::new(config).unwrap().segment(&image).unwrap();

    let exclusive = result.reconstruct(Reconstruction::Exclusive);
    let shared = result.reconstruct(Reconstruction::Shared);
    assert_eq!(exclusive, shared);
    let center = result.centers[0];
    assert!(exclusive.iter().all(|&v| v == center));
    assert!(result.converged());
    assert_eq!(result.iterations, 1);
}

#[test]
fn test_fixed_point_start_converges_immediately() {
    let image = Buffer2::new_filled(3, 3, 100.0);
    let config = Config::default().with_classes(3);
    let segmenter = Segmenter::new(config).unwrap();

    let result = segmenter
        .segment_from(&image, MembershipMatrix::uniform(3, 3, 3))
        .unwrap();

    assert_eq!(result.termination, Termination::Converged);
    assert_eq!(result.iterations, 1);
    assert_eq!(result.divergence, 0.0);
    assert_eq!(result.divergence_history, vec![0.0]);
}

#[test]
fn test_single_pixel_image() {
    let image = Buffer2::new(1, 1, vec![77.0]);

    let single = run_cyclic(&image, Config::default().with_classes(1)).unwrap();
    assert_eq!(single.memberships.pixel(0, 0), &[1.0]);
    assert!((single.centers[0] - 77.0).abs() < 1e-9);

    let segmenter = Segmenter::new(Config::default().with_classes(2)).unwrap();
    let shared = segmenter
        .segment_from(&image, MembershipMatrix::uniform(1, 1, 2))
        .unwrap();
    assert_normalized(&shared.memberships);
    assert!(shared.converged());
}

#[test]
fn test_unregularized_result_follows_pixel_permutation() {
    let values = vec![10.0, 200.0, 30.0, 180.0, 90.0, 120.0];
    let reversed: Vec<f64> = values.iter().rev().copied().collect();
    let forward_image = Buffer2::new(3, 2, values);
    let reversed_image = Buffer2::new(3, 2, reversed);

    let initial_for = |image: &Buffer2<f64>| {
        MembershipMatrix::from_fn(3, 2, 2, |x, y, c| {
            let dark = image[(x, y)] < 100.0;
            if (c == 0) == dark {
                0.8
            } else {
                0.2
            }
        })
    };
    let segmenter = Segmenter::new(
        Config::default()
            .with_classes(2)
            .with_alpha(0.0)
            .with_reconstruction(Reconstruction::Shared),
    )
    .unwrap();

    let forward = segmenter
        .segment_from(&forward_image, initial_for(&forward_image))
        .unwrap();
    let backward = segmenter
        .segment_from(&reversed_image, initial_for(&reversed_image))
        .unwrap();

    let expected: Vec<f64> = forward.image.iter().rev().copied().collect();
    for (a, b) in backward.image.iter().zip(&expected) {
        assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
    }
    for (a, b) in backward.centers.as_slice().iter().zip(forward.centers.as_slice()) {
        assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
    }
}

#[test]
fn test_two_regions_are_separated() {
    let image = two_region_image(8, 6, 20.0, 220.0);
    let initial = MembershipMatrix::from_fn(8, 6, 2, |x, y, c| {
        // Rough guess biased toward the right answer but with wrong pixels.
        let left = x < 4;
        let flipped = (x + y) % 5 == 0;
        if (c == 0) == (left != flipped) {
            0.7
        } else {
            0.3
        }
    });
    let segmenter = Segmenter::new(Config::default().with_classes(2)).unwrap();

    let result = segmenter.segment_from(&image, initial).unwrap();

    assert!(result.converged());
    let labels = result.labels();
    for (x, y, &label) in labels.enumerate_pixels() {
        let expected = if x < 4 { 0 } else { 1 };
        assert_eq!(label, expected, "pixel ({}, {})", x, y);
    }
    assert!((result.centers[0] - 20.0).abs() < 1.0, "{:?}", result.centers);
    assert!((result.centers[1] - 220.0).abs() < 1.0, "{:?}", result.centers);
    assert_eq!(result.image[(0, 0)], result.centers[0]);
    assert_eq!(result.image[(7, 5)], result.centers[1]);
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let image = Buffer2::from_fn(8, 8, |x, y| {
        (if x < 4 { 30.0 } else { 200.0 }) + y as f64
    });
    let config = Config::default().with_classes(2).with_seed(1234);

    let a = segment(&image, &config).unwrap();
    let b = segment(&image, &config).unwrap();

    assert_eq!(a.memberships, b.memberships);
    assert_eq!(a.centers, b.centers);
    assert_eq!(a.iterations, b.iterations);
    assert_eq!(a.image, b.image);
    assert_normalized(&a.memberships);
}

#[test]
fn test_memberships_normalized_after_every_iteration_count() {
    let image = two_region_image(6, 4, 50.0, 150.0);
    for cap in 0..5 {
        let config = Config::default()
            .with_classes(3)
            .with_max_iterations(cap)
            .with_epsilon(1e-300);
        let result = run_cyclic(&image, config).unwrap();
        assert_normalized(&result.memberships);
    }
}

#[test]
fn test_zero_cap_still_runs_one_iteration() {
    let image = two_region_image(4, 4, 20.0, 220.0);
    let config = Config::default().with_classes(2).with_max_iterations(0);

    let result = run_cyclic(&image, config).unwrap();

    assert_eq!(result.iterations, 1);
    assert_eq!(result.termination, Termination::IterationCapReached);
    assert_eq!(result.divergence_history.len(), 1);
}

#[test]
fn test_cap_allows_one_extra_iteration() {
    let image = two_region_image(4, 4, 20.0, 220.0);
    let config = Config::default()
        .with_classes(2)
        .with_max_iterations(3)
        .with_epsilon(1e-300);

    let result = run_cyclic(&image, config).unwrap();

    assert_eq!(result.iterations, 4);
    assert_eq!(result.termination, Termination::IterationCapReached);
    assert_eq!(result.divergence_history.len(), 4);
    assert_eq!(result.divergence, result.divergence_history[3]);
}

#[test]
fn test_configured_reconstruction_is_used() {
    let image = Buffer2::new(2, 1, vec![0.0, 255.0]);
    let config = Config::default()
        .with_classes(2)
        .with_alpha(4.0)
        .with_reconstruction(Reconstruction::Shared);

    let result = run_cyclic(&image, config).unwrap();

    assert_eq!(result.image, result.reconstruct(Reconstruction::Shared));
    assert_ne!(result.image, result.reconstruct(Reconstruction::Exclusive));
}

#[test]
fn test_class_without_support_is_numeric_instability() {
    // One pixel, two classes: the cyclic source gives everything to class 0.
    let image = Buffer2::new(1, 1, vec![128.0]);

    let err = run_cyclic(&image, Config::default().with_classes(2)).unwrap_err();

    match err {
        Error::NumericInstability { iteration, cause } => {
            assert_eq!(iteration, 0);
            assert_eq!(cause, Instability::DegenerateCenter { class: 1 });
        }
        other => panic!("expected NumericInstability, got {:?}", other),
    }
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = Segmenter::new(Config::default().with_fuzziness(1.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "fuzziness", .. }));

    let image = Buffer2::new_filled(2, 2, 1.0);
    let err = segment(&image, &Config::default().with_sigma(0.0)).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "sigma", .. }));
}

#[test]
fn test_empty_image_is_rejected() {
    let image: Buffer2<f64> = Buffer2::new(0, 3, vec![]);
    let err = segment(&image, &Config::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyImage));
}

#[test]
fn test_non_finite_pixel_is_rejected() {
    let mut image = Buffer2::new_filled(2, 2, 1.0);
    image[(1, 1)] = f64::NAN;
    let err = segment(&image, &Config::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "image", .. }));
}

#[test]
fn test_initial_memberships_shape_must_match() {
    let image = Buffer2::new_filled(3, 2, 1.0);
    let segmenter = Segmenter::new(Config::default().with_classes(2)).unwrap();

    let err = segmenter
        .segment_from(&image, MembershipMatrix::uniform(3, 2, 3))
        .unwrap_err();

    match err {
        Error::DimensionMismatch { expected, actual } => {
            assert_eq!(expected, (3, 2, 2));
            assert_eq!(actual, (3, 2, 3));
        }
        other => panic!("expected DimensionMismatch, got {:?}", other),
    }
}

#[test]
fn test_initial_memberships_must_be_normalized() {
    let image = Buffer2::new_filled(2, 2, 1.0);
    let segmenter = Segmenter::new(Config::default().with_classes(2)).unwrap();

    let err = segmenter
        .segment_from(&image, MembershipMatrix::new_filled(2, 2, 2, 0.7))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidParameter {
            name: "initial_memberships",
            ..
        }
    ));
}

#[test]
fn test_termination_display() {
    assert_eq!(Termination::Converged.to_string(), "converged");
    assert_eq!(
        Termination::IterationCapReached.to_string(),
        "iteration_cap_reached"
    );
}

//! Tests for the CPU backend.
//!
//! These tests check the distributed real-to-half-complex transform against
//! analytic modes, a direct DFT and the serial run of the same grid.

#![cfg(test)]

use crate::CpuBackend;
use num_complex::Complex64;
use shearspec_core::backend::SpectralBackend;
use shearspec_core::comm::{Communicator, SingleRank, ThreadComm};
use shearspec_core::config::ConfigError;
use shearspec_core::field::{Field, Representation};
use shearspec_core::grid::Grid3D;
use shearspec_core::layout::SlabLayout;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::thread;

fn pseudo_random(seed: u64) -> impl Fn(usize, usize, usize) -> f64 {
    move |i, j, k| {
        let mut x = seed ^ ((i as u64) << 40) ^ ((j as u64) << 20) ^ k as u64;
        x = x.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        x ^= x >> 29;
        x = x.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        x ^= x >> 32;
        (x as f64 / u64::MAX as f64) * 2.0 - 1.0
    }
}

fn max_real_diff(a: &Field, b: &Field) -> f64 {
    let layout = *a.layout();
    let grid = layout.grid();
    let mut worst = 0.0f64;
    for i in 0..layout.nx_local() {
        for j in 0..grid.ny {
            for k in 0..grid.nz {
                worst = worst.max((a.real(i, j, k) - b.real(i, j, k)).abs());
            }
        }
    }
    worst
}

// ============================================================================
// Serial transforms
// ============================================================================

#[test]
fn transform_roundtrip_recovers_signal() {
    let grid = Grid3D::new(6, 4, 8, 3.0, 2.0, 4.0);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let original = Field::from_fn(layout, pseudo_random(7));

    let mut field = original.clone();
    backend.forward(&mut field).unwrap();
    assert_eq!(field.representation(), Representation::Spectral);
    backend.inverse(&mut field).unwrap();
    assert_eq!(field.representation(), Representation::Real);

    let diff = max_real_diff(&field, &original);
    assert!(diff < 1e-12, "roundtrip diverged: diff={diff}");
    for i in 0..grid.nx {
        for j in 0..grid.ny {
            assert_eq!(field.as_slice()[layout.real_index(i, j, grid.nz)], 0.0);
            assert_eq!(field.as_slice()[layout.real_index(i, j, grid.nz + 1)], 0.0);
        }
    }
}

#[test]
fn single_cosine_lands_in_one_scaled_coefficient() {
    let grid = Grid3D::unit_spacing(8, 4, 8);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let mut field = Field::from_fn(layout, |i, j, k| {
        (TAU * (i as f64 / 8.0 + 2.0 * j as f64 / 4.0 + 3.0 * k as f64 / 8.0)).cos()
    });
    backend.forward(&mut field).unwrap();

    for i in 0..grid.nx {
        for j in 0..grid.ny {
            for m in 0..grid.nz_modes() {
                let expected = if (i, j, m) == (1, 2, 3) { 0.5 } else { 0.0 };
                let got = field.mode(i, j, m);
                assert!(
                    (got - Complex64::new(expected, 0.0)).norm() < 1e-12,
                    "mode ({i},{j},{m}) = {got}"
                );
            }
        }
    }
}

#[test]
fn sine_along_x_lands_on_positive_imaginary_coefficient() {
    let grid = Grid3D::unit_spacing(8, 4, 4);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let mut field = Field::from_fn(layout, |i, _, _| (TAU * i as f64 / 8.0).sin());
    backend.forward(&mut field).unwrap();

    // The e^{+iK·x} kernel puts sin(Kx) at +i/2 on +K and -i/2 on -K.
    assert!((field.mode(1, 0, 0) - Complex64::new(0.0, 0.5)).norm() < 1e-12);
    assert!((field.mode(7, 0, 0) - Complex64::new(0.0, -0.5)).norm() < 1e-12);
}

#[test]
fn forward_matches_direct_dft() {
    let grid = Grid3D::unit_spacing(4, 6, 4);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let sample = pseudo_random(21);
    let mut field = Field::from_fn(layout, &sample);
    backend.forward(&mut field).unwrap();

    let norm = 1.0 / grid.len() as f64;
    for kx in 0..grid.nx {
        for ky in 0..grid.ny {
            for m in 0..grid.nz_modes() {
                let mut sum = Complex64::default();
                for x in 0..grid.nx {
                    for y in 0..grid.ny {
                        for z in 0..grid.nz {
                            let phase = TAU
                                * ((kx * x) as f64 / grid.nx as f64
                                    + (ky * y) as f64 / grid.ny as f64
                                    + (m * z) as f64 / grid.nz as f64);
                            sum += sample(x, y, z) * Complex64::from_polar(1.0, phase);
                        }
                    }
                }
                let diff = (field.mode(kx, ky, m) - sum * norm).norm();
                assert!(diff < 1e-12, "mode ({kx},{ky},{m}) off by {diff}");
            }
        }
    }
}

#[test]
fn batch_transform_handles_every_component() {
    let grid = Grid3D::unit_spacing(4, 4, 4);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let originals: Vec<Field> = (0..3)
        .map(|seed| Field::from_fn(layout, pseudo_random(seed)))
        .collect();
    let mut fields = originals.clone();
    backend.forward_batch(&mut fields).unwrap();
    assert!(fields
        .iter()
        .all(|f| f.representation() == Representation::Spectral));
    backend.inverse_batch(&mut fields).unwrap();
    for (f, original) in fields.iter().zip(&originals) {
        assert!(max_real_diff(f, original) < 1e-12);
    }
}

#[test]
fn out_of_place_transforms_leave_the_source_untouched() {
    let grid = Grid3D::unit_spacing(4, 4, 6);
    let mut backend = CpuBackend::serial(grid).unwrap();
    let layout = *backend.layout();
    let source = Field::from_fn(layout, pseudo_random(3));

    let mut spectral = Field::zeros(layout);
    backend.forward_into(&source, &mut spectral).unwrap();
    assert_eq!(source.representation(), Representation::Real);
    assert_eq!(spectral.representation(), Representation::Spectral);

    let mut in_place = source.clone();
    backend.forward(&mut in_place).unwrap();
    assert_eq!(spectral.as_slice(), in_place.as_slice());

    let mut back = Field::zeros(layout);
    backend.inverse_into(&spectral, &mut back).unwrap();
    assert!(max_real_diff(&back, &source) < 1e-12);
}

// ============================================================================
// Decomposed transforms
// ============================================================================

#[test]
fn decomposed_transform_matches_serial_slabs() {
    let grid = Grid3D::new(8, 8, 6, 2.0, 1.0, 1.5);
    let sample = pseudo_random(99);
    let mut serial = Field::from_fn(SlabLayout::serial(grid).unwrap(), &sample);
    CpuBackend::serial(grid)
        .unwrap()
        .forward(&mut serial)
        .unwrap();

    let size = 2;
    let handles: Vec<_> = ThreadComm::create(size)
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            thread::spawn(move || {
                let layout = SlabLayout::new(grid, rank, size).unwrap();
                let comm: Arc<dyn Communicator> = Arc::new(comm);
                let mut backend = CpuBackend::new(layout, comm).unwrap();
                let original = Field::from_fn(layout, pseudo_random(99));
                let mut field = original.clone();
                backend.forward(&mut field).unwrap();
                let spectral = field.clone();
                backend.inverse(&mut field).unwrap();
                (spectral, max_real_diff(&field, &original))
            })
        })
        .collect();

    for (rank, handle) in handles.into_iter().enumerate() {
        let (spectral, roundtrip) = handle.join().expect("rank thread panicked");
        assert!(roundtrip < 1e-12, "rank {rank} roundtrip diff={roundtrip}");
        let ny_local = spectral.layout().ny_local();
        for i in 0..grid.nx {
            for jj in 0..ny_local {
                for m in 0..grid.nz_modes() {
                    let expected = serial.mode(i, rank * ny_local + jj, m);
                    let diff = (spectral.mode(i, jj, m) - expected).norm();
                    assert!(diff < 1e-12, "rank {rank} mode ({i},{jj},{m}) off by {diff}");
                }
            }
        }
    }
}

#[test]
fn decomposed_batch_matches_component_transforms() {
    let grid = Grid3D::new(4, 8, 6, 1.0, 2.0, 1.5);
    let size = 2;
    let handles: Vec<_> = ThreadComm::create(size)
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            thread::spawn(move || {
                let layout = SlabLayout::new(grid, rank, size).unwrap();
                let comm: Arc<dyn Communicator> = Arc::new(comm);
                let mut backend = CpuBackend::new(layout, comm).unwrap();
                let originals: Vec<Field> = (0..5)
                    .map(|seed| Field::from_fn(layout, pseudo_random(40 + seed)))
                    .collect();

                let mut batch = originals.clone();
                backend.forward_batch(&mut batch).unwrap();
                let mut single = originals.clone();
                for field in single.iter_mut() {
                    backend.forward(field).unwrap();
                }
                let spectral_match = batch
                    .iter()
                    .zip(&single)
                    .all(|(a, b)| a.as_slice() == b.as_slice());

                backend.inverse_batch(&mut batch).unwrap();
                let roundtrip = batch
                    .iter()
                    .zip(&originals)
                    .map(|(a, b)| max_real_diff(a, b))
                    .fold(0.0f64, f64::max);
                (spectral_match, roundtrip)
            })
        })
        .collect();

    for (rank, handle) in handles.into_iter().enumerate() {
        let (spectral_match, roundtrip) = handle.join().expect("rank thread panicked");
        assert!(spectral_match, "rank {rank}: batch differs from single transforms");
        assert!(roundtrip < 1e-12, "rank {rank} batch roundtrip diff={roundtrip}");
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn odd_nz_is_rejected() {
    let result = CpuBackend::serial(Grid3D::unit_spacing(4, 4, 5));
    assert!(matches!(
        result,
        Err(ConfigError::UnsupportedTransformSize(ref msg)) if msg.contains("nz=5")
    ));
}

#[test]
fn communicator_must_match_the_layout() {
    let layout = SlabLayout::new(Grid3D::unit_spacing(4, 4, 4), 1, 2).unwrap();
    let result = CpuBackend::new(layout, Arc::new(SingleRank));
    assert!(matches!(result, Err(ConfigError::Decomposition(_))));
}

#![cfg(test)]

use std::f64::consts::TAU;

use super::config::ConfigError;
use super::grid::{build_k_vector, signed_wavenumber, Grid3D};
use super::kspace::Wavenumbers;
use super::layout::{Representation, SlabLayout};

#[test]
fn signed_wavenumber_wraps_above_half() {
    let ks: Vec<i64> = (0..8).map(|i| signed_wavenumber(i, 8)).collect();
    assert_eq!(ks, vec![0, 1, 2, 3, 4, -3, -2, -1]);
    let odd: Vec<i64> = (0..5).map(|i| signed_wavenumber(i, 5)).collect();
    assert_eq!(odd, vec![0, 1, 2, -2, -1]);
}

#[test]
fn k_vector_scales_by_domain_length() {
    let k = build_k_vector(4, 2.0);
    assert!((k[1] - TAU / 2.0).abs() < 1e-15);
    assert!((k[3] + TAU / 2.0).abs() < 1e-15);
}

#[test]
fn padded_axis_holds_every_half_complex_mode() {
    let grid = Grid3D::unit_spacing(4, 4, 8);
    assert_eq!(grid.nz_modes(), 5);
    assert_eq!(grid.padded_nz(), 2 * grid.nz_modes());
}

#[test]
fn real_and_spectral_buffers_have_equal_length() {
    let grid = Grid3D::unit_spacing(8, 4, 6);
    for rank in 0..2 {
        let layout = SlabLayout::new(grid, rank, 2).expect("valid layout");
        assert_eq!(layout.buffer_len(), 4 * 4 * 8);
        assert_eq!(layout.buffer_len(), grid.nx * layout.spectral_plane_len());
    }
}

#[test]
fn slab_offsets_follow_rank_order() {
    let grid = Grid3D::unit_spacing(8, 4, 4);
    let layout = SlabLayout::new(grid, 1, 2).expect("valid layout");
    assert_eq!(layout.prev(Representation::Real), [4, 0, 0]);
    assert_eq!(layout.next(Representation::Real), [8, 4, 4]);
    assert_eq!(layout.prev(Representation::Spectral), [0, 2, 0]);
    assert_eq!(layout.next(Representation::Spectral), [8, 4, 6]);
}

#[test]
fn spectral_wavenumber_uses_global_row_and_halved_z() {
    let grid = Grid3D::unit_spacing(8, 8, 8);
    let layout = SlabLayout::new(grid, 1, 2).expect("valid layout");
    assert_eq!(layout.wavenumber(7, 1, 5), [-1, -3, 2]);
    assert_eq!(layout.spectral_index(1, 2, 3), (4 + 2) * 10 + 3);
}

#[test]
fn indivisible_decomposition_is_rejected() {
    let grid = Grid3D::unit_spacing(6, 4, 4);
    let err = SlabLayout::new(grid, 0, 4).unwrap_err();
    assert!(matches!(err, ConfigError::Decomposition(_)));
    assert!(err.to_string().contains("nx=6"));
}

#[test]
fn zero_extent_is_rejected() {
    let err = SlabLayout::serial(Grid3D::unit_spacing(0, 4, 4)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidGrid(_)));
}

#[test]
fn wavenumber_table_matches_layout() {
    let grid = Grid3D::new(8, 8, 8, 2.0, 4.0, 8.0);
    let layout = SlabLayout::new(grid, 1, 2).expect("valid layout");
    let k = Wavenumbers::new(&layout);
    assert_eq!(k.ky().len(), 4);
    assert_eq!(k.kz().len(), 5);
    assert_eq!(k.integer(7, 1, 2), [-1, -3, 2]);
    let kk = k.k(1, 0, 1);
    assert!((kk[0] - TAU / 2.0).abs() < 1e-14);
    assert!((kk[1] - TAU * 4.0 / 4.0).abs() < 1e-14);
    assert!((kk[2] - TAU / 8.0).abs() < 1e-14);
    assert!(!k.owns_zero_mode());
}

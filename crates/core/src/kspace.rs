//! Wavenumber tables for the locally owned spectral slab.

use crate::grid::{build_k_vector, signed_wavenumber, DIM};
use crate::layout::{Representation, SlabLayout};

/// Angular and integer wavenumbers of the rank's spectral slab, built once
/// and shared by every operator.
#[derive(Debug, Clone)]
pub struct Wavenumbers {
    layout: SlabLayout,
    kx: Vec<f64>,
    /// Local spectral rows only.
    ky: Vec<f64>,
    /// One entry per complex z-mode.
    kz: Vec<f64>,
    ix: Vec<i64>,
    iy: Vec<i64>,
}

impl Wavenumbers {
    pub fn new(layout: &SlabLayout) -> Self {
        let grid = layout.grid();
        let y0 = layout.prev(Representation::Spectral)[1];
        let ny_local = layout.ny_local();

        let kx = build_k_vector(grid.nx, grid.lx);
        let ky_full = build_k_vector(grid.ny, grid.ly);
        let ky = ky_full[y0..y0 + ny_local].to_vec();
        let kz = build_k_vector(grid.nz, grid.lz)[..grid.nz_modes()].to_vec();
        let ix = (0..grid.nx).map(|i| signed_wavenumber(i, grid.nx)).collect();
        let iy = (y0..y0 + ny_local)
            .map(|j| signed_wavenumber(j, grid.ny))
            .collect();
        Self {
            layout: *layout,
            kx,
            ky,
            kz,
            ix,
            iy,
        }
    }

    pub fn layout(&self) -> &SlabLayout {
        &self.layout
    }

    pub fn kx(&self) -> &[f64] {
        &self.kx
    }

    pub fn ky(&self) -> &[f64] {
        &self.ky
    }

    pub fn kz(&self) -> &[f64] {
        &self.kz
    }

    /// Angular wave vector `K` at global `i`, local `j`, z-mode `m`.
    #[inline]
    pub fn k(&self, i: usize, j: usize, m: usize) -> [f64; DIM] {
        [self.kx[i], self.ky[j], self.kz[m]]
    }

    /// Signed integer wavenumber at global `i`, local `j`, z-mode `m`.
    #[inline]
    pub fn integer(&self, i: usize, j: usize, m: usize) -> [i64; DIM] {
        [self.ix[i], self.iy[j], m as i64]
    }

    #[inline]
    pub fn is_zero_mode(&self, i: usize, j: usize, m: usize) -> bool {
        self.ix[i] == 0 && self.iy[j] == 0 && m == 0
    }

    /// Whether this rank owns the zero mode.
    pub fn owns_zero_mode(&self) -> bool {
        self.layout.prev(Representation::Spectral)[1] == 0
    }
}

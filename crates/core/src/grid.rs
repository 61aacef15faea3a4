//! Uniform periodic 3D grid helpers.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

/// Number of vector components.
pub const DIM: usize = 3;
/// Independent components kept for a symmetric rank-2 tensor, stored as
/// `[xx, xy, xz, yy, yz]`.
pub const QDIM: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid3D {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    #[serde(default = "default_length")]
    pub lx: f64,
    #[serde(default = "default_length")]
    pub ly: f64,
    #[serde(default = "default_length")]
    pub lz: f64,
}

impl Grid3D {
    pub fn new(nx: usize, ny: usize, nz: usize, lx: f64, ly: f64, lz: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            lx,
            ly,
            lz,
        }
    }

    /// Unit-spaced grid (`L = N` along every axis).
    pub fn unit_spacing(nx: usize, ny: usize, nz: usize) -> Self {
        Self::new(nx, ny, nz, nx as f64, ny as f64, nz as f64)
    }

    /// Number of logical sample points.
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the last buffer axis: `nz` samples plus the two reals the
    /// half-complex packing needs for the Nyquist pair.
    #[inline]
    pub fn padded_nz(&self) -> usize {
        self.nz + 2
    }

    /// Number of complex z-modes kept by the half-complex packing.
    #[inline]
    pub fn nz_modes(&self) -> usize {
        self.nz / 2 + 1
    }

    pub fn dx(&self) -> f64 {
        self.lx / self.nx as f64
    }

    pub fn dy(&self) -> f64 {
        self.ly / self.ny as f64
    }

    pub fn dz(&self) -> f64 {
        self.lz / self.nz as f64
    }

    pub fn lengths(&self) -> [f64; DIM] {
        [self.lx, self.ly, self.lz]
    }

    pub fn extents(&self) -> [usize; DIM] {
        [self.nx, self.ny, self.nz]
    }

    pub fn volume(&self) -> f64 {
        self.lx * self.ly * self.lz
    }

    /// Physical coordinate of a real-space sample.
    pub fn position(&self, i: usize, j: usize, k: usize) -> [f64; DIM] {
        [
            i as f64 * self.dx(),
            j as f64 * self.dy(),
            k as f64 * self.dz(),
        ]
    }
}

/// Signed wavenumber for index `i` on an axis of length `n`.
#[inline]
pub fn signed_wavenumber(i: usize, n: usize) -> i64 {
    if i <= n / 2 {
        i as i64
    } else {
        i as i64 - n as i64
    }
}

/// Angular wave vector component `2π k / L` for every index on an axis.
pub fn build_k_vector(n: usize, length: f64) -> Vec<f64> {
    (0..n)
        .map(|i| TAU * signed_wavenumber(i, n) as f64 / length)
        .collect()
}

fn default_length() -> f64 {
    1.0
}

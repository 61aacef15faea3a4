//! Per-rank slab layouts for the real-space and spectral-space buffers.
//!
//! The real-space buffer of a rank holds a contiguous range of x-planes
//! (full y, padded z). After the distributed transform the same buffer holds
//! a contiguous range of y-rows in spectral space (full x, padded z). Both
//! layouts index the buffer as `(i * rows + j) * nz_padded + k`, so one
//! allocation serves either representation.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::grid::{signed_wavenumber, Grid3D, DIM};

/// Which interpretation of a field buffer is currently valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Representation {
    Real,
    Spectral,
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Representation::Real => write!(f, "real space"),
            Representation::Spectral => write!(f, "spectral space"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlabLayout {
    grid: Grid3D,
    rank: usize,
    size: usize,
    /// Owned x-planes in real space.
    nx_local: usize,
    /// Owned y-rows in spectral space.
    ny_local: usize,
}

impl SlabLayout {
    /// Build the layout of `rank` in a decomposition over `size` ranks.
    pub fn new(grid: Grid3D, rank: usize, size: usize) -> Result<Self, ConfigError> {
        if grid.nx == 0 || grid.ny == 0 || grid.nz == 0 {
            return Err(ConfigError::InvalidGrid(format!(
                "grid extents must be non-zero, got {}x{}x{}",
                grid.nx, grid.ny, grid.nz
            )));
        }
        if !(grid.lx > 0.0 && grid.ly > 0.0 && grid.lz > 0.0) {
            return Err(ConfigError::InvalidGrid(format!(
                "domain lengths must be positive, got [{}, {}, {}]",
                grid.lx, grid.ly, grid.lz
            )));
        }
        if size == 0 || rank >= size {
            return Err(ConfigError::Decomposition(format!(
                "rank {rank} is outside a decomposition of {size} ranks"
            )));
        }
        if grid.nx % size != 0 || grid.ny % size != 0 {
            return Err(ConfigError::Decomposition(format!(
                "nx={} and ny={} must both be divisible by the rank count {size}",
                grid.nx, grid.ny
            )));
        }
        Ok(Self {
            grid,
            rank,
            size,
            nx_local: grid.nx / size,
            ny_local: grid.ny / size,
        })
    }

    /// Layout of a single-rank run.
    pub fn serial(grid: Grid3D) -> Result<Self, ConfigError> {
        Self::new(grid, 0, 1)
    }

    pub fn grid(&self) -> Grid3D {
        self.grid
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Locally owned extents `[x, y, z]`. The z entry counts samples in real
    /// space and half-complex reals in spectral space.
    pub fn local_extents(&self, repr: Representation) -> [usize; DIM] {
        match repr {
            Representation::Real => [self.nx_local, self.grid.ny, self.grid.nz],
            Representation::Spectral => [self.grid.nx, self.ny_local, self.grid.padded_nz()],
        }
    }

    /// First global index owned per axis (`PREV_NPs`).
    pub fn prev(&self, repr: Representation) -> [usize; DIM] {
        match repr {
            Representation::Real => [self.rank * self.nx_local, 0, 0],
            Representation::Spectral => [0, self.rank * self.ny_local, 0],
        }
    }

    /// One past the last global index owned per axis (`NEXT_NPs`).
    pub fn next(&self, repr: Representation) -> [usize; DIM] {
        let prev = self.prev(repr);
        let ext = self.local_extents(repr);
        [prev[0] + ext[0], prev[1] + ext[1], prev[2] + ext[2]]
    }

    pub fn nx_local(&self) -> usize {
        self.nx_local
    }

    pub fn ny_local(&self) -> usize {
        self.ny_local
    }

    /// Length of the per-rank buffer, identical in both representations.
    pub fn buffer_len(&self) -> usize {
        self.nx_local * self.grid.ny * self.grid.padded_nz()
    }

    /// Reals in one real-space x-plane (`ny * nz_padded`).
    pub fn real_plane_len(&self) -> usize {
        self.grid.ny * self.grid.padded_nz()
    }

    /// Reals in one spectral x-plane (`ny_local * nz_padded`).
    pub fn spectral_plane_len(&self) -> usize {
        self.ny_local * self.grid.padded_nz()
    }

    /// Buffer length of the full x extent gathered across ranks.
    pub fn full_real_len(&self) -> usize {
        self.grid.nx * self.real_plane_len()
    }

    /// Flat offset of a real-space sample, `i` local to the slab.
    #[inline]
    pub fn real_index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.grid.ny + j) * self.grid.padded_nz() + k
    }

    /// Flat offset of a spectral entry, `j` local to the slab and `k` the
    /// half-complex real index (`2m` real part, `2m + 1` imaginary part).
    #[inline]
    pub fn spectral_index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.ny_local + j) * self.grid.padded_nz() + k
    }

    /// Signed wavenumber triple of a spectral entry (`j` local, `k` the
    /// half-complex real index).
    #[inline]
    pub fn wavenumber(&self, i: usize, j: usize, k: usize) -> [i64; DIM] {
        let j_global = j + self.rank * self.ny_local;
        [
            signed_wavenumber(i, self.grid.nx),
            signed_wavenumber(j_global, self.grid.ny),
            (k / 2) as i64,
        ]
    }
}

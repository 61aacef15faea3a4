//! Two-thirds rule de-aliasing.
//!
//! Coefficients with `|kx| < TRN_X`, `|ky| < TRN_Y` and `kz < TRN_Z` are
//! retained. The complement is covered by four disjoint index boxes in
//! global spectral coordinates:
//!
//! 1. z-high: every `(i, j)`, half-complex index `k >= 2 TRN_Z`
//! 2. y-band: every `i`, `TRN_Y <= j <= NY - TRN_Y`
//! 3. x-band, low y rows `j < TRN_Y`
//! 4. x-band, high y rows `j > NY - TRN_Y`
//!
//! Boxes 2 to 4 only span the retained z range. Each box is clipped to the
//! rank's spectral slab before zeroing.

use log::info;
use rayon::prelude::*;

use crate::config::ConfigError;
use crate::field::{Field, Representation, VectorField};
use crate::grid::{Grid3D, DIM};
use crate::layout::SlabLayout;

/// Half-open box `start[a]..end[a]` of spectral buffer indices. `i` and `j`
/// are global indices, the third axis is the half-complex real index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: [usize; DIM],
    pub end: [usize; DIM],
}

impl IndexRange {
    pub fn new(start: [usize; DIM], end: [usize; DIM]) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        (0..DIM).any(|a| self.start[a] >= self.end[a])
    }

    /// Intersection with the locally owned spectral rows, with `j` rebased
    /// to the slab. `None` when nothing is owned.
    pub fn clip_to(&self, layout: &SlabLayout) -> Option<IndexRange> {
        let prev = layout.prev(Representation::Spectral);
        let next = layout.next(Representation::Spectral);
        let mut start = [0; DIM];
        let mut end = [0; DIM];
        for a in 0..DIM {
            let lo = self.start[a].max(prev[a]);
            let hi = self.end[a].min(next[a]);
            if lo >= hi {
                return None;
            }
            start[a] = lo - prev[a];
            end[a] = hi - prev[a];
        }
        Some(IndexRange { start, end })
    }
}

/// Default thresholds `N / 3` per axis.
pub fn default_thresholds(grid: Grid3D) -> [usize; DIM] {
    [grid.nx / 3, grid.ny / 3, grid.nz / 3]
}

/// Thresholds must leave at least one retained mode and cannot exceed the
/// largest representable wavenumber.
pub fn check_thresholds(grid: Grid3D, thresholds: [usize; DIM]) -> Result<(), ConfigError> {
    let limits = [grid.nx / 2, grid.ny / 2, grid.nz / 2];
    for (axis, (&trn, &limit)) in thresholds.iter().zip(limits.iter()).enumerate() {
        let name = ["TRN_X", "TRN_Y", "TRN_Z"][axis];
        if trn == 0 || trn > limit {
            return Err(ConfigError::Truncation(format!(
                "{name}={trn} must lie in 1..={limit} for a grid of {}x{}x{}",
                grid.nx, grid.ny, grid.nz
            )));
        }
    }
    Ok(())
}

/// Zero the local part of `range` in a spectral field.
pub fn truncate_range(field: &mut Field, range: &IndexRange) {
    field.expect_representation(Representation::Spectral, "truncate_range");
    zero_box(field, range, None);
}

fn zero_box(field: &mut Field, range: &IndexRange, retained: Option<[usize; DIM]>) {
    let layout = *field.layout();
    let Some(local) = range.clip_to(&layout) else {
        return;
    };
    let plane = layout.spectral_plane_len();
    let nzp = layout.grid().padded_nz();

    field.as_mut_slice()[local.start[0] * plane..local.end[0] * plane]
        .par_chunks_mut(plane)
        .enumerate()
        .for_each(|(di, chunk)| {
            let i = local.start[0] + di;
            for j in local.start[1]..local.end[1] {
                let row = &mut chunk[j * nzp..(j + 1) * nzp];
                if let Some(trn) = retained {
                    for k in local.start[2]..local.end[2] {
                        let n = layout.wavenumber(i, j, k);
                        debug_assert!(
                            n[0].unsigned_abs() as usize >= trn[0]
                                || n[1].unsigned_abs() as usize >= trn[1]
                                || n[2] as usize >= trn[2],
                            "truncation zeroed retained mode {n:?}"
                        );
                    }
                }
                row[local.start[2]..local.end[2]].fill(0.0);
            }
        });
}

#[derive(Debug, Clone)]
pub struct Dealiaser {
    layout: SlabLayout,
    thresholds: [usize; DIM],
    ranges: Vec<IndexRange>,
}

impl Dealiaser {
    pub fn new(layout: &SlabLayout, thresholds: Option<[usize; DIM]>) -> Result<Self, ConfigError> {
        let grid = layout.grid();
        let thresholds = thresholds.unwrap_or_else(|| default_thresholds(grid));
        check_thresholds(grid, thresholds)?;
        let [tx, ty, tz] = thresholds;
        let (nx, ny, nzp) = (grid.nx, grid.ny, grid.padded_nz());
        let kz_end = 2 * tz;

        let ranges: Vec<IndexRange> = [
            IndexRange::new([0, 0, kz_end], [nx, ny, nzp]),
            IndexRange::new([0, ty, 0], [nx, ny - ty + 1, kz_end]),
            IndexRange::new([tx, 0, 0], [nx - tx + 1, ty, kz_end]),
            IndexRange::new([tx, ny - ty + 1, 0], [nx - tx + 1, ny, kz_end]),
        ]
        .into_iter()
        .filter(|r| !r.is_empty())
        .collect();

        info!(
            "dealiasing with thresholds TRN_X={tx} TRN_Y={ty} TRN_Z={tz} ({} boxes)",
            ranges.len()
        );
        Ok(Self {
            layout: *layout,
            thresholds,
            ranges,
        })
    }

    pub fn thresholds(&self) -> [usize; DIM] {
        self.thresholds
    }

    /// Global boxes zeroed by [`Dealiaser::truncate`].
    pub fn ranges(&self) -> &[IndexRange] {
        &self.ranges
    }

    pub fn is_retained(&self, n: [i64; DIM]) -> bool {
        let [tx, ty, tz] = self.thresholds;
        (n[0].unsigned_abs() as usize) < tx
            && (n[1].unsigned_abs() as usize) < ty
            && (n[2].unsigned_abs() as usize) < tz
    }

    pub fn truncate(&self, field: &mut Field) {
        field.expect_representation(Representation::Spectral, "truncate");
        debug_assert_eq!(*field.layout(), self.layout);
        for range in &self.ranges {
            zero_box(field, range, Some(self.thresholds));
        }
    }

    pub fn truncate_vector<const D: usize>(&self, field: &mut VectorField<D>) {
        for component in field.components_mut() {
            self.truncate(component);
        }
    }
}

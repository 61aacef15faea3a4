//! Mapping between the orthogonal lab frame and the shear-co-moving
//! oblique frame (Lees-Edwards boundary conditions).
//!
//! Row `j` of the oblique grid is displaced along x by
//! `s_j = γ (j - NY/2) dy / dx` grid cells, `γ = degree_oblique`. Going to
//! the oblique frame samples the orthogonal field at `i + s_j`; going back
//! samples at `i - s_j`. Shifted rows may reach any x-plane, so every
//! transform first gathers the full x extent on each rank.
//!
//! The interpolation strategy is picked once at construction and boxed as a
//! [`RowRemap`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::comm::{gather_full_extent, CommError, Communicator};
use crate::config::ConfigError;
use crate::field::{Field, Representation, Tensor5, Vector3};
use crate::layout::SlabLayout;
use crate::spline::PeriodicSpline;

/// Shear of the oblique frame, owned by the time-integration driver and
/// read-only for the duration of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ShearState {
    /// Accumulated strain of the oblique frame.
    pub degree_oblique: f64,
    /// Instantaneous effective shear rate.
    pub shear_rate_eff: f64,
}

impl ShearState {
    pub fn new(degree_oblique: f64, shear_rate_eff: f64) -> Self {
        Self {
            degree_oblique,
            shear_rate_eff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Two-point blend of the samples bracketing the shifted coordinate.
    #[default]
    Linear,
    /// Periodic cubic spline over the full x row.
    Spline,
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interpolation::Linear => write!(f, "linear"),
            Interpolation::Spline => write!(f, "spline"),
        }
    }
}

impl FromStr for Interpolation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Interpolation::Linear),
            "spline" => Ok(Interpolation::Spline),
            _ => Err(ConfigError::UnknownInterpolation(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    CartesianToOblique,
    ObliqueToCartesian,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::CartesianToOblique => 1.0,
            Direction::ObliqueToCartesian => -1.0,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::CartesianToOblique => Direction::ObliqueToCartesian,
            Direction::ObliqueToCartesian => Direction::CartesianToOblique,
        }
    }
}

impl FromStr for Direction {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "cartesian_to_oblique" | "cartesian2oblique" => Ok(Direction::CartesianToOblique),
            "oblique_to_cartesian" | "oblique2cartesian" => Ok(Direction::ObliqueToCartesian),
            _ => Err(ConfigError::UnknownDirection(s.to_string())),
        }
    }
}

/// Whether returning to the lab frame adds the mean shear flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeanFlow {
    #[default]
    Add,
    Suppress,
}

/// Resamples the owned x-planes of a real-space slab from the gathered full
/// extent. `shifts[j]` is the signed x displacement of row `j` in cells.
pub trait RowRemap {
    fn remap(&mut self, layout: &SlabLayout, shifts: &[f64], full: &[f64], local: &mut [f64]);
}

#[derive(Debug, Default)]
pub struct LinearRemap;

impl RowRemap for LinearRemap {
    fn remap(&mut self, layout: &SlabLayout, shifts: &[f64], full: &[f64], local: &mut [f64]) {
        let grid = layout.grid();
        let (nx, ny, nz) = (grid.nx as i64, grid.ny, grid.nz);
        let x0 = layout.prev(Representation::Real)[0];

        local
            .par_chunks_mut(layout.real_plane_len())
            .enumerate()
            .for_each(|(il, plane)| {
                let nzp = grid.padded_nz();
                for (j, &shift) in shifts.iter().enumerate().take(ny) {
                    let x = (x0 + il) as f64 + shift;
                    let base = x.floor();
                    let alpha = x - base;
                    let i0 = (base as i64).rem_euclid(nx) as usize;
                    let i1 = (i0 + 1) % grid.nx;
                    let row0 = layout.real_index(i0, j, 0);
                    let row1 = layout.real_index(i1, j, 0);
                    for k in 0..nz {
                        plane[j * nzp + k] =
                            (1.0 - alpha) * full[row0 + k] + alpha * full[row1 + k];
                    }
                }
            });
    }
}

pub struct SplineRemap {
    spline: PeriodicSpline,
    /// Resampled rows in `(j, k, i_local)` order.
    rows: Vec<f64>,
}

impl SplineRemap {
    pub fn new(layout: &SlabLayout) -> Self {
        let grid = layout.grid();
        Self {
            spline: PeriodicSpline::new(grid.nx, grid.dx()),
            rows: vec![0.0; grid.ny * grid.nz * layout.nx_local()],
        }
    }
}

impl RowRemap for SplineRemap {
    fn remap(&mut self, layout: &SlabLayout, shifts: &[f64], full: &[f64], local: &mut [f64]) {
        let grid = layout.grid();
        let (nx, nz, nzp) = (grid.nx, grid.nz, grid.padded_nz());
        let nx_local = layout.nx_local();
        let x0 = layout.prev(Representation::Real)[0];
        let spline = &self.spline;

        self.rows.par_chunks_mut(nx_local).enumerate().for_each_init(
            || (vec![0.0; nx], vec![0.0; nx]),
            |(values, moments), (row, out)| {
                let (j, k) = (row / nz, row % nz);
                for (i, v) in values.iter_mut().enumerate() {
                    *v = full[layout.real_index(i, j, k)];
                }
                spline.fit(values, moments);
                for (il, o) in out.iter_mut().enumerate() {
                    *o = spline.eval(values, moments, (x0 + il) as f64 + shifts[j]);
                }
            },
        );

        let rows = &self.rows;
        local
            .par_chunks_mut(layout.real_plane_len())
            .enumerate()
            .for_each(|(il, plane)| {
                for j in 0..grid.ny {
                    for k in 0..nz {
                        plane[j * nzp + k] = rows[(j * nz + k) * nx_local + il];
                    }
                }
            });
    }
}

pub struct ObliqueTransform {
    layout: SlabLayout,
    interpolation: Interpolation,
    comm: Arc<dyn Communicator>,
    remap: Box<dyn RowRemap + Send + Sync>,
    full: Vec<f64>,
    shifts: Vec<f64>,
}

impl ObliqueTransform {
    pub fn new(layout: &SlabLayout, interpolation: Interpolation, comm: Arc<dyn Communicator>) -> Self {
        debug_assert_eq!(comm.rank(), layout.rank());
        debug_assert_eq!(comm.size(), layout.size());
        let remap: Box<dyn RowRemap + Send + Sync> = match interpolation {
            Interpolation::Linear => Box::new(LinearRemap),
            Interpolation::Spline => Box::new(SplineRemap::new(layout)),
        };
        info!(
            "oblique transform: {interpolation} interpolation over {} ranks",
            layout.size()
        );
        Self {
            layout: *layout,
            interpolation,
            comm,
            remap,
            full: vec![0.0; layout.full_real_len()],
            shifts: vec![0.0; layout.grid().ny],
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    /// Move a real-space scalar field between frames.
    pub fn transform_scalar(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        field: &mut Field,
    ) -> Result<(), CommError> {
        field.expect_representation(Representation::Real, "transform_scalar");
        let grid = self.layout.grid();
        let half = (grid.ny / 2) as f64;
        let scale = direction.sign() * shear.degree_oblique * grid.dy() / grid.dx();
        for (j, shift) in self.shifts.iter_mut().enumerate() {
            *shift = scale * (j as f64 - half);
        }
        debug!(
            "rank {}: {direction:?} remap with degree_oblique={}",
            self.layout.rank(),
            shear.degree_oblique
        );

        gather_full_extent(self.comm.as_ref(), &self.layout, field.as_slice(), &mut self.full)?;
        self.remap
            .remap(&self.layout, &self.shifts, &self.full, field.as_mut_slice());
        Ok(())
    }

    /// Move a real-space velocity between Cartesian components on the lab
    /// grid and contravariant components on the oblique grid.
    pub fn transform_velocity(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        mean_flow: MeanFlow,
        u: &mut Vector3,
    ) -> Result<(), CommError> {
        for component in u.components_mut() {
            self.transform_scalar(shear, direction, component)?;
        }

        let grid = self.layout.grid();
        let (ny, nz, nzp) = (grid.ny, grid.nz, grid.padded_nz());
        let gamma = shear.degree_oblique;
        let flow = match (direction, mean_flow) {
            (Direction::ObliqueToCartesian, MeanFlow::Add) => shear.shear_rate_eff,
            _ => 0.0,
        };
        let dy = grid.dy();
        let half = (ny / 2) as f64;
        let sign = -direction.sign();
        let [ux, uy, _] = u.components_mut();

        ux.as_mut_slice()
            .par_chunks_mut(self.layout.real_plane_len())
            .zip(uy.as_slice().par_chunks(self.layout.real_plane_len()))
            .for_each(|(x, y)| {
                for j in 0..ny {
                    let offset = flow * (j as f64 - half) * dy;
                    for k in 0..nz {
                        let idx = j * nzp + k;
                        x[idx] += sign * gamma * y[idx] + offset;
                    }
                }
            });
        Ok(())
    }

    /// Move a real-space strain/stress tensor `[xx, xy, xz, yy, yz]` between
    /// Cartesian and contravariant oblique components. Returning to the lab
    /// frame with [`MeanFlow::Add`] adds the viscous stress `η γ̇` of the
    /// mean shear to `xy`.
    pub fn transform_stress(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        mean_flow: MeanFlow,
        viscosity: f64,
        stress: &mut Tensor5,
    ) -> Result<(), CommError> {
        for component in stress.components_mut() {
            self.transform_scalar(shear, direction, component)?;
        }

        let grid = self.layout.grid();
        let (ny, nz, nzp) = (grid.ny, grid.nz, grid.padded_nz());
        let g = -direction.sign() * shear.degree_oblique;
        let mean = match (direction, mean_flow) {
            (Direction::ObliqueToCartesian, MeanFlow::Add) => viscosity * shear.shear_rate_eff,
            _ => 0.0,
        };
        let plane = self.layout.real_plane_len();
        let [exx, exy, exz, eyy, eyz] = stress.components_mut();

        exx.as_mut_slice()
            .par_chunks_mut(plane)
            .zip(exy.as_mut_slice().par_chunks_mut(plane))
            .zip(exz.as_mut_slice().par_chunks_mut(plane))
            .zip(eyy.as_slice().par_chunks(plane))
            .zip(eyz.as_slice().par_chunks(plane))
            .for_each(|((((xx, xy), xz), yy), yz)| {
                for j in 0..ny {
                    for k in 0..nz {
                        let idx = j * nzp + k;
                        xx[idx] += 2.0 * g * xy[idx] + g * g * yy[idx];
                        xy[idx] += g * yy[idx] + mean;
                        xz[idx] += g * yz[idx];
                    }
                }
            });
        Ok(())
    }
}

//! Shear-rate and stress diagnostics used by the driver of a sheared run.
//!
//! Volume means are rayon sums over owned x-planes followed by an
//! `all_reduce_sum`. Summation order depends on the thread count, so the low
//! bits may differ between runs with different parallelism.

use std::sync::Arc;

use rayon::prelude::*;

use crate::backend::SpectralBackend;
use crate::comm::{gather_full_extent, CommError, Communicator};
use crate::field::{Field, Reduced2, Representation, Vector3};
use crate::grid::DIM;
use crate::kspace::Wavenumbers;
use crate::layout::SlabLayout;
use crate::metric::Metric;
use crate::oblique::ShearState;
use crate::operators::derivative;
use crate::vorticity::velocity_from_reduced;

pub struct ShearDiagnostics {
    layout: SlabLayout,
    comm: Arc<dyn Communicator>,
    velocity: Vector3,
    gradient: Field,
    full: Vec<f64>,
}

impl ShearDiagnostics {
    pub fn new(layout: &SlabLayout, comm: Arc<dyn Communicator>) -> Self {
        Self {
            layout: *layout,
            comm,
            velocity: Vector3::zeros(*layout),
            gradient: Field::zeros(*layout),
            full: vec![0.0; layout.full_real_len()],
        }
    }

    /// Instantaneous shear rate: `∂u_x/∂y` averaged over the central half
    /// of the box, `NY/4 <= j < 3 NY/4`, where the wall-free bulk flow is
    /// measured.
    pub fn mean_velocity_gradient<B: SpectralBackend>(
        &mut self,
        backend: &mut B,
        wavenumbers: &Wavenumbers,
        metric: Metric,
        zeta: &Reduced2,
        uk_dc: [f64; DIM],
    ) -> Result<f64, CommError> {
        velocity_from_reduced(wavenumbers, metric, zeta, uk_dc, &mut self.velocity);
        derivative(wavenumbers, 1, self.velocity.component(0), &mut self.gradient);
        backend.inverse(&mut self.gradient)?;

        let grid = self.layout.grid();
        let (ny0, ny1) = (grid.ny / 4, 3 * grid.ny / 4);
        let nzp = grid.padded_nz();
        let local: f64 = self
            .gradient
            .as_slice()
            .par_chunks(self.layout.real_plane_len())
            .map(|plane| {
                (ny0..ny1)
                    .map(|j| plane[j * nzp..j * nzp + grid.nz].iter().sum::<f64>())
                    .sum::<f64>()
            })
            .sum();

        let mut total = [local];
        self.comm.all_reduce_sum(&mut total)?;
        Ok(total[0] / (grid.nx * (ny1 - ny0) * grid.nz) as f64)
    }

    /// Volume mean of the y-gradient of a real-space oblique-frame field,
    /// taken along the sheared grid lines.
    pub fn mean_oblique_gradient_y(
        &mut self,
        shear: &ShearState,
        field: &Field,
    ) -> Result<f64, CommError> {
        let sum = self.oblique_gradient_sum(shear, field, None)?;
        Ok(sum / self.layout.grid().len() as f64)
    }

    /// Add the mean oblique-frame gradient of `u_x` to `shear_rate_eff` and
    /// return the increment.
    pub fn update_shear_rate(&mut self, shear: &mut ShearState, ux: &Field) -> Result<f64, CommError> {
        let increment = self.mean_oblique_gradient_y(shear, ux)?;
        shear.shear_rate_eff += increment;
        Ok(increment)
    }

    /// Mean viscous shear stress `<(γ̇_eff + ∂u_x/∂y) η>` with a local
    /// viscosity field `eta`.
    pub fn fluid_stress(&mut self, shear: &ShearState, ux: &Field, eta: &Field) -> Result<f64, CommError> {
        eta.expect_representation(Representation::Real, "fluid_stress");
        let sum = self.oblique_gradient_sum(shear, ux, Some(eta))?;
        Ok(sum / self.layout.grid().len() as f64)
    }

    /// Realised strain rate, the negated mean velocity gradient. Accumulates
    /// `rate * dt` into `strain` and returns the rate.
    #[allow(clippy::too_many_arguments)]
    pub fn update_strain<B: SpectralBackend>(
        &mut self,
        backend: &mut B,
        wavenumbers: &Wavenumbers,
        metric: Metric,
        zeta: &Reduced2,
        uk_dc: [f64; DIM],
        dt: f64,
        strain: &mut f64,
    ) -> Result<f64, CommError> {
        let rate = -self.mean_velocity_gradient(backend, wavenumbers, metric, zeta, uk_dc)?;
        *strain += rate * dt;
        Ok(rate)
    }

    /// Sum over the global grid of the local oblique gradient, weighted by
    /// `shear_rate_eff + gradient` times `eta` when a weight is given.
    fn oblique_gradient_sum(
        &mut self,
        shear: &ShearState,
        field: &Field,
        eta: Option<&Field>,
    ) -> Result<f64, CommError> {
        field.expect_representation(Representation::Real, "oblique gradient");
        gather_full_extent(self.comm.as_ref(), &self.layout, field.as_slice(), &mut self.full)?;

        let layout = self.layout;
        let grid = layout.grid();
        let x0 = layout.prev(Representation::Real)[0];
        let full = &self.full;
        let gamma = shear.degree_oblique;

        let local: f64 = (0..layout.nx_local())
            .into_par_iter()
            .map(|il| {
                let mut acc = 0.0;
                for j in 0..grid.ny {
                    for k in 0..grid.nz {
                        let g = local_gradient_y(full, &layout, gamma, il + x0, j, k);
                        acc += match eta {
                            Some(eta) => (shear.shear_rate_eff + g) * eta.real(il, j, k),
                            None => g,
                        };
                    }
                }
                acc
            })
            .sum();

        let mut total = [local];
        self.comm.all_reduce_sum(&mut total)?;
        Ok(total[0])
    }
}

/// Central y-difference along the sheared grid lines: the neighbours in
/// rows `j ± 1` are blended between `i - 1` and `i + 1` by `degree_oblique`.
/// `full` is the gathered full-extent real buffer and `i` is global.
pub fn local_gradient_y(
    full: &[f64],
    layout: &SlabLayout,
    degree_oblique: f64,
    i: usize,
    j: usize,
    k: usize,
) -> f64 {
    let grid = layout.grid();
    let (nx, ny) = (grid.nx, grid.ny);
    let ip1 = (i + 1) % nx;
    let im1 = (i + nx - 1) % nx;
    let jp1 = (j + 1) % ny;
    let jm1 = (j + ny - 1) % ny;
    let at = |i: usize, j: usize| full[layout.real_index(i, j, k)];

    let upper = 0.5 * ((1.0 - degree_oblique) * at(ip1, jp1) + (1.0 + degree_oblique) * at(im1, jp1));
    let lower = 0.5 * ((1.0 - degree_oblique) * at(im1, jm1) + (1.0 + degree_oblique) * at(ip1, jm1));
    (upper - lower) / (2.0 * grid.dy())
}

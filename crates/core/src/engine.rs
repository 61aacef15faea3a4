//! Field engine facade: one backend plus the tables and scratch every
//! spectral and oblique-frame operation needs, built once from an
//! [`EngineConfig`].

use log::{info, warn};

use crate::backend::SpectralBackend;
use crate::comm::CommError;
use crate::config::{ConfigError, EngineConfig};
use crate::field::{Field, Reduced2, Representation, Tensor5, Vector3, VectorField};
use crate::grid::DIM;
use crate::kspace::Wavenumbers;
use crate::layout::SlabLayout;
use crate::metric::{self, Metric};
use crate::oblique::{Direction, MeanFlow, ObliqueTransform, ShearState};
use crate::operators;
use crate::shear::ShearDiagnostics;
use crate::truncation::Dealiaser;
use crate::vorticity;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Comm(#[from] CommError),
}

pub struct FieldEngine<B: SpectralBackend> {
    config: EngineConfig,
    backend: B,
    wavenumbers: Wavenumbers,
    dealiaser: Dealiaser,
    oblique: ObliqueTransform,
    diagnostics: ShearDiagnostics,
}

impl<B: SpectralBackend> FieldEngine<B> {
    pub fn new(config: EngineConfig, backend: B) -> Result<Self, EngineError> {
        config.validate()?;
        let layout = *backend.layout();
        if layout.grid() != config.grid {
            return Err(ConfigError::Conflict(format!(
                "backend grid {:?} differs from configured grid {:?}",
                layout.grid(),
                config.grid
            ))
            .into());
        }
        configure_threads(config.parallel.threads);

        let comm = backend.communicator().clone();
        let wavenumbers = Wavenumbers::new(&layout);
        let dealiaser = Dealiaser::new(&layout, config.dealias.thresholds)?;
        let oblique = ObliqueTransform::new(&layout, config.oblique.interpolation, comm.clone());
        let diagnostics = ShearDiagnostics::new(&layout, comm);

        let grid = layout.grid();
        info!(
            "field engine: {}x{}x{} grid, L=[{}, {}, {}], rank {}/{}",
            grid.nx,
            grid.ny,
            grid.nz,
            grid.lx,
            grid.ly,
            grid.lz,
            layout.rank(),
            layout.size()
        );

        Ok(Self {
            config,
            backend,
            wavenumbers,
            dealiaser,
            oblique,
            diagnostics,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &SlabLayout {
        self.backend.layout()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn wavenumbers(&self) -> &Wavenumbers {
        &self.wavenumbers
    }

    pub fn dealiaser(&self) -> &Dealiaser {
        &self.dealiaser
    }

    pub fn oblique_mut(&mut self) -> &mut ObliqueTransform {
        &mut self.oblique
    }

    pub fn alloc_scalar(&self) -> Field {
        Field::zeros(*self.layout())
    }

    pub fn alloc_vector(&self) -> Vector3 {
        Vector3::zeros(*self.layout())
    }

    pub fn alloc_reduced(&self) -> Reduced2 {
        Reduced2::zeros_in(*self.layout(), Representation::Spectral)
    }

    pub fn alloc_tensor(&self) -> Tensor5 {
        Tensor5::zeros(*self.layout())
    }

    pub fn forward(&mut self, field: &mut Field) -> Result<(), EngineError> {
        Ok(self.backend.forward(field)?)
    }

    pub fn inverse(&mut self, field: &mut Field) -> Result<(), EngineError> {
        Ok(self.backend.inverse(field)?)
    }

    pub fn forward_vector<const D: usize>(&mut self, field: &mut VectorField<D>) -> Result<(), EngineError> {
        Ok(self.backend.forward_vector(field)?)
    }

    pub fn inverse_vector<const D: usize>(&mut self, field: &mut VectorField<D>) -> Result<(), EngineError> {
        Ok(self.backend.inverse_vector(field)?)
    }

    pub fn gradient(&self, input: &Field, out: &mut Vector3) {
        operators::gradient(&self.wavenumbers, input, out);
    }

    pub fn divergence(&self, u: &Vector3, out: &mut Field) {
        operators::divergence(&self.wavenumbers, u, out);
    }

    pub fn curl_in_place(&self, u: &mut Vector3) {
        operators::curl_in_place(&self.wavenumbers, u);
    }

    pub fn stress_tensor(&self, u: &Vector3, out: &mut Tensor5) {
        operators::stress_tensor(&self.wavenumbers, u, out);
    }

    pub fn stress_tensor_oblique(&self, shear: &ShearState, u: &Vector3, out: &mut Tensor5) {
        operators::stress_tensor_oblique(
            &self.wavenumbers,
            Metric::sheared(shear.degree_oblique),
            u,
            out,
        );
    }

    pub fn truncate(&self, field: &mut Field) {
        self.dealiaser.truncate(field);
    }

    pub fn truncate_vector<const D: usize>(&self, field: &mut VectorField<D>) {
        self.dealiaser.truncate_vector(field);
    }

    /// `ζ` and `uk_dc` of a spectral velocity.
    pub fn reduced_from_velocity(
        &self,
        metric: Metric,
        u: &Vector3,
        zeta: &mut Reduced2,
    ) -> Result<[f64; DIM], EngineError> {
        let comm = self.backend.communicator();
        Ok(vorticity::reduced_from_velocity(
            &self.wavenumbers,
            metric,
            comm.as_ref(),
            u,
            zeta,
        )?)
    }

    pub fn velocity_from_reduced(
        &self,
        metric: Metric,
        zeta: &Reduced2,
        uk_dc: [f64; DIM],
        u: &mut Vector3,
    ) {
        vorticity::velocity_from_reduced(&self.wavenumbers, metric, zeta, uk_dc, u);
    }

    pub fn contra_to_co(&self, shear: &ShearState, field: &mut Vector3) {
        metric::contra_to_co(Metric::sheared(shear.degree_oblique), field);
    }

    pub fn co_to_contra(&self, shear: &ShearState, field: &mut Vector3) {
        metric::co_to_contra(Metric::sheared(shear.degree_oblique), field);
    }

    pub fn transform_scalar(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        field: &mut Field,
    ) -> Result<(), EngineError> {
        Ok(self.oblique.transform_scalar(shear, direction, field)?)
    }

    pub fn transform_velocity(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        mean_flow: MeanFlow,
        u: &mut Vector3,
    ) -> Result<(), EngineError> {
        Ok(self.oblique.transform_velocity(shear, direction, mean_flow, u)?)
    }

    pub fn transform_stress(
        &mut self,
        shear: &ShearState,
        direction: Direction,
        mean_flow: MeanFlow,
        viscosity: f64,
        stress: &mut Tensor5,
    ) -> Result<(), EngineError> {
        Ok(self
            .oblique
            .transform_stress(shear, direction, mean_flow, viscosity, stress)?)
    }

    /// Instantaneous shear rate measured from `ζ` over the central band.
    pub fn mean_velocity_gradient(
        &mut self,
        metric: Metric,
        zeta: &Reduced2,
        uk_dc: [f64; DIM],
    ) -> Result<f64, EngineError> {
        Ok(self.diagnostics.mean_velocity_gradient(
            &mut self.backend,
            &self.wavenumbers,
            metric,
            zeta,
            uk_dc,
        )?)
    }

    pub fn update_shear_rate(&mut self, shear: &mut ShearState, ux: &Field) -> Result<f64, EngineError> {
        Ok(self.diagnostics.update_shear_rate(shear, ux)?)
    }

    pub fn fluid_stress(&mut self, shear: &ShearState, ux: &Field, eta: &Field) -> Result<f64, EngineError> {
        Ok(self.diagnostics.fluid_stress(shear, ux, eta)?)
    }

    pub fn update_strain(
        &mut self,
        metric: Metric,
        zeta: &Reduced2,
        uk_dc: [f64; DIM],
        dt: f64,
        strain: &mut f64,
    ) -> Result<f64, EngineError> {
        Ok(self.diagnostics.update_strain(
            &mut self.backend,
            &self.wavenumbers,
            metric,
            zeta,
            uk_dc,
            dt,
            strain,
        )?)
    }
}

fn configure_threads(threads: Option<usize>) {
    let Some(threads) = threads else {
        return;
    };
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => info!("rayon pool sized to {threads} threads"),
        Err(err) => warn!(
            "parallel.threads={threads} ignored, global rayon pool already running with {} threads: {err}",
            rayon::current_num_threads()
        ),
    }
}

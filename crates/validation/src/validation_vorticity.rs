use crate::validation_utils::{
    build_engine, check, emit_report, noise_field, CpuEngine, GridArgs, GridSummary,
    ValidationSummary,
};
use clap::Args;
use num_complex::Complex64;
use serde::Serialize;
use shearspec_core::field::Vector3;
use shearspec_core::metric::Metric;
use shearspec_core::oblique::Interpolation;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VorticityArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Oblique degree of the metric the velocity is expressed in.
    #[arg(long, default_value_t = 0.0)]
    pub degree_oblique: f64,
    /// Seed of the random velocity field.
    #[arg(long, default_value_t = 3)]
    pub seed: u64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Tolerance on spectral coefficients.
    #[arg(long, default_value_t = 1e-12)]
    pub tol: f64,
}

#[derive(Serialize)]
pub struct VorticityReport {
    grid: GridSummary,
    degree_oblique: f64,
    uk_dc: [f64; 3],
    divergence_free: ValidationSummary,
    velocity_recovered: ValidationSummary,
    mean_flow: ValidationSummary,
}

/// Remove the component of every mode along its wavenumber, leaving
/// `K · u = 0` off the zero mode.
fn project_solenoidal(engine: &CpuEngine, u: &mut Vector3) {
    let layout = *engine.layout();
    let grid = layout.grid();
    let wavenumbers = engine.wavenumbers();
    for i in 0..grid.nx {
        for j in 0..layout.ny_local() {
            for m in 0..grid.nz_modes() {
                let k = wavenumbers.k(i, j, m);
                let k2 = k.iter().map(|v| v * v).sum::<f64>();
                if k2 == 0.0 {
                    continue;
                }
                let modes: [Complex64; 3] = std::array::from_fn(|d| u.component(d).mode(i, j, m));
                let along = (0..3).map(|d| modes[d] * k[d]).sum::<Complex64>() / k2;
                for d in 0..3 {
                    u.component_mut(d).set_mode(i, j, m, modes[d] - along * k[d]);
                }
            }
        }
    }
}

fn max_spectral_diff(a: &Vector3, b: &Vector3) -> f64 {
    a.components()
        .iter()
        .zip(b.components())
        .flat_map(|(x, y)| x.as_slice().iter().zip(y.as_slice()))
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

pub fn run(args: VorticityArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = args.grid.grid();
    let mut engine = build_engine(grid, Interpolation::Linear, None)?;
    let layout = *engine.layout();
    let metric = Metric::sheared(args.degree_oblique);

    let mut u = Vector3::from_components([
        noise_field(layout, args.seed),
        noise_field(layout, args.seed + 1),
        noise_field(layout, args.seed + 2),
    ]);
    engine.forward_vector(&mut u)?;
    project_solenoidal(&engine, &mut u);
    let mean: [f64; 3] = std::array::from_fn(|d| u.component(d).mode(0, 0, 0).re);

    let mut zeta = engine.alloc_reduced();
    let uk_dc = engine.reduced_from_velocity(metric, &u, &mut zeta)?;
    let mut rebuilt = engine.alloc_vector();
    engine.velocity_from_reduced(metric, &zeta, uk_dc, &mut rebuilt);

    let mut div = engine.alloc_scalar();
    engine.divergence(&rebuilt, &mut div);
    let divergence = div.as_slice().iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    let mean_error = (0..3)
        .map(|d| (uk_dc[d] - mean[d]).abs().max((rebuilt.component(d).mode(0, 0, 0).re - mean[d]).abs()))
        .fold(0.0, f64::max);

    let report = VorticityReport {
        grid: grid.into(),
        degree_oblique: args.degree_oblique,
        uk_dc,
        divergence_free: ValidationSummary::new("|K · u(K)| = 0 for K != 0", args.tol, divergence),
        velocity_recovered: ValidationSummary::new(
            "velocity_from_reduced(reduced_from_velocity(u)) = u",
            args.tol,
            max_spectral_diff(&rebuilt, &u),
        ),
        mean_flow: ValidationSummary::new("uk_dc = zero mode of u", args.tol, mean_error),
    };
    emit_report(&report, args.output, "vorticity")?;
    check(
        "vorticity",
        &[
            &report.divergence_free,
            &report.velocity_recovered,
            &report.mean_flow,
        ],
    )
}

use crate::validation_utils::{
    build_engine, check, emit_report, max_real_diff, noise_field, GridArgs, GridSummary,
    ValidationSummary,
};
use clap::Args;
use serde::Serialize;
use shearspec_core::field::{Field, Vector3};
use shearspec_core::oblique::Interpolation;
use std::{f64::consts::TAU, path::PathBuf};

#[derive(Args, Debug)]
pub struct GradientArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Wavenumber of the sampled sine along x.
    #[arg(long, default_value_t = 1)]
    pub mode: usize,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Tolerance on the pointwise derivative error.
    #[arg(long, default_value_t = 1e-10)]
    pub tol: f64,
}

#[derive(Serialize)]
pub struct GradientReport {
    grid: GridSummary,
    mode: usize,
    wavenumber: f64,
    samples: Vec<ProfileSample>,
    gradient_x: ValidationSummary,
    transverse_components: ValidationSummary,
    curl_divergence: ValidationSummary,
}

#[derive(Serialize)]
pub struct ProfileSample {
    x: f64,
    numeric: f64,
    analytic: f64,
}

pub fn run(args: GradientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = args.grid.grid();
    if 2 * args.mode >= grid.nx {
        return Err(format!(
            "mode {} is not resolved on nx={} (needs 2*mode < nx)",
            args.mode, grid.nx
        )
        .into());
    }
    let mut engine = build_engine(grid, Interpolation::Linear, None)?;
    let layout = *engine.layout();
    let kx = TAU * args.mode as f64 / grid.lx;
    let x_of = |i: usize| i as f64 * grid.dx();

    let mut f = Field::from_fn(layout, |i, _, _| (kx * x_of(i)).sin());
    engine.forward(&mut f)?;
    let mut grad = engine.alloc_vector();
    engine.gradient(&f, &mut grad);
    engine.inverse_vector(&mut grad)?;

    let analytic = Field::from_fn(layout, |i, _, _| kx * (kx * x_of(i)).cos());
    let zero = Field::zeros(layout);
    let gradient_x = ValidationSummary::new(
        "d/dx sin(2πmx/L) = (2πm/L) cos(2πmx/L)",
        args.tol,
        max_real_diff(grad.component(0), &analytic),
    );
    let transverse = ValidationSummary::new(
        "d/dy = d/dz = 0",
        args.tol,
        max_real_diff(grad.component(1), &zero).max(max_real_diff(grad.component(2), &zero)),
    );

    // div(curl u) vanishes for any field, band-limited or not.
    let mut u = Vector3::from_components([
        noise_field(layout, 11),
        noise_field(layout, 12),
        noise_field(layout, 13),
    ]);
    engine.forward_vector(&mut u)?;
    engine.curl_in_place(&mut u);
    let mut div = engine.alloc_scalar();
    engine.divergence(&u, &mut div);
    engine.inverse(&mut div)?;
    let curl_divergence = ValidationSummary::new(
        "div(curl u) = 0",
        args.tol * grid.len() as f64,
        max_real_diff(&div, &zero),
    );

    let samples = (0..grid.nx)
        .map(|i| ProfileSample {
            x: x_of(i),
            numeric: grad.component(0).real(i, 0, 0),
            analytic: analytic.real(i, 0, 0),
        })
        .collect();

    let report = GradientReport {
        grid: grid.into(),
        mode: args.mode,
        wavenumber: kx,
        samples,
        gradient_x,
        transverse_components: transverse,
        curl_divergence,
    };
    emit_report(&report, args.output, "gradient")?;
    check(
        "gradient",
        &[
            &report.gradient_x,
            &report.transverse_components,
            &report.curl_divergence,
        ],
    )
}

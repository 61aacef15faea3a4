use crate::validation_utils::{
    build_engine, check, emit_report, max_real_diff, GridArgs, GridSummary, ValidationSummary,
};
use clap::Args;
use serde::Serialize;
use shearspec_core::field::Field;
use shearspec_core::oblique::{Direction, Interpolation, ShearState};
use std::{f64::consts::TAU, path::PathBuf};

#[derive(Args, Debug)]
pub struct ObliqueArgs {
    /// Grid of the scenario (8x8x8 reproduces the reference case).
    #[arg(long, default_value_t = 8)]
    pub n: usize,
    /// Shear displacement of the top row relative to the bottom row.
    #[arg(long, default_value_t = 0.25)]
    pub degree_oblique: f64,
    /// Error bound for linear interpolation.
    #[arg(long, default_value_t = 0.2)]
    pub linear_tol: f64,
    /// Error bound for spline interpolation.
    #[arg(long, default_value_t = 0.02)]
    pub spline_tol: f64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct ObliqueReport {
    grid: GridSummary,
    degree_oblique: f64,
    runs: Vec<InterpolationRun>,
}

#[derive(Serialize)]
pub struct InterpolationRun {
    interpolation: String,
    /// Row `j = 0` of the oblique field at `k = 0`.
    oblique_row: Vec<f64>,
    validation: ValidationSummary,
}

pub fn run(args: ObliqueArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = GridArgs {
        nx: args.n,
        ny: args.n,
        nz: args.n,
        lx: 1.0,
        ly: 1.0,
        lz: 1.0,
    }
    .grid();
    let shear = ShearState::new(args.degree_oblique, 0.0);

    let mut runs = Vec::new();
    for (interpolation, tolerance) in [
        (Interpolation::Linear, args.linear_tol),
        (Interpolation::Spline, args.spline_tol),
    ] {
        let mut engine = build_engine(grid, interpolation, None)?;
        let layout = *engine.layout();
        let nx = grid.nx as f64;
        let original = Field::from_fn(layout, |i, _, _| (TAU * i as f64 / nx).sin());

        let mut field = original.clone();
        engine.transform_scalar(&shear, Direction::CartesianToOblique, &mut field)?;
        let oblique_row = (0..grid.nx).map(|i| field.real(i, 0, 0)).collect();
        engine.transform_scalar(&shear, Direction::ObliqueToCartesian, &mut field)?;

        runs.push(InterpolationRun {
            interpolation: interpolation.to_string(),
            oblique_row,
            validation: ValidationSummary::new(
                format!("{interpolation} oblique round trip"),
                tolerance,
                max_real_diff(&field, &original),
            ),
        });
    }

    let report = ObliqueReport {
        grid: grid.into(),
        degree_oblique: args.degree_oblique,
        runs,
    };
    emit_report(&report, args.output, "oblique")?;
    let summaries: Vec<&ValidationSummary> = report.runs.iter().map(|r| &r.validation).collect();
    check("oblique", &summaries)
}

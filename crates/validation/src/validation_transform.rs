use crate::validation_utils::{
    build_engine, check, emit_report, max_real_diff, noise_field, GridArgs, GridSummary,
    ValidationSummary,
};
use clap::Args;
use serde::Serialize;
use shearspec_core::oblique::Interpolation;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RoundtripArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Seed of the random input field.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Tolerance per unit of log2(N) on the pointwise round-trip error.
    #[arg(long, default_value_t = 1e-14)]
    pub tol: f64,
}

#[derive(Serialize)]
pub struct RoundtripReport {
    grid: GridSummary,
    seed: u64,
    mean: f64,
    zero_mode: [f64; 2],
    validation: ValidationSummary,
}

pub fn run(args: RoundtripArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = args.grid.grid();
    let mut engine = build_engine(grid, Interpolation::Linear, None)?;
    let layout = *engine.layout();

    let original = noise_field(layout, args.seed);
    let mean = (0..layout.nx_local())
        .flat_map(|i| (0..grid.ny).flat_map(move |j| (0..grid.nz).map(move |k| (i, j, k))))
        .map(|(i, j, k)| original.real(i, j, k))
        .sum::<f64>()
        / grid.len() as f64;

    let mut field = original.clone();
    engine.forward(&mut field)?;
    let zero = field.mode(0, 0, 0);
    engine.inverse(&mut field)?;

    let tolerance = args.tol * (grid.len() as f64).log2().max(1.0);
    let validation = ValidationSummary::new(
        "inverse(forward(f)) = f",
        tolerance,
        max_real_diff(&field, &original),
    );
    let mean_check = ValidationSummary::new("zero mode = spatial mean", tolerance, (zero.re - mean).abs());

    let report = RoundtripReport {
        grid: grid.into(),
        seed: args.seed,
        mean,
        zero_mode: [zero.re, zero.im],
        validation,
    };
    emit_report(&report, args.output, "roundtrip")?;
    check("roundtrip", &[&report.validation, &mean_check])
}

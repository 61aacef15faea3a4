use crate::validation_utils::{
    build_engine, check, emit_report, noise_field, GridArgs, GridSummary, ValidationSummary,
};
use clap::Args;
use serde::Serialize;
use shearspec_core::oblique::Interpolation;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TruncationArgs {
    #[command(flatten)]
    pub grid: GridArgs,
    /// Retained |kx|, |ky|, |kz| bounds (defaults to n/3 per axis).
    #[arg(long, num_args = 3, value_names = ["TRN_X", "TRN_Y", "TRN_Z"])]
    pub thresholds: Option<Vec<usize>>,
    /// Optional output path for the generated JSON. Defaults to stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
pub struct TruncationReport {
    grid: GridSummary,
    thresholds: [usize; 3],
    zeroed_boxes: Vec<[[usize; 3]; 2]>,
    retained_modes: usize,
    outside_box: ValidationSummary,
    inside_box: ValidationSummary,
    idempotent: ValidationSummary,
}

pub fn run(args: TruncationArgs) -> Result<(), Box<dyn std::error::Error>> {
    let grid = args.grid.grid();
    let thresholds = args
        .thresholds
        .map(|t| [t[0], t[1], t[2]]);
    let mut engine = build_engine(grid, Interpolation::Linear, thresholds)?;
    let layout = *engine.layout();

    let mut field = noise_field(layout, 5);
    engine.forward(&mut field)?;
    let source = field.clone();
    engine.truncate(&mut field);
    let once = field.clone();
    engine.truncate(&mut field);

    let dealiaser = engine.dealiaser();
    let mut outside: f64 = 0.0;
    let mut inside: f64 = 0.0;
    let mut retained_modes = 0;
    for i in 0..grid.nx {
        for j in 0..layout.ny_local() {
            for m in 0..grid.nz_modes() {
                let n = layout.wavenumber(i, j, 2 * m);
                if dealiaser.is_retained(n) {
                    retained_modes += 1;
                    inside = inside.max((once.mode(i, j, m) - source.mode(i, j, m)).norm());
                } else {
                    outside = outside.max(once.mode(i, j, m).norm());
                }
            }
        }
    }
    let repeat = field
        .as_slice()
        .iter()
        .zip(once.as_slice())
        .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()));

    let report = TruncationReport {
        grid: grid.into(),
        thresholds: dealiaser.thresholds(),
        zeroed_boxes: dealiaser.ranges().iter().map(|r| [r.start, r.end]).collect(),
        retained_modes,
        outside_box: ValidationSummary::new("coefficients outside the retained box are zero", 0.0, outside),
        inside_box: ValidationSummary::new("coefficients inside the retained box are untouched", 0.0, inside),
        idempotent: ValidationSummary::new("truncate(truncate(f)) = truncate(f)", 0.0, repeat),
    };
    emit_report(&report, args.output, "truncation")?;
    check(
        "truncation",
        &[&report.outside_box, &report.inside_box, &report.idempotent],
    )
}

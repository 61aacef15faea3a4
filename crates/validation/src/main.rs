mod validation_oblique;
mod validation_operators;
mod validation_transform;
mod validation_truncation;
mod validation_utils;
mod validation_vorticity;

use clap::{Parser, Subcommand};
use validation_oblique::ObliqueArgs;
use validation_operators::GradientArgs;
use validation_transform::RoundtripArgs;
use validation_truncation::TruncationArgs;
use validation_vorticity::VorticityArgs;

fn main() {
    if let Err(err) = run() {
        eprintln!("validation error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Roundtrip(args) => validation_transform::run(args),
        Command::Gradient(args) => validation_operators::run(args),
        Command::Vorticity(args) => validation_vorticity::run(args),
        Command::Truncation(args) => validation_truncation::run(args),
        Command::Oblique(args) => validation_oblique::run(args),
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Scenario checks for the shearspec reciprocal-space field engine."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forward then inverse transform of a random field.
    Roundtrip(RoundtripArgs),
    /// Spectral gradient of a sampled sine against the analytic derivative.
    Gradient(GradientArgs),
    /// Divergence-free velocity reconstruction from the reduced vorticity.
    Vorticity(VorticityArgs),
    /// 2/3-rule truncation box, completeness and idempotence.
    Truncation(TruncationArgs),
    /// Oblique round trip of a sine under linear and spline interpolation.
    Oblique(ObliqueArgs),
}

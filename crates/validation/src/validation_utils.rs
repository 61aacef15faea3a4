use clap::Args;
use serde::Serialize;
use shearspec_backend_cpu::CpuBackend;
use shearspec_core::config::EngineConfig;
use shearspec_core::engine::FieldEngine;
use shearspec_core::field::Field;
use shearspec_core::grid::Grid3D;
use shearspec_core::layout::SlabLayout;
use shearspec_core::oblique::Interpolation;
use std::{fs, path::PathBuf};

pub type CpuEngine = FieldEngine<CpuBackend>;

#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Grid points along x.
    #[arg(long, default_value_t = 16)]
    pub nx: usize,
    /// Grid points along y.
    #[arg(long, default_value_t = 16)]
    pub ny: usize,
    /// Grid points along z (must be even).
    #[arg(long, default_value_t = 16)]
    pub nz: usize,
    /// Domain length along x.
    #[arg(long, default_value_t = 1.0)]
    pub lx: f64,
    /// Domain length along y.
    #[arg(long, default_value_t = 1.0)]
    pub ly: f64,
    /// Domain length along z.
    #[arg(long, default_value_t = 1.0)]
    pub lz: f64,
}

impl GridArgs {
    pub fn grid(&self) -> Grid3D {
        Grid3D::new(self.nx, self.ny, self.nz, self.lx, self.ly, self.lz)
    }
}

#[derive(Serialize)]
pub struct GridSummary {
    extents: [usize; 3],
    lengths: [f64; 3],
}

impl From<Grid3D> for GridSummary {
    fn from(grid: Grid3D) -> Self {
        Self {
            extents: grid.extents(),
            lengths: grid.lengths(),
        }
    }
}

#[derive(Serialize)]
pub struct ValidationSummary {
    pub target: String,
    pub tolerance: f64,
    pub max_abs_error: f64,
    pub passed: bool,
}

impl ValidationSummary {
    pub fn new(target: impl Into<String>, tolerance: f64, max_abs_error: f64) -> Self {
        Self {
            target: target.into(),
            tolerance,
            max_abs_error,
            passed: max_abs_error <= tolerance,
        }
    }
}

pub fn build_engine(
    grid: Grid3D,
    interpolation: Interpolation,
    thresholds: Option<[usize; 3]>,
) -> Result<CpuEngine, Box<dyn std::error::Error>> {
    let mut config = EngineConfig::new(grid);
    config.oblique.interpolation = interpolation;
    config.dealias.thresholds = thresholds;
    let backend = CpuBackend::serial(grid)?;
    Ok(FieldEngine::new(config, backend)?)
}

/// Deterministic samples in `[-1, 1)` from a 64-bit xorshift stream.
pub fn noise_field(layout: SlabLayout, seed: u64) -> Field {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut field = Field::zeros(layout);
    let grid = layout.grid();
    for i in 0..layout.nx_local() {
        for j in 0..grid.ny {
            for k in 0..grid.nz {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let idx = layout.real_index(i, j, k);
                field.as_mut_slice()[idx] = (state >> 11) as f64 / (1u64 << 52) as f64 - 1.0;
            }
        }
    }
    field
}

/// Largest deviation over the owned real-space samples, padding excluded.
pub fn max_real_diff(a: &Field, b: &Field) -> f64 {
    let layout = *a.layout();
    let grid = layout.grid();
    let mut worst = 0.0f64;
    for i in 0..layout.nx_local() {
        for j in 0..grid.ny {
            for k in 0..grid.nz {
                worst = worst.max((a.real(i, j, k) - b.real(i, j, k)).abs());
            }
        }
    }
    worst
}

pub fn emit_report<T: Serialize>(
    report: &T,
    output: Option<PathBuf>,
    label: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(path) = output {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, json)?;
        eprintln!("Saved {label} validation report to {}", path.display());
    } else {
        println!("{}", json);
    }
    Ok(())
}

pub fn check(label: &str, summaries: &[&ValidationSummary]) -> Result<(), Box<dyn std::error::Error>> {
    match summaries.iter().find(|s| !s.passed) {
        None => Ok(()),
        Some(failed) => Err(format!(
            "{label}: {} violated (max abs error = {:.3e} > {:.3e})",
            failed.target, failed.max_abs_error, failed.tolerance
        )
        .into()),
    }
}

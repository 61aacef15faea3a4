//! Engine configuration (TOML) and configuration errors.
//!
//! # Example TOML
//!
//! ```toml
//! [grid]
//! nx = 64
//! ny = 64
//! nz = 64
//! lx = 64.0
//! ly = 64.0
//! lz = 64.0
//!
//! [dealias]
//! thresholds = [21, 21, 21]   # optional, defaults to n / 3 per axis
//!
//! [oblique]
//! interpolation = "spline"    # or "linear"
//!
//! [parallel]
//! threads = 8                 # optional rayon pool size
//! ```

use serde::{Deserialize, Serialize};

use crate::grid::Grid3D;
use crate::oblique::Interpolation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub grid: Grid3D,
    #[serde(default)]
    pub dealias: DealiasConfig,
    #[serde(default)]
    pub oblique: ObliqueConfig,
    #[serde(default)]
    pub parallel: ParallelConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DealiasConfig {
    /// Per-axis truncation thresholds `[TRN_X, TRN_Y, TRN_Z]`.
    pub thresholds: Option<[usize; 3]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObliqueConfig {
    pub interpolation: Interpolation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Size of the global rayon pool. `None` keeps rayon's default.
    pub threads: Option<usize>,
}

impl EngineConfig {
    pub fn new(grid: Grid3D) -> Self {
        Self {
            grid,
            dealias: DealiasConfig::default(),
            oblique: ObliqueConfig::default(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Checks that do not depend on the rank count. Decomposition and
    /// truncation limits are checked again when the layout is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = self.grid;
        if grid.nx == 0 || grid.ny == 0 || grid.nz == 0 {
            return Err(ConfigError::InvalidGrid(format!(
                "grid extents must be non-zero, got {}x{}x{}",
                grid.nx, grid.ny, grid.nz
            )));
        }
        if !(grid.lx > 0.0 && grid.ly > 0.0 && grid.lz > 0.0) {
            return Err(ConfigError::InvalidGrid(format!(
                "domain lengths must be positive, got [{}, {}, {}]",
                grid.lx, grid.ly, grid.lz
            )));
        }
        if grid.nz % 2 != 0 {
            return Err(ConfigError::UnsupportedTransformSize(format!(
                "nz={} must be even for the half-complex packing",
                grid.nz
            )));
        }
        if let Some(thresholds) = self.dealias.thresholds {
            crate::truncation::check_thresholds(grid, thresholds)?;
        }
        if self.parallel.threads == Some(0) {
            return Err(ConfigError::Conflict(
                "parallel.threads must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Fatal setup errors. Each message names the offending parameter.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Unsupported transform size: {0}")]
    UnsupportedTransformSize(String),

    #[error("Invalid decomposition: {0}")]
    Decomposition(String),

    #[error("Invalid truncation thresholds: {0}")]
    Truncation(String),

    #[error("Unknown interpolation strategy: {0} (expected \"linear\" or \"spline\")")]
    UnknownInterpolation(String),

    #[error("Unknown transform direction: {0}")]
    UnknownDirection(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),
}

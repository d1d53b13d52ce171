//! Engine configuration.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (with `GAPSCAN_` prefix)
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GapError, GapResult};

/// Hard upper bound on any ceiling: 2^30 amplitudes is already 8 GiB per vector.
const ABSOLUTE_MAX_QUBITS: usize = 30;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Memory ceilings.
    #[serde(default)]
    pub limits: ResourceLimits,

    /// Eigensolver settings.
    #[serde(default)]
    pub solver: SolverConfig,

    /// Anneal-grid settings.
    #[serde(default)]
    pub scan: ScanConfig,

    /// Logging settings (consumed by the binary).
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Memory ceilings: qubit counts per allocation path and a byte budget for
/// the workspace of a single eigensolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Largest N for which a dense 2^N × 2^N matrix may be built.
    #[serde(default = "default_max_qubits_dense")]
    pub max_qubits_dense: usize,

    /// Largest N for sparse operators and 2^N-length vectors.
    #[serde(default = "default_max_qubits_sparse")]
    pub max_qubits_sparse: usize,

    /// Largest estimated workspace, in bytes, one eigensolve may hold.
    ///
    /// Concurrent grid points of a parallel scan are counted together.
    #[serde(default = "default_max_workspace_bytes")]
    pub max_workspace_bytes: u64,
}

impl ResourceLimits {
    /// Reject `n` for the sparse / vector path before anything is allocated.
    pub fn check_sparse(&self, n: usize) -> GapResult<()> {
        check_ceiling(n, self.max_qubits_sparse, "sparse")
    }

    /// Reject `n` for the dense path before anything is allocated.
    pub fn check_dense(&self, n: usize) -> GapResult<()> {
        check_ceiling(n, self.max_qubits_dense, "dense")
    }

    /// Reject an estimated workspace of `bytes` before it is allocated.
    pub fn check_workspace(&self, bytes: u64, path: &'static str) -> GapResult<()> {
        if bytes > self.max_workspace_bytes {
            return Err(GapError::ResourceExceeded {
                requested: bytes,
                ceiling: self.max_workspace_bytes,
                unit: "bytes",
                path,
            });
        }
        Ok(())
    }
}

fn check_ceiling(n: usize, ceiling: usize, path: &'static str) -> GapResult<()> {
    if n > ceiling {
        return Err(GapError::ResourceExceeded {
            requested: n as u64,
            ceiling: ceiling as u64,
            unit: "qubits",
            path,
        });
    }
    if n == ceiling {
        tracing::warn!(n, ceiling, path, "qubit count is at the configured ceiling");
    }
    Ok(())
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_qubits_dense: default_max_qubits_dense(),
            max_qubits_sparse: default_max_qubits_sparse(),
            max_workspace_bytes: default_max_workspace_bytes(),
        }
    }
}

/// Eigensolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// N at or below which the dense solver is used.
    #[serde(default = "default_dense_threshold")]
    pub dense_threshold: usize,

    /// Ritz residual tolerance, relative to max(1, ‖H‖) with ‖H‖ the row-sum bound.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Lanczos iteration budget for the first attempt.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Tolerance multiplier for the single retry.
    #[serde(default = "default_retry_tolerance_factor")]
    pub retry_tolerance_factor: f64,

    /// Iteration-budget multiplier for the single retry.
    #[serde(default = "default_retry_iteration_factor")]
    pub retry_iteration_factor: usize,

    /// Wall-clock budget per iterative solve, in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl SolverConfig {
    /// Wall-clock budget as a [`Duration`].
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            dense_threshold: default_dense_threshold(),
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            retry_tolerance_factor: default_retry_tolerance_factor(),
            retry_iteration_factor: default_retry_iteration_factor(),
            timeout_seconds: None,
        }
    }
}

/// Anneal-grid settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Number of interior grid points on (0, 1).
    #[serde(default = "default_num_points")]
    pub num_points: usize,

    /// Evaluate grid points on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            num_points: default_num_points(),
            parallel: true,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_max_qubits_dense() -> usize {
    14
}

fn default_max_qubits_sparse() -> usize {
    24
}

fn default_max_workspace_bytes() -> u64 {
    16 << 30
}

fn default_dense_threshold() -> usize {
    12
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_max_iterations() -> usize {
    300
}

fn default_retry_tolerance_factor() -> f64 {
    100.0
}

fn default_retry_iteration_factor() -> usize {
    3
}

fn default_num_points() -> usize {
    100
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: EngineConfig =
            serde_yaml_ng::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration: file (if given) or defaults, then environment overrides.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => EngineConfig::default(),
        };

        let config = config.merge_vars(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `GAPSCAN_*` overrides from `lookup`.
    ///
    /// Only keys that resolve and parse override the current values.
    pub fn merge_vars<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|v| v.parse().ok())
        }

        if let Some(v) = parsed(lookup("GAPSCAN_MAX_QUBITS_DENSE")) {
            self.limits.max_qubits_dense = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_MAX_QUBITS_SPARSE")) {
            self.limits.max_qubits_sparse = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_MAX_WORKSPACE_BYTES")) {
            self.limits.max_workspace_bytes = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_DENSE_THRESHOLD")) {
            self.solver.dense_threshold = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_TOLERANCE")) {
            self.solver.tolerance = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_MAX_ITERATIONS")) {
            self.solver.max_iterations = v;
        }
        if let Some(v) = parsed(lookup("GAPSCAN_TIMEOUT_SECONDS")) {
            self.solver.timeout_seconds = Some(v);
        }
        if let Some(v) = parsed(lookup("GAPSCAN_NUM_POINTS")) {
            self.scan.num_points = v;
        }
        if let Some(v) = lookup("GAPSCAN_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("GAPSCAN_LOG_FORMAT") {
            self.logging.format = v;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_qubits_sparse > ABSOLUTE_MAX_QUBITS {
            return Err(ConfigError::Validation(format!(
                "max_qubits_sparse must be at most {ABSOLUTE_MAX_QUBITS}, got {}",
                self.limits.max_qubits_sparse
            )));
        }
        if self.limits.max_qubits_dense > self.limits.max_qubits_sparse {
            return Err(ConfigError::Validation(
                "max_qubits_dense must not exceed max_qubits_sparse".to_string(),
            ));
        }
        if self.limits.max_workspace_bytes == 0 {
            return Err(ConfigError::Validation(
                "max_workspace_bytes must be greater than 0".to_string(),
            ));
        }
        if self.solver.dense_threshold > self.limits.max_qubits_dense {
            return Err(ConfigError::Validation(format!(
                "dense_threshold ({}) exceeds max_qubits_dense ({})",
                self.solver.dense_threshold, self.limits.max_qubits_dense
            )));
        }
        if !(self.solver.tolerance.is_finite() && self.solver.tolerance > 0.0) {
            return Err(ConfigError::Validation(format!(
                "tolerance must be positive, got {}",
                self.solver.tolerance
            )));
        }
        if self.solver.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if !(self.solver.retry_tolerance_factor >= 1.0) || self.solver.retry_iteration_factor == 0
        {
            return Err(ConfigError::Validation(
                "retry factors must not tighten the retry".to_string(),
            ));
        }
        if self.scan.num_points == 0 {
            return Err(ConfigError::Validation(
                "num_points must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

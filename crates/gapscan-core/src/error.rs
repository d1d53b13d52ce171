//! Error types for the gap-scanning engine.

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::spectrum::Spectrum;

/// Errors produced by instance generation, operator assembly and eigensolving.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GapError {
    /// Invalid N, malformed couplings, negative clause ratio, s outside [0, 1], …
    ///
    /// Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The iterative eigensolver exhausted its iteration budget twice
    /// (once with the configured tolerance, once relaxed).
    ///
    /// The best Ritz pairs found are attached; treat them as degraded.
    #[error(
        "eigensolver did not converge after {iterations} iterations \
         (residual {residual:.3e} > tolerance {tolerance:.3e})"
    )]
    SolverNonConvergence {
        /// Lanczos iterations spent on the final attempt.
        iterations: usize,
        /// Largest Ritz residual norm of the returned pairs.
        residual: f64,
        /// Tolerance that was not met.
        tolerance: f64,
        /// Unconverged spectrum, for callers that want to inspect it.
        degraded: Box<Spectrum>,
    },

    /// The iterative eigensolver ran past its wall-clock budget.
    #[error("eigensolver exceeded its wall-clock budget after {iterations} iterations ({elapsed:?})")]
    SolverTimeout {
        /// Time spent before giving up.
        elapsed: Duration,
        /// Lanczos iterations completed.
        iterations: usize,
    },

    /// A request is beyond a configured memory ceiling: either the qubit
    /// count of an allocation path or the estimated solver workspace.
    #[error("{path} request of {requested} {unit} exceeds the ceiling of {ceiling} {unit}")]
    ResourceExceeded {
        /// Requested amount, in `unit`.
        requested: u64,
        /// Configured ceiling, in `unit`.
        ceiling: u64,
        /// `"qubits"` or `"bytes"`.
        unit: &'static str,
        /// Which allocation path rejected the request.
        path: &'static str,
    },

    /// Configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GapError {
    /// Shorthand for [`GapError::Configuration`].
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Result type for engine operations.
pub type GapResult<T> = Result<T, GapError>;

//! The interpolating annealing Hamiltonian.
//!
//!   H(s) = (1 − s) · H_driver + s · H_problem,   s ∈ [0, 1]
//!
//! Both endpoints are built once per instance; H(s) itself is never cached
//! and is recomputed in O(nnz) per evaluation.

use std::sync::Arc;

use crate::config::ResourceLimits;
use crate::error::{GapError, GapResult};
use crate::instance::ProblemInstance;
use crate::operator::{DriverCache, OperatorBuilder, SparseOperator};

/// Precomputed driver and problem operators for one instance.
#[derive(Debug, Clone)]
pub struct AnnealingHamiltonian {
    num_qubits: usize,
    driver: Arc<SparseOperator>,
    problem: SparseOperator,
}

impl AnnealingHamiltonian {
    /// Build both operators for `instance` through the Kronecker path.
    pub fn new(instance: &ProblemInstance, limits: &ResourceLimits) -> GapResult<Self> {
        let builder = OperatorBuilder::new(instance.num_qubits(), limits)?;
        Ok(Self {
            num_qubits: builder.num_qubits(),
            driver: Arc::new(builder.driver()?),
            problem: builder.problem(instance)?,
        })
    }

    /// Like [`AnnealingHamiltonian::new`] but reusing a driver from `cache`.
    pub fn with_cache(
        instance: &ProblemInstance,
        limits: &ResourceLimits,
        cache: &DriverCache,
    ) -> GapResult<Self> {
        let builder = OperatorBuilder::new(instance.num_qubits(), limits)?;
        Ok(Self {
            num_qubits: builder.num_qubits(),
            driver: cache.get_or_build(&builder)?,
            problem: builder.problem(instance)?,
        })
    }

    /// Anneal into a raw energy landscape (e.g. REM samples).
    ///
    /// The problem operator is diag(`energies`); the length must be 2^N.
    pub fn from_energies(energies: &[f64], limits: &ResourceLimits) -> GapResult<Self> {
        let len = energies.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(GapError::config(format!(
                "energy landscape length must be 2^N with N >= 1, got {len}"
            )));
        }
        if energies.iter().any(|e| !e.is_finite()) {
            return Err(GapError::config("energies must be finite"));
        }
        let builder = OperatorBuilder::new(len.trailing_zeros() as usize, limits)?;
        Ok(Self {
            num_qubits: builder.num_qubits(),
            driver: Arc::new(builder.driver()?),
            problem: SparseOperator::from_diagonal(energies),
        })
    }

    /// Number of qubits N.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Hilbert-space dimension 2^N.
    pub fn dim(&self) -> usize {
        self.problem.dim()
    }

    /// H_driver = −Σ σx_i.
    pub fn driver(&self) -> &SparseOperator {
        &self.driver
    }

    /// H_problem (diagonal in the computational basis).
    pub fn problem(&self) -> &SparseOperator {
        &self.problem
    }

    /// H(s) = (1 − s)·H_driver + s·H_problem. No eigensolving.
    pub fn get_hamiltonian(&self, s: f64) -> GapResult<SparseOperator> {
        if !(0.0..=1.0).contains(&s) {
            return Err(GapError::config(format!(
                "anneal parameter s must lie in [0, 1], got {s}"
            )));
        }
        self.driver.linear_combination(1.0 - s, &self.problem, s)
    }

    /// Lowest classical energy, i.e. the ground energy at s = 1.
    pub fn classical_ground_energy(&self) -> f64 {
        self.problem
            .diagonal()
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    /// Basis index of a lowest classical energy (first one on ties).
    pub fn classical_ground_state(&self) -> usize {
        self.problem
            .diagonal()
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map_or(0, |(i, _)| i)
    }
}

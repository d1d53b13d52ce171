//! Lowest-k eigenpairs of H(s).
//!
//! Two strategies:
//!
//! - **DenseExact**: full symmetric eigendecomposition of the dense matrix.
//!   Always converges; O(2^{3N}) time and O(2^{2N}) memory.
//! - **SparseIterative**: Lanczos with full reorthogonalisation on the CSR
//!   operator, O(k · nnz · iterations). Near an avoided crossing it can fail
//!   to converge; that is detected from the Ritz residuals, retried once with
//!   a relaxed tolerance and a larger budget, then reported as
//!   [`GapError::SolverNonConvergence`].
//!
//! Which strategy runs is decided by an injectable function of N. Before
//! anything is allocated the solver also checks the estimated workspace of
//! the chosen path against [`ResourceLimits::max_workspace_bytes`].

mod dense;
mod lanczos;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EngineConfig, ResourceLimits, SolverConfig};
use crate::error::{GapError, GapResult};
use crate::hamiltonian::AnnealingHamiltonian;
use crate::operator::SparseOperator;

use self::lanczos::LanczosParams;

/// Eigensolver strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectrumStrategy {
    /// Dense symmetric eigendecomposition.
    DenseExact,
    /// Lanczos on the sparse operator.
    SparseIterative,
}

impl SpectrumStrategy {
    /// Default selection: dense for N ≤ `dense_threshold`, sparse above.
    pub fn by_size(num_qubits: usize, dense_threshold: usize) -> Self {
        if num_qubits <= dense_threshold {
            Self::DenseExact
        } else {
            Self::SparseIterative
        }
    }
}

impl fmt::Display for SpectrumStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DenseExact => write!(f, "dense"),
            Self::SparseIterative => write!(f, "sparse"),
        }
    }
}

/// Ascending eigenvalues with orthonormal eigenvectors.
///
/// Always holds at least one pair.
#[derive(Debug, Clone, Serialize)]
pub struct Spectrum {
    energies: Vec<f64>,
    states: Vec<DVector<f64>>,
    strategy: SpectrumStrategy,
}

impl Spectrum {
    pub(crate) fn new(
        energies: Vec<f64>,
        states: Vec<DVector<f64>>,
        strategy: SpectrumStrategy,
    ) -> Self {
        debug_assert!(!energies.is_empty() && energies.len() == states.len());
        Self {
            energies,
            states,
            strategy,
        }
    }

    /// Eigenvalues in ascending order.
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Eigenvectors, aligned with [`Spectrum::energies`].
    pub fn states(&self) -> &[DVector<f64>] {
        &self.states
    }

    /// Strategy that produced this spectrum.
    pub fn strategy(&self) -> SpectrumStrategy {
        self.strategy
    }

    /// Number of eigenpairs.
    pub fn len(&self) -> usize {
        self.energies.len()
    }

    /// Whether no eigenpairs are held.
    pub fn is_empty(&self) -> bool {
        self.energies.is_empty()
    }

    /// Ground state energy.
    pub fn ground_energy(&self) -> f64 {
        self.energies[0]
    }

    /// Ground state vector.
    pub fn ground_state(&self) -> &DVector<f64> {
        &self.states[0]
    }

    /// Spectral gap (E_1 - E_0), or 0 if only one level was requested.
    pub fn gap(&self) -> f64 {
        if self.energies.len() < 2 {
            return 0.0;
        }
        self.energies[1] - self.energies[0]
    }
}

type Selector = Arc<dyn Fn(usize) -> SpectrumStrategy + Send + Sync>;

/// Computes the lowest eigenpairs of an operator or of H(s).
#[derive(Clone)]
pub struct SpectrumSolver {
    config: SolverConfig,
    limits: ResourceLimits,
    selector: Selector,
}

impl fmt::Debug for SpectrumSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumSolver")
            .field("config", &self.config)
            .field("limits", &self.limits)
            .field("selector", &"<fn>")
            .finish()
    }
}

impl Default for SpectrumSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default(), ResourceLimits::default())
    }
}

impl SpectrumSolver {
    /// Solver with the size-based default strategy selection.
    pub fn new(config: SolverConfig, limits: ResourceLimits) -> Self {
        let threshold = config.dense_threshold;
        Self {
            config,
            limits,
            selector: Arc::new(move |n: usize| SpectrumStrategy::by_size(n, threshold)),
        }
    }

    /// Solver configured from an [`EngineConfig`].
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.solver.clone(), config.limits)
    }

    /// Replace the strategy selection with `selector`.
    #[must_use]
    pub fn with_selector<F>(mut self, selector: F) -> Self
    where
        F: Fn(usize) -> SpectrumStrategy + Send + Sync + 'static,
    {
        self.selector = Arc::new(selector);
        self
    }

    /// Solver settings.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Memory ceilings.
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }

    /// Strategy that would be used for `num_qubits`.
    pub fn strategy_for(&self, num_qubits: usize) -> SpectrumStrategy {
        (self.selector)(num_qubits)
    }

    /// Lowest `k` eigenpairs of H(`s`).
    pub fn get_spectrum(
        &self,
        hamiltonian: &AnnealingHamiltonian,
        s: f64,
        k: usize,
    ) -> GapResult<Spectrum> {
        let strategy = self.strategy_for(hamiltonian.num_qubits());
        self.check_ceiling(hamiltonian.num_qubits(), strategy)?;
        let op = hamiltonian.get_hamiltonian(s)?;
        self.solve_with(&op, hamiltonian.num_qubits(), k, strategy)
    }

    /// Lowest `k` eigenpairs of an arbitrary real symmetric operator on
    /// `num_qubits` qubits.
    pub fn solve(&self, op: &SparseOperator, num_qubits: usize, k: usize) -> GapResult<Spectrum> {
        if op.dim() != 1usize << num_qubits {
            return Err(GapError::config(format!(
                "operator dimension {} does not match {num_qubits} qubits",
                op.dim()
            )));
        }
        let strategy = self.strategy_for(num_qubits);
        self.check_ceiling(num_qubits, strategy)?;
        self.solve_with(op, num_qubits, k, strategy)
    }

    /// Estimated peak bytes of one solve for `k` pairs on `num_qubits` qubits,
    /// first attempt of the selected strategy.
    pub fn workspace_bytes(&self, num_qubits: usize, k: usize) -> u64 {
        let dim = u32::try_from(num_qubits)
            .ok()
            .and_then(|n| 1usize.checked_shl(n))
            .unwrap_or(usize::MAX);
        match self.strategy_for(num_qubits) {
            SpectrumStrategy::DenseExact => dense::workspace_bytes(dim),
            SpectrumStrategy::SparseIterative => {
                lanczos::workspace_bytes(dim, k, self.config.max_iterations)
            }
        }
    }

    fn check_ceiling(&self, num_qubits: usize, strategy: SpectrumStrategy) -> GapResult<()> {
        match strategy {
            SpectrumStrategy::DenseExact => self.limits.check_dense(num_qubits),
            SpectrumStrategy::SparseIterative => self.limits.check_sparse(num_qubits),
        }
    }

    fn solve_with(
        &self,
        op: &SparseOperator,
        num_qubits: usize,
        k: usize,
        strategy: SpectrumStrategy,
    ) -> GapResult<Spectrum> {
        if k == 0 || k > op.dim() {
            return Err(GapError::config(format!(
                "requested {k} eigenpairs from a {}-dimensional operator",
                op.dim()
            )));
        }
        debug!(
            n = num_qubits,
            dim = op.dim(),
            nnz = op.nnz(),
            k,
            %strategy,
            "solving for lowest eigenpairs"
        );

        match strategy {
            SpectrumStrategy::DenseExact => {
                self.limits
                    .check_workspace(dense::workspace_bytes(op.dim()), "dense workspace")?;
                let (energies, states) = dense::lowest_eigenpairs(op, k);
                Ok(Spectrum::new(energies, states, strategy))
            }
            SpectrumStrategy::SparseIterative => self.solve_iterative(op, k),
        }
    }

    fn solve_iterative(&self, op: &SparseOperator, k: usize) -> GapResult<Spectrum> {
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        let first = LanczosParams {
            tolerance: self.config.tolerance,
            max_iterations: self.config.max_iterations,
            deadline,
        };

        self.check_lanczos_workspace(op.dim(), k, &first)?;
        let outcome = lanczos::lowest_eigenpairs(op, k, &first)?;
        if outcome.converged {
            return Ok(outcome.into_spectrum());
        }

        let relaxed = LanczosParams {
            tolerance: first.tolerance * self.config.retry_tolerance_factor,
            max_iterations: first.max_iterations * self.config.retry_iteration_factor,
            deadline,
        };
        warn!(
            iterations = outcome.iterations,
            residual = outcome.max_residual,
            tolerance = first.tolerance,
            retry_tolerance = relaxed.tolerance,
            retry_iterations = relaxed.max_iterations,
            "Lanczos did not converge; retrying with relaxed settings"
        );

        self.check_lanczos_workspace(op.dim(), k, &relaxed)?;
        let outcome = lanczos::lowest_eigenpairs(op, k, &relaxed)?;
        if outcome.converged {
            return Ok(outcome.into_spectrum());
        }

        Err(GapError::SolverNonConvergence {
            iterations: outcome.iterations,
            residual: outcome.max_residual,
            tolerance: relaxed.tolerance,
            degraded: Box::new(outcome.into_spectrum()),
        })
    }

    fn check_lanczos_workspace(
        &self,
        dim: usize,
        k: usize,
        params: &LanczosParams,
    ) -> GapResult<()> {
        let bytes = lanczos::workspace_bytes(dim, k, params.max_iterations);
        self.limits.check_workspace(bytes, "sparse workspace")
    }
}

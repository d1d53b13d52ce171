//! `gapscan-core`: exact-diagonalisation engine for adiabatic spectral gaps.
//!
//! Builds the transverse-field annealing Hamiltonian
//!
//!   H(s) = (1 − s) · (−Σ σx_i) + s · H_problem
//!
//! for random combinatorial instances and measures how its minimum gap,
//! ground-state localisation and energies scale with the number of qubits:
//!
//! - **Instances**: Sherrington–Kirkpatrick spin glass, random 3-SAT as a
//!   pairwise Ising penalty, Random Energy Model landscapes
//! - **Operators**: CSR matrices from sparse Kronecker products of Paulis
//! - **Spectrum**: dense `SymmetricEigen` for small N, Lanczos above
//! - **Gap scan**: uniform grid over s ∈ (0, 1)
//! - **Metrics / scaling**: IPR, Shannon entropy, least-squares trend fits
//!
//! # Quick start
//!
//! ```rust
//! use gapscan_core::{AnnealingHamiltonian, GapScanner, InstanceGenerator, ResourceLimits};
//!
//! let instance = InstanceGenerator::default().spin_glass(3, 42)?;
//! let hamiltonian = AnnealingHamiltonian::new(&instance, &ResourceLimits::default())?;
//! let record = GapScanner::default().find_minimum_gap(&hamiltonian, 20)?;
//!
//! assert!(record.min_gap > 0.0);
//! assert!(record.critical_s > 0.0 && record.critical_s < 1.0);
//! # Ok::<(), gapscan_core::GapError>(())
//! ```

pub mod config;
pub mod error;
pub mod gap;
pub mod hamiltonian;
pub mod instance;
pub mod metrics;
pub mod operator;
pub mod scaling;
pub mod spectrum;
pub mod sweep;

pub use config::{ConfigError, EngineConfig, ResourceLimits, ScanConfig, SolverConfig};
pub use error::{GapError, GapResult};
pub use gap::{GapRecord, GapSample, GapScanner, StateSample};
pub use hamiltonian::AnnealingHamiltonian;
pub use instance::{InstanceGenerator, Literal, ProblemInstance, SatInstance};
pub use metrics::{StateMetrics, inverse_participation_ratio, shannon_entropy};
pub use operator::{DriverCache, OperatorBuilder, Pauli, SparseOperator};
pub use scaling::{FitKind, SizeAggregate, TrendFit, aggregate_by_n};
pub use spectrum::{Spectrum, SpectrumSolver, SpectrumStrategy};
pub use sweep::{ProblemKind, Sweep, TrialRecord};

//! Repeated trials over a range of sizes and seeds.
//!
//! Each (N, seed) trial generates its own instance from its own seeded RNG,
//! builds the annealing Hamiltonian and scans it. Trials share nothing
//! mutable, so they run as a rayon map; the output is ordered by (N, seed)
//! regardless of scheduling.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{EngineConfig, ResourceLimits};
use crate::error::{GapError, GapResult};
use crate::gap::GapScanner;
use crate::hamiltonian::AnnealingHamiltonian;
use crate::instance::InstanceGenerator;
use crate::metrics::StateMetrics;
use crate::operator::DriverCache;

/// Instance family of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemKind {
    /// Sherrington–Kirkpatrick couplings.
    SpinGlass,
    /// Random 3-SAT at clause-to-variable ratio `ratio`.
    ThreeSat { ratio: f64 },
    /// Random Energy Model landscape.
    RandomEnergy,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpinGlass => write!(f, "spin-glass"),
            Self::ThreeSat { ratio } => write!(f, "3-sat(ratio={ratio})"),
            Self::RandomEnergy => write!(f, "rem"),
        }
    }
}

/// Outcome of one (N, seed) trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub n: usize,
    pub seed: u64,
    pub min_gap: f64,
    pub critical_s: f64,
    /// E_0 at `critical_s`.
    pub ground_energy: f64,
    /// Lowest classical energy (E_0 at s = 1).
    pub classical_energy: f64,
    /// IPR of the ground state at `critical_s`.
    pub ipr: f64,
    /// Entropy of the ground state at `critical_s`, in bits.
    pub entropy: f64,
}

/// A size × seed grid of trials for one problem family.
#[derive(Debug, Clone)]
pub struct Sweep {
    kind: ProblemKind,
    sizes: Vec<usize>,
    seeds: Vec<u64>,
    num_points: usize,
    parallel: bool,
    limits: ResourceLimits,
    generator: InstanceGenerator,
    scanner: GapScanner,
    driver_cache: Option<Arc<DriverCache>>,
}

impl Sweep {
    /// Validate the grid against `config` before anything is generated.
    pub fn new(
        kind: ProblemKind,
        sizes: Vec<usize>,
        seeds: Vec<u64>,
        config: &EngineConfig,
    ) -> GapResult<Self> {
        if sizes.is_empty() || seeds.is_empty() {
            return Err(GapError::config("a sweep needs at least one size and one seed"));
        }
        let min_n = if matches!(kind, ProblemKind::ThreeSat { .. }) { 3 } else { 1 };
        for &n in &sizes {
            if n < min_n {
                return Err(GapError::config(format!("{kind} needs N >= {min_n}, got {n}")));
            }
            config.limits.check_sparse(n)?;
        }

        let mut sizes = sizes;
        sizes.sort_unstable();
        sizes.dedup();
        let mut seeds = seeds;
        seeds.sort_unstable();
        seeds.dedup();

        Ok(Self {
            kind,
            sizes,
            seeds,
            num_points: config.scan.num_points,
            parallel: config.scan.parallel,
            limits: config.limits,
            generator: InstanceGenerator::new(config.limits),
            scanner: GapScanner::from_config(config),
            driver_cache: None,
        })
    }

    /// Override the grid resolution.
    #[must_use]
    pub fn with_num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Share one driver Hamiltonian per N across trials.
    #[must_use]
    pub fn with_driver_cache(mut self, cache: Arc<DriverCache>) -> Self {
        self.driver_cache = Some(cache);
        self
    }

    pub fn kind(&self) -> ProblemKind {
        self.kind
    }

    /// All (N, seed) pairs in output order.
    pub fn trials(&self) -> Vec<(usize, u64)> {
        self.sizes
            .iter()
            .flat_map(|&n| self.seeds.iter().map(move |&seed| (n, seed)))
            .collect()
    }

    /// Instance of trial (`n`, `seed`) as an annealing Hamiltonian.
    pub fn build_hamiltonian(&self, n: usize, seed: u64) -> GapResult<AnnealingHamiltonian> {
        let instance = match self.kind {
            ProblemKind::SpinGlass => self.generator.spin_glass(n, seed)?,
            ProblemKind::ThreeSat { ratio } => self.generator.three_sat(n, ratio, seed)?.into_ising(),
            ProblemKind::RandomEnergy => {
                let energies = self.generator.rem_energies(n, seed)?;
                return AnnealingHamiltonian::from_energies(&energies, &self.limits);
            }
        };
        match &self.driver_cache {
            Some(cache) => AnnealingHamiltonian::with_cache(&instance, &self.limits, cache),
            None => AnnealingHamiltonian::new(&instance, &self.limits),
        }
    }

    /// Scan one trial.
    pub fn run_trial(&self, n: usize, seed: u64) -> GapResult<TrialRecord> {
        let hamiltonian = self.build_hamiltonian(n, seed)?;
        let record = self.scanner.find_minimum_gap(&hamiltonian, self.num_points)?;
        let metrics = StateMetrics::of(&record.ground_state);

        let trial = TrialRecord {
            n,
            seed,
            min_gap: record.min_gap,
            critical_s: record.critical_s,
            ground_energy: record.ground_energy,
            classical_energy: hamiltonian.classical_ground_energy(),
            ipr: metrics.ipr,
            entropy: metrics.entropy,
        };
        info!(
            kind = %self.kind,
            n,
            seed,
            min_gap = trial.min_gap,
            critical_s = trial.critical_s,
            "trial complete"
        );
        Ok(trial)
    }

    /// Run every trial. Stops at the first error.
    pub fn run(&self) -> GapResult<Vec<TrialRecord>> {
        self.run_with(|_| {})
    }

    /// Run every trial, calling `on_trial` as each one finishes (in any order).
    pub fn run_with<F>(&self, on_trial: F) -> GapResult<Vec<TrialRecord>>
    where
        F: Fn(&TrialRecord) + Sync + Send,
    {
        let trials = self.trials();
        let run = |&(n, seed): &(usize, u64)| -> GapResult<TrialRecord> {
            let record = self.run_trial(n, seed)?;
            on_trial(&record);
            Ok(record)
        };
        if self.parallel {
            trials.par_iter().map(run).collect()
        } else {
            trials.iter().map(run).collect()
        }
    }

    /// Lowest classical energy of every trial's instance, in trial order.
    ///
    /// Reads the diagonal of the problem operator only; nothing is solved.
    pub fn classical_energies(&self) -> GapResult<Vec<(usize, u64, f64)>> {
        let energy = |&(n, seed): &(usize, u64)| -> GapResult<(usize, u64, f64)> {
            let hamiltonian = self.build_hamiltonian(n, seed)?;
            Ok((n, seed, hamiltonian.classical_ground_energy()))
        };
        let trials = self.trials();
        if self.parallel {
            trials.par_iter().map(energy).collect()
        } else {
            trials.iter().map(energy).collect()
        }
    }
}

//! Random problem instances.
//!
//! Every generator takes an explicit seed (or an explicit RNG handle) so a
//! trial is reproducible on its own and independent of any other trial
//! running on another thread.
//!
//! Basis convention used throughout the crate: qubit 0 is the most
//! significant bit of a basis index, and bit value 0 is the σz = +1 spin.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ResourceLimits;
use crate::error::{GapError, GapResult};

/// Symmetry tolerance for caller-supplied couplings.
const SYMMETRY_TOL: f64 = 1e-12;

/// An Ising cost function H = Σ_{i<j} J_ij z_i z_j + Σ_i h_i z_i.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemInstance {
    j: DMatrix<f64>,
    h: DVector<f64>,
}

impl ProblemInstance {
    /// Build an instance from caller-supplied couplings and fields.
    ///
    /// `j` must be square, symmetric, finite and have a zero diagonal;
    /// `h` must have one entry per qubit.
    pub fn new(j: DMatrix<f64>, h: DVector<f64>) -> GapResult<Self> {
        let n = j.nrows();
        if n == 0 {
            return Err(GapError::config("N must be at least 1"));
        }
        if j.ncols() != n {
            return Err(GapError::config(format!(
                "J must be square, got {}x{}",
                j.nrows(),
                j.ncols()
            )));
        }
        if h.len() != n {
            return Err(GapError::config(format!(
                "h has length {} but J is {n}x{n}",
                h.len()
            )));
        }
        if j.iter().chain(h.iter()).any(|v| !v.is_finite()) {
            return Err(GapError::config("J and h must be finite"));
        }
        for i in 0..n {
            if j[(i, i)] != 0.0 {
                return Err(GapError::config(format!("J[{i},{i}] must be zero")));
            }
            for k in (i + 1)..n {
                if (j[(i, k)] - j[(k, i)]).abs() > SYMMETRY_TOL {
                    return Err(GapError::config(format!("J is not symmetric at ({i},{k})")));
                }
            }
        }
        Ok(Self { j, h })
    }

    /// Number of qubits N.
    pub fn num_qubits(&self) -> usize {
        self.h.len()
    }

    /// Coupling matrix J (symmetric, zero diagonal).
    pub fn couplings(&self) -> &DMatrix<f64> {
        &self.j
    }

    /// Longitudinal fields h.
    pub fn fields(&self) -> &DVector<f64> {
        &self.h
    }

    /// Classical energy of computational basis state `index`.
    pub fn energy(&self, index: usize) -> f64 {
        let n = self.num_qubits();
        let spin = |q: usize| -> f64 {
            if (index >> (n - 1 - q)) & 1 == 0 { 1.0 } else { -1.0 }
        };

        let mut energy = 0.0;
        for i in 0..n {
            let zi = spin(i);
            energy += self.h[i] * zi;
            for k in (i + 1)..n {
                energy += self.j[(i, k)] * zi * spin(k);
            }
        }
        energy
    }
}

/// One literal of a clause: variable index and polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    /// Variable (qubit) index.
    pub var: usize,
    /// True for ¬x.
    pub negated: bool,
}

impl Literal {
    /// Truth value of this literal when its variable holds `bit`.
    fn holds(self, bit: bool) -> bool {
        bit != self.negated
    }
}

/// A random 3-SAT formula together with its pairwise Ising encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatInstance {
    clauses: Vec<[Literal; 3]>,
    ising: ProblemInstance,
}

impl SatInstance {
    /// The clauses, each over three distinct variables.
    pub fn clauses(&self) -> &[[Literal; 3]] {
        &self.clauses
    }

    /// The Ising encoding (linear and pairwise penalty terms only).
    pub fn ising(&self) -> &ProblemInstance {
        &self.ising
    }

    /// Consume into the Ising encoding.
    pub fn into_ising(self) -> ProblemInstance {
        self.ising
    }

    /// Number of clauses violated by basis state `index`.
    pub fn violated(&self, index: usize) -> usize {
        let n = self.ising.num_qubits();
        let bit = |q: usize| (index >> (n - 1 - q)) & 1 == 1;
        self.clauses
            .iter()
            .filter(|clause| clause.iter().all(|lit| !lit.holds(bit(lit.var))))
            .count()
    }
}

/// Seeded generator for the three instance families.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceGenerator {
    limits: ResourceLimits,
}

impl InstanceGenerator {
    /// Create a generator bounded by `limits`.
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    /// Sherrington–Kirkpatrick spin glass seeded from `seed`.
    pub fn spin_glass(&self, n: usize, seed: u64) -> GapResult<ProblemInstance> {
        self.spin_glass_with_rng(n, &mut StdRng::seed_from_u64(seed))
    }

    /// Sherrington–Kirkpatrick spin glass drawn from `rng`.
    ///
    /// Upper-triangle couplings are i.i.d. Normal(0, 1/N) (variance 1/N) and
    /// mirrored; the diagonal is zero and h = 0.
    pub fn spin_glass_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> GapResult<ProblemInstance> {
        self.check_size(n)?;
        let normal = normal(1.0 / (n as f64).sqrt())?;

        let mut j = DMatrix::zeros(n, n);
        for i in 0..n {
            for k in (i + 1)..n {
                let v = normal.sample(rng);
                j[(i, k)] = v;
                j[(k, i)] = v;
            }
        }
        debug!(n, "generated spin-glass instance");
        Ok(ProblemInstance {
            j,
            h: DVector::zeros(n),
        })
    }

    /// Random 3-SAT with round(`ratio`·N) clauses, seeded from `seed`.
    pub fn three_sat(&self, n: usize, ratio: f64, seed: u64) -> GapResult<SatInstance> {
        self.three_sat_with_rng(n, ratio, &mut StdRng::seed_from_u64(seed))
    }

    /// Random 3-SAT drawn from `rng`.
    ///
    /// A clause is violated exactly when all three literals are false, with
    /// indicator (1/8)·Π_k (1 + σ_k z_k) where σ_k = +1 for a positive
    /// literal. Its linear terms go into h and its pairwise terms into J; the
    /// constant and the three-body term are dropped, so the encoding is a
    /// pairwise approximation of the clause-count landscape.
    pub fn three_sat_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        ratio: f64,
        rng: &mut R,
    ) -> GapResult<SatInstance> {
        if !(ratio.is_finite() && ratio >= 0.0) {
            return Err(GapError::config(format!(
                "clause ratio must be non-negative, got {ratio}"
            )));
        }
        self.check_size(n)?;
        if n < 3 {
            return Err(GapError::config(format!(
                "3-SAT needs at least 3 variables, got {n}"
            )));
        }

        let num_clauses = (ratio * n as f64).round() as usize;
        let mut clauses = Vec::with_capacity(num_clauses);
        let mut j = DMatrix::zeros(n, n);
        let mut h = DVector::zeros(n);

        for _ in 0..num_clauses {
            let vars = rand::seq::index::sample(rng, n, 3).into_vec();
            let clause = [0usize, 1, 2].map(|k| Literal {
                var: vars[k],
                negated: rng.gen_bool(0.5),
            });
            let sign = |lit: Literal| if lit.negated { -1.0 } else { 1.0 };

            for (a, &la) in clause.iter().enumerate() {
                h[la.var] += sign(la) / 8.0;
                for &lb in &clause[a + 1..] {
                    let w = sign(la) * sign(lb) / 8.0;
                    j[(la.var, lb.var)] += w;
                    j[(lb.var, la.var)] += w;
                }
            }
            clauses.push(clause);
        }

        debug!(n, num_clauses, ratio, "generated 3-SAT instance");
        Ok(SatInstance {
            clauses,
            ising: ProblemInstance { j, h },
        })
    }

    /// Random Energy Model: 2^N i.i.d. Normal(0, N/2) energies (unit coupling).
    pub fn rem_energies(&self, n: usize, seed: u64) -> GapResult<Vec<f64>> {
        self.rem_energies_with_rng(n, 1.0, &mut StdRng::seed_from_u64(seed))
    }

    /// Random Energy Model with coupling scale `coupling`: variance N·J²/2.
    pub fn rem_energies_with_rng<R: Rng + ?Sized>(
        &self,
        n: usize,
        coupling: f64,
        rng: &mut R,
    ) -> GapResult<Vec<f64>> {
        self.check_size(n)?;
        if !coupling.is_finite() {
            return Err(GapError::config("REM coupling must be finite"));
        }
        let normal = normal((n as f64 * coupling * coupling / 2.0).sqrt())?;
        let energies: Vec<f64> = (0..1usize << n).map(|_| normal.sample(rng)).collect();
        debug!(n, count = energies.len(), "sampled REM energies");
        Ok(energies)
    }

    fn check_size(&self, n: usize) -> GapResult<()> {
        if n < 1 {
            return Err(GapError::config("N must be at least 1"));
        }
        self.limits.check_sparse(n)
    }
}

fn normal(std_dev: f64) -> GapResult<Normal<f64>> {
    Normal::new(0.0, std_dev).map_err(|e| GapError::config(format!("bad normal scale: {e}")))
}

//! Lanczos iteration with full reorthogonalisation.
//!
//! Convergence is judged on Ritz residuals, not on eigenvalue drift: for a
//! Ritz pair (θ, y = Q s) of the m-step tridiagonal T_m the residual
//! ‖H y − θ y‖ equals |β_m · s_m|, which is free to evaluate. All k lowest
//! pairs must reach `tolerance · max(1, ‖H‖)`.
//!
//! When the Krylov space becomes invariant the iteration restarts from a new
//! vector orthogonal to everything seen so far, so lower levels outside the
//! first invariant subspace are still found.
//!
//! A single start vector only sees one copy of a degenerate level, and its
//! residuals can settle before a nearly degenerate partner shows up. After
//! convergence the accepted pairs are therefore locked and a deflated run on
//! their orthogonal complement looks for a level below the current k-th one.
//! Any such level replaces the highest accepted pair, and the search repeats
//! until the complement has nothing lower to offer.

use std::f64::consts::SQRT_2;
use std::time::Instant;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use super::{Spectrum, SpectrumStrategy};
use crate::error::{GapError, GapResult};
use crate::operator::SparseOperator;

const GOLDEN: f64 = 0.618_033_988_749_895;

/// Relative size of β below which the Krylov space is treated as invariant.
const BREAKDOWN_TOL: f64 = 1e-12;

/// Ritz values are only extracted every few steps.
const CHECK_INTERVAL: usize = 5;

/// Pseudo-random restart vectors tried before falling back to unit vectors.
const RESTART_ATTEMPTS: usize = 4;

#[derive(Debug, Clone)]
pub(super) struct LanczosParams {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Clone)]
pub(super) struct LanczosOutcome {
    pub energies: Vec<f64>,
    pub states: Vec<DVector<f64>>,
    pub converged: bool,
    pub iterations: usize,
    pub max_residual: f64,
}

impl LanczosOutcome {
    pub fn into_spectrum(self) -> Spectrum {
        Spectrum::new(self.energies, self.states, SpectrumStrategy::SparseIterative)
    }
}

/// Peak bytes held by one call with these settings: the Krylov basis, the
/// locked pairs, the Ritz vectors being assembled and the work vector.
pub(super) fn workspace_bytes(dim: usize, k: usize, max_iterations: usize) -> u64 {
    let steps = max_iterations.max(k + 1).min(dim);
    let vectors = (steps + 2 * k + 1) as u64;
    vectors
        .saturating_mul(dim as u64)
        .saturating_mul(size_of::<f64>() as u64)
}

pub(super) fn lowest_eigenpairs(
    op: &SparseOperator,
    k: usize,
    params: &LanczosParams,
) -> GapResult<LanczosOutcome> {
    let dim = op.dim();
    let scale = op.norm_bound().max(1.0);
    let krylov = Krylov {
        op,
        params,
        threshold: params.tolerance * scale,
        breakdown: BREAKDOWN_TOL * scale,
        started: Instant::now(),
    };

    let first = krylov.run(k, &[], 0, 0)?;
    if !first.outcome.converged || first.exhausted || k >= dim {
        return Ok(first.outcome);
    }

    let mut outcome = first.outcome;
    for round in 1..=dim - k {
        // Fresh start vectors: the first run's start has no component along
        // a degenerate partner of the pairs it found.
        let salt = round * (RESTART_ATTEMPTS + 1);
        let found = krylov
            .run(1, &outcome.states, outcome.iterations, salt)?
            .outcome;
        outcome.iterations += found.iterations;
        outcome.max_residual = outcome.max_residual.max(found.max_residual);
        if !found.converged {
            outcome.converged = false;
            break;
        }

        let top = outcome.energies[outcome.energies.len() - 1];
        let theta = found.energies[0];
        if theta >= top - krylov.threshold {
            break;
        }

        debug!(energy = theta, replaces = top, "deflated run found a missed level");
        let at = outcome.energies.partition_point(|&e| e <= theta);
        outcome.energies.insert(at, theta);
        outcome.states.insert(at, found.states[0].clone());
        outcome.energies.truncate(k);
        outcome.states.truncate(k);
    }

    Ok(outcome)
}

// =========================================================================
// Internal helpers
// =========================================================================

struct Krylov<'a> {
    op: &'a SparseOperator,
    params: &'a LanczosParams,
    threshold: f64,
    breakdown: f64,
    started: Instant,
}

struct Pass {
    outcome: LanczosOutcome,
    /// The whole space orthogonal to the locked vectors was spanned, so the
    /// Ritz pairs are exact.
    exhausted: bool,
}

impl Krylov<'_> {
    /// Lowest `k` pairs of H restricted to the orthogonal complement of
    /// `locked`. `done` counts iterations already spent by earlier runs and
    /// `salt` selects the family of start vectors.
    fn run(
        &self,
        k: usize,
        locked: &[DVector<f64>],
        done: usize,
        salt: usize,
    ) -> GapResult<Pass> {
        let dim = self.op.dim();
        let space = dim - locked.len();
        let steps = self.params.max_iterations.max(k + 1).min(space);

        let mut basis: Vec<DVector<f64>> = Vec::with_capacity(steps);
        let Some(start) = fresh_vector(locked, &basis, dim, salt) else {
            return Err(GapError::config("no direction left outside the locked eigenvectors"));
        };
        basis.push(start);
        let mut alpha: Vec<f64> = Vec::with_capacity(steps);
        let mut beta: Vec<f64> = Vec::with_capacity(steps);
        let mut block_start = 0;
        let mut last_beta = 0.0;

        for j in 0..steps {
            if let Some(deadline) = self.params.deadline {
                if Instant::now() >= deadline {
                    return Err(GapError::SolverTimeout {
                        elapsed: self.started.elapsed(),
                        iterations: done + j,
                    });
                }
            }

            let q = &basis[j];
            let mut w = DVector::from_vec(self.op.matvec(q.as_slice()));
            let a = q.dot(&w);
            alpha.push(a);
            w.axpy(-a, q, 1.0);
            if j > block_start {
                w.axpy(-beta[j - 1], &basis[j - 1], 1.0);
            }
            reorthogonalize(&mut w, locked, &basis);

            let b = w.norm();
            let broke = b <= self.breakdown;
            let exhausted = basis.len() == space;
            last_beta = if broke { 0.0 } else { b };

            let block_len = j + 1 - block_start;
            let min_block = (k + 1).min(space - block_start);
            let due = (j + 1) % CHECK_INTERVAL == 0 || j + 1 == steps || broke;
            if exhausted || (block_len >= min_block && due) {
                let ritz = ritz_pairs(&alpha, &beta, last_beta, k);
                trace!(iteration = j + 1, residual = ritz.max_residual, "Ritz check");
                if exhausted || ritz.max_residual <= self.threshold {
                    debug!(
                        iterations = j + 1,
                        residual = ritz.max_residual,
                        locked = locked.len(),
                        "Lanczos converged"
                    );
                    return Ok(Pass {
                        outcome: ritz.into_outcome(&basis, true, j + 1),
                        exhausted,
                    });
                }
            }

            if j + 1 == steps {
                break;
            }

            if broke {
                match fresh_vector(locked, &basis, dim, salt) {
                    Some(v) => {
                        debug!(iteration = j + 1, "Krylov space invariant, restarting");
                        beta.push(0.0);
                        basis.push(v);
                        block_start = j + 1;
                    }
                    None => {
                        let ritz = ritz_pairs(&alpha, &beta, 0.0, k);
                        return Ok(Pass {
                            outcome: ritz.into_outcome(&basis, true, j + 1),
                            exhausted: true,
                        });
                    }
                }
            } else {
                beta.push(b);
                basis.push(w / b);
            }
        }

        let ritz = ritz_pairs(&alpha, &beta, last_beta, k);
        let converged = ritz.max_residual <= self.threshold;
        debug!(
            iterations = alpha.len(),
            residual = ritz.max_residual,
            threshold = self.threshold,
            converged,
            "Lanczos budget exhausted"
        );
        Ok(Pass {
            outcome: ritz.into_outcome(&basis, converged, alpha.len()),
            exhausted: false,
        })
    }
}

struct RitzPairs {
    values: Vec<f64>,
    /// Eigenvectors of T, one column per kept value.
    coefficients: Vec<DVector<f64>>,
    max_residual: f64,
}

impl RitzPairs {
    fn into_outcome(
        self,
        basis: &[DVector<f64>],
        converged: bool,
        iterations: usize,
    ) -> LanczosOutcome {
        let dim = basis[0].len();
        let states = self
            .coefficients
            .iter()
            .map(|s| {
                let mut y = DVector::zeros(dim);
                for (c, q) in s.iter().zip(basis) {
                    y.axpy(*c, q, 1.0);
                }
                let norm = y.norm();
                if norm > 0.0 { y / norm } else { y }
            })
            .collect();

        LanczosOutcome {
            energies: self.values,
            states,
            converged,
            iterations,
            max_residual: self.max_residual,
        }
    }
}

/// Lowest `k` eigenpairs of the tridiagonal T with residual `next_beta · s_last`.
fn ritz_pairs(alpha: &[f64], beta: &[f64], next_beta: f64, k: usize) -> RitzPairs {
    let m = alpha.len();
    let mut t = DMatrix::zeros(m, m);
    for i in 0..m {
        t[(i, i)] = alpha[i];
        if i + 1 < m {
            t[(i, i + 1)] = beta[i];
            t[(i + 1, i)] = beta[i];
        }
    }
    let eig = t.symmetric_eigen();

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));
    order.truncate(k);

    let values = order.iter().map(|&i| eig.eigenvalues[i]).collect();
    let coefficients: Vec<DVector<f64>> = order
        .iter()
        .map(|&i| eig.eigenvectors.column(i).into_owned())
        .collect();
    let max_residual = coefficients
        .iter()
        .map(|s| (next_beta * s[m - 1]).abs())
        .fold(0.0, f64::max);

    RitzPairs {
        values,
        coefficients,
        max_residual,
    }
}

/// Two passes of classical Gram-Schmidt against the locked vectors and the basis.
fn reorthogonalize(w: &mut DVector<f64>, locked: &[DVector<f64>], basis: &[DVector<f64>]) {
    for _ in 0..2 {
        for q in locked.iter().chain(basis) {
            let overlap = q.dot(w);
            w.axpy(-overlap, q, 1.0);
        }
    }
}

/// Deterministic, non-symmetric start vector; `salt` picks a different one.
fn start_vector(dim: usize, salt: usize) -> DVector<f64> {
    let step = GOLDEN + salt as f64 * SQRT_2;
    let v = DVector::from_fn(dim, |i, _| ((i as f64 + 1.0) * step).fract() - 0.5);
    let norm = v.norm();
    v / norm
}

/// Unit vector orthogonal to `locked` and `basis`, or `None` once they span
/// the whole space.
fn fresh_vector(
    locked: &[DVector<f64>],
    basis: &[DVector<f64>],
    dim: usize,
    salt: usize,
) -> Option<DVector<f64>> {
    let unit = |i: usize| {
        let mut e = DVector::zeros(dim);
        e[i] = 1.0;
        e
    };

    (salt..=salt + RESTART_ATTEMPTS)
        .map(|salt| start_vector(dim, salt))
        .chain((0..dim).map(unit))
        .find_map(|mut v| {
            reorthogonalize(&mut v, locked, basis);
            let norm = v.norm();
            (norm > 1e-8).then(|| v / norm)
        })
}

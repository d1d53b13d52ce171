//! Least-squares trend fits across problem sizes.
//!
//! Inputs are (N, y) pairs, typically per-N means from [`aggregate_by_n`].
//! Exponential fits regress ln y on N, power-law fits ln y on ln N; both
//! report the coefficients of that linearised model together with its R².

use std::collections::BTreeMap;
use std::f64::consts::LN_2;

use serde::{Deserialize, Serialize};

use crate::error::{GapError, GapResult};
use crate::sweep::TrialRecord;

/// Below this the x spread is treated as zero.
const DEGENERATE_SPREAD: f64 = 1e-12;

/// Functional form of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitKind {
    /// y = a + b·N
    Linear,
    /// y = e^a · e^{b·N}
    Exponential,
    /// y = e^a · N^b
    PowerLaw,
}

/// Coefficients and quality of one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub kind: FitKind,
    /// b of the linearised model.
    pub slope: f64,
    /// a of the linearised model.
    pub intercept: f64,
    /// Coefficient of determination of the linearised model, floored at 0.
    pub r_squared: f64,
    /// Number of points fitted.
    pub points: usize,
}

impl TrendFit {
    /// Model value at size `n`.
    pub fn predict(&self, n: f64) -> f64 {
        match self.kind {
            FitKind::Linear => self.intercept + self.slope * n,
            FitKind::Exponential => (self.intercept + self.slope * n).exp(),
            FitKind::PowerLaw => self.intercept.exp() * n.powf(self.slope),
        }
    }
}

/// Ordinary least squares y = a + b·x.
pub fn fit_linear(points: &[(f64, f64)]) -> GapResult<TrendFit> {
    least_squares(points, FitKind::Linear)
}

/// ln y = a + b·N. All y must be positive.
pub fn fit_exponential(points: &[(f64, f64)]) -> GapResult<TrendFit> {
    let logged = points
        .iter()
        .map(|&(x, y)| Ok((x, positive_ln(y, "y")?)))
        .collect::<GapResult<Vec<_>>>()?;
    least_squares(&logged, FitKind::Exponential)
}

/// ln y = a + b·ln N. All N and y must be positive.
pub fn fit_power_law(points: &[(f64, f64)]) -> GapResult<TrendFit> {
    let logged = points
        .iter()
        .map(|&(x, y)| Ok((positive_ln(x, "N")?, positive_ln(y, "y")?)))
        .collect::<GapResult<Vec<_>>>()?;
    least_squares(&logged, FitKind::PowerLaw)
}

/// Exponential or power-law, whichever explains the data better by R².
///
/// Ties go to the exponential fit.
pub fn classify_trend(points: &[(f64, f64)]) -> GapResult<TrendFit> {
    let exponential = fit_exponential(points)?;
    let power = fit_power_law(points)?;
    Ok(if exponential.r_squared >= power.r_squared {
        exponential
    } else {
        power
    })
}

/// REM ground-state energy per spin in the thermodynamic limit, −√(ln 2).
pub fn rem_ground_energy_per_spin() -> f64 {
    -LN_2.sqrt()
}

/// Per-N means of a set of trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeAggregate {
    pub n: usize,
    pub trials: usize,
    pub mean_min_gap: f64,
    pub mean_critical_s: f64,
    pub mean_ground_energy: f64,
    pub mean_classical_energy: f64,
    pub mean_ipr: f64,
    pub mean_entropy: f64,
}

/// Group trials by N and average every measured quantity. Ascending N.
pub fn aggregate_by_n(records: &[TrialRecord]) -> Vec<SizeAggregate> {
    let mut groups: BTreeMap<usize, Vec<&TrialRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.n).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(n, group)| {
            let count = group.len() as f64;
            let mean = |f: fn(&TrialRecord) -> f64| group.iter().map(|r| f(r)).sum::<f64>() / count;
            SizeAggregate {
                n,
                trials: group.len(),
                mean_min_gap: mean(|r| r.min_gap),
                mean_critical_s: mean(|r| r.critical_s),
                mean_ground_energy: mean(|r| r.ground_energy),
                mean_classical_energy: mean(|r| r.classical_energy),
                mean_ipr: mean(|r| r.ipr),
                mean_entropy: mean(|r| r.entropy),
            }
        })
        .collect()
}

/// (N, quantity) pairs from aggregates, ready for a fit.
pub fn series<F>(aggregates: &[SizeAggregate], quantity: F) -> Vec<(f64, f64)>
where
    F: Fn(&SizeAggregate) -> f64,
{
    aggregates
        .iter()
        .map(|a| (a.n as f64, quantity(a)))
        .collect()
}

// =========================================================================
// Internal helpers
// =========================================================================

fn positive_ln(v: f64, what: &str) -> GapResult<f64> {
    if v > 0.0 && v.is_finite() {
        Ok(v.ln())
    } else {
        Err(GapError::config(format!(
            "log-scale fit needs positive {what}, got {v}"
        )))
    }
}

fn least_squares(points: &[(f64, f64)], kind: FitKind) -> GapResult<TrendFit> {
    if points.len() < 2 {
        return Err(GapError::config(format!(
            "a fit needs at least 2 points, got {}",
            points.len()
        )));
    }
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(GapError::config("fit points must be finite"));
    }

    let count = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / count;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / count;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    if sxx <= DEGENERATE_SPREAD {
        return Err(GapError::config("fit needs at least two distinct sizes"));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - intercept - slope * p.0).powi(2))
        .sum();
    // Constant data is fitted exactly by a flat line.
    let r_squared = if ss_tot <= f64::EPSILON * count {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    Ok(TrendFit {
        kind,
        slope,
        intercept,
        r_squared,
        points: points.len(),
    })
}

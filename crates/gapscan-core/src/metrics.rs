//! Localisation measures of a state in the computational basis.
//!
//! Both measures normalise their input first, so a vector that drifted off
//! unit norm (or an unnormalised Ritz vector) still yields values in range.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Probabilities at or below this are left out of the entropy sum.
pub const PROBABILITY_FLOOR: f64 = 1e-15;

/// IPR = Σ_i |ψ_i|⁴ of the normalised state.
///
/// 1 for a computational basis vector, 2^-N for the uniform superposition.
/// Always within [2^-N, 1]; the zero vector sits at the floor 2^-N.
pub fn inverse_participation_ratio(state: &DVector<f64>) -> f64 {
    let floor = 1.0 / state.len().max(1) as f64;
    let norm_sq = state.norm_squared();
    if norm_sq <= PROBABILITY_FLOOR {
        return floor;
    }
    let ipr: f64 = state.iter().map(|a| (a * a / norm_sq).powi(2)).sum();
    ipr.clamp(floor, 1.0)
}

/// Shannon entropy −Σ p_i log₂ p_i in bits, with p_i = |ψ_i|².
///
/// Lies in [0, N]. Returns 0 for the zero vector.
pub fn shannon_entropy(state: &DVector<f64>) -> f64 {
    let norm_sq = state.norm_squared();
    if norm_sq <= PROBABILITY_FLOOR {
        return 0.0;
    }
    let h: f64 = state
        .iter()
        .map(|a| a * a / norm_sq)
        .filter(|&p| p > PROBABILITY_FLOOR)
        .map(|p| -p * p.log2())
        .sum();
    h.max(0.0)
}

/// Both measures of one state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateMetrics {
    /// Inverse participation ratio.
    pub ipr: f64,
    /// Shannon entropy in bits.
    pub entropy: f64,
}

impl StateMetrics {
    pub fn of(state: &DVector<f64>) -> Self {
        Self {
            ipr: inverse_participation_ratio(state),
            entropy: shannon_entropy(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_vector_is_floored() {
        let zero = DVector::zeros(8);
        assert_eq!(inverse_participation_ratio(&zero), 0.125);
        assert_eq!(shannon_entropy(&zero), 0.0);
    }

    #[test]
    fn test_unnormalised_input() {
        let v = DVector::from_vec(vec![3.0, 0.0, 0.0, 3.0]);
        assert!((inverse_participation_ratio(&v) - 0.5).abs() < 1e-12);
        assert!((shannon_entropy(&v) - 1.0).abs() < 1e-12);
    }
}

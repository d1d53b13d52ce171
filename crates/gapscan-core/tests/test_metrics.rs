//! Tests for IPR and Shannon entropy.

use approx::assert_relative_eq;
use gapscan_core::{StateMetrics, inverse_participation_ratio, shannon_entropy};
use nalgebra::DVector;
use proptest::prelude::*;

fn basis_vector(dim: usize, index: usize) -> DVector<f64> {
    let mut v = DVector::zeros(dim);
    v[index] = 1.0;
    v
}

fn uniform(n: usize) -> DVector<f64> {
    let dim = 1usize << n;
    DVector::from_element(dim, 1.0 / (dim as f64).sqrt())
}

#[test]
fn basis_vector_is_localised() {
    for n in 1..=6 {
        let v = basis_vector(1 << n, (1 << n) - 1);
        assert_eq!(inverse_participation_ratio(&v), 1.0);
        assert_eq!(shannon_entropy(&v), 0.0);
    }
}

#[test]
fn uniform_superposition_is_delocalised() {
    for n in 1..=8 {
        let v = uniform(n);
        assert_relative_eq!(
            inverse_participation_ratio(&v),
            1.0 / (1u64 << n) as f64,
            max_relative = 1e-12
        );
        assert_relative_eq!(shannon_entropy(&v), n as f64, max_relative = 1e-12);
    }
}

#[test]
fn bell_like_state() {
    let v = DVector::from_vec(vec![
        std::f64::consts::FRAC_1_SQRT_2,
        0.0,
        0.0,
        -std::f64::consts::FRAC_1_SQRT_2,
    ]);
    let metrics = StateMetrics::of(&v);
    assert_relative_eq!(metrics.ipr, 0.5, max_relative = 1e-12);
    assert_relative_eq!(metrics.entropy, 1.0, max_relative = 1e-12);
}

#[test]
fn zero_state_stays_in_range() {
    for n in 1..=5 {
        let dim = 1usize << n;
        let metrics = StateMetrics::of(&DVector::zeros(dim));
        assert_eq!(metrics.ipr, 1.0 / dim as f64);
        assert_eq!(metrics.entropy, 0.0);
    }
}

#[test]
fn tiny_amplitudes_are_floored() {
    let mut v = basis_vector(4, 0);
    v[1] = 1e-9; // p ≈ 1e-18, below the floor
    assert_eq!(shannon_entropy(&v), 0.0);
    assert!(inverse_participation_ratio(&v).is_finite());
}

fn arb_state() -> impl Strategy<Value = (usize, DVector<f64>)> {
    (1usize..=6).prop_flat_map(|n| {
        prop::collection::vec(-1.0f64..1.0, 1usize << n)
            .prop_filter("non-zero", |v| v.iter().any(|a| a.abs() > 1e-6))
            .prop_map(move |amps| {
                let v = DVector::from_vec(amps);
                let norm = v.norm();
                (n, v / norm)
            })
    })
}

proptest! {
    #[test]
    fn ipr_is_bounded((n, state) in arb_state()) {
        let ipr = inverse_participation_ratio(&state);
        let floor = 1.0 / (1u64 << n) as f64;
        prop_assert!(ipr >= floor * (1.0 - 1e-12));
        prop_assert!(ipr <= 1.0 + 1e-12);
    }

    #[test]
    fn entropy_is_bounded((n, state) in arb_state()) {
        let h = shannon_entropy(&state);
        prop_assert!(h >= 0.0);
        prop_assert!(h <= n as f64 + 1e-12);
    }

    #[test]
    fn measures_ignore_global_scale((_n, state) in arb_state(), scale in 0.1f64..10.0) {
        let scaled = &state * scale;
        prop_assert!((inverse_participation_ratio(&scaled) - inverse_participation_ratio(&state)).abs() < 1e-12);
        prop_assert!((shannon_entropy(&scaled) - shannon_entropy(&state)).abs() < 1e-10);
    }
}

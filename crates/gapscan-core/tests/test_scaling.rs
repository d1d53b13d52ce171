//! Tests for trend fits and sweep aggregation.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use gapscan_core::scaling::{
    classify_trend, fit_exponential, fit_linear, fit_power_law, rem_ground_energy_per_spin,
    series,
};
use gapscan_core::{EngineConfig, FitKind, ProblemKind, Sweep, TrialRecord, aggregate_by_n};

fn record(n: usize, seed: u64, min_gap: f64, ground_energy: f64) -> TrialRecord {
    TrialRecord {
        n,
        seed,
        min_gap,
        critical_s: 0.5,
        ground_energy,
        classical_energy: ground_energy,
        ipr: 0.25,
        entropy: 2.0,
    }
}

// ---------------------------------------------------------------------------
// Fits
// ---------------------------------------------------------------------------

#[test]
fn linear_fit_recovers_line() {
    let points: Vec<(f64, f64)> = (1..=6).map(|n| (n as f64, 3.0 - 0.5 * n as f64)).collect();
    let fit = fit_linear(&points).unwrap();
    assert_eq!(fit.kind, FitKind::Linear);
    assert_relative_eq!(fit.slope, -0.5, max_relative = 1e-12);
    assert_relative_eq!(fit.intercept, 3.0, max_relative = 1e-12);
    assert_relative_eq!(fit.r_squared, 1.0, max_relative = 1e-12);
    assert_eq!(fit.points, 6);
    assert_relative_eq!(fit.predict(10.0), -2.0, max_relative = 1e-12);
}

#[test]
fn exponential_fit_recovers_rate() {
    let points: Vec<(f64, f64)> = (4..=10)
        .map(|n| (n as f64, 2.0 * (-0.7 * n as f64).exp()))
        .collect();
    let fit = fit_exponential(&points).unwrap();
    assert_relative_eq!(fit.slope, -0.7, max_relative = 1e-10);
    assert_relative_eq!(fit.intercept, 2.0f64.ln(), max_relative = 1e-10);
    assert_relative_eq!(fit.predict(12.0), 2.0 * (-8.4f64).exp(), max_relative = 1e-9);
}

#[test]
fn power_law_fit_recovers_exponent() {
    let points: Vec<(f64, f64)> = (2..=10).map(|n| (n as f64, 5.0 * (n as f64).powf(-2.0))).collect();
    let fit = fit_power_law(&points).unwrap();
    assert_relative_eq!(fit.slope, -2.0, max_relative = 1e-10);
    assert_relative_eq!(fit.predict(4.0), 5.0 / 16.0, max_relative = 1e-9);
}

#[test]
fn classify_prefers_better_model() {
    let exponential: Vec<(f64, f64)> = (4..=14)
        .map(|n| (n as f64, (-0.9 * n as f64).exp()))
        .collect();
    assert_eq!(classify_trend(&exponential).unwrap().kind, FitKind::Exponential);

    let polynomial: Vec<(f64, f64)> = (2..=40)
        .map(|n| (n as f64, (n as f64).powf(-1.5)))
        .collect();
    assert_eq!(classify_trend(&polynomial).unwrap().kind, FitKind::PowerLaw);
}

#[test]
fn degenerate_inputs_are_rejected() {
    assert!(fit_linear(&[(1.0, 2.0)]).is_err());
    assert!(fit_linear(&[(3.0, 1.0), (3.0, 2.0)]).is_err());
    assert!(fit_linear(&[(1.0, f64::NAN), (2.0, 1.0)]).is_err());
    assert!(fit_exponential(&[(1.0, 0.0), (2.0, 1.0)]).is_err());
    assert!(fit_power_law(&[(0.0, 1.0), (2.0, 1.0)]).is_err());
}

#[test]
fn constant_data_fits_exactly() {
    let fit = fit_linear(&[(1.0, 4.0), (2.0, 4.0), (3.0, 4.0)]).unwrap();
    assert_abs_diff_eq!(fit.slope, 0.0);
    assert_eq!(fit.r_squared, 1.0);
}

#[test]
fn rem_prediction() {
    assert_relative_eq!(rem_ground_energy_per_spin(), -0.832_554_611_157_697_7, max_relative = 1e-12);
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[test]
fn aggregate_groups_by_size_in_order() {
    let records = vec![
        record(6, 0, 0.2, -4.0),
        record(4, 0, 0.5, -3.0),
        record(6, 1, 0.4, -5.0),
        record(4, 1, 0.3, -2.0),
    ];
    let aggregates = aggregate_by_n(&records);
    assert_eq!(aggregates.len(), 2);

    assert_eq!(aggregates[0].n, 4);
    assert_eq!(aggregates[0].trials, 2);
    assert_relative_eq!(aggregates[0].mean_min_gap, 0.4, max_relative = 1e-12);
    assert_relative_eq!(aggregates[0].mean_ground_energy, -2.5, max_relative = 1e-12);

    assert_eq!(aggregates[1].n, 6);
    assert_relative_eq!(aggregates[1].mean_min_gap, 0.3, max_relative = 1e-12);

    let gaps = series(&aggregates, |a| a.mean_min_gap);
    assert_eq!(gaps.len(), 2);
    assert_eq!(gaps[0].0, 4.0);
}

#[test]
fn aggregate_of_nothing_is_empty() {
    assert!(aggregate_by_n(&[]).is_empty());
}

// ---------------------------------------------------------------------------
// Pipeline sanity check
// ---------------------------------------------------------------------------

#[test]
fn sk_ground_energy_slope_near_rem_prediction() {
    // Seed-averaged ground energy per added spin, against the REM value
    // −√(ln 2). A loose pipeline bound: finite-size SK slopes drift with the
    // seed set, so the average runs over 30 seeds per N.
    let sweep = Sweep::new(
        ProblemKind::SpinGlass,
        (4..=10).collect(),
        (0..30).collect(),
        &EngineConfig::default(),
    )
    .unwrap();

    let energies = sweep.classical_energies().unwrap();
    assert_eq!(energies.len(), 7 * 30);

    let mut points = Vec::new();
    for n in 4..=10 {
        let group: Vec<f64> = energies
            .iter()
            .filter(|(size, _, _)| *size == n)
            .map(|(_, _, e)| *e)
            .collect();
        points.push((n as f64, group.iter().sum::<f64>() / group.len() as f64));
    }

    let fit = fit_linear(&points).unwrap();
    let target = rem_ground_energy_per_spin();
    assert!(
        (fit.slope - target).abs() <= 0.15 * target.abs(),
        "slope {} vs {}",
        fit.slope,
        target
    );
    assert!(fit.r_squared > 0.9);
}

#[test]
fn small_sweep_runs_end_to_end() {
    let mut config = EngineConfig::default();
    config.scan.num_points = 12;
    let sweep = Sweep::new(ProblemKind::SpinGlass, vec![4, 3], vec![2, 1], &config).unwrap();
    assert_eq!(sweep.trials(), vec![(3, 1), (3, 2), (4, 1), (4, 2)]);

    let records = sweep.run().unwrap();
    assert_eq!(records.len(), 4);
    for (r, (n, seed)) in records.iter().zip(sweep.trials()) {
        assert_eq!((r.n, r.seed), (n, seed));
        assert!(r.min_gap > 0.0);
        assert!(r.ipr > 0.0 && r.ipr <= 1.0);
    }

    let aggregates = aggregate_by_n(&records);
    assert_eq!(aggregates.len(), 2);
    assert!(fit_linear(&series(&aggregates, |a| a.mean_classical_energy)).is_ok());
}

#[test]
fn sweep_rejects_bad_grids() {
    let config = EngineConfig::default();
    assert!(Sweep::new(ProblemKind::SpinGlass, vec![], vec![1], &config).is_err());
    assert!(Sweep::new(ProblemKind::SpinGlass, vec![3], vec![], &config).is_err());
    assert!(Sweep::new(ProblemKind::ThreeSat { ratio: 4.0 }, vec![2], vec![1], &config).is_err());
    assert!(Sweep::new(ProblemKind::RandomEnergy, vec![30], vec![1], &config).is_err());
}

//! Tests for the dense and iterative eigensolvers.

use approx::assert_abs_diff_eq;
use gapscan_core::{
    AnnealingHamiltonian, GapError, InstanceGenerator, ResourceLimits, SolverConfig,
    SparseOperator, SpectrumSolver, SpectrumStrategy,
};

fn spin_glass(n: usize, seed: u64) -> AnnealingHamiltonian {
    let inst = InstanceGenerator::default().spin_glass(n, seed).unwrap();
    AnnealingHamiltonian::new(&inst, &ResourceLimits::default()).unwrap()
}

fn forced(strategy: SpectrumStrategy) -> SpectrumSolver {
    SpectrumSolver::default().with_selector(move |_| strategy)
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

#[test]
fn default_selection_switches_at_threshold() {
    let solver = SpectrumSolver::default();
    assert_eq!(solver.strategy_for(12), SpectrumStrategy::DenseExact);
    assert_eq!(solver.strategy_for(13), SpectrumStrategy::SparseIterative);
}

#[test]
fn selection_follows_configured_threshold() {
    let config = SolverConfig {
        dense_threshold: 4,
        ..SolverConfig::default()
    };
    let solver = SpectrumSolver::new(config, ResourceLimits::default());
    assert_eq!(solver.strategy_for(4), SpectrumStrategy::DenseExact);
    assert_eq!(solver.strategy_for(5), SpectrumStrategy::SparseIterative);
}

#[test]
fn spectrum_reports_strategy() {
    let h = spin_glass(3, 0);
    let dense = forced(SpectrumStrategy::DenseExact).get_spectrum(&h, 0.5, 2).unwrap();
    let sparse = forced(SpectrumStrategy::SparseIterative).get_spectrum(&h, 0.5, 2).unwrap();
    assert_eq!(dense.strategy(), SpectrumStrategy::DenseExact);
    assert_eq!(sparse.strategy(), SpectrumStrategy::SparseIterative);
}

// ---------------------------------------------------------------------------
// Eigenpairs
// ---------------------------------------------------------------------------

#[test]
fn dense_and_sparse_agree() {
    let h = spin_glass(6, 17);
    let dense = forced(SpectrumStrategy::DenseExact);
    let sparse = forced(SpectrumStrategy::SparseIterative);

    for s in [0.1, 0.45, 0.8] {
        let a = dense.get_spectrum(&h, s, 3).unwrap();
        let b = sparse.get_spectrum(&h, s, 3).unwrap();
        for (ea, eb) in a.energies().iter().zip(b.energies()) {
            assert_abs_diff_eq!(*ea, *eb, epsilon = 1e-8);
        }
        assert_abs_diff_eq!(
            a.ground_state().dot(b.ground_state()).abs(),
            1.0,
            epsilon = 1e-6
        );
    }
}

#[test]
fn eigenpairs_are_sorted_and_orthonormal() {
    let h = spin_glass(5, 2);
    for strategy in [SpectrumStrategy::DenseExact, SpectrumStrategy::SparseIterative] {
        let spectrum = forced(strategy).get_spectrum(&h, 0.3, 4).unwrap();
        assert_eq!(spectrum.len(), 4);
        assert!(spectrum.energies().windows(2).all(|w| w[0] <= w[1]));

        let states = spectrum.states();
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(states[i].dot(&states[j]), expected, epsilon = 1e-8);
            }
        }
    }
}

#[test]
fn transverse_field_spectrum() {
    // −Σσx has E_0 = −N and a gap of 2.
    let h = spin_glass(3, 4);
    for strategy in [SpectrumStrategy::DenseExact, SpectrumStrategy::SparseIterative] {
        let spectrum = forced(strategy).get_spectrum(&h, 0.0, 2).unwrap();
        assert_abs_diff_eq!(spectrum.ground_energy(), -3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(spectrum.gap(), 2.0, epsilon = 1e-10);
    }
}

#[test]
fn sparse_resolves_degenerate_ground_level() {
    let op = SparseOperator::from_diagonal(&[0.0, 0.0, 1.0, 2.0]);
    let dense = forced(SpectrumStrategy::DenseExact).solve(&op, 2, 2).unwrap();
    let sparse = forced(SpectrumStrategy::SparseIterative).solve(&op, 2, 2).unwrap();

    assert_abs_diff_eq!(dense.gap(), 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(sparse.gap(), 0.0, epsilon = 1e-10);
    for (a, b) in dense.energies().iter().zip(sparse.energies()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }
    assert_abs_diff_eq!(sparse.states()[0].dot(&sparse.states()[1]), 0.0, epsilon = 1e-10);
}

#[test]
fn sparse_resolves_spin_flip_pairs_at_classical_endpoint() {
    // h = 0, so every classical level comes with its spin-flipped partner.
    let h = spin_glass(6, 3);
    let dense = forced(SpectrumStrategy::DenseExact).get_spectrum(&h, 1.0, 2).unwrap();
    let sparse = forced(SpectrumStrategy::SparseIterative).get_spectrum(&h, 1.0, 2).unwrap();

    assert_abs_diff_eq!(dense.gap(), 0.0, epsilon = 1e-10);
    assert_abs_diff_eq!(sparse.gap(), dense.gap(), epsilon = 1e-8);
    assert_abs_diff_eq!(sparse.ground_energy(), h.classical_ground_energy(), epsilon = 1e-8);

    let k4_dense = forced(SpectrumStrategy::DenseExact).get_spectrum(&h, 1.0, 4).unwrap();
    let k4_sparse = forced(SpectrumStrategy::SparseIterative).get_spectrum(&h, 1.0, 4).unwrap();
    for (a, b) in k4_dense.energies().iter().zip(k4_sparse.energies()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-8);
    }
}

#[test]
fn classical_endpoint_matches_diagonal_minimum() {
    let h = spin_glass(5, 21);
    let spectrum = SpectrumSolver::default().get_spectrum(&h, 1.0, 1).unwrap();
    assert_abs_diff_eq!(
        spectrum.ground_energy(),
        h.classical_ground_energy(),
        epsilon = 1e-10
    );
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn invalid_k_is_rejected() {
    let h = spin_glass(2, 0);
    let solver = SpectrumSolver::default();
    assert!(matches!(
        solver.get_spectrum(&h, 0.5, 0),
        Err(GapError::Configuration(_))
    ));
    assert!(solver.get_spectrum(&h, 0.5, 5).is_err());
    assert!(solver.get_spectrum(&h, 0.5, 4).is_ok());
}

#[test]
fn solve_checks_dimension() {
    let h = spin_glass(3, 0);
    let op = h.get_hamiltonian(0.5).unwrap();
    let solver = SpectrumSolver::default();
    assert!(solver.solve(&op, 4, 2).is_err());
    assert!(solver.solve(&op, 3, 2).is_ok());
}

#[test]
fn dense_ceiling_rejects_before_allocation() {
    let limits = ResourceLimits {
        max_qubits_dense: 4,
        max_qubits_sparse: 8,
        ..ResourceLimits::default()
    };
    let solver = SpectrumSolver::new(SolverConfig::default(), limits)
        .with_selector(|_| SpectrumStrategy::DenseExact);
    let h = spin_glass(5, 0);
    assert!(matches!(
        solver.get_spectrum(&h, 0.5, 2),
        Err(GapError::ResourceExceeded {
            requested: 5,
            ceiling: 4,
            unit: "qubits",
            path: "dense"
        })
    ));
}

#[test]
fn sparse_workspace_ceiling_rejects_before_allocation() {
    let h = spin_glass(6, 0);
    let solver = forced(SpectrumStrategy::SparseIterative);
    let needed = solver.workspace_bytes(6, 2);
    assert_eq!(needed, (64 + 5) * 64 * 8);

    let limits = ResourceLimits {
        max_workspace_bytes: needed - 1,
        ..ResourceLimits::default()
    };
    let tight = SpectrumSolver::new(SolverConfig::default(), limits)
        .with_selector(|_| SpectrumStrategy::SparseIterative);
    assert!(matches!(
        tight.get_spectrum(&h, 0.5, 2),
        Err(GapError::ResourceExceeded {
            unit: "bytes",
            path: "sparse workspace",
            ..
        })
    ));

    let roomy = SpectrumSolver::new(
        SolverConfig::default(),
        ResourceLimits {
            max_workspace_bytes: needed,
            ..ResourceLimits::default()
        },
    )
    .with_selector(|_| SpectrumStrategy::SparseIterative);
    assert!(roomy.get_spectrum(&h, 0.5, 2).is_ok());
}

#[test]
fn exhausted_budget_escalates_with_degraded_result() {
    let config = SolverConfig {
        max_iterations: 2,
        retry_tolerance_factor: 1.0,
        retry_iteration_factor: 1,
        ..SolverConfig::default()
    };
    let solver = SpectrumSolver::new(config, ResourceLimits::default())
        .with_selector(|_| SpectrumStrategy::SparseIterative);
    let h = spin_glass(7, 3);

    match solver.get_spectrum(&h, 0.5, 2) {
        Err(GapError::SolverNonConvergence {
            iterations,
            residual,
            tolerance,
            degraded,
        }) => {
            assert_eq!(iterations, 3);
            assert!(residual > tolerance);
            assert_abs_diff_eq!(tolerance, 1e-10);
            assert_eq!(degraded.len(), 2);
            assert_eq!(degraded.strategy(), SpectrumStrategy::SparseIterative);
        }
        other => panic!("expected non-convergence, got {other:?}"),
    }
}

#[test]
fn retry_with_larger_budget_recovers() {
    let config = SolverConfig {
        max_iterations: 3,
        retry_iteration_factor: 100,
        ..SolverConfig::default()
    };
    let solver = SpectrumSolver::new(config, ResourceLimits::default())
        .with_selector(|_| SpectrumStrategy::SparseIterative);
    let h = spin_glass(6, 3);
    let spectrum = solver.get_spectrum(&h, 0.5, 2).unwrap();
    let exact = forced(SpectrumStrategy::DenseExact).get_spectrum(&h, 0.5, 2).unwrap();
    assert_abs_diff_eq!(spectrum.ground_energy(), exact.ground_energy(), epsilon = 1e-6);
}

#[test]
fn zero_timeout_aborts_iterative_solve() {
    let config = SolverConfig {
        timeout_seconds: Some(0),
        ..SolverConfig::default()
    };
    let solver = SpectrumSolver::new(config, ResourceLimits::default())
        .with_selector(|_| SpectrumStrategy::SparseIterative);
    let h = spin_glass(4, 1);
    assert!(matches!(
        solver.get_spectrum(&h, 0.5, 2),
        Err(GapError::SolverTimeout { .. })
    ));
}

//! Gap command implementation.
//!
//! Scan a single generated instance for its minimum gap.

use anyhow::Result;
use console::style;
use serde::Serialize;

use gapscan_core::{
    EngineConfig, GapSample, GapScanner, ProblemKind, StateMetrics, StateSample, Sweep,
};

use super::common::{OutputFormat, heading, print_json};

#[derive(Serialize)]
struct GapReport {
    problem: String,
    n: usize,
    seed: u64,
    strategy: String,
    num_points: usize,
    critical_s: f64,
    min_gap: f64,
    ground_energy: f64,
    classical_energy: f64,
    ipr: f64,
    entropy: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    gap_profile: Option<Vec<GapSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_profile: Option<Vec<StateSample>>,
}

/// Execute the gap command.
pub fn execute(
    config: &EngineConfig,
    kind: ProblemKind,
    n: usize,
    seed: u64,
    points: Option<usize>,
    profile: bool,
    format: OutputFormat,
) -> Result<()> {
    let num_points = points.unwrap_or(config.scan.num_points);
    let sweep = Sweep::new(kind, vec![n], vec![seed], config)?;
    let hamiltonian = sweep.build_hamiltonian(n, seed)?;
    let scanner = GapScanner::from_config(config);
    let strategy = scanner.solver().strategy_for(n);

    if format == OutputFormat::Table {
        heading(&format!(
            "Scanning {} instance, N = {}, seed {} ({} solver, {} points)",
            style(kind).green(),
            n,
            seed,
            style(strategy).yellow(),
            num_points
        ));
    }

    let record = scanner.find_minimum_gap(&hamiltonian, num_points)?;
    let metrics = StateMetrics::of(&record.ground_state);
    let (gap_profile, state_profile) = if profile {
        (
            Some(scanner.gap_profile(&hamiltonian, num_points)?),
            Some(scanner.state_profile(&hamiltonian, num_points)?),
        )
    } else {
        (None, None)
    };

    let report = GapReport {
        problem: kind.to_string(),
        n,
        seed,
        strategy: strategy.to_string(),
        num_points,
        critical_s: record.critical_s,
        min_gap: record.min_gap,
        ground_energy: record.ground_energy,
        classical_energy: hamiltonian.classical_ground_energy(),
        ipr: metrics.ipr,
        entropy: metrics.entropy,
        gap_profile,
        state_profile,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_table(&report),
    }

    Ok(())
}

fn print_table(report: &GapReport) {
    println!("{} Minimum gap on the grid", style("✓").green().bold());
    println!("  min gap:          {}", style(format!("{:.6e}", report.min_gap)).yellow());
    println!("  critical s:       {:.4}", report.critical_s);
    println!("  E0 at s*:         {:+.6}", report.ground_energy);
    println!("  classical E0:     {:+.6}", report.classical_energy);
    println!("  IPR at s*:        {:.4}", report.ipr);
    println!("  entropy at s*:    {:.4} bits", report.entropy);

    if let (Some(gaps), Some(states)) = (&report.gap_profile, &report.state_profile) {
        println!();
        println!(
            "  {:>8}  {:>12}  {:>12}  {:>12}  {:>8}  {:>8}",
            "s", "E0", "E1", "gap", "entropy", "IPR"
        );
        for (g, st) in gaps.iter().zip(states) {
            println!(
                "  {:>8.4}  {:>+12.6}  {:>+12.6}  {:>12.4e}  {:>8.4}  {:>8.4}",
                g.s, g.ground_energy, g.first_excited_energy, g.gap, st.entropy, st.ipr
            );
        }
    }
}

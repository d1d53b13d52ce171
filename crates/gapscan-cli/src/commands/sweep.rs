//! Sweep command implementation.
//!
//! Run every (N, seed) trial, average per N and fit scaling trends.

use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use gapscan_core::scaling::{
    classify_trend, fit_exponential, fit_linear, rem_ground_energy_per_spin, series,
};
use gapscan_core::{
    DriverCache, EngineConfig, ProblemKind, SizeAggregate, Sweep, TrendFit, TrialRecord,
    aggregate_by_n,
};

use super::common::{OutputFormat, heading, print_fit, print_json};

#[derive(Serialize)]
struct Fits {
    min_gap: Option<TrendFit>,
    classical_energy: Option<TrendFit>,
    ipr: Option<TrendFit>,
    entropy: Option<TrendFit>,
    rem_energy_per_spin: f64,
}

#[derive(Serialize)]
struct SweepReport {
    problem: String,
    num_points: usize,
    trials: Vec<TrialRecord>,
    by_n: Vec<SizeAggregate>,
    fits: Fits,
}

/// Execute the sweep command.
pub fn execute(
    config: &EngineConfig,
    kind: ProblemKind,
    sizes: RangeInclusive<usize>,
    seeds: Range<u64>,
    points: Option<usize>,
    driver_cache: bool,
    format: OutputFormat,
) -> Result<()> {
    let num_points = points.unwrap_or(config.scan.num_points);
    let mut sweep = Sweep::new(kind, sizes.collect(), seeds.collect(), config)?
        .with_num_points(num_points);
    if driver_cache {
        sweep = sweep.with_driver_cache(Arc::new(DriverCache::new()));
    }
    let total = sweep.trials().len();

    if format == OutputFormat::Table {
        heading(&format!(
            "Sweeping {} over {} trials ({} points each)",
            style(kind).green(),
            total,
            num_points
        ));
    }

    let progress = match format {
        OutputFormat::Table => ProgressBar::new(total as u64),
        OutputFormat::Json => ProgressBar::hidden(),
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} trials ({elapsed})")?
            .progress_chars("=> "),
    );
    let trials = sweep.run_with(|_| progress.inc(1));
    progress.finish_and_clear();
    let trials = trials?;

    let by_n = aggregate_by_n(&trials);
    let fits = Fits {
        min_gap: classify_trend(&series(&by_n, |a| a.mean_min_gap)).ok(),
        classical_energy: fit_linear(&series(&by_n, |a| a.mean_classical_energy)).ok(),
        ipr: fit_exponential(&series(&by_n, |a| a.mean_ipr)).ok(),
        entropy: fit_linear(&series(&by_n, |a| a.mean_entropy)).ok(),
        rem_energy_per_spin: rem_ground_energy_per_spin(),
    };

    let report = SweepReport {
        problem: kind.to_string(),
        num_points,
        trials,
        by_n,
        fits,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_table(&report),
    }

    Ok(())
}

fn print_table(report: &SweepReport) {
    println!(
        "{} {} trials complete",
        style("✓").green().bold(),
        report.trials.len()
    );
    println!();
    println!(
        "  {:>4}  {:>6}  {:>12}  {:>8}  {:>12}  {:>12}  {:>8}  {:>8}",
        "N", "trials", "min gap", "s*", "E0(s*)", "classical", "IPR", "entropy"
    );
    for a in &report.by_n {
        println!(
            "  {:>4}  {:>6}  {:>12.4e}  {:>8.4}  {:>+12.5}  {:>+12.5}  {:>8.4}  {:>8.4}",
            a.n,
            a.trials,
            a.mean_min_gap,
            a.mean_critical_s,
            a.mean_ground_energy,
            a.mean_classical_energy,
            a.mean_ipr,
            a.mean_entropy
        );
    }

    println!();
    println!("{} Scaling fits", style("→").cyan().bold());
    let fits = &report.fits;
    print_fit("min gap", fits.min_gap.as_ref());
    print_fit("classical energy", fits.classical_energy.as_ref());
    print_fit("IPR", fits.ipr.as_ref());
    print_fit("entropy", fits.entropy.as_ref());
    println!(
        "  {:<18} {:+.4} per spin",
        "REM prediction",
        fits.rem_energy_per_spin
    );
}

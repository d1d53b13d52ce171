//! REM command implementation.
//!
//! Sample one Random Energy Model landscape and summarise it against the
//! Gaussian moments and the thermodynamic ground-state energy.

use anyhow::Result;
use console::style;
use serde::Serialize;

use gapscan_core::scaling::rem_ground_energy_per_spin;
use gapscan_core::{EngineConfig, InstanceGenerator};

use super::common::{OutputFormat, heading, print_json};

#[derive(Serialize)]
struct RemReport {
    n: usize,
    seed: u64,
    samples: usize,
    mean: f64,
    variance: f64,
    expected_variance: f64,
    min_energy: f64,
    min_energy_per_spin: f64,
    predicted_per_spin: f64,
}

/// Execute the rem command.
pub fn execute(config: &EngineConfig, n: usize, seed: u64, format: OutputFormat) -> Result<()> {
    let energies = InstanceGenerator::new(config.limits).rem_energies(n, seed)?;

    let count = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / count;
    let variance = if energies.len() > 1 {
        energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / (count - 1.0)
    } else {
        0.0
    };
    let min_energy = energies.iter().copied().fold(f64::INFINITY, f64::min);

    let report = RemReport {
        n,
        seed,
        samples: energies.len(),
        mean,
        variance,
        expected_variance: n as f64 / 2.0,
        min_energy,
        min_energy_per_spin: min_energy / n as f64,
        predicted_per_spin: rem_ground_energy_per_spin(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            heading(&format!("REM landscape, N = {n}, seed {seed}"));
            println!("  samples:          {}", report.samples);
            println!("  mean:             {:+.4}", report.mean);
            println!(
                "  variance:         {:.4} (expected {:.4})",
                report.variance, report.expected_variance
            );
            println!("  min energy:       {:+.4}", report.min_energy);
            println!(
                "  per spin:         {} (N → ∞: {:+.4})",
                style(format!("{:+.4}", report.min_energy_per_spin)).yellow(),
                report.predicted_per_spin
            );
        }
    }

    Ok(())
}

//! Shared helpers for CLI commands.

use anyhow::{Context, Result};
use clap::ValueEnum;
use console::style;
use serde::Serialize;

use gapscan_core::ProblemKind;
use gapscan_core::scaling::TrendFit;

/// Problem family as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProblemArg {
    /// Sherrington–Kirkpatrick spin glass
    SpinGlass,
    /// Random 3-SAT encoded as a pairwise Ising penalty
    #[value(name = "3sat")]
    ThreeSat,
    /// Random Energy Model
    Rem,
}

impl ProblemArg {
    /// Resolve to a library problem kind; `ratio` only matters for 3-SAT.
    pub fn into_kind(self, ratio: f64) -> ProblemKind {
        match self {
            Self::SpinGlass => ProblemKind::SpinGlass,
            Self::ThreeSat => ProblemKind::ThreeSat { ratio },
            Self::Rem => ProblemKind::RandomEnergy,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

/// Print a section heading.
pub fn heading(text: &str) {
    println!("{} {}", style("→").cyan().bold(), text);
}

/// One line describing a fit, or why there is none.
pub fn print_fit(label: &str, fit: Option<&TrendFit>) {
    match fit {
        Some(fit) => println!(
            "  {:<18} {:?}: slope {:>+10.4}, intercept {:>+10.4}, R² {}",
            label,
            fit.kind,
            fit.slope,
            fit.intercept,
            style(format!("{:.4}", fit.r_squared)).yellow()
        ),
        None => println!("  {:<18} {}", label, style("n/a").dim()),
    }
}

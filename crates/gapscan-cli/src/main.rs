//! gapscan Command-Line Interface
//!
//! Thin driver over `gapscan-core`: single-instance gap scans, scaling
//! sweeps over N and seeds, and Random Energy Model sampling. Results go to
//! stdout as a table or as JSON; nothing is written to disk.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use gapscan_core::EngineConfig;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{OutputFormat, ProblemArg};
use commands::{gap, rem, sweep};

/// gapscan - adiabatic spectral-gap scans by exact diagonalisation
#[derive(Parser)]
#[command(name = "gapscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "GAPSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one instance for its minimum gap
    Gap {
        /// Problem family
        #[arg(short, long, value_enum, default_value = "spin-glass")]
        problem: ProblemArg,

        /// Number of qubits
        #[arg(short, long)]
        n: usize,

        /// Instance seed
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Clause-to-variable ratio (3-SAT only)
        #[arg(long, default_value = "4.27")]
        ratio: f64,

        /// Grid points on (0, 1); defaults to the configured value
        #[arg(long)]
        points: Option<usize>,

        /// Also print the per-point gap and ground-state profiles
        #[arg(long)]
        profile: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Sweep N and seeds, then fit scaling trends
    Sweep {
        /// Problem family
        #[arg(short, long, value_enum, default_value = "spin-glass")]
        problem: ProblemArg,

        /// Smallest N
        #[arg(long, default_value = "4")]
        min_n: usize,

        /// Largest N
        #[arg(long, default_value = "10")]
        max_n: usize,

        /// Seeds per N (seeds are first_seed..first_seed + seeds)
        #[arg(long, default_value = "10")]
        seeds: u64,

        /// First seed
        #[arg(long, default_value = "0")]
        first_seed: u64,

        /// Clause-to-variable ratio (3-SAT only)
        #[arg(long, default_value = "4.27")]
        ratio: f64,

        /// Grid points on (0, 1); defaults to the configured value
        #[arg(long)]
        points: Option<usize>,

        /// Share one driver Hamiltonian per N across trials
        #[arg(long)]
        driver_cache: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Sample a Random Energy Model landscape
    Rem {
        /// Number of spins
        #[arg(short, long)]
        n: usize,

        /// Sample seed
        #[arg(short, long, default_value = "7")]
        seed: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    init_logging(&config, cli.verbose);

    let result = match cli.command {
        Commands::Gap {
            problem,
            n,
            seed,
            ratio,
            points,
            profile,
            format,
        } => gap::execute(&config, problem.into_kind(ratio), n, seed, points, profile, format),

        Commands::Sweep {
            problem,
            min_n,
            max_n,
            seeds,
            first_seed,
            ratio,
            points,
            driver_cache,
            format,
        } => sweep::execute(
            &config,
            problem.into_kind(ratio),
            min_n..=max_n,
            first_seed..first_seed.saturating_add(seeds),
            points,
            driver_cache,
            format,
        ),

        Commands::Rem { n, seed, format } => rem::execute(&config, n, seed, format),
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

/// `-v` flags win over the configured level; `RUST_LOG` is not consulted.
fn init_logging(config: &EngineConfig, verbose: u8) {
    let filter = match verbose {
        0 => config.logging.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

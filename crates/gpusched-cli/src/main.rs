//! gpusched CLI
//!
//! Command-line interface for inspecting the decisions of the policy engine
//! on a job trace.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use gpusched_core::{LogFormat, Policy, SchedConfig};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// gpusched - scheduling policy engine for GPU cluster traces
#[derive(Parser, Debug)]
#[command(name = "gpusched")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Order a trace's jobs with a policy
    Order {
        /// Trace CSV file
        trace: PathBuf,

        /// Per-user duration profile CSV
        #[arg(long)]
        profiles: Option<PathBuf>,

        /// Policy name or id (defaults to the configured policy)
        #[arg(long)]
        policy: Option<Policy>,

        /// Run seed (overrides the configuration)
        #[arg(long)]
        seed: Option<u64>,

        /// Per-job GPU cap in percent (overrides the configuration)
        #[arg(long)]
        gpu_limit: Option<u32>,

        /// Per-job CPU cap in percent (overrides the configuration)
        #[arg(long)]
        cpu_limit: Option<u32>,

        /// Decision time used to compute waiting times
        #[arg(long)]
        now: Option<u64>,

        /// Show only the first N jobs
        #[arg(long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List available policies
    Policies,

    /// Show the effective configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration errors are the only fatal ones
    let mut config = match &cli.config {
        Some(path) => SchedConfig::from_file(path)
            .with_context(|| format!("Invalid configuration {}", path.display()))?,
        None => SchedConfig::default(),
    };

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        match config.logging.level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match config.logging.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
    };

    match cli.command {
        Commands::Order {
            trace,
            profiles,
            policy,
            seed,
            gpu_limit,
            cpu_limit,
            now,
            limit,
            json,
        } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(gpu_limit) = gpu_limit {
                config.cluster.gpu_limit = gpu_limit;
            }
            if let Some(cpu_limit) = cpu_limit {
                config.cluster.cpu_limit = cpu_limit;
            }
            commands::order(
                &config,
                commands::OrderArgs {
                    trace,
                    profiles,
                    policy,
                    now,
                    limit,
                    json,
                },
            )?;
        }
        Commands::Policies => {
            commands::policies()?;
        }
        Commands::Config => {
            commands::show_config(&config)?;
        }
    }

    Ok(())
}

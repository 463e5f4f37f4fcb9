//! Sharemesh simulation CLI
//!
//! Runs a sharechain gossip mesh for a fixed window and reports per-node
//! fork-choice statistics.

use anyhow::Context;
use clap::{Parser, Subcommand};
use sharemesh_sim::{harness, SimConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sharemesh-sim")]
#[command(version)]
#[command(about = "Sharechain gossip simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// TOML configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of nodes in the mesh
        #[arg(short, long)]
        nodes: Option<u32>,

        /// Mean link latency in seconds
        #[arg(long)]
        mean_latency: Option<f64>,

        /// Link latency variance
        #[arg(long)]
        latency_variance: Option<f64>,

        /// Mean share-generation interval in seconds
        #[arg(long)]
        gen_mean: Option<f64>,

        /// Share-generation variance
        #[arg(long)]
        gen_variance: Option<f64>,

        /// Cap on tips a new share references
        #[arg(long)]
        max_tips: Option<u32>,

        /// Simulation duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Master seed for the statistical models
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write per-node results to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the full summary as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false),
        )
        .init();
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    config: Option<PathBuf>,
    nodes: Option<u32>,
    mean_latency: Option<f64>,
    latency_variance: Option<f64>,
    gen_mean: Option<f64>,
    gen_variance: Option<f64>,
    max_tips: Option<u32>,
    duration: Option<f64>,
    seed: Option<u64>,
) -> anyhow::Result<SimConfig> {
    let mut sim_config = match config {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => SimConfig::default(),
    };

    if let Some(nodes) = nodes {
        sim_config.num_nodes = nodes;
    }
    if let Some(mean_latency) = mean_latency {
        sim_config.mean_latency = mean_latency;
    }
    if let Some(latency_variance) = latency_variance {
        sim_config.latency_variance = latency_variance;
    }
    if let Some(gen_mean) = gen_mean {
        sim_config.share_gen_mean = gen_mean;
    }
    if let Some(gen_variance) = gen_variance {
        sim_config.share_gen_variance = gen_variance;
    }
    if let Some(max_tips) = max_tips {
        sim_config.max_tips_to_reference = max_tips;
    }
    if let Some(duration) = duration {
        sim_config.duration_secs = duration;
    }
    if let Some(seed) = seed {
        sim_config.seed = seed;
    }
    Ok(sim_config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            nodes,
            mean_latency,
            latency_variance,
            gen_mean,
            gen_variance,
            max_tips,
            duration,
            seed,
            csv,
            json,
        } => {
            let sim_config = build_config(
                config,
                nodes,
                mean_latency,
                latency_variance,
                gen_mean,
                gen_variance,
                max_tips,
                duration,
                seed,
            )?;

            info!(
                nodes = sim_config.num_nodes,
                mean_latency = sim_config.mean_latency,
                gen_mean = sim_config.share_gen_mean,
                max_tips = sim_config.max_tips_to_reference,
                duration = sim_config.duration_secs,
                "simulation parameters"
            );

            let summary = harness::run(&sim_config).await;
            summary.print_console();

            if let Some(path) = csv {
                summary
                    .write_csv(&path)
                    .with_context(|| format!("writing CSV to {}", path.display()))?;
                info!(path = %path.display(), "CSV report written");
            }
            if let Some(path) = json {
                summary
                    .write_json(&path)
                    .with_context(|| format!("writing JSON to {}", path.display()))?;
                info!(path = %path.display(), "JSON summary written");
            }
        }
    }

    Ok(())
}

//! Sonomap CLI - synthesize microphone-array recordings and map sources.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sonomap")]
#[command(author, version, about = "Acoustic source mapping with microphone arrays", long_about = None)]
struct Cli {
    /// Log debug output (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads for spectral estimation and beamforming (default: all cores)
    #[arg(long, global = true, value_name = "N")]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a scene into a multichannel recording
    Synth(commands::synth::SynthArgs),

    /// Map sources in a stored recording
    Beamform(commands::beamform::BeamformArgs),

    /// Synthesize and map a scene in one pass
    Run(commands::run::RunArgs),

    /// Show recording metadata
    Info(commands::info::InfoArgs),

    /// Show or export a microphone geometry
    Geometry(commands::geometry::GeometryArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
        tracing::debug!(threads, "configured worker pool");
    }

    match cli.command {
        Commands::Synth(args) => commands::synth::run(args),
        Commands::Beamform(args) => commands::beamform::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Geometry(args) => commands::geometry::run(args),
    }
}

//! FrameForge CLI - diagnostics for the compute scheduler and LOD manager.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use frameforge::logging::init_logging;

use commands::benchmark::BenchmarkArgs;
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "frameforge", version, about = "Per-frame compute routing and LOD diagnostics")]
struct Cli {
    /// Config file (default: <config dir>/frameforge/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `frameforge=trace` (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show which compute backends are usable on this machine
    Capabilities,

    /// Time a synthetic particle field on every available backend
    Benchmark(BenchmarkArgs),

    /// Drive the scheduler, quality controller and LOD manager over synthetic frames
    Simulate(SimulateArgs),

    /// View or change configuration settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();

    // Config management must work even when the file does not parse
    let command = match cli.command {
        Commands::Config(command) => return commands::config::run(command, cli.config.as_deref()),
        other => other,
    };

    let config = commands::common::load_config(cli.config.as_deref())?;
    let mut logging = config.logging.clone();
    if let Some(level) = cli.log_level {
        logging.filter = level;
    }
    let _guard = init_logging(&logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async move {
        match command {
            Commands::Capabilities => commands::capabilities::run(&config),
            Commands::Benchmark(args) => commands::benchmark::run(args, &config).await,
            Commands::Simulate(args) => commands::simulate::run(args, &config).await,
            Commands::Config(_) => unreachable!("handled before runtime start"),
        }
    })
}

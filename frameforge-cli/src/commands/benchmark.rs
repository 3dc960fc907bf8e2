//! Benchmark command - time every available backend on the same payload.

use clap::Args;
use frameforge::config::ConfigFile;

use super::common::{build_scheduler, spinner};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct BenchmarkArgs {
    /// Particles in the synthetic payload
    #[arg(long, default_value_t = 100_000)]
    pub elements: usize,
}

pub async fn run(args: BenchmarkArgs, config: &ConfigFile) -> Result<(), CliError> {
    let scheduler = build_scheduler(config)?;
    println!("Capabilities: {}", scheduler.capabilities());
    println!();

    let progress = spinner(format!("Benchmarking {} particles", args.elements));
    let report = scheduler.benchmark(args.elements).await;
    progress.finish_and_clear();

    println!("{}", report);
    scheduler.shutdown();
    Ok(())
}

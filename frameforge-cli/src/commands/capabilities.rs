//! Capabilities command - report usable backends.

use frameforge::compute::BackendKind;
use frameforge::config::ConfigFile;

use super::common::build_scheduler;
use crate::error::CliError;

pub fn run(config: &ConfigFile) -> Result<(), CliError> {
    let scheduler = build_scheduler(config)?;
    let caps = scheduler.capabilities();
    let registered = scheduler.backends();

    println!("FrameForge v{}", frameforge::VERSION);
    println!("==================");
    println!();
    println!("Capabilities: {}", caps);
    println!();

    for kind in BackendKind::ALL {
        let status = match (registered.contains(&kind), caps.supports(kind)) {
            (true, true) => "ready",
            (true, false) => "registered, not usable",
            (false, _) => "not registered",
        };
        println!("  {:<8} {}", kind.as_str(), status);
    }

    let t = &config.scheduler.thresholds;
    println!();
    println!("Selection thresholds (elements):");
    println!("  high priority -> gpu     > {}", t.gpu_high_priority);
    println!("  high priority -> native  > {}", t.native_high_priority);
    println!("  any           -> gpu     > {}", t.large);
    println!("  any           -> native  > {}", t.medium);
    println!("  any           -> worker  > {}", t.small);

    scheduler.shutdown();
    Ok(())
}

//! Common types and helpers shared across CLI commands.

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use frameforge::compute::{AnimationMode, ComputeScheduler, Priority};
use frameforge::config::ConfigFile;
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::CliError;

/// Animation mode selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ModeArg {
    /// Small sinusoidal wander around each position
    Drift,
    /// Rotate around the vertical axis, faster for brighter particles
    Galaxy,
    /// Vertical sine wave travelling through the field
    Wave,
    /// Uniform rotation with a vertical bob
    Spiral,
}

impl From<ModeArg> for AnimationMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Drift => AnimationMode::Drift,
            ModeArg::Galaxy => AnimationMode::Galaxy,
            ModeArg::Wave => AnimationMode::Wave,
            ModeArg::Spiral => AnimationMode::Spiral,
        }
    }
}

/// Task priority selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum PriorityArg {
    High,
    Normal,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(priority: PriorityArg) -> Self {
        match priority {
            PriorityArg::High => Priority::High,
            PriorityArg::Normal => Priority::Normal,
            PriorityArg::Low => Priority::Low,
        }
    }
}

/// Load the config file: an explicit path must exist, the default may not.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let config = match path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    Ok(config)
}

/// Scheduler with the built-in backends, configured from `config`.
pub fn build_scheduler(config: &ConfigFile) -> Result<ComputeScheduler, CliError> {
    Ok(ComputeScheduler::with_default_backends(
        config.scheduler.clone(),
    )?)
}

/// Spinner for work of unknown length.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Progress bar over `len` steps.
pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40} {pos}/{len} frames [{elapsed_precise}] {msg}")
    {
        bar.set_style(style);
    }
    bar
}

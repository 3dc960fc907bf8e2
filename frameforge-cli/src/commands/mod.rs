//! CLI subcommands.

pub mod benchmark;
pub mod capabilities;
pub mod common;
pub mod config;
pub mod simulate;

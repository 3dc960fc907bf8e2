//! Backend benchmark and synthetic particle fields.

use std::f32::consts::TAU;
use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::BackendError;
use super::policy::BackendKind;
use super::task::PARTICLE_STRIDE;

/// Seed used by the benchmark so every run measures the same payload.
pub const BENCHMARK_SEED: u64 = 0x5EED_F0E6;

/// Generate `count` particles laid out on a flat disc.
///
/// Deterministic for a given seed.
pub fn synthetic_particles(count: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut payload = Vec::with_capacity(count * PARTICLE_STRIDE);

    for id in 0..count {
        let radius: f32 = rng.random_range(1.0..50.0);
        let angle: f32 = rng.random_range(0.0..TAU);
        let height: f32 = rng.random_range(-2.0..2.0);

        payload.extend_from_slice(&[
            radius * angle.cos(),
            height,
            radius * angle.sin(),
            0.0,
            0.0,
            0.0,
            rng.random_range(0.0..TAU),
            rng.random_range(0.2..1.0),
            rng.random_range(0..4u32) as f32,
            id as f32,
        ]);
    }

    payload
}

/// One backend's benchmark run.
#[derive(Debug, Clone)]
pub struct BenchmarkEntry {
    pub backend: BackendKind,
    pub outcome: Result<Duration, BackendError>,
}

impl BenchmarkEntry {
    /// Elements per second, if the run succeeded.
    pub fn throughput(&self, elements: usize) -> Option<f64> {
        let elapsed = self.outcome.as_ref().ok()?;
        let secs = elapsed.as_secs_f64();
        (secs > 0.0).then(|| elements as f64 / secs)
    }
}

/// Comparative timings across backends.
#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub elements: usize,
    /// One entry per available backend, fastest-tier first.
    pub entries: Vec<BenchmarkEntry>,
}

impl BenchmarkReport {
    /// The backend with the shortest successful run.
    pub fn fastest(&self) -> Option<(BackendKind, Duration)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.as_ref().ok().map(|d| (e.backend, *d)))
            .min_by_key(|(_, d)| *d)
    }

    pub fn get(&self, backend: BackendKind) -> Option<&BenchmarkEntry> {
        self.entries.iter().find(|e| e.backend == backend)
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Benchmark: {} elements", self.elements)?;
        for entry in &self.entries {
            match &entry.outcome {
                Ok(elapsed) => writeln!(
                    f,
                    "  {:<8} {:>10.3} ms  {:>14.0} elem/s",
                    entry.backend.as_str(),
                    elapsed.as_secs_f64() * 1000.0,
                    entry.throughput(self.elements).unwrap_or(0.0)
                )?,
                Err(e) => writeln!(f, "  {:<8} failed: {}", entry.backend.as_str(), e)?,
            }
        }
        if let Some((backend, _)) = self.fastest() {
            write!(f, "Fastest: {}", backend)?;
        }
        Ok(())
    }
}

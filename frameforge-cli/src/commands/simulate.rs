//! Simulate command - run the whole pipeline over a synthetic particle field.
//!
//! Each frame submits the current particle state to the scheduler, feeds the
//! transformed positions to the LOD manager, and applies any workload
//! advisory from the quality controller by shrinking or growing the field.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use frameforge::compute::{
    synthetic_particles, AnimationMode, ComputeError, ComputeTask, Priority, TaskParams,
    BENCHMARK_SEED, PARTICLE_STRIDE,
};
use frameforge::config::ConfigFile;
use frameforge::lod::{EntityId, LodManager, Vec3};
use frameforge::quality::QualityController;
use frameforge::world::positions_from_payload;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::{build_scheduler, progress_bar, ModeArg, PriorityArg};
use crate::error::CliError;

/// Advisories never shrink the field below this.
const MIN_PARTICLES: usize = 1_000;

/// Advisories never grow the field above this.
const MAX_PARTICLES: usize = 1_000_000;

const CAMERA_ORBIT_RADIUS: f32 = 60.0;
const CAMERA_HEIGHT: f32 = 5.0;

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Initial particle count
    #[arg(long, default_value_t = 50_000)]
    pub particles: usize,

    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    pub frames: u64,

    /// Target frame rate for the quality controller (overrides config)
    #[arg(long)]
    pub target_fps: Option<f64>,

    /// Animation applied to the particles
    #[arg(long, value_enum, default_value_t = ModeArg::Galaxy)]
    pub mode: ModeArg,

    /// Priority of every frame task
    #[arg(long, value_enum, default_value_t = PriorityArg::Normal)]
    pub priority: PriorityArg,

    /// Wait for each frame slot instead of running flat out
    #[arg(long)]
    pub paced: bool,
}

pub async fn run(args: SimulateArgs, config: &ConfigFile) -> Result<(), CliError> {
    let scheduler = build_scheduler(config)?;

    let mut quality_config = config.quality.clone();
    if let Some(fps) = args.target_fps {
        quality_config = quality_config.with_target_fps(fps);
    }
    let target_fps = quality_config.target_fps;
    let controller = Arc::new(QualityController::new(
        scheduler.metrics_handle(),
        quality_config,
    )?);
    let mut advisories = controller.subscribe();
    let lod = LodManager::new(config.lod.clone());

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.cancel())
            .map_err(|e| CliError::Signal(e.to_string()))?;
    }

    let controller_task = {
        let controller = Arc::clone(&controller);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { controller.run(shutdown).await })
    };

    let mode = AnimationMode::from(args.mode);
    let priority = Priority::from(args.priority);
    let initial = args.particles.clamp(MIN_PARTICLES, MAX_PARTICLES);
    let frame_time = Duration::from_secs_f64(1.0 / target_fps);

    println!("FrameForge Simulation v{}", frameforge::VERSION);
    println!("=========================");
    println!();
    println!("Capabilities: {}", scheduler.capabilities());
    println!("Particles:    {}", initial);
    println!("Frames:       {} ({} mode, {} priority)", args.frames, mode, priority);
    println!("Target:       {:.0} FPS", target_fps);
    println!();
    println!("Press Ctrl+C to stop early");
    println!();

    info!(particles = initial, frames = args.frames, %mode, "Simulation started");

    let mut particles = synthetic_particles(initial, BENCHMARK_SEED);
    let mut pacer = tokio::time::interval(frame_time);
    pacer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let bar = progress_bar(args.frames);
    let started = Instant::now();
    let mut elapsed = 0.0f32;
    let mut frames_run = 0u64;
    let mut failed = 0u64;
    let mut applied = 0u64;

    for frame in 0..args.frames {
        if args.paced {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = pacer.tick() => {}
            }
        } else if shutdown.is_cancelled() {
            break;
        }

        elapsed += frame_time.as_secs_f32();
        let count = particles.len() / PARTICLE_STRIDE;
        let params = TaskParams::default()
            .with_delta_time(frame_time.as_secs_f32())
            .with_elapsed(elapsed)
            .with_mode(mode)
            .with_priority(priority);

        let handle = scheduler.submit(ComputeTask::new(particles.clone(), params))?;
        match handle.await {
            Ok(result) => {
                bar.set_message(format!(
                    "{} particles on {} ({:.1} ms)",
                    count,
                    result.backend,
                    result.processing_time.as_secs_f64() * 1000.0
                ));
                lod.optimize_for_performance(result.processing_time);
                particles = result.output;
            }
            Err(e) => {
                failed += 1;
                warn!(frame, error = %e, "Frame task failed");
            }
        }

        let positions = positions_from_payload(&particles, PARTICLE_STRIDE, "particle")
            .map_err(ComputeError::from)?;
        lod.sync_positions(&positions);
        lod.set_camera_position(camera_at(elapsed));
        lod.tick();

        while let Ok(advisory) = advisories.try_recv() {
            let current = particles.len() / PARTICLE_STRIDE;
            let target = ((current as f64) * advisory.scale()).round() as usize;
            let target = target.clamp(MIN_PARTICLES, MAX_PARTICLES);
            if target != current {
                resize_field(&mut particles, target, frame, &lod);
                applied += 1;
                info!(from = current, to = target, advisory = %advisory, "Particle count adjusted");
            }
        }

        frames_run += 1;
        bar.inc(1);
    }

    bar.finish_and_clear();
    let interrupted = shutdown.is_cancelled();
    shutdown.cancel();
    if let Err(e) = controller_task.await {
        warn!(error = %e, "Quality controller task ended abnormally");
    }
    scheduler.shutdown();

    let wall = started.elapsed().as_secs_f64();
    let stats = lod.stats();

    if interrupted {
        println!("Interrupted.");
        println!();
    }
    println!("Simulation Summary");
    println!("──────────────────");
    println!("  Frames:      {}/{} ({} failed)", frames_run, args.frames, failed);
    println!(
        "  Wall time:   {:.2}s ({:.1} frames/s)",
        wall,
        if wall > 0.0 { frames_run as f64 / wall } else { 0.0 }
    );
    println!(
        "  Particles:   {} -> {}",
        initial,
        particles.len() / PARTICLE_STRIDE
    );
    println!(
        "  Advisories:  {} emitted, {} applied",
        controller.advisories_emitted(),
        applied
    );
    println!("  Metrics:     {}", scheduler.metrics_summary());
    println!("  LOD:         {}", stats);
    println!("  LOD interval {} ms", lod.update_interval().as_millis());

    let distribution = lod.distribution();
    let culled_level = lod.config().culled_level();
    for (level, count) in &distribution {
        let label = if *level == culled_level {
            "culled".to_string()
        } else {
            format!("level {}", level)
        };
        println!("    {:<8} {}", label, count);
    }

    let suggestions = lod.optimization_suggestions();
    if !suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for suggestion in suggestions {
            println!("  - {}", suggestion);
        }
    }

    Ok(())
}

/// Camera orbiting the field centre.
fn camera_at(elapsed: f32) -> Vec3 {
    let angle = (elapsed * 0.2) % TAU;
    Vec3::new(
        CAMERA_ORBIT_RADIUS * angle.cos(),
        CAMERA_HEIGHT,
        CAMERA_ORBIT_RADIUS * angle.sin(),
    )
}

/// Grow or shrink the field to `target` particles.
///
/// Particle ids stay equal to their index, so shrinking untracks the ids
/// that were cut off.
fn resize_field(particles: &mut Vec<f32>, target: usize, seed: u64, lod: &LodManager) {
    let current = particles.len() / PARTICLE_STRIDE;

    if target < current {
        particles.truncate(target * PARTICLE_STRIDE);
        for id in target..current {
            lod.untrack(EntityId(id as u64));
        }
        return;
    }

    let mut extra = synthetic_particles(target - current, seed);
    for (i, p) in extra.chunks_exact_mut(PARTICLE_STRIDE).enumerate() {
        p[PARTICLE_STRIDE - 1] = (current + i) as f32;
    }
    particles.extend_from_slice(&extra);
}

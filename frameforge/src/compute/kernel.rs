//! Reference particle transform.
//!
//! Every CPU-side backend runs this code, so the CPU, native and worker-pool
//! paths produce bit-identical output for the same input. Elements are
//! addressed by their global index in the task payload, which keeps the
//! result independent of how a backend chunks the work.
//!
//! Each particle is advanced to the animation pose at time
//! `elapsed + index * 0.001` and its velocity is set to the displacement
//! divided by the frame delta. Phase, intensity, type, id and any trailing
//! values pass through unchanged.

use super::task::{AnimationMode, TaskParams, PARTICLE_STRIDE};

/// Smallest delta used when deriving velocities.
pub const MIN_DELTA_TIME: f32 = 1.0e-4;

/// Per-particle time offset, de-synchronises neighbouring particles.
pub const PARTICLE_TIME_OFFSET: f32 = 0.001;

/// Below this distance from the Y axis, rotation modes leave a particle alone.
const MIN_ROTATION_RADIUS: f32 = 0.001;

/// Transform a whole payload, returning a new buffer.
pub fn transform(payload: &[f32], params: &TaskParams, stride: usize) -> Vec<f32> {
    let mut output = payload.to_vec();
    transform_in_place(&mut output, 0, params, stride);
    output
}

/// Transform a contiguous run of elements in place.
///
/// `first_index` is the global index of the first element in `chunk`.
/// A trailing partial element is left untouched.
pub fn transform_in_place(chunk: &mut [f32], first_index: usize, params: &TaskParams, stride: usize) {
    if stride < PARTICLE_STRIDE {
        return;
    }
    for (offset, particle) in chunk.chunks_exact_mut(stride).enumerate() {
        transform_particle(particle, first_index + offset, params);
    }
}

fn transform_particle(p: &mut [f32], index: usize, params: &TaskParams) {
    let (x, y, z) = (p[0], p[1], p[2]);
    let phase = p[6];
    let intensity = p[7];
    let ptype = p[8];

    let t = params.elapsed + index as f32 * PARTICLE_TIME_OFFSET;
    let dt = params.delta_time.max(MIN_DELTA_TIME);

    match params.mode {
        AnimationMode::Galaxy => {
            if radius(x, z) > MIN_ROTATION_RADIUS {
                let spiral = 1.0 + intensity * 0.5;
                let (nx, nz) = rotate_y(x, z, t * 0.1 * spiral);
                let ny = y + (t * 2.0 + phase).sin() * 0.1 * intensity;
                p[0] = nx;
                p[1] = ny;
                p[2] = nz;
                p[3] = (nx - x) / dt;
                p[5] = (nz - z) / dt;
            }
        }
        AnimationMode::Wave => {
            let primary = (x * 2.0 + t * 5.0 + phase).sin() * 0.3;
            let secondary = (z * 1.5 + t * 3.0 + phase).sin() * 0.1;
            let ny = y + (primary + secondary) * intensity * (1.0 + ptype * 0.2);
            p[1] = ny;
            p[4] = (ny - y) / dt;
        }
        AnimationMode::Spiral => {
            if radius(x, z) > MIN_ROTATION_RADIUS {
                let (nx, nz) = rotate_y(x, z, t * 0.2);
                let ny = y + (t * 0.5 + phase).sin() * 0.2 * intensity;
                p[0] = nx;
                p[1] = ny;
                p[2] = nz;
                p[3] = (nx - x) / dt;
                p[4] = (ny - y) / dt;
                p[5] = (nz - z) / dt;
            }
        }
        AnimationMode::Drift => {
            let wander = (t * 0.1 + phase).sin() * 0.05;
            let nx = x + wander * intensity;
            let ny = y + (t + phase).sin() * 0.1 * intensity;
            let nz = z + wander * intensity;
            p[0] = nx;
            p[1] = ny;
            p[2] = nz;
            p[3] = (nx - x) / dt;
            p[4] = (ny - y) / dt;
            p[5] = (nz - z) / dt;
        }
    }
}

fn radius(x: f32, z: f32) -> f32 {
    (x * x + z * z).sqrt()
}

fn rotate_y(x: f32, z: f32, angle: f32) -> (f32, f32) {
    let (sin, cos) = angle.sin_cos();
    (x * cos - z * sin, x * sin + z * cos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(x: f32, y: f32, z: f32, intensity: f32) -> Vec<f32> {
        vec![x, y, z, 0.0, 0.0, 0.0, 0.25, intensity, 1.0, 42.0]
    }

    #[test]
    fn test_passthrough_fields_unchanged() {
        for mode in [
            AnimationMode::Drift,
            AnimationMode::Galaxy,
            AnimationMode::Wave,
            AnimationMode::Spiral,
        ] {
            let params = TaskParams::default().with_mode(mode).with_elapsed(3.0);
            let out = transform(&particle(1.0, 2.0, 3.0, 0.8), &params, PARTICLE_STRIDE);
            assert_eq!(&out[6..10], &[0.25, 0.8, 1.0, 42.0], "mode {}", mode);
        }
    }

    #[test]
    fn test_zero_intensity_drift_is_stationary() {
        let params = TaskParams::default().with_elapsed(10.0);
        let input = particle(1.0, 2.0, 3.0, 0.0);
        let out = transform(&input, &params, PARTICLE_STRIDE);
        assert_eq!(&out[0..3], &input[0..3]);
        assert_eq!(&out[3..6], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_galaxy_preserves_radius() {
        let params = TaskParams::default()
            .with_mode(AnimationMode::Galaxy)
            .with_elapsed(7.5);
        let out = transform(&particle(3.0, 0.0, 4.0, 1.0), &params, PARTICLE_STRIDE);
        let r = (out[0] * out[0] + out[2] * out[2]).sqrt();
        assert!((r - 5.0).abs() < 1e-4, "radius drifted to {}", r);
    }

    #[test]
    fn test_rotation_skips_particles_on_axis() {
        let params = TaskParams::default()
            .with_mode(AnimationMode::Spiral)
            .with_elapsed(2.0);
        let input = particle(0.0, 1.0, 0.0, 1.0);
        let out = transform(&input, &params, PARTICLE_STRIDE);
        assert_eq!(out, input);
    }

    #[test]
    fn test_wave_only_moves_vertically() {
        let params = TaskParams::default()
            .with_mode(AnimationMode::Wave)
            .with_elapsed(1.0);
        let out = transform(&particle(1.0, 2.0, 3.0, 1.0), &params, PARTICLE_STRIDE);
        assert_eq!(out[0], 1.0);
        assert_eq!(out[2], 3.0);
        assert_eq!(out[3], 0.0);
        assert_eq!(out[5], 0.0);
    }

    #[test]
    fn test_velocity_uses_delta_time() {
        let params = TaskParams::default()
            .with_elapsed(1.0)
            .with_delta_time(0.5);
        let input = particle(1.0, 2.0, 3.0, 1.0);
        let out = transform(&input, &params, PARTICLE_STRIDE);
        let expected_vy = (out[1] - input[1]) / 0.5;
        assert!((out[4] - expected_vy).abs() < 1e-6);
    }

    #[test]
    fn test_zero_delta_time_stays_finite() {
        let params = TaskParams::default()
            .with_elapsed(1.0)
            .with_delta_time(0.0);
        let out = transform(&particle(1.0, 2.0, 3.0, 1.0), &params, PARTICLE_STRIDE);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_chunked_matches_whole() {
        let params = TaskParams::default()
            .with_mode(AnimationMode::Wave)
            .with_elapsed(4.2);
        let input: Vec<f32> = (0..50)
            .flat_map(|i| particle(i as f32 * 0.1, 0.0, 1.0, 0.5))
            .collect();

        let whole = transform(&input, &params, PARTICLE_STRIDE);

        let mut chunked = input.clone();
        let split = 17 * PARTICLE_STRIDE;
        let (head, tail) = chunked.split_at_mut(split);
        transform_in_place(head, 0, &params, PARTICLE_STRIDE);
        transform_in_place(tail, 17, &params, PARTICLE_STRIDE);

        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_extra_stride_values_pass_through() {
        let params = TaskParams::default().with_elapsed(1.0);
        let mut input = particle(1.0, 2.0, 3.0, 1.0);
        input.extend_from_slice(&[9.0, 8.0]);
        let out = transform(&input, &params, 12);
        assert_eq!(&out[10..12], &[9.0, 8.0]);
    }
}

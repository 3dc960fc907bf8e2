//! GPU compute backend (wgpu).
//!
//! Runs the particle kernel as a WGSL compute shader, one invocation per
//! particle. Each call uploads the payload, dispatches, and reads the result
//! back through a staging buffer. Submission and readback block, so the whole
//! round trip runs on a blocking thread.
//!
//! The shader mirrors the CPU kernel's math but is not bit-identical to it:
//! GPU transcendental functions have their own precision.
//!
//! If the device is lost the backend marks itself unavailable and every
//! subsequent call fails with `DeviceLost`, which prompts the scheduler to
//! re-probe capabilities.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use wgpu::util::DeviceExt;

use crate::compute::backend::{BoxFuture, ComputeBackend};
use crate::compute::error::BackendError;
use crate::compute::policy::BackendKind;
use crate::compute::task::{TaskParams, PARTICLE_STRIDE};

const SHADER: &str = include_str!("particles.wgsl");

/// Must match `@workgroup_size` in the shader.
const WORKGROUP_SIZE: u32 = 256;

/// Per-dimension dispatch limit guaranteed by WebGPU.
const MAX_WORKGROUPS: u32 = 65_535;

struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
}

/// Particle kernel on the default high-performance adapter.
pub struct GpuBackend {
    ctx: Arc<GpuContext>,
    adapter_name: String,
    lost: Arc<AtomicBool>,
}

impl GpuBackend {
    /// Acquire an adapter and device and compile the kernel.
    ///
    /// Returns `Unavailable` if no adapter or device can be obtained.
    pub fn new() -> Result<Self, BackendError> {
        pollster::block_on(Self::init())
    }

    async fn init() -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .map_err(|e| {
                BackendError::unavailable(BackendKind::Gpu, format!("no GPU adapter: {}", e))
            })?;

        let adapter_name = adapter.get_info().name;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("frameforge_compute_device"),
                ..Default::default()
            })
            .await
            .map_err(|e| {
                BackendError::unavailable(BackendKind::Gpu, format!("device request failed: {}", e))
            })?;

        let lost = Arc::new(AtomicBool::new(false));
        {
            let lost = Arc::clone(&lost);
            device.set_device_lost_callback(move |reason, message| {
                lost.store(true, Ordering::SeqCst);
                warn!(?reason, message = %message, "GPU device lost");
            });
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("frameforge_particles"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("frameforge_particles_pipeline"),
            layout: None,
            module: &module,
            entry_point: Some("main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        let layout = pipeline.get_bind_group_layout(0);

        info!(adapter = %adapter_name, "GPU compute backend ready");

        Ok(Self {
            ctx: Arc::new(GpuContext {
                device,
                queue,
                pipeline,
                layout,
            }),
            adapter_name,
            lost,
        })
    }

    /// Name of the adapter in use.
    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("adapter", &self.adapter_name)
            .field("lost", &self.lost.load(Ordering::Relaxed))
            .finish()
    }
}

impl ComputeBackend for GpuBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gpu
    }

    fn is_available(&self) -> bool {
        !self.lost.load(Ordering::SeqCst)
    }

    fn units(&self) -> usize {
        1
    }

    fn execute(
        &self,
        payload: Arc<[f32]>,
        params: TaskParams,
        stride: usize,
    ) -> BoxFuture<'_, Result<Vec<f32>, BackendError>> {
        let ctx = Arc::clone(&self.ctx);
        let lost = Arc::clone(&self.lost);

        Box::pin(async move {
            if lost.load(Ordering::SeqCst) {
                return Err(BackendError::DeviceLost {
                    backend: BackendKind::Gpu,
                    reason: "device was lost earlier".to_string(),
                });
            }
            if stride != PARTICLE_STRIDE {
                return Err(BackendError::Unsupported {
                    backend: BackendKind::Gpu,
                    what: format!("stride {}", stride),
                });
            }

            let result = tokio::task::spawn_blocking(move || ctx.run(&payload, &params))
                .await
                .map_err(|e| {
                    BackendError::failed(BackendKind::Gpu, format!("GPU job aborted: {}", e))
                })?;

            if let Err(BackendError::DeviceLost { .. }) = &result {
                lost.store(true, Ordering::SeqCst);
            }
            result
        })
    }
}

impl GpuContext {
    fn run(&self, payload: &[f32], params: &TaskParams) -> Result<Vec<f32>, BackendError> {
        let count = (payload.len() / PARTICLE_STRIDE) as u32;
        let groups = count.div_ceil(WORKGROUP_SIZE);
        if groups > MAX_WORKGROUPS {
            return Err(BackendError::Unsupported {
                backend: BackendKind::Gpu,
                what: format!("{} particles in one dispatch", count),
            });
        }

        let bytes: &[u8] = bytemuck::cast_slice(payload);
        let size = bytes.len() as u64;
        let max_binding = self.device.limits().max_storage_buffer_binding_size as u64;
        if size > max_binding {
            return Err(BackendError::Unsupported {
                backend: BackendKind::Gpu,
                what: format!("{} byte buffers (limit {})", size, max_binding),
            });
        }

        let input = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frameforge_input"),
                contents: bytes,
                usage: wgpu::BufferUsages::STORAGE,
            });
        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frameforge_output"),
            size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frameforge_staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Layout matches `struct Params` in the shader
        let words: [u32; 4] = [
            params.elapsed.to_bits(),
            params.delta_time.to_bits(),
            params.mode.code(),
            count,
        ];
        let uniform = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("frameforge_params"),
                contents: bytemuck::cast_slice(&words),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frameforge_bind_group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frameforge_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("frameforge_particles_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&output, 0, &staging, 0, size);

        let submission = self.queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });

        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(submission),
                timeout: None,
            })
            .map_err(|e| BackendError::DeviceLost {
                backend: BackendKind::Gpu,
                reason: format!("device poll failed: {:?}", e),
            })?;

        rx.recv()
            .map_err(|_| BackendError::failed(BackendKind::Gpu, "readback callback dropped"))?
            .map_err(|e| BackendError::failed(BackendKind::Gpu, format!("readback failed: {:?}", e)))?;

        let result = {
            let mapped = slice.get_mapped_range();
            bytemuck::pod_collect_to_vec::<u8, f32>(&mapped)
        };
        staging.unmap();

        Ok(result)
    }
}

use super::{DeviceInit, GpuError, Result};

/// Owns the logical device and its single command queue.
///
/// This is the entry point of the crate:
/// - acquires Instance/Adapter/Device/Queue once
/// - creates buffers, shaders and pipelines (see the `resource` and `pipeline` modules)
/// - hands out command sessions and submits their buffers
/// - maps staging buffers for readback
///
/// The context is never mutated after acquisition; everything borrows it.
pub struct GpuContext {
    /// Kept alive for the lifetime of the adapter and device.
    _instance: wgpu::Instance,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// Logical device.
    device: wgpu::Device,

    /// Command queue. All submissions serialize through it.
    queue: wgpu::Queue,
}

impl GpuContext {
    /// Acquires a device, blocking the calling thread until negotiation finishes.
    ///
    /// Fails with [`GpuError::Unavailable`] when the platform exposes no adapter
    /// or device creation is refused. There is no retry: an `Unavailable` result
    /// stands for the rest of the process run.
    pub fn acquire(init: DeviceInit) -> Result<Self> {
        pollster::block_on(Self::acquire_async(init))
    }

    /// Asynchronous form of [`acquire`](Self::acquire).
    pub async fn acquire_async(init: DeviceInit) -> Result<Self> {
        let DeviceInit {
            backends,
            power_preference,
            force_fallback_adapter,
            required_features,
            required_limits,
            label,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: backends.with_env(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::from_env().unwrap_or(power_preference),
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .map_err(|e| GpuError::Unavailable(format!("no suitable GPU adapter: {e}")))?;

        let info = adapter.get_info();
        log::info!(
            "adapter: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some(label),
                required_features,
                required_limits: required_limits.using_resolution(adapter.limits()),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| GpuError::Unavailable(format!("device request refused: {e}")))?;

        Ok(Self {
            _instance: instance,
            adapter,
            device,
            queue,
        })
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Blocks until every submission so far has finished executing.
    pub fn wait_idle(&self) -> Result<()> {
        self.poll_wait(None)
    }

    pub(crate) fn poll_wait(&self, submission_index: Option<wgpu::SubmissionIndex>) -> Result<()> {
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index,
                timeout: None,
            })
            .map(|_| ())
            .map_err(|e| GpuError::map_failed("device", format!("device poll failed: {e}")))
    }
}

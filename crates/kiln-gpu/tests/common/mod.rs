use kiln_gpu::logging::{init_logging, LoggingConfig};
use kiln_gpu::{DeviceInit, GpuContext};

/// Acquires a device, or returns `None` on machines without one.
///
/// Tests return early on `None`, so the suite passes without a GPU.
pub fn acquire() -> Option<GpuContext> {
    init_logging(LoggingConfig::for_tests());

    match GpuContext::acquire(DeviceInit::default()) {
        Ok(ctx) => Some(ctx),
        Err(e) if e.is_unavailable() => {
            log::warn!("no GPU, skipping: {e}");
            None
        }
        Err(e) => panic!("unexpected acquisition error: {e}"),
    }
}

//! GPU-resident resources.
//!
//! Buffers carry their byte size and usage set for their whole lifetime; every
//! operation that touches a buffer checks the usage contract before wgpu sees it.

mod buffer;
mod target;
pub(crate) mod usage;

pub use buffer::GpuBuffer;
pub use target::RenderTarget;

//! GPU device management.
//!
//! - acquiring the adapter, logical device and queue once per process
//! - the single submission queue every command buffer goes through
//! - the error taxonomy shared by the rest of the crate

mod context;
mod error;
mod init;

pub use context::GpuContext;
pub use error::{GpuError, Result};
pub use init::DeviceInit;

//! Host readback of GPU-written data.
//!
//! A buffer goes through at most one map cycle at a time:
//! `map_for_read` → views → `unmap`. Views are checked against the cycle they
//! were created in, so a view that outlives its mapping fails instead of
//! reading released memory.

mod mapped;
mod state;

pub use mapped::{MappedBuffer, ReadView};
pub(crate) use state::MapCycle;

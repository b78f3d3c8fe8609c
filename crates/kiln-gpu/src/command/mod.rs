//! Command recording and submission.
//!
//! A [`CommandSession`] records passes and copies into one command buffer.
//! Passes borrow the session, so only one can be open at a time, and each is
//! closed explicitly with `end()` before the next pass or copy.

mod compute;
mod render;
mod session;
mod state;

pub use compute::ComputePass;
pub use render::{ColorAttachment, RenderPass};
pub use session::{CommandBuffer, CommandSession, CommandStats, Submission};

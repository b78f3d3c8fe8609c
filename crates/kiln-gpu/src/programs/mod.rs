//! Ready-made workloads built on the rest of the crate.
//!
//! - [`IndexTransform`]: compute pass, copy to staging, readback.
//! - [`Triangle`]: vertex-colored triangle drawn into a color attachment.

mod index_transform;
mod triangle;

pub use index_transform::{IndexTransform, IndexTransformConfig, IndexTransformOutput};
pub use triangle::{ColoredVertex, RenderedImage, Triangle, TriangleConfig, TRIANGLE};

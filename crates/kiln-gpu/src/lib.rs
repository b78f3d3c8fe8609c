//! Kiln GPU crate.
//!
//! A single-submission command layer over wgpu: device acquisition, buffers with
//! explicit usage contracts, compute/render pipeline construction, one-shot
//! command sessions and a readback path for host-visible results.
//!
//! Every size and offset in this API is expressed in bytes.

pub mod command;
pub mod device;
pub mod logging;
pub mod pipeline;
pub mod programs;
pub mod readback;
pub mod resource;

pub use command::{
    ColorAttachment, CommandBuffer, CommandSession, CommandStats, ComputePass, RenderPass,
    Submission,
};
pub use device::{DeviceInit, GpuContext, GpuError, Result};
pub use pipeline::{
    BindGroup, BindGroupLayout, BindingKind, BindingSlot, ComputePipeline, PipelineBuilder,
    RenderPipeline, RenderPipelineDesc, ShaderModule, VertexAttribute, VertexLayout,
};
pub use readback::{MappedBuffer, ReadView};
pub use resource::{GpuBuffer, RenderTarget};

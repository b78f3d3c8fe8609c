//! Shader compilation and pipeline linking.
//!
//! Conventions:
//! - shader source is WGSL, treated as an opaque artifact handed in by the caller
//! - entry points are reflected at compile time and checked against the
//!   workgroup size, vertex layouts and bind group layouts a pipeline is built with

mod binding;
mod builder;
mod compute;
mod render;
mod shader;
mod vertex;

pub use binding::{BindGroup, BindGroupLayout, BindingKind, BindingSlot};
pub use builder::PipelineBuilder;
pub use compute::{workgroup_count, ComputePipeline};
pub use render::{RenderPipeline, RenderPipelineDesc};
pub use shader::{EntryPoint, ResourceAccess, ResourceUse, ShaderModule, ShaderStage};
pub use vertex::{VertexAttribute, VertexLayout};

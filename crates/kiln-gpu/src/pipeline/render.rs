use std::sync::Arc;

use super::vertex::VertexLayout;
use super::BindGroupLayout;

/// Everything a render pipeline is linked from, besides the shader module.
#[derive(Debug, Clone)]
pub struct RenderPipelineDesc<'a> {
    pub label: &'a str,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    /// One layout per vertex buffer slot, in slot order.
    pub vertex_layouts: &'a [VertexLayout],
    pub bind_group_layouts: &'a [&'a BindGroupLayout],
    /// Format of the color attachment the pipeline will draw into.
    pub target_format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
}

/// Linked render pipeline.
///
/// Topology and target format are fixed at build time.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    raw: wgpu::RenderPipeline,
    label: String,
    target_format: wgpu::TextureFormat,
    topology: wgpu::PrimitiveTopology,
    vertex_layouts: Arc<[VertexLayout]>,
    group_layouts: Arc<[u64]>,
}

impl RenderPipeline {
    pub(crate) fn new(
        raw: wgpu::RenderPipeline,
        desc: &RenderPipelineDesc<'_>,
        group_layouts: Vec<u64>,
    ) -> Self {
        Self {
            raw,
            label: desc.label.to_string(),
            target_format: desc.target_format,
            topology: desc.topology,
            vertex_layouts: desc.vertex_layouts.into(),
            group_layouts: group_layouts.into(),
        }
    }

    pub fn raw(&self) -> &wgpu::RenderPipeline {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    pub fn vertex_layouts(&self) -> &[VertexLayout] {
        &self.vertex_layouts
    }

    pub(crate) fn group_layouts(&self) -> &[u64] {
        &self.group_layouts
    }
}

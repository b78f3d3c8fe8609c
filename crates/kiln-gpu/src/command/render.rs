use std::ops::Range;

use crate::device::{GpuError, Result};
use crate::pipeline::{BindGroup, RenderPipeline};
use crate::resource::GpuBuffer;

use super::session::{check_bind_groups, CommandSession};
use super::state::PassKind;

/// Color attachment of a render pass: a texture view plus its load behavior.
///
/// The view comes from outside this crate (a surface texture, or a
/// [`RenderTarget`](crate::RenderTarget)); its format is carried alongside so
/// pipelines can be checked against it.
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    load: wgpu::LoadOp<wgpu::Color>,
}

impl ColorAttachment {
    /// Clears the view to `color` before drawing.
    pub fn clear(view: wgpu::TextureView, format: wgpu::TextureFormat, color: wgpu::Color) -> Self {
        Self {
            view,
            format,
            load: wgpu::LoadOp::Clear(color),
        }
    }

    /// Keeps the existing contents of the view.
    pub fn load(view: wgpu::TextureView, format: wgpu::TextureFormat) -> Self {
        Self {
            view,
            format,
            load: wgpu::LoadOp::Load,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }
}

enum RenderOp {
    Pipeline(RenderPipeline),
    BindGroup(u32, BindGroup),
    VertexBuffer(u32, GpuBuffer),
    Draw {
        vertices: Range<u32>,
        instances: Range<u32>,
    },
}

/// Open render pass of a [`CommandSession`] drawing into one color attachment.
///
/// Same contract as [`ComputePass`](super::ComputePass): validated while
/// recording, encoded on [`end`](Self::end), and a pass dropped without
/// `end()` leaves the session in the open-pass state.
pub struct RenderPass<'s, 'ctx> {
    session: &'s mut CommandSession<'ctx>,
    label: String,
    attachment: ColorAttachment,
    pipeline: Option<RenderPipeline>,
    bound: Vec<Option<BindGroup>>,
    vertex_buffers: Vec<Option<GpuBuffer>>,
    ops: Vec<RenderOp>,
    draws: u32,
    vertices: u64,
}

impl<'s, 'ctx> RenderPass<'s, 'ctx> {
    pub(super) fn new(
        session: &'s mut CommandSession<'ctx>,
        label: &str,
        attachment: ColorAttachment,
    ) -> Self {
        Self {
            session,
            label: label.to_string(),
            attachment,
            pipeline: None,
            bound: Vec::new(),
            vertex_buffers: Vec::new(),
            ops: Vec::new(),
            draws: 0,
            vertices: 0,
        }
    }

    /// Binds `pipeline`; its target format must match the attachment.
    pub fn set_pipeline(&mut self, pipeline: &RenderPipeline) -> Result<()> {
        if pipeline.target_format() != self.attachment.format {
            return Err(GpuError::LayoutMismatch(format!(
                "pipeline `{}` targets {:?} but pass `{}` draws into {:?}",
                pipeline.label(),
                pipeline.target_format(),
                self.label,
                self.attachment.format
            )));
        }

        self.pipeline = Some(pipeline.clone());
        self.ops.push(RenderOp::Pipeline(pipeline.clone()));
        Ok(())
    }

    pub fn set_bind_group(&mut self, index: u32, group: &BindGroup) {
        let slot = index as usize;
        if self.bound.len() <= slot {
            self.bound.resize(slot + 1, None);
        }
        self.bound[slot] = Some(group.clone());
        self.ops.push(RenderOp::BindGroup(index, group.clone()));
    }

    /// Binds `buffer` to vertex buffer slot `slot`. Requires `VERTEX` usage.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &GpuBuffer) -> Result<()> {
        buffer.require(wgpu::BufferUsages::VERTEX, "set_vertex_buffer")?;

        let index = slot as usize;
        if self.vertex_buffers.len() <= index {
            self.vertex_buffers.resize(index + 1, None);
        }
        self.vertex_buffers[index] = Some(buffer.clone());
        self.ops.push(RenderOp::VertexBuffer(slot, buffer.clone()));
        Ok(())
    }

    /// Draws `vertex_count` vertices, one instance.
    pub fn draw(&mut self, vertex_count: u32) -> Result<()> {
        self.draw_instanced(0..vertex_count, 0..1)
    }

    /// Draws a vertex range for each instance in `instances`.
    ///
    /// Every vertex buffer slot of the bound pipeline must be set, and each
    /// buffer must hold enough elements for the range its step mode reads.
    pub fn draw_instanced(&mut self, vertices: Range<u32>, instances: Range<u32>) -> Result<()> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or(GpuError::PipelineNotSet("draw"))?;
        check_bind_groups(pipeline.label(), pipeline.group_layouts(), &self.bound)?;

        for (slot, layout) in pipeline.vertex_layouts().iter().enumerate() {
            let buffer = self
                .vertex_buffers
                .get(slot)
                .and_then(Option::as_ref)
                .ok_or_else(|| {
                    GpuError::LayoutMismatch(format!(
                        "pipeline `{}` reads vertex buffer slot {slot}, none set",
                        pipeline.label()
                    ))
                })?;

            let needed = match layout.step_mode {
                wgpu::VertexStepMode::Vertex => vertices.end,
                wgpu::VertexStepMode::Instance => instances.end,
            };
            if u64::from(needed) > layout.element_capacity(buffer.size()) {
                return Err(GpuError::OutOfBounds {
                    label: buffer.label().to_string(),
                    offset: 0,
                    size: u64::from(needed) * layout.stride,
                    extent: buffer.size(),
                });
            }
        }

        self.draws += 1;
        self.vertices += vertices.len() as u64 * instances.len() as u64;
        self.ops.push(RenderOp::Draw {
            vertices,
            instances,
        });
        Ok(())
    }

    /// Encodes the recorded commands and closes the pass.
    pub fn end(self) -> Result<()> {
        let RenderPass {
            session,
            label,
            attachment,
            ops,
            draws,
            vertices,
            ..
        } = self;

        let encoder = session
            .encoder
            .as_mut()
            .ok_or(GpuError::AlreadyFinished)?;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(&label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &attachment.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: attachment.load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for op in &ops {
                match op {
                    RenderOp::Pipeline(p) => pass.set_pipeline(p.raw()),
                    RenderOp::BindGroup(index, group) => pass.set_bind_group(*index, group.raw(), &[]),
                    RenderOp::VertexBuffer(slot, buffer) => {
                        pass.set_vertex_buffer(*slot, buffer.raw().slice(..))
                    }
                    RenderOp::Draw {
                        vertices,
                        instances,
                    } => pass.draw(vertices.clone(), instances.clone()),
                }
            }
        }

        for op in &ops {
            match op {
                RenderOp::BindGroup(_, group) => {
                    for buffer in group.buffers() {
                        session.retain(buffer);
                    }
                }
                RenderOp::VertexBuffer(_, buffer) => session.retain(buffer),
                _ => {}
            }
        }

        session.stats.render_passes += 1;
        session.stats.draws += draws;
        session.stats.vertices += vertices;
        session.state.end_pass(PassKind::Render);

        log::trace!("render pass `{label}`: {draws} draw(s), {vertices} vertices");
        Ok(())
    }
}

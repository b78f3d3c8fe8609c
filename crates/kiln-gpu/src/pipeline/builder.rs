use crate::device::{GpuContext, GpuError, Result};
use crate::resource::GpuBuffer;

use super::binding::{self, BindGroup, BindGroupLayout, BindingSlot};
use super::compute::ComputePipeline;
use super::render::{RenderPipeline, RenderPipelineDesc};
use super::shader::{self, ShaderModule, ShaderStage};
use super::vertex;

/// Compiles shaders and links pipelines against a device.
///
/// Every contract a pipeline relies on (entry points, workgroup size, vertex
/// layout, bindings) is checked here, before wgpu sees the descriptor.
pub struct PipelineBuilder<'ctx> {
    ctx: &'ctx GpuContext,
}

impl<'ctx> PipelineBuilder<'ctx> {
    pub fn new(ctx: &'ctx GpuContext) -> Self {
        Self { ctx }
    }

    /// Compiles WGSL source.
    ///
    /// Malformed source fails with [`GpuError::CompileError`] carrying the
    /// front-end diagnostic.
    pub fn compile_shader(&self, label: &str, source: &str) -> Result<ShaderModule> {
        let entry_points = shader::reflect_wgsl(label, source)?;

        let raw = self
            .ctx
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        log::debug!(
            "compiled shader `{label}` with entry points {:?}",
            entry_points.iter().map(|e| e.name.as_str()).collect::<Vec<_>>()
        );
        Ok(ShaderModule::new(raw, label, entry_points))
    }

    pub fn create_bind_group_layout(
        &self,
        label: &str,
        slots: &[BindingSlot],
    ) -> Result<BindGroupLayout> {
        binding::validate_slots(label, slots)?;

        let entries: Vec<wgpu::BindGroupLayoutEntry> = slots.iter().map(BindingSlot::entry).collect();
        let raw = self
            .ctx
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            });

        Ok(BindGroupLayout::new(raw, label, slots))
    }

    /// Binds one buffer to every slot of `layout`.
    pub fn create_bind_group(
        &self,
        label: &str,
        layout: &BindGroupLayout,
        entries: &[(u32, &GpuBuffer)],
    ) -> Result<BindGroup> {
        let matched = binding::match_entries(
            layout.label(),
            layout.slots(),
            entries,
            &self.ctx.device().limits(),
        )?;

        let raw_entries: Vec<wgpu::BindGroupEntry<'_>> = matched
            .iter()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: buffer.raw().as_entire_binding(),
            })
            .collect();

        let raw = self
            .ctx
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: layout.raw(),
                entries: &raw_entries,
            });

        let buffers = matched.iter().map(|(_, b)| (*b).clone()).collect();
        Ok(BindGroup::new(raw, label, layout, buffers))
    }

    /// Links a compute entry point with its bind group layouts.
    ///
    /// The entry point's `@workgroup_size` x-dimension must equal
    /// `workgroup_size`; dispatch counts are derived from it.
    pub fn build_compute_pipeline(
        &self,
        module: &ShaderModule,
        entry_point: &str,
        bind_group_layouts: &[&BindGroupLayout],
        workgroup_size: u32,
    ) -> Result<ComputePipeline> {
        let ep = module.entry_point(entry_point, ShaderStage::Compute)?;

        if ep.workgroup_size[0] != workgroup_size {
            return Err(GpuError::LayoutMismatch(format!(
                "entry point `{entry_point}` declares @workgroup_size({}), pipeline configured for {workgroup_size}",
                ep.workgroup_size[0]
            )));
        }
        binding::check_shader_resources(
            entry_point,
            ShaderStage::Compute,
            &ep.resources,
            bind_group_layouts,
        )?;

        let label = format!("{} compute pipeline", module.label());
        let layout = self.pipeline_layout(&label, bind_group_layouts);

        let raw = self
            .ctx
            .device()
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(&label),
                layout: Some(&layout),
                module: module.raw(),
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        log::debug!("built `{label}` ({entry_point}, workgroup {:?})", ep.workgroup_size);
        Ok(ComputePipeline::new(
            raw,
            &label,
            entry_point,
            ep.workgroup_size,
            layout_ids(bind_group_layouts),
        ))
    }

    /// Links vertex and fragment entry points of `module` into a render pipeline.
    pub fn build_render_pipeline(
        &self,
        module: &ShaderModule,
        desc: &RenderPipelineDesc<'_>,
    ) -> Result<RenderPipeline> {
        let vs = module.entry_point(desc.vertex_entry, ShaderStage::Vertex)?;
        let fs = module.entry_point(desc.fragment_entry, ShaderStage::Fragment)?;

        vertex::check_vertex_inputs(desc.vertex_entry, desc.vertex_layouts, &vs.input_locations)?;
        binding::check_shader_resources(
            desc.vertex_entry,
            ShaderStage::Vertex,
            &vs.resources,
            desc.bind_group_layouts,
        )?;
        binding::check_shader_resources(
            desc.fragment_entry,
            ShaderStage::Fragment,
            &fs.resources,
            desc.bind_group_layouts,
        )?;

        let layout = self.pipeline_layout(desc.label, desc.bind_group_layouts);

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|l| l.raw_attributes())
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(l, attrs)| wgpu::VertexBufferLayout {
                array_stride: l.stride,
                step_mode: l.step_mode,
                attributes: attrs,
            })
            .collect();

        let raw = self
            .ctx
            .device()
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: module.raw(),
                    entry_point: Some(desc.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },

                fragment: Some(wgpu::FragmentState {
                    module: module.raw(),
                    entry_point: Some(desc.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.target_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: desc.topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        log::debug!(
            "built `{}` ({} -> {}, {:?}, {:?})",
            desc.label,
            desc.vertex_entry,
            desc.fragment_entry,
            desc.topology,
            desc.target_format
        );
        Ok(RenderPipeline::new(
            raw,
            desc,
            layout_ids(desc.bind_group_layouts),
        ))
    }

    fn pipeline_layout(
        &self,
        label: &str,
        bind_group_layouts: &[&BindGroupLayout],
    ) -> wgpu::PipelineLayout {
        let raw: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().map(|l| l.raw()).collect();
        self.ctx
            .device()
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &raw,
                immediate_size: 0,
            })
    }
}

fn layout_ids(layouts: &[&BindGroupLayout]) -> Vec<u64> {
    layouts.iter().map(|l| l.id()).collect()
}

use std::borrow::Cow;

use crate::command::{CommandSession, CommandStats};
use crate::device::{GpuContext, GpuError, Result};
use crate::pipeline::{BindGroup, BindingSlot, ComputePipeline, PipelineBuilder};
use crate::resource::GpuBuffer;

/// Width of one output element (`f32`) in bytes.
const ELEMENT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

const ENTRY_POINT: &str = "main";

/// Parameters of the index-transform workload.
#[derive(Debug, Clone)]
pub struct IndexTransformConfig {
    /// Number of `f32` elements written.
    pub element_count: u32,
    /// Must equal the `@workgroup_size` declared by `source`.
    pub workgroup_size: u32,
    /// WGSL with a `main` compute entry point writing `@group(0) @binding(0)`.
    pub source: Cow<'static, str>,
}

impl Default for IndexTransformConfig {
    fn default() -> Self {
        Self {
            element_count: 1000,
            workgroup_size: 64,
            source: Cow::Borrowed(include_str!("shaders/index_transform.wgsl")),
        }
    }
}

impl IndexTransformConfig {
    /// Size of the output buffer in bytes.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.element_count) * ELEMENT_SIZE
    }

    /// Value element `i` holds after a run: `i * 1000 + (i % workgroup_size)`.
    pub fn expected(&self) -> Vec<f32> {
        let w = self.workgroup_size.max(1);
        (0..self.element_count)
            .map(|i| i as f32 * 1000.0 + (i % w) as f32)
            .collect()
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct IndexTransformOutput {
    pub values: Vec<f32>,
    pub workgroups: u32,
    pub stats: CommandStats,
}

/// Compute workload: every invocation writes a value derived from its global
/// and local index into a storage buffer, which is copied to a staging buffer
/// and read back.
pub struct IndexTransform {
    config: IndexTransformConfig,
    pipeline: ComputePipeline,
    bind_group: BindGroup,
    output: GpuBuffer,
    staging: GpuBuffer,
}

impl IndexTransform {
    /// Builds buffers, bind group and pipeline for `config`.
    pub fn new(ctx: &GpuContext, config: IndexTransformConfig) -> Result<Self> {
        if config.element_count == 0 {
            return Err(GpuError::InvalidSize {
                label: "index transform output".to_string(),
                size: 0,
            });
        }
        let size = config.byte_size();

        let output = ctx.create_buffer(
            "index transform output",
            size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;
        let staging = ctx.create_staging_buffer("index transform staging", size)?;

        let builder = PipelineBuilder::new(ctx);
        let module = builder.compile_shader("index transform", &config.source)?;
        let layout = builder.create_bind_group_layout(
            "index transform layout",
            &[BindingSlot::storage(0, false, wgpu::ShaderStages::COMPUTE)],
        )?;
        let bind_group =
            builder.create_bind_group("index transform bindings", &layout, &[(0, &output)])?;
        let pipeline =
            builder.build_compute_pipeline(&module, ENTRY_POINT, &[&layout], config.workgroup_size)?;

        Ok(Self {
            config,
            pipeline,
            bind_group,
            output,
            staging,
        })
    }

    pub fn config(&self) -> &IndexTransformConfig {
        &self.config
    }

    pub fn output(&self) -> &GpuBuffer {
        &self.output
    }

    pub fn staging(&self) -> &GpuBuffer {
        &self.staging
    }

    /// Records the compute pass and the copy into the staging buffer.
    ///
    /// Returns the number of workgroups dispatched.
    pub fn record(&self, session: &mut CommandSession<'_>) -> Result<u32> {
        let mut pass = session.begin_compute_pass("index transform pass")?;
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group);
        let workgroups = pass.dispatch_for_elements(self.config.element_count)?;
        pass.end()?;

        session.copy_buffer_to_buffer(&self.output, 0, &self.staging, 0, self.config.byte_size())?;
        Ok(workgroups)
    }

    /// Records, submits and reads back one run.
    pub async fn run(&self, ctx: &GpuContext) -> Result<IndexTransformOutput> {
        let mut session = ctx.begin_encoding("index transform");
        let workgroups = self.record(&mut session)?;
        let commands = session.finish()?;
        let stats = commands.stats();

        let submission = ctx.submit(commands)?;
        let mapped = ctx
            .map_for_read(&self.staging, 0, self.config.byte_size())
            .await?;
        let values = mapped.full_view().to_vec::<f32>()?;
        mapped.unmap();
        drop(submission);

        log::info!(
            "index transform: {} elements in {workgroups} workgroup(s) of {}",
            values.len(),
            self.config.workgroup_size
        );
        Ok(IndexTransformOutput {
            values,
            workgroups,
            stats,
        })
    }

    /// Blocking form of [`run`](Self::run).
    pub fn run_blocking(&self, ctx: &GpuContext) -> Result<IndexTransformOutput> {
        pollster::block_on(self.run(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shader() {
        let config = IndexTransformConfig::default();
        assert_eq!(config.element_count, 1000);
        assert_eq!(config.workgroup_size, 64);
        assert!(config.source.contains("@workgroup_size(64)"));
    }

    #[test]
    fn byte_size_is_four_per_element() {
        assert_eq!(IndexTransformConfig::default().byte_size(), 4000);
    }

    #[test]
    fn expected_values() {
        let values = IndexTransformConfig::default().expected();
        assert_eq!(values.len(), 1000);
        assert_eq!(values[0], 0.0);
        assert_eq!(values[1], 1001.0);
        assert_eq!(values[63], 63063.0);
        assert_eq!(values[64], 64000.0);
        assert_eq!(values[999], 999_039.0);
    }
}

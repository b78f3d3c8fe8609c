use crate::device::{GpuError, Result};
use crate::pipeline::{workgroup_count, BindGroup, ComputePipeline};

use super::session::{check_bind_groups, CommandSession};
use super::state::PassKind;

enum ComputeOp {
    Pipeline(ComputePipeline),
    BindGroup(u32, BindGroup),
    Dispatch([u32; 3]),
}

/// Open compute pass of a [`CommandSession`].
///
/// Commands are validated as they are recorded and encoded on [`end`](Self::end).
/// Dropping the pass without ending it leaves the session unusable: every
/// later operation fails with [`GpuError::PassOpen`].
pub struct ComputePass<'s, 'ctx> {
    session: &'s mut CommandSession<'ctx>,
    label: String,
    pipeline: Option<ComputePipeline>,
    bound: Vec<Option<BindGroup>>,
    ops: Vec<ComputeOp>,
    dispatches: u32,
}

impl<'s, 'ctx> ComputePass<'s, 'ctx> {
    pub(super) fn new(session: &'s mut CommandSession<'ctx>, label: &str) -> Self {
        Self {
            session,
            label: label.to_string(),
            pipeline: None,
            bound: Vec::new(),
            ops: Vec::new(),
            dispatches: 0,
        }
    }

    pub fn set_pipeline(&mut self, pipeline: &ComputePipeline) {
        self.pipeline = Some(pipeline.clone());
        self.ops.push(ComputeOp::Pipeline(pipeline.clone()));
    }

    pub fn set_bind_group(&mut self, index: u32, group: &BindGroup) {
        let slot = index as usize;
        if self.bound.len() <= slot {
            self.bound.resize(slot + 1, None);
        }
        self.bound[slot] = Some(group.clone());
        self.ops.push(ComputeOp::BindGroup(index, group.clone()));
    }

    /// Records a dispatch of `x * y * z` workgroups.
    ///
    /// Fails with `PipelineNotSet` before [`set_pipeline`](Self::set_pipeline),
    /// with `LayoutMismatch` if a bind group the pipeline expects is missing
    /// or built for another layout, and with `OutOfBounds` if any count is
    /// above the device's `max_compute_workgroups_per_dimension`.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        let pipeline = self
            .pipeline
            .as_ref()
            .ok_or(GpuError::PipelineNotSet("dispatch"))?;
        check_bind_groups(pipeline.label(), pipeline.group_layouts(), &self.bound)?;

        let max = self
            .session
            .context()
            .device()
            .limits()
            .max_compute_workgroups_per_dimension;
        for (axis, count) in [("x", x), ("y", y), ("z", z)] {
            if count > max {
                return Err(GpuError::OutOfBounds {
                    label: format!("{} workgroups along {axis}", self.label),
                    offset: 0,
                    size: u64::from(count),
                    extent: u64::from(max),
                });
            }
        }

        self.ops.push(ComputeOp::Dispatch([x, y, z]));
        self.dispatches += 1;
        Ok(())
    }

    /// Dispatches enough workgroups along x to cover `elements` invocations.
    ///
    /// Returns the number of workgroups dispatched.
    pub fn dispatch_for_elements(&mut self, elements: u32) -> Result<u32> {
        let size = self
            .pipeline
            .as_ref()
            .ok_or(GpuError::PipelineNotSet("dispatch"))?
            .workgroup_size()[0];

        let groups = workgroup_count(elements, size);
        self.dispatch(groups, 1, 1)?;
        Ok(groups)
    }

    /// Encodes the recorded commands and closes the pass.
    pub fn end(self) -> Result<()> {
        let ComputePass {
            session,
            label,
            ops,
            dispatches,
            ..
        } = self;

        let encoder = session
            .encoder
            .as_mut()
            .ok_or(GpuError::AlreadyFinished)?;
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(&label),
                timestamp_writes: None,
            });
            for op in &ops {
                match op {
                    ComputeOp::Pipeline(p) => pass.set_pipeline(p.raw()),
                    ComputeOp::BindGroup(index, group) => pass.set_bind_group(*index, group.raw(), &[]),
                    ComputeOp::Dispatch([x, y, z]) => pass.dispatch_workgroups(*x, *y, *z),
                }
            }
        }

        for op in &ops {
            if let ComputeOp::BindGroup(_, group) = op {
                for buffer in group.buffers() {
                    session.retain(buffer);
                }
            }
        }

        session.stats.compute_passes += 1;
        session.stats.dispatches += dispatches;
        session.state.end_pass(PassKind::Compute);

        log::trace!("compute pass `{label}`: {dispatches} dispatch(es)");
        Ok(())
    }
}

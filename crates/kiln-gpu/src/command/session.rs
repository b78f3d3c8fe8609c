use crate::device::{GpuContext, GpuError, Result};
use crate::pipeline::BindGroup;
use crate::resource::usage;
use crate::resource::{GpuBuffer, RenderTarget};

use super::compute::ComputePass;
use super::render::{ColorAttachment, RenderPass};
use super::state::{EncoderState, PassKind};

/// What a command buffer records.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CommandStats {
    pub compute_passes: u32,
    pub render_passes: u32,
    pub dispatches: u32,
    pub draws: u32,
    /// Vertices drawn, summed over instances.
    pub vertices: u64,
    pub copies: u32,
}

/// Records one command buffer.
///
/// Created by [`GpuContext::begin_encoding`]. Passes and copies are recorded in
/// order; [`finish`](Self::finish) seals the session and every later call
/// fails with [`GpuError::AlreadyFinished`].
///
/// Every buffer touched by a pass or copy is retained and handed on to the
/// [`CommandBuffer`] and then the [`Submission`], so it cannot be released
/// while the GPU may still use it.
pub struct CommandSession<'ctx> {
    ctx: &'ctx GpuContext,
    label: String,
    pub(super) encoder: Option<wgpu::CommandEncoder>,
    pub(super) state: EncoderState,
    retained: Vec<GpuBuffer>,
    pub(super) stats: CommandStats,
}

impl<'ctx> CommandSession<'ctx> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn context(&self) -> &'ctx GpuContext {
        self.ctx
    }

    /// Counters of everything recorded so far.
    pub fn stats(&self) -> CommandStats {
        self.stats
    }

    /// Opens a compute pass. Only one pass may be open at a time.
    pub fn begin_compute_pass(&mut self, label: &str) -> Result<ComputePass<'_, 'ctx>> {
        self.state.begin_pass(PassKind::Compute)?;
        Ok(ComputePass::new(self, label))
    }

    /// Opens a render pass drawing into `attachment`.
    pub fn begin_render_pass(
        &mut self,
        label: &str,
        attachment: ColorAttachment,
    ) -> Result<RenderPass<'_, 'ctx>> {
        self.state.begin_pass(PassKind::Render)?;
        Ok(RenderPass::new(self, label, attachment))
    }

    /// Records a copy of `size` bytes between two buffers.
    ///
    /// Only valid outside passes. `src` needs `COPY_SRC`, `dst` needs
    /// `COPY_DST`; both ranges must fit their buffers, and offsets and size
    /// must be 4-byte aligned. Neither buffer may be mapped.
    pub fn copy_buffer_to_buffer(
        &mut self,
        src: &GpuBuffer,
        src_offset: u64,
        dst: &GpuBuffer,
        dst_offset: u64,
        size: u64,
    ) -> Result<()> {
        self.state.ensure_recording()?;

        src.require(wgpu::BufferUsages::COPY_SRC, "copy source")?;
        dst.require(wgpu::BufferUsages::COPY_DST, "copy destination")?;
        if src.same_as(dst) {
            return Err(GpuError::invalid_usage(
                src.label(),
                "a buffer cannot be copied into itself",
            ));
        }
        if size == 0 {
            return Err(GpuError::InvalidSize {
                label: src.label().to_string(),
                size,
            });
        }

        usage::check_range(src.label(), src_offset, size, src.size())?;
        usage::check_range(dst.label(), dst_offset, size, dst.size())?;
        usage::check_alignment(src.label(), "offset", src_offset, wgpu::COPY_BUFFER_ALIGNMENT)?;
        usage::check_alignment(dst.label(), "offset", dst_offset, wgpu::COPY_BUFFER_ALIGNMENT)?;
        usage::check_alignment(src.label(), "copy size", size, wgpu::COPY_BUFFER_ALIGNMENT)?;
        src.ensure_unmapped()?;
        dst.ensure_unmapped()?;

        let encoder = self.encoder.as_mut().ok_or(GpuError::AlreadyFinished)?;
        encoder.copy_buffer_to_buffer(src.raw(), src_offset, dst.raw(), dst_offset, size);

        self.retain(src);
        self.retain(dst);
        self.stats.copies += 1;

        log::trace!(
            "copy `{}`[{src_offset}..] -> `{}`[{dst_offset}..], {size} bytes",
            src.label(),
            dst.label()
        );
        Ok(())
    }

    /// Records a copy of the whole `target` into `dst`.
    ///
    /// Rows land [`RenderTarget::padded_bytes_per_row`] bytes apart; `dst` must
    /// hold at least [`RenderTarget::readback_size`] bytes and must not be mapped.
    pub fn copy_target_to_buffer(&mut self, target: &RenderTarget, dst: &GpuBuffer) -> Result<()> {
        self.state.ensure_recording()?;

        dst.require(wgpu::BufferUsages::COPY_DST, "copy destination")?;
        usage::check_range(dst.label(), 0, target.readback_size(), dst.size())?;
        dst.ensure_unmapped()?;

        let encoder = self.encoder.as_mut().ok_or(GpuError::AlreadyFinished)?;
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: dst.raw(),
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(target.padded_bytes_per_row()),
                    rows_per_image: Some(target.height()),
                },
            },
            wgpu::Extent3d {
                width: target.width(),
                height: target.height(),
                depth_or_array_layers: 1,
            },
        );

        self.retain(dst);
        self.stats.copies += 1;
        Ok(())
    }

    /// Seals the session into a submittable command buffer.
    ///
    /// Fails with `PassOpen` while a pass is open (including one dropped
    /// without `end()`), and with `AlreadyFinished` on a second call.
    pub fn finish(&mut self) -> Result<CommandBuffer> {
        self.state.finish()?;
        let encoder = self.encoder.take().ok_or(GpuError::AlreadyFinished)?;

        log::debug!("finished `{}`: {:?}", self.label, self.stats);
        Ok(CommandBuffer {
            raw: encoder.finish(),
            label: std::mem::take(&mut self.label),
            retained: std::mem::take(&mut self.retained),
            stats: self.stats,
        })
    }

    pub(super) fn retain(&mut self, buffer: &GpuBuffer) {
        if !self.retained.iter().any(|b| b.same_as(buffer)) {
            self.retained.push(buffer.clone());
        }
    }
}

/// Checks that every group slot a pipeline expects holds a group built for
/// that slot's layout.
pub(super) fn check_bind_groups(
    pipeline: &str,
    expected: &[u64],
    bound: &[Option<BindGroup>],
) -> Result<()> {
    for (slot, layout_id) in expected.iter().enumerate() {
        match bound.get(slot).and_then(Option::as_ref) {
            None => {
                return Err(GpuError::LayoutMismatch(format!(
                    "pipeline `{pipeline}` expects a bind group at slot {slot}, none set"
                )));
            }
            Some(group) if group.layout_id() != *layout_id => {
                return Err(GpuError::LayoutMismatch(format!(
                    "bind group `{}` at slot {slot} does not match the layout of pipeline `{pipeline}`",
                    group.label()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Sealed command buffer, consumed by [`GpuContext::submit`].
pub struct CommandBuffer {
    raw: wgpu::CommandBuffer,
    label: String,
    retained: Vec<GpuBuffer>,
    stats: CommandStats,
}

impl CommandBuffer {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> CommandStats {
        self.stats
    }
}

/// Handle to work enqueued on the device queue.
///
/// Holds every buffer the command buffer referenced; drop it once the
/// results have been read back.
pub struct Submission {
    index: wgpu::SubmissionIndex,
    label: String,
    retained: Vec<GpuBuffer>,
    stats: CommandStats,
}

impl Submission {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stats(&self) -> CommandStats {
        self.stats
    }

    /// Buffers kept alive by this submission.
    pub fn retained(&self) -> &[GpuBuffer] {
        &self.retained
    }
}

impl GpuContext {
    /// Opens a command session on this device.
    pub fn begin_encoding(&self, label: &str) -> CommandSession<'_> {
        let encoder = self
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label),
            });

        CommandSession {
            ctx: self,
            label: label.to_string(),
            encoder: Some(encoder),
            state: EncoderState::Recording,
            retained: Vec::new(),
            stats: CommandStats::default(),
        }
    }

    /// Enqueues `buffer` on the queue and returns immediately.
    ///
    /// Execution follows recording order. Use [`wait_for`](Self::wait_for) or
    /// [`map_for_read`](Self::map_for_read) to observe completion.
    ///
    /// Fails with `AlreadyMapped` if a buffer the commands touch was mapped
    /// after it was recorded; the command buffer is dropped unsubmitted.
    pub fn submit(&self, buffer: CommandBuffer) -> Result<Submission> {
        let CommandBuffer {
            raw,
            label,
            retained,
            stats,
        } = buffer;

        if let Err(e) = retained.iter().try_for_each(GpuBuffer::ensure_unmapped) {
            log::warn!("not submitting `{label}`: {e}");
            return Err(e);
        }

        let index = self.queue().submit(std::iter::once(raw));
        log::debug!("submitted `{label}` ({} retained buffer(s))", retained.len());

        Ok(Submission {
            index,
            label,
            retained,
            stats,
        })
    }

    /// Blocks until `submission` has finished executing.
    pub fn wait_for(&self, submission: &Submission) -> Result<()> {
        self.poll_wait(Some(submission.index.clone()))
    }
}

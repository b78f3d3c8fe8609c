use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use wgpu::util::DeviceExt;

use crate::device::{GpuContext, GpuError, Result};
use crate::readback::MapCycle;

use super::usage;

/// Device-resident buffer with a fixed byte size and usage set.
///
/// Cloning is cheap and shares the allocation. The allocation is released once
/// the last handle is gone: sessions, bind groups, submissions and open
/// mappings all hold one.
#[derive(Clone)]
pub struct GpuBuffer {
    inner: Arc<BufferInner>,
}

struct BufferInner {
    raw: wgpu::Buffer,
    label: String,
    size: u64,
    usage: wgpu::BufferUsages,
    map: Mutex<MapCycle>,
}

impl GpuBuffer {
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.inner.size
    }

    pub fn usage(&self) -> wgpu::BufferUsages {
        self.inner.usage
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.inner.raw
    }

    /// Returns `true` if both handles refer to the same allocation.
    pub fn same_as(&self, other: &GpuBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn require(&self, required: wgpu::BufferUsages, op: &str) -> Result<()> {
        usage::require(self.label(), self.usage(), required, op)
    }

    /// Fails with `AlreadyMapped` while a map cycle is open on the buffer.
    pub(crate) fn ensure_unmapped(&self) -> Result<()> {
        if self.map_cycle().is_open() {
            return Err(GpuError::AlreadyMapped(self.label().to_string()));
        }
        Ok(())
    }

    pub(crate) fn map_cycle(&self) -> MutexGuard<'_, MapCycle> {
        // The cycle holds plain state; a panic mid-update cannot leave it torn.
        self.inner.map.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for GpuBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuBuffer")
            .field("label", &self.inner.label)
            .field("size", &self.inner.size)
            .field("usage", &self.inner.usage)
            .finish()
    }
}

impl GpuContext {
    /// Creates an uninitialized buffer of `size` bytes.
    ///
    /// Contents are unspecified until written with [`write_buffer`](Self::write_buffer)
    /// or filled by a copy.
    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<GpuBuffer> {
        self.check_buffer_size(label, size)?;
        usage::validate_usage(label, usage)?;

        let raw = self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });

        log::debug!("created buffer `{label}`: {size} bytes, {usage:?}");
        Ok(wrap(raw, label, size, usage))
    }

    /// Creates a buffer holding `contents`.
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<GpuBuffer> {
        let size = contents.len() as u64;
        self.check_buffer_size(label, size)?;
        usage::validate_usage(label, usage)?;

        let raw = self
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            });

        log::debug!("created buffer `{label}` with {size} initial bytes, {usage:?}");
        Ok(wrap(raw, label, size, usage))
    }

    /// Creates a host-readable buffer that can only be filled by a copy.
    pub fn create_staging_buffer(&self, label: &str, size: u64) -> Result<GpuBuffer> {
        self.create_buffer(
            label,
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        )
    }

    /// Schedules `data` to be written at `offset` before the next submission.
    ///
    /// Requires `COPY_DST` usage; offset and length must be 4-byte aligned.
    pub fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) -> Result<()> {
        buffer.require(wgpu::BufferUsages::COPY_DST, "write_buffer")?;

        let len = data.len() as u64;
        usage::check_range(buffer.label(), offset, len, buffer.size())?;
        usage::check_alignment(buffer.label(), "offset", offset, wgpu::COPY_BUFFER_ALIGNMENT)?;
        usage::check_alignment(buffer.label(), "length", len, wgpu::COPY_BUFFER_ALIGNMENT)?;

        buffer.ensure_unmapped()?;

        self.queue().write_buffer(buffer.raw(), offset, data);
        Ok(())
    }

    /// Sizes must be non-zero and within the device's `max_buffer_size`.
    fn check_buffer_size(&self, label: &str, size: u64) -> Result<()> {
        if size == 0 || size > self.device().limits().max_buffer_size {
            return Err(GpuError::InvalidSize {
                label: label.to_string(),
                size,
            });
        }
        Ok(())
    }
}

fn wrap(raw: wgpu::Buffer, label: &str, size: u64, usage: wgpu::BufferUsages) -> GpuBuffer {
    GpuBuffer {
        inner: Arc::new(BufferInner {
            raw,
            label: label.to_string(),
            size,
            usage,
            map: Mutex::new(MapCycle::default()),
        }),
    }
}

use futures::channel::oneshot;

use crate::device::{GpuContext, GpuError, Result};
use crate::resource::usage;
use crate::resource::GpuBuffer;

/// An open map cycle on a staging buffer.
///
/// The mapped range is host-visible and reflects every GPU write submitted
/// before the map was requested. Dropping the value (or calling
/// [`unmap`](Self::unmap)) ends the cycle; views created from it fail with
/// [`GpuError::UseAfterUnmap`] afterwards.
pub struct MappedBuffer {
    buffer: GpuBuffer,
    generation: u64,
    offset: u64,
    size: u64,
}

impl MappedBuffer {
    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Start of the mapped range, in bytes from the buffer start.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Length of the mapped range in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read-only view of `offset..offset + size` (buffer coordinates).
    ///
    /// The range must lie inside the mapped range.
    pub fn view(&self, offset: u64, size: u64) -> Result<ReadView> {
        let label = self.buffer.label();
        if offset < self.offset {
            return Err(GpuError::OutOfBounds {
                label: label.to_string(),
                offset,
                size,
                extent: self.offset + self.size,
            });
        }
        usage::check_range(label, offset, size, self.offset + self.size)?;

        Ok(ReadView {
            buffer: self.buffer.clone(),
            generation: self.generation,
            offset,
            size,
        })
    }

    /// View of the whole mapped range.
    pub fn full_view(&self) -> ReadView {
        ReadView {
            buffer: self.buffer.clone(),
            generation: self.generation,
            offset: self.offset,
            size: self.size,
        }
    }

    /// Releases the mapping. Copy out what you need first.
    pub fn unmap(self) {
        drop(self);
    }
}

impl Drop for MappedBuffer {
    fn drop(&mut self) {
        let mut cycle = self.buffer.map_cycle();
        if cycle.release(self.generation) {
            self.buffer.raw().unmap();
            log::debug!("unmapped `{}`", self.buffer.label());
        }
    }
}

/// Read-only window into a mapped range.
///
/// Holds no borrow of the mapping: every access re-checks that the map cycle
/// it came from is still open.
#[derive(Debug, Clone)]
pub struct ReadView {
    buffer: GpuBuffer,
    generation: u64,
    offset: u64,
    size: u64,
}

impl ReadView {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Copies the viewed bytes out.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// Copies the viewed bytes into `dst`, which must be exactly `size` bytes long.
    pub fn copy_into(&self, dst: &mut [u8]) -> Result<()> {
        if dst.len() as u64 != self.size {
            return Err(GpuError::OutOfBounds {
                label: self.buffer.label().to_string(),
                offset: 0,
                size: self.size,
                extent: dst.len() as u64,
            });
        }
        self.with_bytes(|bytes| dst.copy_from_slice(bytes))
    }

    /// Reinterprets the viewed bytes as a vector of `T`.
    ///
    /// The view size must be a multiple of `size_of::<T>()`.
    pub fn to_vec<T: bytemuck::Pod>(&self) -> Result<Vec<T>> {
        let width = std::mem::size_of::<T>() as u64;
        if width > 0 {
            usage::check_alignment(self.buffer.label(), "view size", self.size, width)?;
        }
        self.with_bytes(bytemuck::pod_collect_to_vec::<u8, T>)
    }

    /// Runs `f` over the viewed bytes while the map cycle is locked.
    ///
    /// `f` must not touch the mapping of the same buffer.
    pub(crate) fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R> {
        let cycle = self.buffer.map_cycle();
        let (map_offset, map_size) = cycle.mapped_range(self.buffer.label(), self.generation)?;

        let mapped = self
            .buffer
            .raw()
            .slice(map_offset..map_offset + map_size)
            .get_mapped_range();

        let start = (self.offset - map_offset) as usize;
        let end = start + self.size as usize;
        let out = f(&mapped[start..end]);

        drop(mapped);
        drop(cycle);
        Ok(out)
    }
}

impl GpuContext {
    /// Maps `offset..offset + size` of a staging buffer for host reads.
    ///
    /// Resolves once all previously submitted GPU work has completed and the
    /// range is host-visible. On native backends the device is polled to
    /// completion before the returned future resolves.
    ///
    /// Errors:
    /// - `MapFailed` if the buffer lacks `MAP_READ` or the device reports a fault
    /// - `AlreadyMapped` if a map cycle is already open on the buffer
    /// - `OutOfBounds` / `Misaligned` / `InvalidSize` for a bad range
    pub async fn map_for_read(
        &self,
        buffer: &GpuBuffer,
        offset: u64,
        size: u64,
    ) -> Result<MappedBuffer> {
        let label = buffer.label();
        if !buffer.usage().contains(wgpu::BufferUsages::MAP_READ) {
            return Err(GpuError::map_failed(
                label,
                format!("usage {:?} lacks MAP_READ", buffer.usage()),
            ));
        }
        if size == 0 {
            return Err(GpuError::InvalidSize {
                label: label.to_string(),
                size,
            });
        }
        usage::check_range(label, offset, size, buffer.size())?;
        usage::check_alignment(label, "map offset", offset, wgpu::MAP_ALIGNMENT)?;
        usage::check_alignment(label, "map size", size, wgpu::COPY_BUFFER_ALIGNMENT)?;

        let generation = buffer.map_cycle().begin(label)?;

        let (tx, rx) = oneshot::channel();
        buffer
            .raw()
            .slice(offset..offset + size)
            .map_async(wgpu::MapMode::Read, move |result| {
                // A dropped receiver means nobody is waiting anymore.
                let _ = tx.send(result);
            });

        if let Err(e) = self.poll_wait(None) {
            buffer.map_cycle().abort(generation);
            buffer.raw().unmap();
            return Err(GpuError::map_failed(label, e.to_string()));
        }

        let outcome = match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(oneshot::Canceled) => Err("map callback dropped before completion".to_string()),
        };

        match outcome {
            Ok(()) => {
                buffer.map_cycle().complete(generation, offset, size);
                log::debug!("mapped `{label}` {offset}..{}", offset + size);
                Ok(MappedBuffer {
                    buffer: buffer.clone(),
                    generation,
                    offset,
                    size,
                })
            }
            Err(reason) => {
                buffer.map_cycle().abort(generation);
                Err(GpuError::map_failed(label, reason))
            }
        }
    }

    /// Maps a range, copies it out and unmaps in one step.
    pub async fn read_buffer(&self, buffer: &GpuBuffer, offset: u64, size: u64) -> Result<Vec<u8>> {
        let mapped = self.map_for_read(buffer, offset, size).await?;
        let bytes = mapped.full_view().to_bytes()?;
        mapped.unmap();
        Ok(bytes)
    }
}

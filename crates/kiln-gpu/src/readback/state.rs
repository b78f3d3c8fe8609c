use crate::device::{GpuError, Result};

/// Map state of one buffer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
enum MapPhase {
    #[default]
    Unmapped,
    /// `map_async` issued, completion not yet observed.
    Pending { generation: u64 },
    /// Range is host-visible.
    Mapped {
        generation: u64,
        offset: u64,
        size: u64,
    },
}

/// Tracks map cycles of a buffer.
///
/// Every cycle gets a fresh generation number; views remember it and are
/// rejected once the buffer moves on.
#[derive(Debug, Default)]
pub(crate) struct MapCycle {
    phase: MapPhase,
    next_generation: u64,
}

impl MapCycle {
    pub(crate) fn is_open(&self) -> bool {
        self.phase != MapPhase::Unmapped
    }

    /// Starts a cycle. Fails with `AlreadyMapped` unless the buffer is unmapped.
    pub(crate) fn begin(&mut self, label: &str) -> Result<u64> {
        if self.is_open() {
            return Err(GpuError::AlreadyMapped(label.to_string()));
        }
        let generation = self.next_generation;
        self.next_generation += 1;
        self.phase = MapPhase::Pending { generation };
        Ok(generation)
    }

    /// Marks the pending cycle as host-visible.
    pub(crate) fn complete(&mut self, generation: u64, offset: u64, size: u64) {
        if self.phase == (MapPhase::Pending { generation }) {
            self.phase = MapPhase::Mapped {
                generation,
                offset,
                size,
            };
        }
    }

    /// Abandons a pending cycle after a failed map.
    pub(crate) fn abort(&mut self, generation: u64) {
        if self.phase == (MapPhase::Pending { generation }) {
            self.phase = MapPhase::Unmapped;
        }
    }

    /// Ends a mapped cycle. Returns `true` if the caller must unmap the buffer.
    pub(crate) fn release(&mut self, generation: u64) -> bool {
        match self.phase {
            MapPhase::Mapped { generation: g, .. } if g == generation => {
                self.phase = MapPhase::Unmapped;
                true
            }
            _ => false,
        }
    }

    /// Returns the mapped range if `generation` is still the live cycle.
    pub(crate) fn mapped_range(&self, label: &str, generation: u64) -> Result<(u64, u64)> {
        match self.phase {
            MapPhase::Mapped {
                generation: g,
                offset,
                size,
            } if g == generation => Ok((offset, size)),
            _ => Err(GpuError::UseAfterUnmap(label.to_string())),
        }
    }
}

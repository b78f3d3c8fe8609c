use thiserror::Error;

/// Errors reported by the command layer.
///
/// Nothing here is retried. `Unavailable` is the only non-fatal variant: the
/// caller is expected to drop the GPU feature for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    /// No adapter, or device negotiation failed.
    #[error("GPU unavailable: {0}")]
    Unavailable(String),

    /// Shader source failed to parse or validate.
    #[error("shader `{label}` failed to compile:\n{diagnostic}")]
    CompileError { label: String, diagnostic: String },

    /// A buffer was used for an operation its usage flags do not allow.
    #[error("buffer `{label}`: {reason}")]
    InvalidUsage { label: String, reason: String },

    /// Zero-sized or otherwise unusable allocation request.
    #[error("buffer `{label}`: invalid size {size}")]
    InvalidSize { label: String, size: u64 },

    /// A range reaches past the end of the region it addresses.
    #[error("`{label}`: range {offset}..{end} exceeds extent {extent}", end = .offset.saturating_add(*.size))]
    OutOfBounds {
        label: String,
        offset: u64,
        size: u64,
        extent: u64,
    },

    /// Offset or size violates a copy/map alignment requirement.
    #[error("`{label}`: {what} {value} is not a multiple of {alignment}")]
    Misaligned {
        label: String,
        what: &'static str,
        value: u64,
        alignment: u64,
    },

    /// Recording was attempted on a finished command session.
    #[error("command buffer already finished")]
    AlreadyFinished,

    /// A pass is still open where none may be.
    #[error("a {0} pass is still open")]
    PassOpen(&'static str),

    /// Dispatch or draw issued before `set_pipeline`.
    #[error("no pipeline bound in {0} pass")]
    PipelineNotSet(&'static str),

    /// Binding, vertex layout or entry point contract violated.
    #[error("layout mismatch: {0}")]
    LayoutMismatch(String),

    /// A map cycle is already open on this buffer.
    #[error("buffer `{0}` is already mapped")]
    AlreadyMapped(String),

    /// A view was accessed after its mapping was released.
    #[error("view of buffer `{0}` accessed after unmap")]
    UseAfterUnmap(String),

    /// The device could not make the range host-visible.
    #[error("mapping buffer `{label}` failed: {reason}")]
    MapFailed { label: String, reason: String },
}

pub type Result<T> = std::result::Result<T, GpuError>;

impl GpuError {
    pub(crate) fn invalid_usage(label: &str, reason: impl Into<String>) -> Self {
        Self::InvalidUsage {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn map_failed(label: &str, reason: impl Into<String>) -> Self {
        Self::MapFailed {
            label: label.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the one variant callers may treat as "feature off".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_message_shows_end() {
        let e = GpuError::OutOfBounds {
            label: "staging".into(),
            offset: 8,
            size: 16,
            extent: 20,
        };
        assert_eq!(e.to_string(), "`staging`: range 8..24 exceeds extent 20");
    }

    #[test]
    fn only_unavailable_is_soft() {
        assert!(GpuError::Unavailable("no adapter".into()).is_unavailable());
        assert!(!GpuError::AlreadyFinished.is_unavailable());
    }
}

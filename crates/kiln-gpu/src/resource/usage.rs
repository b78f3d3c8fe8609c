//! Usage-set and range rules shared by buffer creation, copies, bindings and mapping.

use crate::device::{GpuError, Result};

/// Usages that bind a buffer to a pipeline rather than to a copy.
const PIPELINE_USAGES: wgpu::BufferUsages = wgpu::BufferUsages::STORAGE
    .union(wgpu::BufferUsages::VERTEX)
    .union(wgpu::BufferUsages::INDEX)
    .union(wgpu::BufferUsages::UNIFORM)
    .union(wgpu::BufferUsages::INDIRECT);

/// Checks a usage set requested at creation time.
///
/// A map-read buffer may only be filled by a copy, so `MAP_READ` combines with
/// `COPY_DST` and nothing else.
pub(crate) fn validate_usage(label: &str, usage: wgpu::BufferUsages) -> Result<()> {
    if usage.is_empty() {
        return Err(GpuError::invalid_usage(label, "usage set is empty"));
    }

    if usage.contains(wgpu::BufferUsages::MAP_WRITE) {
        return Err(GpuError::invalid_usage(
            label,
            "MAP_WRITE is not supported; upload with write_buffer",
        ));
    }

    if usage.contains(wgpu::BufferUsages::MAP_READ) {
        let extra = usage - wgpu::BufferUsages::MAP_READ - wgpu::BufferUsages::COPY_DST;
        if !extra.is_empty() {
            let reason = if extra.intersects(PIPELINE_USAGES) {
                format!("MAP_READ cannot be combined with pipeline usage {extra:?}; copy into a staging buffer instead")
            } else {
                format!("MAP_READ can only be combined with COPY_DST, got {extra:?}")
            };
            return Err(GpuError::invalid_usage(label, reason));
        }
    }

    Ok(())
}

/// Fails with `InvalidUsage` unless `usage` contains every flag in `required`.
pub(crate) fn require(
    label: &str,
    usage: wgpu::BufferUsages,
    required: wgpu::BufferUsages,
    op: &str,
) -> Result<()> {
    if usage.contains(required) {
        Ok(())
    } else {
        Err(GpuError::invalid_usage(
            label,
            format!("{op} requires {required:?}, buffer has {usage:?}"),
        ))
    }
}

/// Fails with `OutOfBounds` unless `offset..offset + size` lies within `0..extent`.
pub(crate) fn check_range(label: &str, offset: u64, size: u64, extent: u64) -> Result<()> {
    match offset.checked_add(size) {
        Some(end) if end <= extent => Ok(()),
        _ => Err(GpuError::OutOfBounds {
            label: label.to_string(),
            offset,
            size,
            extent,
        }),
    }
}

pub(crate) fn check_alignment(
    label: &str,
    what: &'static str,
    value: u64,
    alignment: u64,
) -> Result<()> {
    if value % alignment == 0 {
        Ok(())
    } else {
        Err(GpuError::Misaligned {
            label: label.to_string(),
            what,
            value,
            alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::BufferUsages as U;

    // ── validate_usage ────────────────────────────────────────────────────

    #[test]
    fn empty_usage_rejected() {
        assert!(matches!(
            validate_usage("b", U::empty()),
            Err(GpuError::InvalidUsage { .. })
        ));
    }

    #[test]
    fn staging_usage_accepted() {
        assert!(validate_usage("b", U::MAP_READ | U::COPY_DST).is_ok());
        assert!(validate_usage("b", U::MAP_READ).is_ok());
    }

    #[test]
    fn map_read_with_storage_rejected() {
        let err = validate_usage("out", U::MAP_READ | U::STORAGE).unwrap_err();
        match err {
            GpuError::InvalidUsage { label, reason } => {
                assert_eq!(label, "out");
                assert!(reason.contains("staging"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn map_read_with_copy_src_rejected() {
        assert!(validate_usage("b", U::MAP_READ | U::COPY_SRC).is_err());
    }

    #[test]
    fn map_read_reason_names_the_conflict() {
        for usage in [U::UNIFORM, U::VERTEX, U::INDIRECT] {
            match validate_usage("b", U::MAP_READ | usage) {
                Err(GpuError::InvalidUsage { reason, .. }) => {
                    assert!(reason.contains("pipeline usage"), "{reason}");
                }
                other => panic!("unexpected result {other:?}"),
            }
        }
        match validate_usage("b", U::MAP_READ | U::COPY_SRC) {
            Err(GpuError::InvalidUsage { reason, .. }) => {
                assert!(reason.contains("only be combined with COPY_DST"), "{reason}");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn storage_copy_src_accepted() {
        assert!(validate_usage("b", U::STORAGE | U::COPY_SRC).is_ok());
        assert!(validate_usage("b", U::VERTEX | U::COPY_DST).is_ok());
    }

    // ── require ───────────────────────────────────────────────────────────

    #[test]
    fn require_reports_missing_flag() {
        assert!(require("v", U::VERTEX, U::COPY_DST, "write_buffer").is_err());
        assert!(require("v", U::VERTEX | U::COPY_DST, U::COPY_DST, "write_buffer").is_ok());
    }

    // ── check_range ───────────────────────────────────────────────────────

    #[test]
    fn range_inside_extent() {
        assert!(check_range("b", 0, 4000, 4000).is_ok());
        assert!(check_range("b", 3996, 4, 4000).is_ok());
        assert!(check_range("b", 4000, 0, 4000).is_ok());
    }

    #[test]
    fn range_past_extent() {
        assert!(matches!(
            check_range("b", 3996, 8, 4000),
            Err(GpuError::OutOfBounds { extent: 4000, .. })
        ));
        assert!(check_range("b", u64::MAX, 1, 4000).is_err());
    }

    #[test]
    fn alignment() {
        assert!(check_alignment("b", "offset", 256, 8).is_ok());
        assert!(matches!(
            check_alignment("b", "size", 6, 4),
            Err(GpuError::Misaligned { value: 6, alignment: 4, .. })
        ));
    }
}

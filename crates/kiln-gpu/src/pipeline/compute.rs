use std::sync::Arc;

/// Number of workgroups needed to cover `total_elements` invocations.
///
/// `ceil(total_elements / workgroup_size)`; the shader must bounds-check
/// invocations past `total_elements`.
pub fn workgroup_count(total_elements: u32, workgroup_size: u32) -> u32 {
    total_elements.div_ceil(workgroup_size.max(1))
}

/// Linked compute pipeline.
///
/// The workgroup size is fixed here and cannot change per dispatch.
#[derive(Debug, Clone)]
pub struct ComputePipeline {
    raw: wgpu::ComputePipeline,
    label: String,
    entry_point: String,
    workgroup_size: [u32; 3],
    group_layouts: Arc<[u64]>,
}

impl ComputePipeline {
    pub(crate) fn new(
        raw: wgpu::ComputePipeline,
        label: &str,
        entry_point: &str,
        workgroup_size: [u32; 3],
        group_layouts: Vec<u64>,
    ) -> Self {
        Self {
            raw,
            label: label.to_string(),
            entry_point: entry_point.to_string(),
            workgroup_size,
            group_layouts: group_layouts.into(),
        }
    }

    pub fn raw(&self) -> &wgpu::ComputePipeline {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    /// Layout id expected at each bind group slot.
    pub(crate) fn group_layouts(&self) -> &[u64] {
        &self.group_layouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousand_elements_by_64_is_16_groups() {
        assert_eq!(workgroup_count(1000, 64), 16);
    }

    #[test]
    fn exact_multiple_adds_no_group() {
        assert_eq!(workgroup_count(1024, 64), 16);
        assert_eq!(workgroup_count(1025, 64), 17);
    }

    #[test]
    fn small_and_empty_inputs() {
        assert_eq!(workgroup_count(0, 64), 0);
        assert_eq!(workgroup_count(1, 64), 1);
        assert_eq!(workgroup_count(5, 0), 5);
    }

    #[test]
    fn count_is_ceiling_for_all_sizes() {
        for w in [1u32, 3, 32, 64, 256] {
            for n in 0u32..600 {
                let c = workgroup_count(n, w);
                assert!(c * w >= n, "n={n} w={w}");
                assert!(c == 0 || (c - 1) * w < n, "n={n} w={w}");
            }
        }
    }
}

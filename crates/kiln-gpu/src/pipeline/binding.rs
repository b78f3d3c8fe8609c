use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::device::{GpuError, Result};
use crate::resource::GpuBuffer;
use crate::resource::usage;

use super::shader::{ResourceAccess, ResourceUse, ShaderStage};

/// Kind of buffer a binding slot accepts.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingKind {
    Storage { read_only: bool },
    Uniform,
}

/// One fixed slot of a bind group layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BindingSlot {
    pub binding: u32,
    pub kind: BindingKind,
    pub visibility: wgpu::ShaderStages,
}

impl BindingSlot {
    pub const fn storage(binding: u32, read_only: bool, visibility: wgpu::ShaderStages) -> Self {
        Self {
            binding,
            kind: BindingKind::Storage { read_only },
            visibility,
        }
    }

    pub const fn uniform(binding: u32, visibility: wgpu::ShaderStages) -> Self {
        Self {
            binding,
            kind: BindingKind::Uniform,
            visibility,
        }
    }

    /// Usage a buffer must carry to be bound to this slot.
    pub fn required_usage(&self) -> wgpu::BufferUsages {
        match self.kind {
            BindingKind::Storage { .. } => wgpu::BufferUsages::STORAGE,
            BindingKind::Uniform => wgpu::BufferUsages::UNIFORM,
        }
    }

    /// Largest buffer the device accepts in a slot of this kind.
    pub(crate) fn max_binding_size(&self, limits: &wgpu::Limits) -> u64 {
        match self.kind {
            BindingKind::Storage { .. } => u64::from(limits.max_storage_buffer_binding_size),
            BindingKind::Uniform => u64::from(limits.max_uniform_buffer_binding_size),
        }
    }

    pub(crate) fn entry(&self) -> wgpu::BindGroupLayoutEntry {
        let ty = match self.kind {
            BindingKind::Storage { read_only } => wgpu::BufferBindingType::Storage { read_only },
            BindingKind::Uniform => wgpu::BufferBindingType::Uniform,
        };
        wgpu::BindGroupLayoutEntry {
            binding: self.binding,
            visibility: self.visibility,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    /// Whether a shader access is satisfied by this slot.
    fn accepts(&self, access: ResourceAccess) -> bool {
        match (self.kind, access) {
            (BindingKind::Uniform, ResourceAccess::Uniform) => true,
            (BindingKind::Storage { read_only }, ResourceAccess::Storage { writable }) => {
                !(writable && read_only)
            }
            _ => false,
        }
    }
}

static NEXT_LAYOUT_ID: AtomicU64 = AtomicU64::new(1);

/// Bind group layout plus the slot contract it was built from.
#[derive(Debug, Clone)]
pub struct BindGroupLayout {
    raw: wgpu::BindGroupLayout,
    label: String,
    slots: Arc<[BindingSlot]>,
    id: u64,
}

impl BindGroupLayout {
    pub(crate) fn new(raw: wgpu::BindGroupLayout, label: &str, slots: &[BindingSlot]) -> Self {
        Self {
            raw,
            label: label.to_string(),
            slots: slots.into(),
            id: NEXT_LAYOUT_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn raw(&self) -> &wgpu::BindGroupLayout {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

/// Concrete buffers bound to the slots of a layout.
///
/// Holds a handle to every bound buffer so they stay alive as long as the
/// group is referenced by a pass.
#[derive(Debug, Clone)]
pub struct BindGroup {
    raw: wgpu::BindGroup,
    label: String,
    layout_id: u64,
    buffers: Arc<[GpuBuffer]>,
}

impl BindGroup {
    pub(crate) fn new(
        raw: wgpu::BindGroup,
        label: &str,
        layout: &BindGroupLayout,
        buffers: Vec<GpuBuffer>,
    ) -> Self {
        Self {
            raw,
            label: label.to_string(),
            layout_id: layout.id(),
            buffers: buffers.into(),
        }
    }

    pub fn raw(&self) -> &wgpu::BindGroup {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn buffers(&self) -> &[GpuBuffer] {
        &self.buffers
    }

    pub(crate) fn layout_id(&self) -> u64 {
        self.layout_id
    }
}

/// Checks slot numbers of a layout are unique and visible somewhere.
pub(crate) fn validate_slots(label: &str, slots: &[BindingSlot]) -> Result<()> {
    for (i, slot) in slots.iter().enumerate() {
        if slots[..i].iter().any(|s| s.binding == slot.binding) {
            return Err(GpuError::LayoutMismatch(format!(
                "layout `{label}`: binding {} declared twice",
                slot.binding
            )));
        }
        if slot.visibility.is_empty() {
            return Err(GpuError::LayoutMismatch(format!(
                "layout `{label}`: binding {} is visible to no stage",
                slot.binding
            )));
        }
    }
    Ok(())
}

/// Pairs every slot of `slots` with exactly one buffer from `entries`.
///
/// Fails with `LayoutMismatch` for missing, duplicate or unknown bindings,
/// with `InvalidUsage` when a buffer lacks the usage its slot requires, and
/// with `OutOfBounds` when a buffer is larger than the device lets a slot of
/// its kind bind.
pub(crate) fn match_entries<'b>(
    layout_label: &str,
    slots: &[BindingSlot],
    entries: &[(u32, &'b GpuBuffer)],
    limits: &wgpu::Limits,
) -> Result<Vec<(u32, &'b GpuBuffer)>> {
    if let Some((binding, _)) = entries
        .iter()
        .find(|(b, _)| !slots.iter().any(|s| s.binding == *b))
    {
        return Err(GpuError::LayoutMismatch(format!(
            "layout `{layout_label}` has no binding {binding}"
        )));
    }

    let mut matched = Vec::with_capacity(slots.len());
    for slot in slots {
        let mut bound = entries.iter().filter(|(b, _)| *b == slot.binding);
        let buffer = match (bound.next(), bound.next()) {
            (Some((_, buffer)), None) => *buffer,
            (None, _) => {
                return Err(GpuError::LayoutMismatch(format!(
                    "layout `{layout_label}`: binding {} left unbound",
                    slot.binding
                )));
            }
            (Some(_), Some(_)) => {
                return Err(GpuError::LayoutMismatch(format!(
                    "layout `{layout_label}`: binding {} bound more than once",
                    slot.binding
                )));
            }
        };

        buffer.require(slot.required_usage(), &format!("binding {}", slot.binding))?;
        if let BindingKind::Storage { .. } = slot.kind {
            usage::check_alignment(buffer.label(), "storage size", buffer.size(), 4)?;
        }
        usage::check_range(buffer.label(), 0, buffer.size(), slot.max_binding_size(limits))?;
        matched.push((slot.binding, buffer));
    }
    Ok(matched)
}

/// Checks that the resources an entry point uses are provided by `layouts`.
pub(crate) fn check_shader_resources(
    entry: &str,
    stage: ShaderStage,
    resources: &[ResourceUse],
    layouts: &[&BindGroupLayout],
) -> Result<()> {
    for r in resources {
        let layout = layouts.get(r.group as usize).ok_or_else(|| {
            GpuError::LayoutMismatch(format!(
                "entry point `{entry}` uses group {} but the pipeline has {} bind group layout(s)",
                r.group,
                layouts.len()
            ))
        })?;

        let slot = layout
            .slots()
            .iter()
            .find(|s| s.binding == r.binding)
            .ok_or_else(|| {
                GpuError::LayoutMismatch(format!(
                    "entry point `{entry}` uses @group({}) @binding({}) missing from layout `{}`",
                    r.group,
                    r.binding,
                    layout.label()
                ))
            })?;

        if !slot.accepts(r.access) {
            return Err(GpuError::LayoutMismatch(format!(
                "@group({}) @binding({}): shader access {:?} does not fit slot {:?}",
                r.group, r.binding, r.access, slot.kind
            )));
        }
        if !slot.visibility.contains(stage.wgpu_stages()) {
            return Err(GpuError::LayoutMismatch(format!(
                "@group({}) @binding({}) is not visible to the {stage:?} stage",
                r.group, r.binding
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CS: wgpu::ShaderStages = wgpu::ShaderStages::COMPUTE;

    #[test]
    fn duplicate_slot_rejected() {
        let slots = [
            BindingSlot::storage(0, false, CS),
            BindingSlot::uniform(0, CS),
        ];
        assert!(matches!(
            validate_slots("l", &slots),
            Err(GpuError::LayoutMismatch(_))
        ));
    }

    #[test]
    fn invisible_slot_rejected() {
        let slots = [BindingSlot::storage(0, false, wgpu::ShaderStages::NONE)];
        assert!(validate_slots("l", &slots).is_err());
    }

    #[test]
    fn read_only_slot_refuses_writes() {
        let ro = BindingSlot::storage(0, true, CS);
        let rw = BindingSlot::storage(0, false, CS);
        assert!(!ro.accepts(ResourceAccess::Storage { writable: true }));
        assert!(ro.accepts(ResourceAccess::Storage { writable: false }));
        assert!(rw.accepts(ResourceAccess::Storage { writable: true }));
        assert!(!rw.accepts(ResourceAccess::Uniform));
    }

    #[test]
    fn shader_group_outside_layouts() {
        let uses = [ResourceUse {
            group: 1,
            binding: 0,
            access: ResourceAccess::Storage { writable: true },
        }];
        let err = check_shader_resources("main", ShaderStage::Compute, &uses, &[]).unwrap_err();
        assert!(matches!(err, GpuError::LayoutMismatch(_)));
    }

    #[test]
    fn binding_size_limit_follows_kind() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1 << 20,
            max_uniform_buffer_binding_size: 1 << 10,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert_eq!(BindingSlot::storage(0, true, CS).max_binding_size(&limits), 1 << 20);
        assert_eq!(BindingSlot::uniform(0, CS).max_binding_size(&limits), 1 << 10);
    }

    #[test]
    fn required_usage_follows_kind() {
        assert_eq!(
            BindingSlot::storage(0, true, CS).required_usage(),
            wgpu::BufferUsages::STORAGE
        );
        assert_eq!(
            BindingSlot::uniform(0, CS).required_usage(),
            wgpu::BufferUsages::UNIFORM
        );
    }
}

use std::sync::Arc;

use crate::device::{GpuError, Result};

/// Pipeline stage of a shader entry point.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl ShaderStage {
    pub(crate) fn wgpu_stages(self) -> wgpu::ShaderStages {
        match self {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
            ShaderStage::Compute => wgpu::ShaderStages::COMPUTE,
        }
    }
}

/// Buffer resource a shader entry point reads or writes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ResourceUse {
    pub group: u32,
    pub binding: u32,
    pub access: ResourceAccess,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceAccess {
    Uniform,
    Storage { writable: bool },
    /// Textures, samplers and anything else this crate does not bind.
    Other,
}

/// Reflected metadata of one entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub stage: ShaderStage,
    /// `@workgroup_size`; `[0, 0, 0]` outside compute.
    pub workgroup_size: [u32; 3],
    /// `@location` inputs, including those nested in struct arguments.
    pub input_locations: Vec<u32>,
    /// Resources the entry point statically uses.
    pub resources: Vec<ResourceUse>,
}

/// Compiled shader module plus the entry points it declares.
#[derive(Debug, Clone)]
pub struct ShaderModule {
    raw: wgpu::ShaderModule,
    label: String,
    entry_points: Arc<[EntryPoint]>,
}

impl ShaderModule {
    pub(crate) fn new(raw: wgpu::ShaderModule, label: &str, entry_points: Vec<EntryPoint>) -> Self {
        Self {
            raw,
            label: label.to_string(),
            entry_points: entry_points.into(),
        }
    }

    pub fn raw(&self) -> &wgpu::ShaderModule {
        &self.raw
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// Looks up `name` and checks it belongs to `stage`.
    pub fn entry_point(&self, name: &str, stage: ShaderStage) -> Result<&EntryPoint> {
        let ep = self
            .entry_points
            .iter()
            .find(|ep| ep.name == name)
            .ok_or_else(|| {
                GpuError::LayoutMismatch(format!(
                    "shader `{}` has no entry point `{name}`",
                    self.label
                ))
            })?;

        if ep.stage != stage {
            return Err(GpuError::LayoutMismatch(format!(
                "entry point `{name}` of `{}` is a {:?} stage, expected {stage:?}",
                self.label, ep.stage
            )));
        }
        Ok(ep)
    }
}

/// Parses and validates WGSL, returning the entry points it declares.
///
/// Any parse or validation failure becomes `CompileError` with the front-end
/// diagnostic rendered against `source`.
pub(crate) fn reflect_wgsl(label: &str, source: &str) -> Result<Vec<EntryPoint>> {
    let compile_error = |diagnostic: String| GpuError::CompileError {
        label: label.to_string(),
        diagnostic,
    };

    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| compile_error(e.emit_to_string(source)))?;

    let mut out = Vec::with_capacity(module.entry_points.len());
    for (index, ep) in module.entry_points.iter().enumerate() {
        let stage = match ep.stage {
            naga::ShaderStage::Vertex => ShaderStage::Vertex,
            naga::ShaderStage::Fragment => ShaderStage::Fragment,
            naga::ShaderStage::Compute => ShaderStage::Compute,
            #[allow(unreachable_patterns)]
            _ => continue,
        };

        let workgroup_size = if stage == ShaderStage::Compute {
            ep.workgroup_size
        } else {
            [0; 3]
        };

        out.push(EntryPoint {
            name: ep.name.clone(),
            stage,
            workgroup_size,
            input_locations: input_locations(&module, &ep.function),
            resources: resources_used(&module, info.get_entry_point(index)),
        });
    }

    Ok(out)
}

fn input_locations(module: &naga::Module, function: &naga::Function) -> Vec<u32> {
    let mut locations = Vec::new();
    for arg in &function.arguments {
        match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(_) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for m in members {
                        if let Some(naga::Binding::Location { location, .. }) = &m.binding {
                            locations.push(*location);
                        }
                    }
                }
            }
        }
    }
    locations.sort_unstable();
    locations
}

fn resources_used(module: &naga::Module, info: &naga::valid::FunctionInfo) -> Vec<ResourceUse> {
    module
        .global_variables
        .iter()
        .filter(|(handle, _)| !info[*handle].is_empty())
        .filter_map(|(_, var)| {
            let rb = var.binding.as_ref()?;
            let access = match var.space {
                naga::AddressSpace::Uniform => ResourceAccess::Uniform,
                naga::AddressSpace::Storage { access } => ResourceAccess::Storage {
                    writable: access.contains(naga::StorageAccess::STORE),
                },
                _ => ResourceAccess::Other,
            };
            Some(ResourceUse {
                group: rb.group,
                binding: rb.binding,
                access,
            })
        })
        .collect()
}

use crate::device::{GpuError, Result};

/// Stride and attribute offsets must be multiples of this.
const VERTEX_ALIGNMENT: u64 = 4;

/// One attribute inside a vertex buffer element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    /// `@location` the attribute feeds.
    pub location: u32,
    /// Byte offset from the start of the element.
    pub offset: u64,
    pub format: wgpu::VertexFormat,
}

impl VertexAttribute {
    pub const fn new(location: u32, offset: u64, format: wgpu::VertexFormat) -> Self {
        Self {
            location,
            offset,
            format,
        }
    }

    /// First byte past the attribute.
    pub fn end(&self) -> u64 {
        self.offset + self.format.size()
    }
}

/// Byte layout of one vertex buffer slot.
///
/// The layout must describe exactly the bytes the caller uploads: the builder
/// checks every attribute fits inside `stride`, since a mismatch is not caught
/// on the GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes between consecutive elements.
    pub stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    pub fn per_vertex(stride: u64, attributes: impl Into<Vec<VertexAttribute>>) -> Self {
        Self {
            stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attributes.into(),
        }
    }

    pub fn per_instance(stride: u64, attributes: impl Into<Vec<VertexAttribute>>) -> Self {
        Self {
            stride,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: attributes.into(),
        }
    }

    /// Checks stride/offset/format bookkeeping.
    ///
    /// For every attribute: `offset + format width <= stride` and the offset is
    /// 4-byte aligned. The stride itself must be a non-zero multiple of 4 and
    /// locations must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 || self.stride % VERTEX_ALIGNMENT != 0 {
            return Err(GpuError::LayoutMismatch(format!(
                "vertex stride {} must be a non-zero multiple of {}",
                self.stride,
                VERTEX_ALIGNMENT
            )));
        }
        if self.attributes.is_empty() {
            return Err(GpuError::LayoutMismatch(
                "vertex layout declares no attributes".to_string(),
            ));
        }

        for (i, attr) in self.attributes.iter().enumerate() {
            if attr.offset % VERTEX_ALIGNMENT != 0 {
                return Err(GpuError::LayoutMismatch(format!(
                    "attribute @location({}) offset {} is not 4-byte aligned",
                    attr.location, attr.offset
                )));
            }
            if attr.end() > self.stride {
                return Err(GpuError::LayoutMismatch(format!(
                    "attribute @location({}) {:?} at offset {} ends at byte {}, past stride {}",
                    attr.location,
                    attr.format,
                    attr.offset,
                    attr.end(),
                    self.stride
                )));
            }
            if self.attributes[..i].iter().any(|a| a.location == attr.location) {
                return Err(GpuError::LayoutMismatch(format!(
                    "@location({}) declared twice",
                    attr.location
                )));
            }
        }
        Ok(())
    }

    /// Number of whole elements a buffer of `buffer_size` bytes holds.
    ///
    /// The last element only needs to extend to its final attribute.
    pub fn element_capacity(&self, buffer_size: u64) -> u64 {
        let tail = self.attributes.iter().map(VertexAttribute::end).max().unwrap_or(0);
        if buffer_size < tail || self.stride == 0 {
            return 0;
        }
        (buffer_size - tail) / self.stride + 1
    }

    pub(crate) fn raw_attributes(&self) -> Vec<wgpu::VertexAttribute> {
        self.attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format,
                offset: a.offset,
                shader_location: a.location,
            })
            .collect()
    }
}

/// Validates a set of layouts bound together and the shader inputs they feed.
///
/// Locations must be unique across all slots and every location consumed by
/// the vertex entry point must be provided.
pub(crate) fn check_vertex_inputs(
    entry: &str,
    layouts: &[VertexLayout],
    shader_inputs: &[u32],
) -> Result<()> {
    let mut provided: Vec<u32> = Vec::new();
    for layout in layouts {
        layout.validate()?;
        for attr in &layout.attributes {
            if provided.contains(&attr.location) {
                return Err(GpuError::LayoutMismatch(format!(
                    "@location({}) provided by more than one vertex buffer",
                    attr.location
                )));
            }
            provided.push(attr.location);
        }
    }

    if let Some(missing) = shader_inputs.iter().find(|l| !provided.contains(l)) {
        return Err(GpuError::LayoutMismatch(format!(
            "vertex entry point `{entry}` reads @location({missing}) which no vertex buffer provides"
        )));
    }
    Ok(())
}

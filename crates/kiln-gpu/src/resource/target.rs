use crate::command::ColorAttachment;
use crate::device::{GpuContext, GpuError, Result};

/// Offscreen color texture used as a render-pass attachment.
///
/// Stands in for the presentation surface: a render pass writes into its view,
/// and a copy can move the pixels into a staging buffer for sampling.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Attachment that clears the target to `clear` before drawing.
    pub fn attachment(&self, clear: wgpu::Color) -> ColorAttachment {
        ColorAttachment::clear(self.view.clone(), self.format, clear)
    }

    /// Bytes per texel of the target format.
    pub fn bytes_per_pixel(&self) -> u32 {
        texel_size(self.format).unwrap_or(4)
    }

    /// Row pitch of a texture-to-buffer copy, padded to the copy alignment.
    pub fn padded_bytes_per_row(&self) -> u32 {
        padded_row(self.width * self.bytes_per_pixel())
    }

    /// Size of the buffer a full-target copy needs.
    pub fn readback_size(&self) -> u64 {
        u64::from(self.padded_bytes_per_row()) * u64::from(self.height)
    }

    /// Drops the per-row padding of a copied image, returning tightly packed rows.
    pub fn unpad_rows(&self, padded: &[u8]) -> Vec<u8> {
        let row = (self.width * self.bytes_per_pixel()) as usize;
        let pitch = self.padded_bytes_per_row() as usize;

        padded
            .chunks(pitch)
            .take(self.height as usize)
            .flat_map(|r| &r[..row.min(r.len())])
            .copied()
            .collect()
    }
}

impl GpuContext {
    /// Creates an offscreen color target that can be rendered to and copied from.
    pub fn create_render_target(
        &self,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize {
                label: label.to_string(),
                size: u64::from(width) * u64::from(height),
            });
        }
        let max = self.device().limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(GpuError::InvalidSize {
                label: label.to_string(),
                size: u64::from(width.max(height)),
            });
        }
        if texel_size(format).is_none() {
            return Err(GpuError::LayoutMismatch(format!(
                "render target `{label}`: format {format:?} cannot be copied to a buffer"
            )));
        }

        let texture = self.device().create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("created render target `{label}`: {width}x{height} {format:?}");

        Ok(RenderTarget {
            texture,
            view,
            label: label.to_string(),
            format,
            width,
            height,
        })
    }
}

fn texel_size(format: wgpu::TextureFormat) -> Option<u32> {
    format.block_copy_size(None)
}

fn padded_row(unpadded: u32) -> u32 {
    unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};

use crate::command::{ColorAttachment, CommandSession, CommandStats};
use crate::device::{GpuContext, GpuError, Result};
use crate::pipeline::{PipelineBuilder, RenderPipeline, RenderPipelineDesc, VertexAttribute, VertexLayout};
use crate::resource::GpuBuffer;

// ── vertex ────────────────────────────────────────────────────────────────

/// Clip-space position plus RGBA color, both `vec4f`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    pub position: [f32; 4],
    pub color: [f32; 4],
}

impl ColoredVertex {
    pub const fn new(position: [f32; 4], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::per_vertex(
            std::mem::size_of::<ColoredVertex>() as u64,
            [
                VertexAttribute::new(0, 0, wgpu::VertexFormat::Float32x4),
                VertexAttribute::new(1, 16, wgpu::VertexFormat::Float32x4),
            ],
        )
    }
}

/// Red top, green bottom-left, blue bottom-right.
pub const TRIANGLE: [ColoredVertex; 3] = [
    ColoredVertex::new([0.0, 0.6, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]),
    ColoredVertex::new([-0.5, -0.6, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]),
    ColoredVertex::new([0.5, -0.6, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]),
];

// ── config ────────────────────────────────────────────────────────────────

/// Parameters of the triangle workload.
#[derive(Debug, Clone)]
pub struct TriangleConfig {
    /// Size of the offscreen target used by [`Triangle::render_offscreen`].
    pub width: u32,
    pub height: u32,
    /// Format of every attachment the pipeline draws into.
    pub format: wgpu::TextureFormat,
    pub clear: wgpu::Color,
    pub vertices: Vec<ColoredVertex>,
    /// WGSL with `vertex_main` and `fragment_main` entry points.
    pub source: Cow<'static, str>,
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
            format: wgpu::TextureFormat::Rgba8Unorm,
            clear: wgpu::Color::BLACK,
            vertices: TRIANGLE.to_vec(),
            source: Cow::Borrowed(include_str!("shaders/triangle.wgsl")),
        }
    }
}

// ── rendered image ────────────────────────────────────────────────────────

/// Tightly packed pixels read back from an offscreen render.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub bytes_per_pixel: u32,
    pub pixels: Vec<u8>,
    pub stats: CommandStats,
}

impl RenderedImage {
    /// Texel at `(x, y)`, origin top-left.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.bytes_per_pixel as usize;
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        self.pixels.get(start..start + bpp)
    }
}

// ── program ───────────────────────────────────────────────────────────────

/// Render workload: one triangle-list draw of vertex-colored vertices.
pub struct Triangle {
    config: TriangleConfig,
    pipeline: RenderPipeline,
    vertices: GpuBuffer,
}

impl Triangle {
    pub fn new(ctx: &GpuContext, config: TriangleConfig) -> Result<Self> {
        let contents: &[u8] = bytemuck::cast_slice(&config.vertices);
        if contents.is_empty() {
            return Err(GpuError::InvalidSize {
                label: "triangle vertices".to_string(),
                size: 0,
            });
        }

        let vertices = ctx.create_buffer(
            "triangle vertices",
            contents.len() as u64,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        )?;
        ctx.write_buffer(&vertices, 0, contents)?;

        let builder = PipelineBuilder::new(ctx);
        let module = builder.compile_shader("triangle", &config.source)?;
        let pipeline = builder.build_render_pipeline(
            &module,
            &RenderPipelineDesc {
                label: "triangle pipeline",
                vertex_entry: "vertex_main",
                fragment_entry: "fragment_main",
                vertex_layouts: &[ColoredVertex::layout()],
                bind_group_layouts: &[],
                target_format: config.format,
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
        )?;

        Ok(Self {
            config,
            pipeline,
            vertices,
        })
    }

    pub fn config(&self) -> &TriangleConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn vertex_count(&self) -> u32 {
        self.config.vertices.len() as u32
    }

    /// Records the render pass into `attachment`.
    pub fn record(&self, session: &mut CommandSession<'_>, attachment: ColorAttachment) -> Result<()> {
        let mut pass = session.begin_render_pass("triangle pass", attachment)?;
        pass.set_pipeline(&self.pipeline)?;
        pass.set_vertex_buffer(0, &self.vertices)?;
        pass.draw(self.vertex_count())?;
        pass.end()
    }

    /// Renders into a fresh offscreen target and reads the pixels back.
    pub async fn render_offscreen(&self, ctx: &GpuContext) -> Result<RenderedImage> {
        let target = ctx.create_render_target(
            "triangle target",
            self.config.width,
            self.config.height,
            self.config.format,
        )?;
        let staging = ctx.create_staging_buffer("triangle readback", target.readback_size())?;

        let mut session = ctx.begin_encoding("triangle");
        self.record(&mut session, target.attachment(self.config.clear))?;
        session.copy_target_to_buffer(&target, &staging)?;
        let commands = session.finish()?;
        let stats = commands.stats();

        let _submission = ctx.submit(commands)?;
        let padded = ctx.read_buffer(&staging, 0, target.readback_size()).await?;

        log::info!(
            "triangle: {} draw(s), {} vertices into {}x{} {:?}",
            stats.draws,
            stats.vertices,
            target.width(),
            target.height(),
            target.format()
        );
        Ok(RenderedImage {
            width: target.width(),
            height: target.height(),
            format: target.format(),
            bytes_per_pixel: target.bytes_per_pixel(),
            pixels: target.unpad_rows(&padded),
            stats,
        })
    }

    /// Blocking form of [`render_offscreen`](Self::render_offscreen).
    pub fn render_offscreen_blocking(&self, ctx: &GpuContext) -> Result<RenderedImage> {
        pollster::block_on(self.render_offscreen(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<ColoredVertex>(), 32);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&TRIANGLE).len(), 96);
    }

    #[test]
    fn layout_covers_both_attributes() {
        let layout = ColoredVertex::layout();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.stride, 32);
        assert_eq!(layout.element_capacity(96), 3);
    }

    #[test]
    fn pixel_lookup_is_row_major() {
        let image = RenderedImage {
            width: 2,
            height: 2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            bytes_per_pixel: 4,
            pixels: (0u8..16).collect(),
            stats: CommandStats::default(),
        };
        assert_eq!(image.pixel(1, 0), Some(&[4u8, 5, 6, 7][..]));
        assert_eq!(image.pixel(0, 1), Some(&[8u8, 9, 10, 11][..]));
        assert_eq!(image.pixel(2, 0), None);
    }
}

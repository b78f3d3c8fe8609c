use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use kiln_gpu::logging::{init_logging, LoggingConfig};
use kiln_gpu::programs::{IndexTransform, IndexTransformConfig, RenderedImage, Triangle, TriangleConfig};
use kiln_gpu::{DeviceInit, GpuContext};

/// Runs the compute program, then renders the triangle offscreen.
///
/// Usage: `kiln-demo [triangle.png]`. Without a path the image is only sampled.
fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let png_path = std::env::args_os().nth(1).map(PathBuf::from);

    let ctx = match GpuContext::acquire(DeviceInit::default()) {
        Ok(ctx) => ctx,
        Err(e) if e.is_unavailable() => {
            log::warn!("GPU unavailable, nothing to run: {e}");
            return Ok(());
        }
        Err(e) => return Err(e).context("failed to acquire GPU device"),
    };

    let info = ctx.adapter_info();
    println!("adapter   {} ({:?})", info.name, info.backend);

    run_compute(&ctx)?;
    let image = run_triangle(&ctx)?;

    if let Some(path) = png_path {
        write_png(&image, &path)?;
        println!("wrote     {}", path.display());
    }
    Ok(())
}

fn run_compute(ctx: &GpuContext) -> Result<()> {
    let config = IndexTransformConfig::default();
    let expected = config.expected();

    let program =
        IndexTransform::new(ctx, config).context("failed to build index transform program")?;
    let out = program
        .run_blocking(ctx)
        .context("index transform run failed")?;

    let mismatches = out
        .values
        .iter()
        .zip(&expected)
        .filter(|(got, want)| got != want)
        .count();

    println!(
        "compute   {} elements, {} workgroups, first {:?}, last {:?}",
        out.values.len(),
        out.workgroups,
        out.values.first(),
        out.values.last()
    );
    if mismatches > 0 {
        log::error!("{mismatches} element(s) differ from the expected values");
        anyhow::bail!("compute result mismatch");
    }
    Ok(())
}

fn run_triangle(ctx: &GpuContext) -> Result<RenderedImage> {
    let triangle =
        Triangle::new(ctx, TriangleConfig::default()).context("failed to build triangle program")?;
    let image = triangle
        .render_offscreen_blocking(ctx)
        .context("triangle render failed")?;

    let center = image.pixel(image.width / 2, image.height * 3 / 5);
    println!(
        "render    {}x{} {:?}, {} draw(s) of {} vertices, center pixel {:?}",
        image.width, image.height, image.format, image.stats.draws, image.stats.vertices, center
    );
    Ok(image)
}

fn write_png(image: &RenderedImage, path: &Path) -> Result<()> {
    let rgba = image::RgbaImage::from_raw(image.width, image.height, rgba8_pixels(image)?)
        .context("pixel buffer does not match the image size")?;
    rgba.save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Pixels in RGBA8 order. BGRA8 targets get their red and blue swapped.
fn rgba8_pixels(image: &RenderedImage) -> Result<Vec<u8>> {
    use wgpu::TextureFormat as F;

    match image.format {
        F::Rgba8Unorm | F::Rgba8UnormSrgb => Ok(image.pixels.clone()),
        F::Bgra8Unorm | F::Bgra8UnormSrgb => {
            let mut pixels = image.pixels.clone();
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
            Ok(pixels)
        }
        other => anyhow::bail!("cannot encode {other:?} as RGBA8"),
    }
}

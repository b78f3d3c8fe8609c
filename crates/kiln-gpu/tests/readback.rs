mod common;

use kiln_gpu::{GpuBuffer, GpuContext, GpuError};

fn filled_staging(ctx: &GpuContext, values: &[f32]) -> GpuBuffer {
    let bytes: &[u8] = bytemuck::cast_slice(values);
    let src = ctx
        .create_buffer_init("source", bytes, wgpu::BufferUsages::COPY_SRC)
        .unwrap();
    let staging = ctx.create_staging_buffer("staging", bytes.len() as u64).unwrap();

    let mut session = ctx.begin_encoding("fill staging");
    session
        .copy_buffer_to_buffer(&src, 0, &staging, 0, bytes.len() as u64)
        .unwrap();
    let submission = ctx.submit(session.finish().unwrap()).unwrap();
    ctx.wait_for(&submission).unwrap();
    staging
}

#[test]
fn copied_values_read_back() {
    let Some(ctx) = common::acquire() else { return };

    let staging = filled_staging(&ctx, &[1.0, 2.0, 3.0, 4.0]);
    let bytes = pollster::block_on(ctx.read_buffer(&staging, 0, 16)).unwrap();
    let values: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn partial_map_exposes_only_its_range() {
    let Some(ctx) = common::acquire() else { return };

    let staging = filled_staging(&ctx, &[1.0, 2.0, 3.0, 4.0]);
    let mapped = pollster::block_on(ctx.map_for_read(&staging, 8, 8)).unwrap();

    assert_eq!(mapped.full_view().to_vec::<f32>().unwrap(), vec![3.0, 4.0]);
    assert_eq!(mapped.view(12, 4).unwrap().to_vec::<f32>().unwrap(), vec![4.0]);

    // Before the mapped range, past it, and past the buffer.
    assert!(matches!(mapped.view(4, 4), Err(GpuError::OutOfBounds { .. })));
    assert!(matches!(mapped.view(12, 8), Err(GpuError::OutOfBounds { .. })));
    assert!(matches!(mapped.view(16, 4), Err(GpuError::OutOfBounds { .. })));
}

#[test]
fn second_map_while_open_fails() {
    let Some(ctx) = common::acquire() else { return };

    let staging = ctx.create_staging_buffer("staging", 16).unwrap();
    let first = pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();

    assert!(matches!(
        pollster::block_on(ctx.map_for_read(&staging, 0, 16)),
        Err(GpuError::AlreadyMapped(_))
    ));
    assert!(matches!(
        ctx.write_buffer(&staging, 0, &[0; 4]),
        Err(GpuError::AlreadyMapped(_))
    ));

    first.unmap();
    let again = pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();
    assert_eq!(again.full_view().to_bytes().unwrap(), vec![0; 16]);
}

#[test]
fn view_after_unmap_fails() {
    let Some(ctx) = common::acquire() else { return };

    let staging = filled_staging(&ctx, &[7.0, 8.0]);
    let mapped = pollster::block_on(ctx.map_for_read(&staging, 0, 8)).unwrap();
    let view = mapped.full_view();
    assert_eq!(view.to_vec::<f32>().unwrap(), vec![7.0, 8.0]);

    mapped.unmap();
    assert!(matches!(view.to_bytes(), Err(GpuError::UseAfterUnmap(_))));

    // A later cycle does not revive the old view.
    let remapped = pollster::block_on(ctx.map_for_read(&staging, 0, 8)).unwrap();
    assert!(matches!(view.to_bytes(), Err(GpuError::UseAfterUnmap(_))));
    assert_eq!(remapped.full_view().to_vec::<f32>().unwrap(), vec![7.0, 8.0]);
}

#[test]
fn copy_into_requires_exact_length() {
    let Some(ctx) = common::acquire() else { return };

    let staging = filled_staging(&ctx, &[1.0, 2.0]);
    let mapped = pollster::block_on(ctx.map_for_read(&staging, 0, 8)).unwrap();
    let view = mapped.full_view();

    let mut short = [0u8; 4];
    assert!(matches!(
        view.copy_into(&mut short),
        Err(GpuError::OutOfBounds { .. })
    ));

    let mut exact = [0u8; 8];
    view.copy_into(&mut exact).unwrap();
    assert_eq!(&exact[..4], &1.0f32.to_le_bytes());
}

#[test]
fn typed_view_needs_whole_elements() {
    let Some(ctx) = common::acquire() else { return };

    let staging = ctx.create_staging_buffer("staging", 16).unwrap();
    let mapped = pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();
    let view = mapped.view(0, 6).unwrap();

    assert_eq!(view.to_bytes().unwrap().len(), 6);
    assert!(matches!(
        view.to_vec::<f32>(),
        Err(GpuError::Misaligned { .. })
    ));
}

#[test]
fn map_requires_map_read_usage() {
    let Some(ctx) = common::acquire() else { return };

    let storage = ctx
        .create_buffer(
            "storage",
            16,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )
        .unwrap();
    assert!(matches!(
        pollster::block_on(ctx.map_for_read(&storage, 0, 16)),
        Err(GpuError::MapFailed { .. })
    ));
}

#[test]
fn map_range_validated() {
    let Some(ctx) = common::acquire() else { return };

    let staging = ctx.create_staging_buffer("staging", 16).unwrap();
    assert!(matches!(
        pollster::block_on(ctx.map_for_read(&staging, 8, 16)),
        Err(GpuError::OutOfBounds { .. })
    ));
    assert!(matches!(
        pollster::block_on(ctx.map_for_read(&staging, 4, 8)),
        Err(GpuError::Misaligned { .. })
    ));
    assert!(matches!(
        pollster::block_on(ctx.map_for_read(&staging, 0, 0)),
        Err(GpuError::InvalidSize { .. })
    ));

    // Rejected requests never open a cycle.
    pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();
}

#[test]
fn buffer_creation_contracts() {
    let Some(ctx) = common::acquire() else { return };

    assert!(matches!(
        ctx.create_buffer("zero", 0, wgpu::BufferUsages::STORAGE),
        Err(GpuError::InvalidSize { .. })
    ));
    assert!(matches!(
        ctx.create_buffer("none", 16, wgpu::BufferUsages::empty()),
        Err(GpuError::InvalidUsage { .. })
    ));
    assert!(matches!(
        ctx.create_buffer(
            "mapped storage",
            16,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::STORAGE
        ),
        Err(GpuError::InvalidUsage { .. })
    ));
}

#[test]
fn buffer_size_capped_by_device_limit() {
    let Some(ctx) = common::acquire() else { return };

    let max = ctx.device().limits().max_buffer_size;
    assert_eq!(
        ctx.create_buffer("huge", max + 4, wgpu::BufferUsages::STORAGE)
            .unwrap_err(),
        GpuError::InvalidSize {
            label: "huge".into(),
            size: max + 4,
        }
    );

    // The zeroed allocation stays untouched; the size is rejected first.
    let Ok(len) = usize::try_from(max + 4) else { return };
    let contents = vec![0u8; len];
    assert!(matches!(
        ctx.create_buffer_init("huge init", &contents, wgpu::BufferUsages::STORAGE),
        Err(GpuError::InvalidSize { .. })
    ));
}

#[test]
fn write_buffer_contracts() {
    let Some(ctx) = common::acquire() else { return };

    let storage = ctx
        .create_buffer("storage", 16, wgpu::BufferUsages::STORAGE)
        .unwrap();
    assert!(matches!(
        ctx.write_buffer(&storage, 0, &[0; 4]),
        Err(GpuError::InvalidUsage { .. })
    ));

    let target = ctx
        .create_buffer(
            "target",
            16,
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        )
        .unwrap();
    assert!(matches!(
        ctx.write_buffer(&target, 12, &[0; 8]),
        Err(GpuError::OutOfBounds { .. })
    ));
    assert!(matches!(
        ctx.write_buffer(&target, 2, &[0; 4]),
        Err(GpuError::Misaligned { .. })
    ));
    assert!(matches!(
        ctx.write_buffer(&target, 0, &[0; 3]),
        Err(GpuError::Misaligned { .. })
    ));

    // Written bytes reach the GPU before the next submission.
    ctx.write_buffer(&target, 4, bytemuck::cast_slice(&[42u32])).unwrap();
    let staging = ctx.create_staging_buffer("staging", 16).unwrap();
    let mut session = ctx.begin_encoding("write then copy");
    session.copy_buffer_to_buffer(&target, 0, &staging, 0, 16).unwrap();
    let _submission = ctx.submit(session.finish().unwrap()).unwrap();

    let bytes = pollster::block_on(ctx.read_buffer(&staging, 0, 16)).unwrap();
    assert_eq!(&bytes[4..8], &42u32.to_le_bytes());
}

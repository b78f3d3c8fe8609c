mod common;

use kiln_gpu::GpuError;

const COPY_SRC: wgpu::BufferUsages = wgpu::BufferUsages::COPY_SRC;
const COPY_DST: wgpu::BufferUsages = wgpu::BufferUsages::COPY_DST;

#[test]
fn empty_session_submits() {
    let Some(ctx) = common::acquire() else { return };

    let mut session = ctx.begin_encoding("empty");
    let commands = session.finish().unwrap();
    assert_eq!(commands.stats(), Default::default());

    let submission = ctx.submit(commands).unwrap();
    assert!(submission.retained().is_empty());
    ctx.wait_for(&submission).unwrap();
}

#[test]
fn everything_after_finish_fails() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let dst = ctx.create_buffer("dst", 16, COPY_DST).unwrap();

    let mut session = ctx.begin_encoding("finished");
    let _commands = session.finish().unwrap();

    assert!(matches!(
        session.begin_compute_pass("late"),
        Err(GpuError::AlreadyFinished)
    ));
    assert_eq!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 0, 16),
        Err(GpuError::AlreadyFinished)
    );
    assert!(matches!(session.finish(), Err(GpuError::AlreadyFinished)));
}

#[test]
fn pass_dropped_without_end_blocks_session() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let dst = ctx.create_buffer("dst", 16, COPY_DST).unwrap();

    let mut session = ctx.begin_encoding("abandoned pass");
    {
        let _pass = session.begin_compute_pass("forgotten").unwrap();
    }

    assert_eq!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 0, 16),
        Err(GpuError::PassOpen("compute"))
    );
    assert!(matches!(
        session.begin_compute_pass("second"),
        Err(GpuError::PassOpen("compute"))
    ));
    assert!(matches!(session.finish(), Err(GpuError::PassOpen("compute"))));
}

#[test]
fn ended_pass_frees_session() {
    let Some(ctx) = common::acquire() else { return };

    let mut session = ctx.begin_encoding("two passes");
    session.begin_compute_pass("first").unwrap().end().unwrap();
    session.begin_compute_pass("second").unwrap().end().unwrap();

    let commands = session.finish().unwrap();
    assert_eq!(commands.stats().compute_passes, 2);
    assert_eq!(commands.stats().dispatches, 0);
    ctx.submit(commands).unwrap();
}

#[test]
fn copy_validates_usage() {
    let Some(ctx) = common::acquire() else { return };

    let storage = ctx
        .create_buffer("storage", 16, wgpu::BufferUsages::STORAGE)
        .unwrap();
    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let dst = ctx.create_buffer("dst", 16, COPY_DST).unwrap();

    let mut session = ctx.begin_encoding("usage");
    assert!(matches!(
        session.copy_buffer_to_buffer(&storage, 0, &dst, 0, 16),
        Err(GpuError::InvalidUsage { .. })
    ));
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 0, &storage, 0, 16),
        Err(GpuError::InvalidUsage { .. })
    ));

    let both = ctx.create_buffer("both", 16, COPY_SRC | COPY_DST).unwrap();
    assert!(matches!(
        session.copy_buffer_to_buffer(&both, 0, &both, 0, 4),
        Err(GpuError::InvalidUsage { .. })
    ));
}

#[test]
fn copy_validates_range_and_alignment() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let dst = ctx.create_buffer("dst", 32, COPY_DST).unwrap();

    let mut session = ctx.begin_encoding("ranges");
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 0, 32),
        Err(GpuError::OutOfBounds { .. })
    ));
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 24, 16),
        Err(GpuError::OutOfBounds { .. })
    ));
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 0, 6),
        Err(GpuError::Misaligned { .. })
    ));
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 2, &dst, 0, 4),
        Err(GpuError::Misaligned { .. })
    ));
    assert!(matches!(
        session.copy_buffer_to_buffer(&src, 0, &dst, 0, 0),
        Err(GpuError::InvalidSize { .. })
    ));

    // Failed copies leave the session usable.
    session.copy_buffer_to_buffer(&src, 0, &dst, 16, 16).unwrap();
    assert_eq!(session.stats().copies, 1);
}

#[test]
fn submission_retains_copied_buffers() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let dst = ctx.create_buffer("dst", 16, COPY_DST).unwrap();

    let mut session = ctx.begin_encoding("retain");
    session.copy_buffer_to_buffer(&src, 0, &dst, 0, 16).unwrap();
    session.copy_buffer_to_buffer(&src, 0, &dst, 0, 8).unwrap();
    let commands = session.finish().unwrap();
    assert_eq!(commands.stats().copies, 2);

    let submission = ctx.submit(commands).unwrap();
    assert_eq!(submission.retained().len(), 2);
    assert!(submission.retained().iter().any(|b| b.same_as(&src)));
    assert!(submission.retained().iter().any(|b| b.same_as(&dst)));
    ctx.wait_for(&submission).unwrap();
}

#[test]
fn mapped_buffer_is_not_a_copy_endpoint() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let staging = ctx.create_staging_buffer("staging", 16).unwrap();
    let target = ctx
        .create_render_target("target", 2, 2, wgpu::TextureFormat::Rgba8Unorm)
        .unwrap();
    let readback = ctx
        .create_staging_buffer("readback", target.readback_size())
        .unwrap();

    let mapped = pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();
    let mapped_readback =
        pollster::block_on(ctx.map_for_read(&readback, 0, target.readback_size())).unwrap();

    let mut session = ctx.begin_encoding("into mapped");
    assert_eq!(
        session.copy_buffer_to_buffer(&src, 0, &staging, 0, 16),
        Err(GpuError::AlreadyMapped("staging".into()))
    );
    assert_eq!(
        session.copy_target_to_buffer(&target, &readback),
        Err(GpuError::AlreadyMapped("readback".into()))
    );
    assert_eq!(session.stats().copies, 0);

    // Once unmapped, the same copies record and submit.
    mapped.unmap();
    mapped_readback.unmap();
    session.copy_buffer_to_buffer(&src, 0, &staging, 0, 16).unwrap();
    session.copy_target_to_buffer(&target, &readback).unwrap();
    let submission = ctx.submit(session.finish().unwrap()).unwrap();
    ctx.wait_for(&submission).unwrap();
}

#[test]
fn submit_refuses_buffers_mapped_after_recording() {
    let Some(ctx) = common::acquire() else { return };

    let src = ctx.create_buffer("src", 16, COPY_SRC).unwrap();
    let staging = ctx.create_staging_buffer("staging", 16).unwrap();

    let mut session = ctx.begin_encoding("mapped later");
    session.copy_buffer_to_buffer(&src, 0, &staging, 0, 16).unwrap();
    let commands = session.finish().unwrap();

    let mapped = pollster::block_on(ctx.map_for_read(&staging, 0, 16)).unwrap();
    assert!(matches!(
        ctx.submit(commands),
        Err(GpuError::AlreadyMapped(label)) if label == "staging"
    ));

    // The mapping is untouched and the buffer is usable again after unmap.
    assert_eq!(mapped.full_view().to_bytes().unwrap().len(), 16);
    mapped.unmap();

    let mut session = ctx.begin_encoding("after unmap");
    session.copy_buffer_to_buffer(&src, 0, &staging, 0, 16).unwrap();
    let submission = ctx.submit(session.finish().unwrap()).unwrap();
    ctx.wait_for(&submission).unwrap();
}

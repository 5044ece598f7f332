use criterion::{Criterion, black_box, criterion_group, criterion_main};

use strata_graphics::{
    BackendType, BufferUsage, ConstantMirror, FramesInFlight, GraphicsInstance,
    InstanceParameters, MaterialConstants, ShadingBlock, alignment, transfer,
};

fn dummy_device() -> std::sync::Arc<strata_graphics::GraphicsDevice> {
    let params = InstanceParameters::new().with_backend(BackendType::Dummy);
    GraphicsInstance::with_parameters(params)
        .expect("dummy instance")
        .create_device()
        .expect("dummy device")
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

fn bench_constant_buffer_byte_size(c: &mut Criterion) {
    c.bench_function("constant_buffer_byte_size_1k", |b| {
        b.iter(|| {
            let mut total = 0u64;
            for size in 0..1024u32 {
                total += alignment::constant_buffer_byte_size(black_box(size));
            }
            black_box(total);
        });
    });
}

// ---------------------------------------------------------------------------
// Constant mirror
// ---------------------------------------------------------------------------

fn bench_sync_clean_blocks(c: &mut Criterion) {
    let device = dummy_device();
    let frames = FramesInFlight::DEFAULT;
    let mut mirror = ConstantMirror::new(&device, "materials", frames, 256).expect("mirror");
    let mut blocks: Vec<ShadingBlock<MaterialConstants>> = (0..256)
        .map(|_| mirror.create_block(MaterialConstants::default()).expect("block"))
        .collect();
    for frame in 0..frames.as_usize() {
        mirror.sync(frame, blocks.iter_mut()).expect("sync");
    }

    let mut frame = 0;
    c.bench_function("mirror_sync_256_clean", |b| {
        b.iter(|| {
            black_box(mirror.sync(frame, blocks.iter_mut()).expect("sync"));
            frame = (frame + 1) % frames.as_usize();
        });
    });
}

fn bench_sync_dirty_blocks(c: &mut Criterion) {
    let device = dummy_device();
    let frames = FramesInFlight::DEFAULT;
    let mut mirror = ConstantMirror::new(&device, "materials", frames, 256).expect("mirror");
    let mut blocks: Vec<ShadingBlock<MaterialConstants>> = (0..256)
        .map(|_| mirror.create_block(MaterialConstants::default()).expect("block"))
        .collect();

    let mut frame = 0;
    c.bench_function("mirror_sync_256_dirty", |b| {
        b.iter(|| {
            for block in &mut blocks {
                block.edit().roughness += 0.001;
            }
            black_box(mirror.sync(frame, blocks.iter_mut()).expect("sync"));
            frame = (frame + 1) % frames.as_usize();
        });
    });
}

// ---------------------------------------------------------------------------
// Staged transfer
// ---------------------------------------------------------------------------

fn bench_staged_upload(c: &mut Criterion) {
    let device = dummy_device();
    let source = vec![0xABu8; 64 * 1024];

    c.bench_function("staged_upload_64k", |b| {
        b.iter(|| {
            let mut commands = device.create_command_list("bench");
            let upload = transfer::upload(
                &device,
                &mut commands,
                "bench",
                source.len() as u64,
                BufferUsage::VERTEX,
                &source,
            )
            .expect("upload");
            device.submit(commands).expect("submit").wait();
            black_box(upload);
        });
    });
}

criterion_group!(
    benches,
    bench_constant_buffer_byte_size,
    bench_sync_clean_blocks,
    bench_sync_dirty_blocks,
    bench_staged_upload,
);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framepipe::{ChannelConfig, ChannelNames, FrameFormat, RingTransport};
use std::time::Duration;

const LOCK: Duration = Duration::from_millis(4);
const SYNC_TIMEOUT: i64 = 1_000_000_000;

fn bench_pipe(tag: &str, size_per_slot: u32) -> RingTransport {
    let names = ChannelNames::with_prefix(&format!("/fp-bench-{}-{}", tag, std::process::id()));
    let config = ChannelConfig::new(FrameFormat::new(2, 2, 1), 4, size_per_slot).with_names(names);
    RingTransport::open_as_owner(&config).unwrap()
}

fn benchmark_push_pop_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("RingTransport_PushPop");

    // Square frames at 3 bytes per pixel, from thumbnail to 1080p
    for &width in [64u32, 320, 640, 1920].iter() {
        let height = width * 9 / 16;
        let format = FrameFormat::new(width, height, 3);
        let frame_size = format.frame_size();

        group.throughput(Throughput::Bytes(frame_size as u64));
        group.bench_with_input(
            BenchmarkId::new("push_pop", format!("{}x{}", width, height)),
            &format,
            |b, &format| {
                let mut pipe = bench_pipe(&format!("pp{}", width), frame_size as u32);
                let data = vec![0x7Fu8; frame_size];
                let mut dst = vec![0u8; frame_size];

                b.iter(|| {
                    pipe.push(format, &data, LOCK).unwrap();
                    pipe.pop(&mut dst, 0, 0, SYNC_TIMEOUT, LOCK).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn benchmark_repeat_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("RingTransport_Repeat");

    let format = FrameFormat::new(640, 360, 3);
    let frame_size = format.frame_size();
    group.throughput(Throughput::Bytes(frame_size as u64));

    group.bench_function("repeat_last_frame", |b| {
        let mut pipe = bench_pipe("repeat", frame_size as u32);
        let data = vec![0x7Fu8; frame_size];
        let mut dst = vec![0u8; frame_size];

        // Drain once so every iteration hits the repeat path
        pipe.push(format, &data, LOCK).unwrap();
        pipe.pop(&mut dst, 0, 0, SYNC_TIMEOUT, LOCK).unwrap();

        b.iter(|| {
            pipe.pop(&mut dst, 0, 0, SYNC_TIMEOUT, LOCK).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_push_pop_throughput,
    benchmark_repeat_path
);
criterion_main!(benches);

use criterion::{criterion_group, criterion_main, Criterion};
use mqlink::engine::{Driver, Engine, FrameQueue};
use mqlink::packet::{build, PacketId, QoS};
use std::hint::black_box;

struct NullDriver;

impl Driver for NullDriver {}

fn bench_build_publish(c: &mut Criterion) {
    let mut ids = PacketId::new();
    c.bench_function("build_publish_qos1", |b| {
        b.iter(|| {
            build::publish(
                black_box("sensors/temp"),
                black_box(b"23.5"),
                false,
                QoS::AtLeastOnce,
                false,
                &mut ids,
            )
            .unwrap()
        })
    });
}

fn bench_encode_remaining_length(c: &mut Criterion) {
    c.bench_function("encode_remaining_length", |b| {
        b.iter(|| mqlink::codec::encode_remaining_length(black_box(16_384)).unwrap())
    });
}

fn bench_dispatch_publish(c: &mut Criterion) {
    // qos=0 so dispatch does not accumulate acknowledgment frames
    let mut ids = PacketId::new();
    let (frame, _) =
        build::publish("sensors/temp", b"23.5", false, QoS::AtMostOnce, false, &mut ids).unwrap();
    let mut engine: Engine<NullDriver, FrameQueue> = Engine::new(FrameQueue::new());
    engine.attach(NullDriver);
    c.bench_function("dispatch_publish_qos0", |b| {
        b.iter(|| engine.dispatch(black_box(frame.as_bytes())).unwrap())
    });
}

criterion_group!(
    benches,
    bench_build_publish,
    bench_encode_remaining_length,
    bench_dispatch_publish
);
criterion_main!(benches);

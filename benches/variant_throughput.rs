//! Benchmarks for variant handling and cooperative execution
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use visflow::config::EngineConfig;
use visflow::pipeline::nodes::{CounterSource, ScaleOperation};
use visflow::pipeline::{Engine, ExecutionError, Operation, PortDescriptor, ProcessContext, ProcessorKind};
use visflow::variant::{tags, Matrix};
use visflow::Variant;

static DISCARD_PORTS: &[PortDescriptor] = &[PortDescriptor::input("input")];

/// Sink that drops everything it receives
struct Discard;

impl Operation for Discard {
    fn name(&self) -> &str {
        "Discard"
    }

    fn ports(&self) -> &[PortDescriptor] {
        DISCARD_PORTS
    }

    fn process(&mut self, ctx: &mut ProcessContext) -> Result<(), ExecutionError> {
        black_box(ctx.take_input(0));
        Ok(())
    }
}

fn bench_variant_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("variant_clone");
    group.throughput(Throughput::Elements(1));

    let inline = Variant::new(42.0f64);
    group.bench_function("inline_f64", |b| b.iter(|| black_box(&inline).clone()));

    let tag = tags::resume_tag(Default::default());
    group.bench_function("resume_tag", |b| b.iter(|| black_box(&tag).clone()));

    for size in [16usize, 256, 1024] {
        let matrix = Variant::new(Matrix::<u8>::filled(size, size, 7));
        group.bench_with_input(BenchmarkId::new("matrix_u8", size), &matrix, |b, matrix| {
            b.iter(|| black_box(matrix).clone())
        });
    }
    group.finish();
}

fn bench_variant_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("variant_convert");

    let value = Variant::new(1234i32);
    group.bench_function("i32_to_f64", |b| b.iter(|| black_box(&value).convert_to(0.0f64)));
    group.bench_function("i32_to_bool", |b| b.iter(|| black_box(&value).convert_to(false)));

    let text = Variant::from("1234");
    group.bench_function("string_to_i32", |b| b.iter(|| black_box(&text).convert_to(0i32)));
    group.finish();
}

fn bench_simple_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_chain");
    group.throughput(Throughput::Elements(1));

    for stages in [1usize, 4, 16] {
        let mut engine = Engine::new(EngineConfig::default().with_default_processor(ProcessorKind::Simple));
        let mut previous = engine
            .add_operation("counter", CounterSource::new())
            .expect("counter");
        for i in 0..stages {
            let scale = engine
                .add_operation(&format!("scale{}", i), ScaleOperation::new(1.0))
                .expect("scale");
            engine.connect(previous, "output", scale, "input").expect("connect");
            previous = scale;
        }
        let sink = engine.add_operation("discard", Discard).expect("discard");
        engine.connect(previous, "output", sink, "input").expect("connect");

        // every start emits one value through the whole chain
        group.bench_with_input(BenchmarkId::new("stages", stages), &engine, |b, engine| {
            b.iter(|| engine.start().expect("start"))
        });
        engine.interrupt();
    }
    group.finish();
}

criterion_group!(benches, bench_variant_clone, bench_variant_convert, bench_simple_chain);
criterion_main!(benches);

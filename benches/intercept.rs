//! Benchmarks for call interception.
//!
//! Measures the cost of routing a call through a fake:
//! - Unconfigured calls answered by the default rules
//! - Calls matched by a configured rule with argument constraints
//! - Property reads served by the auto property rule
//! - Fake creation for an interface

extern crate dotfake;

use criterion::{criterion_group, criterion_main, Criterion};
use dotfake::prelude::*;
use std::hint::black_box;

fn repository(context: &FakeContext) -> TypeRc {
    let types = context.types();
    types
        .interface("Acme", "IRepository")
        .method("Count", &types.i4(), [])
        .method(
            "Find",
            &types.string(),
            [param("id", &types.i4()), param("name", &types.string())],
        )
        .property("Name", &types.string())
        .build()
        .unwrap()
}

/// Call logs grow with every recorded call, so the benchmarks run without recording.
fn context() -> FakeContext {
    FakeContext::with_config(FakeConfig::minimal())
}

/// Benchmark an unconfigured call returning the default value.
fn bench_unconfigured_call(c: &mut Criterion) {
    let context = context();
    let fake = context.fake(&repository(&context)).unwrap();

    c.bench_function("intercept_unconfigured", |b| {
        b.iter(|| {
            let value = fake.call(black_box("Count"), args![]).unwrap();
            black_box(value)
        });
    });
}

/// Benchmark a call matched by a configured rule with argument constraints.
fn bench_configured_call(c: &mut Criterion) {
    let context = context();
    let fake = context.fake(&repository(&context)).unwrap();
    fake.call_to("Count").unwrap().returns(1).unwrap();
    fake.call_to("Find")
        .unwrap()
        .with_args(args![42, "answer"])
        .unwrap()
        .returns("found")
        .unwrap();

    c.bench_function("intercept_configured_with_args", |b| {
        b.iter(|| {
            let value = fake.call(black_box("Find"), args![42, "answer"]).unwrap();
            black_box(value)
        });
    });
}

/// Benchmark a property read after the property was assigned.
fn bench_property_get(c: &mut Criterion) {
    let context = context();
    let fake = context.fake(&repository(&context)).unwrap();
    fake.set("Name", "repository").unwrap();

    c.bench_function("intercept_property_get", |b| {
        b.iter(|| {
            let value = fake.get(black_box("Name")).unwrap();
            black_box(value)
        });
    });
}

/// Benchmark creating a fake of an interface.
fn bench_create_fake(c: &mut Criterion) {
    let context = context();
    let ty = repository(&context);

    c.bench_function("create_interface_fake", |b| {
        b.iter(|| {
            let fake = context.fake(black_box(&ty)).unwrap();
            black_box(fake)
        });
    });
}

criterion_group!(
    benches,
    bench_unconfigured_call,
    bench_configured_call,
    bench_property_get,
    bench_create_fake
);
criterion_main!(benches);

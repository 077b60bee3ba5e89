use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use envtext::{EnvMap, marshal, unmarshal};

fn bench_unmarshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("unmarshal");
    for size in [1_024usize, 10_240, 102_400] {
        let input = make_input(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| unmarshal(black_box(input)).expect("parse should succeed"));
        });
    }
    group.finish();
}

fn bench_marshal(c: &mut Criterion) {
    let map: EnvMap = (0..2_000)
        .map(|idx| (format!("KEY_{idx}"), format!("value with \"quotes\" and $dollar {idx}")))
        .collect();

    c.bench_function("marshal", |b| b.iter(|| marshal(black_box(&map))));
}

fn make_input(bytes: usize) -> String {
    let block = "PLAIN=value\nQUOTED=\"multi\\nline $PLAIN\"\nexport SINGLE='raw $PLAIN'\n";
    let repeat = bytes / block.len() + 1;
    block.repeat(repeat)
}

criterion_group!(benches, bench_unmarshal, bench_marshal);
criterion_main!(benches);

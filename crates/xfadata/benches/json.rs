use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use xfadata::{envelope_to_datasets_xml, json_to_tree};

fn envelope_json(fields: usize) -> String {
    let body: Vec<String> = (0..fields)
        .map(|i| format!("\"Field{i}\":\"value {i} \\\"quoted\\\"\""))
        .collect();
    format!("{{\"data\":{{\"form1\":{{{}}}}}}}", body.join(","))
}

fn bench_parse(c: &mut Criterion) {
    let json = envelope_json(500);
    c.bench_function("xfadata_json_parse_500", |b| {
        b.iter(|| json_to_tree(black_box(&json)))
    });
}

fn bench_fill(c: &mut Criterion) {
    let json = envelope_json(500);
    c.bench_function("xfadata_json_fill_500", |b| {
        b.iter(|| envelope_to_datasets_xml(black_box(&json)))
    });
}

criterion_group!(benches, bench_parse, bench_fill);
criterion_main!(benches);

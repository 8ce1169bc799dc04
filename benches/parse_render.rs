//! Benchmark: parse, validate and render pipelines of growing size

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fmt::Write as _;
use yamline::{parse_and_validate, render};

fn definition(stages: usize) -> String {
    let mut text = String::from(
        "agent: any\nenvironment:\n  TOKEN:\n    credentials: deploy-token\noptions:\n  - timestamps\nstages:\n",
    );
    for index in 0..stages {
        let _ = write!(
            text,
            "  - name: Stage {index}\n    when:\n      branch: main\n    parallel:\n      - name: Unit {index}\n        steps:\n          - sh make test\n      - name: Lint {index}\n        steps:\n          - sh: make lint\n          - archiveArtifacts:\n              artifacts: out/*.log\n              fingerprint: true\n"
        );
    }
    text
}

fn benchmark_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_and_validate");
    for stages in [1, 10, 100] {
        let text = definition(stages);
        group.bench_with_input(BenchmarkId::from_parameter(stages), &text, |b, text| {
            b.iter(|| parse_and_validate(black_box(text)).unwrap());
        });
    }
    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    for stages in [1, 10, 100] {
        let pipeline = parse_and_validate(&definition(stages)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(stages), &pipeline, |b, pipeline| {
            b.iter(|| render(black_box(pipeline)));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_parse, benchmark_render);
criterion_main!(benches);

//! Benchmarks for sub-stage inclusion decisions.

use buildstage::params::{RunParameters, SubStageSelection};
use buildstage::stages::is_included;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const BUILD_STEPS: &[&str] = &["compile", "replace", "prettify", "minimize", "test", "document"];

fn inclusion_benchmark(c: &mut Criterion) {
    let unset = SubStageSelection::Unset;
    c.bench_function("inclusion_unfiltered", |b| {
        b.iter(|| {
            BUILD_STEPS
                .iter()
                .filter(|name| is_included(black_box(name), BUILD_STEPS, &unset, &unset))
                .count()
        });
    });

    let only = SubStageSelection::from(vec!["compile", "test", "document"]);
    let without = SubStageSelection::from("test");
    c.bench_function("inclusion_only_and_without", |b| {
        b.iter(|| {
            BUILD_STEPS
                .iter()
                .filter(|name| is_included(black_box(name), BUILD_STEPS, &only, &without))
                .count()
        });
    });

    let params = RunParameters::new()
        .with_only_for("compile", SubStageSelection::parse_list("scss,ts"))
        .with_without_for("compile", "files");
    c.bench_function("delegated_parameters", |b| {
        b.iter(|| black_box(params.for_delegation("compile", 1)));
    });
}

criterion_group!(benches, inclusion_benchmark);
criterion_main!(benches);

//! Benchmarks for the path backtracker.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use runskip::backtrack::{backtrack, CompiledFilter, MAX_BACKTRACK_STEPS};
use runskip::config::PathFilterConfig;
use runskip::platform::RawRun;
use runskip::registry::RunRegistry;
use runskip::testing::{linear_history, InMemoryPlatform, RunBuilder};

fn registry(platform: &InMemoryPlatform) -> RunRegistry {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let current: RawRun = RunBuilder::new(100).tree("head").in_progress().build();
    platform.add_run(current);
    platform.add_run(RunBuilder::new(1).tree("t0").build());
    let ctx = runskip::context::RunContext::new("acme/widgets", 100, "push", "c59");
    runtime
        .block_on(RunRegistry::load(&ctx, platform, &mut runskip::ledger::MemoLedger::new()))
        .expect("registry")
}

fn backtrack_benchmark(c: &mut Criterion) {
    let platform = InMemoryPlatform::new();
    for commit in linear_history(MAX_BACKTRACK_STEPS + 10, |i| {
        vec![format!("docs/page-{i}.md"), format!("assets/img-{i}.png")]
    }) {
        platform.add_commit(commit);
    }
    let registry = registry(&platform);
    let filters = vec![
        CompiledFilter::compile(
            "docs",
            &PathFilterConfig::new().with_paths_ignore(["docs/**", "assets/**"]),
        )
        .expect("filter"),
        CompiledFilter::compile("src", &PathFilterConfig::new().with_paths(["src/**", "Cargo.*"]))
            .expect("filter"),
    ];
    let runtime = tokio::runtime::Runtime::new().expect("runtime");

    c.bench_function("backtrack_to_ceiling", |b| {
        b.iter(|| {
            let result = runtime.block_on(backtrack(
                black_box(&filters),
                "c59",
                &registry,
                &platform,
            ));
            black_box(result.steps())
        })
    });
}

criterion_group!(benches, backtrack_benchmark);
criterion_main!(benches);

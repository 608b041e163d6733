use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grove_compiler::resolve::candidate_names;
use grove_compiler::{ClassNodeResolver, DefaultClassNodeResolver, NoOpResourceLoader};
use grove_runtime::SystemClassLoader;
use grove_scripts::{can_skip_lookup, DefaultImportsReader, ImportsReader, ShortcutClassNodeResolver};
use rustc_hash::FxHashMap;

/// The probes resolving a handful of identifiers produces with the default
/// star imports in place
fn probes() -> Vec<String> {
    let imports = DefaultImportsReader::new().unwrap();
    let star_packages: Vec<String> = imports
        .import_packages()
        .iter()
        .map(|package| format!("{}.", package))
        .collect();
    let explicit = FxHashMap::default();
    ["Map.Entry", "String", "Project", "Task", "DefaultTask", "File"]
        .iter()
        .flat_map(|name| candidate_names(name, &explicit, &star_packages))
        .collect()
}

fn bench_can_skip_lookup(c: &mut Criterion) {
    let names = probes();
    c.bench_function("can_skip_lookup", |b| {
        b.iter(|| names.iter().filter(|name| can_skip_lookup(black_box(name))).count());
    });
}

fn bench_resolvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_probes");
    let names = probes();

    group.bench_with_input(BenchmarkId::new("default", names.len()), &names, |b, names| {
        b.iter(|| {
            let mut resolver = DefaultClassNodeResolver::new(
                Arc::new(SystemClassLoader::new()),
                Arc::new(NoOpResourceLoader),
            );
            names.iter().filter_map(|name| resolver.find_class_node(name)).count()
        });
    });

    group.bench_with_input(BenchmarkId::new("shortcut", names.len()), &names, |b, names| {
        b.iter(|| {
            let mut resolver = ShortcutClassNodeResolver::new(DefaultClassNodeResolver::new(
                Arc::new(SystemClassLoader::new()),
                Arc::new(NoOpResourceLoader),
            ));
            names.iter().filter_map(|name| resolver.find_class_node(name)).count()
        });
    });

    group.finish();
}

criterion_group!(benches, bench_can_skip_lookup, bench_resolvers);
criterion_main!(benches);

//! Benchmarks for configuration expansion and bootstrap refresh
//!
//! Measures how expansion converges over import chains and import cycles of
//! growing size, and the cost of a complete refresh with eager singletons.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use elif_context::bootstrap::BootstrapContext;
use elif_context::config::{BootstrapConfig, Environment, StandardEnvironment};
use elif_context::definitions::{Definition, DefinitionRegistry};
use elif_context::expansion::ConfigurationProcessor;
use elif_context::extensions::RegistryPostProcessor;
use elif_context::metadata::{FactoryMethod, SourceModel, TypeCatalog, TypeMetadata};

struct Service;

/// Source `i` imports source `i + 1`; the last one imports the first when `cyclic`
fn import_catalog(size: usize, cyclic: bool, methods: usize) -> TypeCatalog {
    let mut catalog = TypeCatalog::new();
    for i in 0..size {
        let mut model = SourceModel::full();
        if i + 1 < size {
            model = model.with_import(format!("bench::Source{}", i + 1));
        } else if cyclic {
            model = model.with_import("bench::Source0");
        }
        for m in 0..methods {
            model = model.with_factory_method(FactoryMethod::new(format!("service{}_{}", i, m), |_| {
                Ok(Service)
            }));
        }
        catalog = catalog.with_type(TypeMetadata::source(format!("bench::Source{}", i), model));
    }
    catalog
}

fn benchmark_expansion(c: &mut Criterion) {
    let mut group = c.benchmark_group("expansion");

    for size in [10, 50, 100, 250].iter() {
        for (label, cyclic) in [("import_chain", false), ("import_cycle", true)] {
            let catalog = Arc::new(import_catalog(*size, cyclic, 2));
            group.bench_with_input(BenchmarkId::new(label, size), size, |b, _| {
                b.iter(|| {
                    let processor = ConfigurationProcessor::new(
                        catalog.clone(),
                        Arc::new(StandardEnvironment::new(Environment::Testing)),
                    );
                    let registry = DefinitionRegistry::new();
                    registry
                        .register(Definition::new("root", "bench::Source0"))
                        .unwrap();

                    processor.post_process_registry(&registry).unwrap();
                    black_box(registry.len().unwrap());
                });
            });
        }
    }

    group.finish();
}

fn benchmark_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("refresh");

    for size in [10, 50, 100].iter() {
        let catalog = Arc::new(import_catalog(*size, false, 3));
        group.bench_with_input(BenchmarkId::new("eager_singletons", size), size, |b, _| {
            b.iter(|| {
                let config = BootstrapConfig {
                    eager_singletons: true,
                    log_summary: false,
                    ..BootstrapConfig::testing()
                };
                let context = BootstrapContext::builder()
                    .with_config(config)
                    .with_reader(catalog.clone())
                    .with_definition(Definition::new("root", "bench::Source0"))
                    .build()
                    .unwrap();

                black_box(context.refresh().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_expansion, benchmark_refresh);

criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modhost::config::RegistryConfig;
use modhost::extension::{
    Args, CapabilityDescriptor, CapabilityRegistry, ExposedType, ExtensionLoader, ParamType,
    TypeCatalog,
};

trait Handler {
    fn handle(&self, input: u64) -> u64;
}

struct HandlerTag;

struct Scaled(u64);

impl Handler for Scaled {
    fn handle(&self, input: u64) -> u64 {
        input.wrapping_mul(self.0)
    }
}

fn catalog(index: usize, keys: usize) -> TypeCatalog {
    // one exposed type per catalog; keys spread across catalogs
    TypeCatalog::new(format!("artifact-{}", index)).with_type(
        ExposedType::of::<Scaled>()
            .implements::<dyn Handler>(|s| Box::new(s))
            .tag::<HandlerTag>(format!("key-{}", index % keys))
            .constructor(&[ParamType::of::<u64>()], |args: &Args| {
                Ok(Scaled(*args.get::<u64>(0)?))
            }),
    )
}

fn create_loader(artifacts: usize, keys: usize) -> ExtensionLoader {
    let catalogs = (0..artifacts).map(|i| catalog(i, keys)).collect();
    let registry = CapabilityRegistry::new(
        catalogs,
        vec![CapabilityDescriptor::of::<dyn Handler, HandlerTag>(vec![
            ParamType::of::<u64>(),
        ])],
        &RegistryConfig::default(),
    )
    .unwrap();
    ExtensionLoader::new(registry)
}

fn benchmark_registry_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_construction");
    for artifacts in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(artifacts), &artifacts, |b, &n| {
            b.iter(|| black_box(create_loader(n, 16)))
        });
    }
    group.finish();
}

fn benchmark_load(c: &mut Criterion) {
    let loader = create_loader(100, 16);
    let args = Args::new().with(3u64);

    c.bench_function("load_highest_priority", |b| {
        b.iter(|| {
            let handler = loader
                .load::<dyn Handler>(black_box("key-7"), &args)
                .unwrap();
            black_box(handler.handle(black_box(11)))
        })
    });
}

fn benchmark_deep_load(c: &mut Criterion) {
    let loader = create_loader(100, 16);
    let args = Args::new().with(3u64);

    c.bench_function("deep_load_iterate", |b| {
        b.iter(|| {
            let seq = loader.deep_load::<dyn Handler>(black_box("key-7"), &args).unwrap();
            seq.iter()
                .map(|h| h.unwrap().handle(1))
                .fold(0u64, u64::wrapping_add)
        })
    });

    c.bench_function("deep_load_all", |b| {
        b.iter(|| black_box(loader.deep_load_all::<dyn Handler>(&args).unwrap().len()))
    });
}

criterion_group!(
    benches,
    benchmark_registry_construction,
    benchmark_load,
    benchmark_deep_load
);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use lightspring::metadata::MethodMetadata;
use lightspring::web::{join_paths, HandlerArgs};
use lightspring::{Constructor, Container, ParamSpec, ServiceOptions};
use std::collections::HashMap;
use std::sync::Arc;

struct Config {
    port: u16,
}

struct Repository {
    config: Arc<Config>,
}

struct Service {
    repo: Arc<Repository>,
}

fn app_container(lifetime: ServiceOptions) -> Container {
    let container = Container::new();
    container.register("Config", Constructor::of::<Config>(|_| Ok(Config { port: 2000 })), ServiceOptions::singleton());
    container.register(
        "Repository",
        Constructor::of::<Repository>(|args| Ok(Repository { config: args.take(0)? }))
            .param(ParamSpec::class::<Config>())
            .inject(0, "Config"),
        lifetime,
    );
    container.register(
        "Service",
        Constructor::of::<Service>(|args| Ok(Service { repo: args.take(0)? }))
            .param(ParamSpec::class::<Repository>())
            .inject(0, "Repository"),
        lifetime,
    );
    container
}

// ===== Micro Benchmarks =====

fn bench_singleton_hit(c: &mut Criterion) {
    let container = Container::new();
    container.register_instance("Answer", 42u64);

    // Prime the singleton
    let _ = container.resolve::<u64>("Answer").unwrap();

    c.bench_function("singleton_hit_u64", |b| {
        b.iter(|| {
            let v = container.resolve::<u64>("Answer").unwrap();
            black_box(v);
        })
    });
}

fn bench_singleton_cold(c: &mut Criterion) {
    struct ExpensiveToCreate {
        data: Vec<u64>,
    }

    c.bench_function("singleton_cold_expensive", |b| {
        b.iter_batched(
            || {
                let container = Container::new();
                container.register(
                    "Expensive",
                    Constructor::of::<ExpensiveToCreate>(|_| Ok(ExpensiveToCreate { data: (0..1000).collect() })),
                    ServiceOptions::singleton(),
                );
                container
            },
            |container| {
                let v = container.resolve::<ExpensiveToCreate>("Expensive").unwrap();
                black_box(v.data.len());
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_lifetimes(c: &mut Criterion) {
    let mut group = c.benchmark_group("dependency_chain");

    let singleton = app_container(ServiceOptions::singleton());
    group.bench_function("singleton", |b| {
        b.iter(|| black_box(singleton.resolve::<Service>("Service").unwrap().repo.config.port))
    });

    let transient = app_container(ServiceOptions::transient());
    group.bench_function("transient", |b| {
        b.iter(|| black_box(transient.resolve::<Service>("Service").unwrap().repo.config.port))
    });

    let scoped = app_container(ServiceOptions::request());
    let scope = scoped.create_scope();
    group.bench_function("request_scope_hit", |b| {
        b.iter(|| black_box(scope.resolve::<Service>("Service").unwrap().repo.config.port))
    });
    group.bench_function("request_scope_fresh", |b| {
        b.iter(|| {
            let scope = scoped.create_scope();
            black_box(scope.resolve::<Service>("Service").unwrap().repo.config.port)
        })
    });

    group.finish();
}

fn bench_instantiate(c: &mut Criterion) {
    struct Controller {
        service: Arc<Service>,
    }

    let container = app_container(ServiceOptions::singleton());
    let ctor = Constructor::of::<Controller>(|args| Ok(Controller { service: args.take(0)? }))
        .param(ParamSpec::class::<Service>());

    c.bench_function("instantiate_controller", |b| {
        b.iter(|| {
            let controller: Arc<Controller> = container.instantiate(&ctor).unwrap();
            black_box(controller.service.repo.config.port)
        })
    });
}

// ===== Dispatch Helpers =====

fn bench_argument_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("argument_assembly");

    for params in [1usize, 4, 8] {
        let mut meta = MethodMetadata::default().body(params);
        let mut path = HashMap::new();
        for i in 0..params {
            meta = meta.param(format!("p{}", i), i);
            path.insert(format!("p{}", i), format!("value{}", i));
        }
        let bindings = meta.bindings();
        let body = serde_json::json!({ "title": "bench" });

        group.bench_with_input(BenchmarkId::from_parameter(params), &params, |b, _| {
            b.iter(|| black_box(HandlerArgs::assemble(&bindings, &path, &body, None).len()))
        });
    }

    group.finish();
}

fn bench_join_paths(c: &mut Criterion) {
    c.bench_function("join_paths", |b| {
        b.iter(|| black_box(join_paths(black_box("/api/v1/todos/"), black_box("/:id/comments"))))
    });
}

criterion_group!(
    benches,
    bench_singleton_hit,
    bench_singleton_cold,
    bench_lifetimes,
    bench_instantiate,
    bench_argument_assembly,
    bench_join_paths
);
criterion_main!(benches);

//! Benchmarks for the binding-completion pass over synthetic dependency
//! graphs: linear chains of increasing depth and a wide fan-out root.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use bindery_core::key::Key;
use bindery_core::metadata::{TypeMeta, TypeRegistry};
use bindery_testing::fixture::{FixtureMeta, HookKind};
use bindery_testing::mock::MockRegistry;
use bindery_testing::module::{AutoBinder, TestBinder};

struct S0;
struct S1;
struct S2;
struct S3;
struct S4;
struct S5;
struct S6;
struct S7;
struct S8;
struct S9;
struct S10;
struct S11;
struct S12;
struct S13;
struct S14;
struct S15;
struct S16;

macro_rules! chain_link {
    ($types:expr, $node:ident) => {
        $types.register(TypeMeta::concrete::<$node>().construct(|_| Ok($node)));
    };
    ($types:expr, $node:ident => $dep:ident) => {
        $types.register(
            TypeMeta::concrete::<$node>()
                .dependency::<$dep>()
                .construct(|injector| {
                    let _dep: Arc<$dep> = injector.resolve()?;
                    Ok($node)
                }),
        );
    };
}

/// S16 -> S15 -> ... -> S0, plus a hub depending on the first eight links
struct Hub;

fn chain_registry() -> Arc<TypeRegistry> {
    let types = TypeRegistry::new();
    chain_link!(types, S0);
    chain_link!(types, S1 => S0);
    chain_link!(types, S2 => S1);
    chain_link!(types, S3 => S2);
    chain_link!(types, S4 => S3);
    chain_link!(types, S5 => S4);
    chain_link!(types, S6 => S5);
    chain_link!(types, S7 => S6);
    chain_link!(types, S8 => S7);
    chain_link!(types, S9 => S8);
    chain_link!(types, S10 => S9);
    chain_link!(types, S11 => S10);
    chain_link!(types, S12 => S11);
    chain_link!(types, S13 => S12);
    chain_link!(types, S14 => S13);
    chain_link!(types, S15 => S14);
    chain_link!(types, S16 => S15);
    types.register(
        TypeMeta::concrete::<Hub>()
            .dependency::<S0>()
            .dependency::<S1>()
            .dependency::<S2>()
            .dependency::<S3>()
            .dependency::<S4>()
            .dependency::<S5>()
            .dependency::<S6>()
            .dependency::<S7>()
            .construct(|_| Ok(Hub)),
    );
    Arc::new(types)
}

fn complete_for_root(types: &Arc<TypeRegistry>, root: &Key) -> usize {
    let fixture =
        FixtureMeta::new("BenchFixture").hook(HookKind::Test, "walks_graph", vec![root.clone()]);
    let module = |_: &mut TestBinder<'_>| {};
    let completed = AutoBinder::new(Arc::clone(types), Arc::new(MockRegistry::new()))
        .complete(&module, &fixture)
        .expect("completion succeeds");
    completed.report.observed_keys
}

fn benchmark_chain_depth(c: &mut Criterion) {
    let types = chain_registry();
    let mut group = c.benchmark_group("completion_chain");

    let roots = [
        (4usize, Key::of::<S4>()),
        (8, Key::of::<S8>()),
        (16, Key::of::<S16>()),
    ];
    for (depth, root) in roots {
        group.bench_with_input(BenchmarkId::new("depth", depth), &root, |b, root| {
            b.iter(|| black_box(complete_for_root(&types, root)));
        });
    }

    group.finish();
}

fn benchmark_fan_out(c: &mut Criterion) {
    let types = chain_registry();

    c.bench_function("completion_fan_out", |b| {
        let root = Key::of::<Hub>();
        b.iter(|| black_box(complete_for_root(&types, &root)));
    });
}

criterion_group!(benches, benchmark_chain_depth, benchmark_fan_out);
criterion_main!(benches);

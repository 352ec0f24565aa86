//! Kernel benchmarks
//!
//! Benchmarks for the hot paths: factory interning, weak-head reduction of
//! recursor applications, and type inference of nested binders.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use sharc_kernel::{type_check, whnf, ModuleEnv, Sort, Term, TermFactory};
use std::collections::BTreeMap;
use std::hint::black_box;

/// Addition on naturals via the recursor.
fn rec_plus(f: &TermFactory, env: &ModuleEnv, a: Term, b: Term) -> Term {
    let ids = env.prelude();
    let nat = env.nat_type(f);
    let motive = f.lambda("n", nat.clone(), nat.clone());
    let mut cases = BTreeMap::new();
    cases.insert(ids.zero.clone(), b);
    cases.insert(
        ids.succ.clone(),
        f.lambda(
            "n",
            nat.clone(),
            f.lambda(
                "ih",
                nat.clone(),
                f.ctor_app(ids.succ.clone(), vec![], vec![f.local_var(0)]),
            ),
        ),
    );
    f.recursor_app(ids.nat.clone(), vec![], motive, cases, vec![], a)
}

/// A left-nested application of `depth` identity functions to a literal.
fn nested_identities(f: &TermFactory, env: &ModuleEnv, depth: usize) -> Term {
    let nat = env.nat_type(f);
    let mut t = f.nat_lit(1u32);
    for _ in 0..depth {
        t = f.apply(f.lambda("x", nat.clone(), f.local_var(0)), t);
    }
    t
}

fn bench_interning(c: &mut Criterion) {
    c.bench_function("factory_intern_lambda_tower", |bencher| {
        bencher.iter(|| {
            let f = TermFactory::new();
            let mut t = f.local_var(0);
            for _ in 0..64 {
                t = f.lambda("x", f.sort(Sort::new(0)), t);
            }
            black_box(t)
        });
    });
}

fn bench_whnf(c: &mut Criterion) {
    let f = TermFactory::new();
    let env = ModuleEnv::with_prelude(&f);
    let mut group = c.benchmark_group("whnf");
    for depth in [4usize, 16, 64] {
        let t = nested_identities(&f, &env, depth);
        group.bench_with_input(BenchmarkId::new("identity_chain", depth), &t, |b, t| {
            b.iter(|| black_box(whnf(&f, &env, t)));
        });
    }
    let sum = rec_plus(&f, &env, f.nat_lit(8u32), f.nat_lit(8u32));
    group.bench_function("recursor_add_8_8", |b| {
        b.iter(|| black_box(whnf(&f, &env, &sum)));
    });
    group.finish();
}

fn bench_infer(c: &mut Criterion) {
    let f = TermFactory::new();
    let env = ModuleEnv::with_prelude(&f);
    let mut group = c.benchmark_group("infer");

    let id = f.lambda("x", f.sort(Sort::new(0)), f.local_var(0));
    group.bench_function("identity", |b| {
        b.iter(|| black_box(type_check(&f, &env, None, &id).unwrap()));
    });

    let chain = nested_identities(&f, &env, 16);
    group.bench_function("identity_chain_16", |b| {
        b.iter(|| black_box(type_check(&f, &env, None, &chain).unwrap()));
    });

    let sum = rec_plus(&f, &env, f.nat_lit(4u32), f.nat_lit(4u32));
    group.bench_function("recursor_add_4_4", |b| {
        b.iter(|| black_box(type_check(&f, &env, None, &sum).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, bench_interning, bench_whnf, bench_infer);
criterion_main!(benches);

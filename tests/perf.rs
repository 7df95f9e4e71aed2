#![cfg(all(feature = "memory-store", feature = "memory-cache"))]

use futures::executor::block_on;
use rs_query_authz::{
    AuthzInput, Decision, EngineBuilder, Grant, MemoryCache, MemoryStore, RoleId, UserId,
};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Instant;

const REPEATS: usize = 5;

fn benchmark_sync<F>(name: &str, iterations: usize, mut op: F)
where
    F: FnMut(),
{
    let mut samples = Vec::with_capacity(REPEATS);

    for _ in 0..REPEATS {
        let start = Instant::now();
        for _ in 0..iterations {
            op();
        }
        samples.push(start.elapsed());
    }

    samples.sort_unstable();
    let median = samples[REPEATS / 2];
    let total_ms = median.as_secs_f64() * 1_000.0;
    let ns_per_op = median.as_secs_f64() * 1_000_000_000.0 / iterations as f64;
    let ops_per_sec = iterations as f64 / median.as_secs_f64();

    println!(
        "{name}: median={total_ms:.3} ms, ns/op={ns_per_op:.1}, ops/s={ops_per_sec:.0} (iters={iterations}, repeats={REPEATS})"
    );
}

fn benchmark_parallel<F>(name: &str, threads: usize, iterations_per_thread: usize, op_factory: F)
where
    F: Fn() -> Box<dyn FnMut() + Send> + Send + Sync + 'static,
{
    let op_factory = Arc::new(op_factory);
    let mut samples = Vec::with_capacity(REPEATS);

    for _ in 0..REPEATS {
        let start = Instant::now();
        let mut joins = Vec::with_capacity(threads);
        for _ in 0..threads {
            let factory = Arc::clone(&op_factory);
            joins.push(std::thread::spawn(move || {
                let mut op = factory();
                for _ in 0..iterations_per_thread {
                    op();
                }
            }));
        }
        for join in joins {
            join.join().expect("thread panicked");
        }
        samples.push(start.elapsed());
    }

    samples.sort_unstable();
    let median = samples[REPEATS / 2];
    let total_ops = threads * iterations_per_thread;
    let total_ms = median.as_secs_f64() * 1_000.0;
    let ns_per_op = median.as_secs_f64() * 1_000_000_000.0 / total_ops as f64;
    let ops_per_sec = total_ops as f64 / median.as_secs_f64();

    println!(
        "{name}: median={total_ms:.3} ms, ns/op={ns_per_op:.1}, ops/s={ops_per_sec:.0} (threads={threads}, total_ops={total_ops}, repeats={REPEATS})"
    );
}

fn setup_store(grant_count: usize) -> (MemoryStore, AuthzInput) {
    let store = MemoryStore::new();
    let user = UserId::try_from("user_perf").unwrap();
    let role = RoleId::try_from("role_perf").unwrap();
    store.add_user_role(user, role.clone());

    for i in 0..grant_count {
        store.add_grant(
            role.clone(),
            Grant::new(["SELECT"])
                .data_source("aurora")
                .instances([format!("inst-{i}-*")])
                .tables([format!("orders_{i}"), format!("inst-{i}-a.audit_*")]),
        );
    }

    let last = grant_count - 1;
    let input = AuthzInput::new("user_perf", "GET", "SELECT")
        .data_source("aurora")
        .instance(format!("inst-{last}-a"))
        .table(format!("audit_{last}"))
        .columns(["id", "total"])
        .query_sql("SELECT id, total FROM audit");

    (store, input)
}

#[test]
#[ignore = "manual performance test; run with --ignored --nocapture"]
fn perf_decide() {
    let iterations = 50_000;

    for grant_count in [1usize, 16, 128] {
        let (store, input) = setup_store(grant_count);
        let engine = EngineBuilder::new(store).build();
        assert_eq!(
            block_on(engine.decide(&input)).unwrap().decision,
            Decision::Allowed
        );
        benchmark_sync(
            &format!("decide_grants{grant_count}_no_cache"),
            iterations,
            || {
                let verdict = block_on(engine.decide(&input)).unwrap();
                black_box(verdict);
            },
        );

        let (store, input) = setup_store(grant_count);
        let engine = EngineBuilder::new(store)
            .pattern_cache(MemoryCache::new(8_192))
            .build();
        benchmark_sync(
            &format!("decide_grants{grant_count}_hot_cache"),
            iterations,
            || {
                let verdict = block_on(engine.decide(&input)).unwrap();
                black_box(verdict);
            },
        );
    }

    let threads = std::thread::available_parallelism()
        .map(|n| n.get().min(8))
        .unwrap_or(4);
    let iterations_per_thread = 20_000;

    let (store, input) = setup_store(16);
    let engine = Arc::new(
        EngineBuilder::new(store)
            .pattern_cache(MemoryCache::new(8_192))
            .build(),
    );
    let warm = block_on(engine.decide(&input)).unwrap();
    assert_eq!(warm.decision, Decision::Allowed);

    let engine_for_parallel = Arc::clone(&engine);
    benchmark_parallel(
        "decide_grants16_hot_cache_parallel",
        threads,
        iterations_per_thread,
        move || {
            let engine = Arc::clone(&engine_for_parallel);
            let input = input.clone();
            Box::new(move || {
                let verdict = block_on(engine.decide(&input)).unwrap();
                black_box(verdict);
            })
        },
    );
}

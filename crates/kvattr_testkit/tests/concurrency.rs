//! Many owners sharing one bounded pool from several threads.

use kvattr_codec::Value;
use kvattr_core::AttributeHost;
use kvattr_store::{MemoryStore, PoolConfig, PoolOptions, PoolRegistry, StoreError};
use kvattr_testkit::prelude::*;
use std::thread;
use std::time::Duration;

const THREADS: u64 = 8;
const POOL_SIZE: usize = 2;

fn small_pool() -> TestStore {
    TestStore::from_config(
        PoolConfig::from_url("redis://memory")
            .with_pool_size(POOL_SIZE)
            .with_timeout(Duration::from_secs(10))
            .into(),
    )
}

#[test]
fn owners_on_many_threads_share_the_pool() {
    init_test_logging();
    let test = small_pool();

    thread::scope(|scope| {
        for id in 0..THREADS {
            let registry = &test.registry;
            scope.spawn(move || {
                let mut post = Post::create(id, registry);
                for n in 0..20 {
                    post.write("count", n);
                    post.on_commit().unwrap();
                }
                assert_eq!(post.read("count"), Value::Integer(19));
            });
        }
    });

    let pool = test.registry.default_pool();
    assert!(pool.open_connections() <= POOL_SIZE);
    assert!(test.store.connections_opened() <= POOL_SIZE);
    for id in 0..THREADS {
        assert_eq!(test.store.peek(&format!("posts:{id}:count")).as_deref(), Some("19"));
    }
}

#[test]
fn sorted_set_increments_from_many_threads() {
    let test = small_pool();
    let post = Post::create(1, &test.registry);
    let rankings = post.sorted_set("rankings").unwrap();

    thread::scope(|scope| {
        for _ in 0..THREADS {
            let rankings = rankings.clone();
            scope.spawn(move || {
                for _ in 0..10 {
                    rankings.increment("hot").unwrap();
                }
            });
        }
    });

    assert_eq!(rankings.score("hot").unwrap(), Some(THREADS as i64 * 10));
}

#[test]
fn exhausted_pool_times_out() {
    let store = MemoryStore::new();
    let options = PoolOptions::default()
        .with_size(1)
        .with_timeout(Duration::from_millis(50));
    let registry = PoolRegistry::with_connector(options, store);
    let pool = registry.default_pool();

    let result = pool.with_connection(|_held| {
        Ok(registry.default_pool().with_connection(|conn| conn.get("k")))
    });

    assert!(matches!(result.unwrap(), Err(StoreError::PoolTimeout { .. })));
    assert_eq!(pool.open_connections(), 1);
}

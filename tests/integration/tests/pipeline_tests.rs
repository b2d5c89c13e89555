//! Like Pipeline Integration Tests
//!
//! Exercises the cache, the persistence worker and the counter relay together
//! without a WebSocket in front.
//!
//! Run with: cargo test -p integration-tests --test pipeline_tests

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use integration_tests::{eventually, Backends};
use like_common::LikeConfig;
use like_core::{TargetId, UserId};
use like_service::{LikeService, ServiceError};

fn config(batch_size: usize, sync_interval_secs: u64) -> LikeConfig {
    LikeConfig {
        batch_size,
        sync_interval_secs,
        ..LikeConfig::default()
    }
}

#[tokio::test]
async fn test_repeated_toggles_persist_once() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context("pipeline"));
    let user = UserId::random();
    let target = TargetId::random();

    for expected in [true, false, true] {
        let result = runtime.service.toggle(user, target).await;
        assert_eq!(result.liked, expected);
    }

    let outcome = runtime.worker.force_sync().await.unwrap();
    assert_eq!(outcome.mutations, 3);
    assert_eq!(outcome.net_likes, 1);
    assert_eq!(outcome.net_unlikes, 0);
    assert_eq!(outcome.inserted, 1);

    assert_eq!(backends.store.row_count(), 1);
    assert_eq!(backends.store.count(target), 1);
    assert_eq!(runtime.service.stats().pending, 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_like_then_unlike_leaves_store_untouched() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context("pipeline"));
    let user = UserId::random();
    let target = TargetId::random();

    runtime.service.toggle(user, target).await;
    runtime.service.toggle(user, target).await;

    let outcome = runtime.worker.force_sync().await.unwrap();
    assert_eq!(outcome.net_likes, 0);
    assert_eq!(outcome.net_unlikes, 1);
    assert_eq!(outcome.deleted, 0);

    assert_eq!(backends.store.row_count(), 0);
    assert_eq!(backends.store.count(target), 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_batch_is_dropped() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context("pipeline"));
    let (lost, kept) = (UserId::random(), UserId::random());
    let target = TargetId::random();

    backends.store.failing_inserts.store(1, Ordering::SeqCst);
    runtime.service.toggle(lost, target).await;

    let err = runtime.worker.force_sync().await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::PersistenceDropped { mutations: 1, .. }
    ));
    // Not retried
    assert_eq!(runtime.service.stats().pending, 0);

    runtime.service.toggle(kept, target).await;
    let outcome = runtime.worker.force_sync().await.unwrap();
    assert_eq!(outcome.inserted, 1);

    assert!(!backends.store.has_row(lost, target));
    assert!(backends.store.has_row(kept, target));
    assert_eq!(backends.store.count(target), 1);
    // The cache still answers with both likes
    assert_eq!(runtime.service.cache().get_count(target), 2);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_periodic_sync_recovers_after_dropped_batch() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context_with("pipeline", config(100, 1)));
    let (lost, kept) = (UserId::random(), UserId::random());
    let target = TargetId::random();

    backends.store.failing_inserts.store(1, Ordering::SeqCst);
    runtime.service.toggle(lost, target).await;

    let store = backends.store.clone();
    assert!(eventually(Duration::from_secs(3), || store.insert_calls.load(Ordering::SeqCst) == 1).await);

    runtime.service.toggle(kept, target).await;
    assert!(eventually(Duration::from_secs(3), || store.has_row(kept, target)).await);

    assert!(!backends.store.has_row(lost, target));
    assert_eq!(backends.store.count(target), 1);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_full_batch_drains_without_tick() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context_with("pipeline", config(5, 3600)));
    let target = TargetId::random();

    for _ in 0..5 {
        runtime.service.toggle(UserId::random(), target).await;
    }

    let store = backends.store.clone();
    assert!(eventually(Duration::from_secs(2), || store.count(target) == 5).await);
    assert_eq!(runtime.service.stats().pending, 0);

    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_store_outage_keeps_serving() {
    let backends = Backends::new();
    let runtime = LikeService::start(backends.context("pipeline"));
    let user = UserId::random();
    let target = TargetId::random();

    backends.store.down.store(true, Ordering::SeqCst);
    let count = runtime.service.hydrate_user(user).await;
    assert_eq!(count, 0);

    let result = runtime.service.toggle(user, target).await;
    assert!(result.liked);
    assert_eq!(result.count, 1);

    assert!(runtime.service.is_store_degraded());

    assert!(runtime.worker.force_sync().await.is_err());
    runtime.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ten_thousand_concurrent_likes() {
    const USERS: usize = 10_000;

    let backends = Backends::new();
    let like_config = LikeConfig {
        relay_buffer: 20_000,
        ..config(100, 3600)
    };
    let runtime = LikeService::start(backends.context_with("load", like_config));
    let target = TargetId::random();

    let started = Instant::now();
    let tasks: Vec<_> = (0..USERS)
        .map(|_| {
            let service = runtime.service.clone();
            tokio::spawn(async move { service.toggle(UserId::random(), target).await })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().liked);
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(runtime.service.cache().get_count(target), USERS as u64);

    let redis = backends.redis.clone();
    assert!(
        eventually(Duration::from_secs(10), || redis.count(target) == Some(USERS as u64)).await
    );

    let service = runtime.service.clone();
    runtime.shutdown().await.unwrap();

    assert_eq!(backends.store.row_count(), USERS);
    assert_eq!(backends.store.count(target), USERS as i64);
    assert_eq!(service.stats().pending, 0);
}

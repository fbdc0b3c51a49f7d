// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Durable tier tests: restart round-trips, TTL across restarts,
//! best-effort writes, and read-failure degradation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use memora::{MemoCache, Memoized};
use memora_key::{CallKey, FunctionIdentity};
use memora_store::{
    ClockControl, Store,
    testing::{RecordingStore, StoreOp},
};

fn key(n: u128) -> CallKey {
    CallKey::from_digest(n)
}

#[tokio::test]
async fn entries_survive_engine_reconstruction() {
    let dir = tempfile::tempdir().unwrap();
    let control = ClockControl::new();
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let cache = MemoCache::isolated::<String>(control.to_clock())
            .persist_dir(dir.path())
            .unwrap()
            .build()
            .unwrap();
        // `insert` awaits the durable write, so the entry is on disk when
        // the cache instance goes away.
        cache.insert(key(1), "persisted".to_string()).await.unwrap();
    }

    let rebuilt = MemoCache::isolated::<String>(control.to_clock())
        .persist_dir(dir.path())
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(rebuilt.len(), Some(0), "memory starts empty after a restart");

    let calls_in_compute = Arc::clone(&calls);
    let value = rebuilt
        .get_or_compute(key(1), || async move {
            calls_in_compute.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>("recomputed".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, "persisted");
    assert_eq!(calls.load(Ordering::SeqCst), 0, "a durable hit must not recompute");
    assert_eq!(rebuilt.len(), Some(1), "the durable hit is promoted into memory");
}

#[tokio::test]
async fn persisted_entries_do_not_outlive_their_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let control = ClockControl::new();

    {
        let cache = MemoCache::isolated::<String>(control.to_clock())
            .ttl(Duration::from_secs(60))
            .persist_dir(dir.path())
            .unwrap()
            .build()
            .unwrap();
        cache.insert(key(1), "stale".to_string()).await.unwrap();
    }

    // The process "restarts" after the TTL has elapsed.
    control.advance(Duration::from_secs(61));

    let rebuilt = MemoCache::isolated::<String>(control.to_clock())
        .ttl(Duration::from_secs(60))
        .persist_dir(dir.path())
        .unwrap()
        .build()
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let value = rebuilt
        .get_or_compute(key(1), || async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>("fresh".to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, "fresh", "the stale durable entry must not be served");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn computed_values_reach_disk_off_the_happy_path() {
    let dir = tempfile::tempdir().unwrap();
    let control = ClockControl::new();

    let cache = MemoCache::isolated::<String>(control.to_clock())
        .persist_dir(dir.path())
        .unwrap()
        .build()
        .unwrap();

    let value = cache
        .get_or_compute(key(7), || async { Ok::<_, std::io::Error>("computed".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "computed");

    // The durable write is offloaded; wait for it to land.
    let path = dir.path().join(format!("{}.bin", key(7)));
    for _ in 0..200 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(path.exists(), "the computed entry must be mirrored to disk");
}

#[tokio::test]
async fn durable_write_failure_is_best_effort() {
    let durable: RecordingStore<CallKey, String> = RecordingStore::new();
    durable.fail_when(|op| matches!(op, StoreOp::Put { .. }));

    let cache = MemoCache::isolated::<String>(ClockControl::new().to_clock())
        .durable_store(durable.clone())
        .build()
        .unwrap();

    // The computed value comes back even though every durable write fails.
    let value = cache
        .get_or_compute(key(1), || async { Ok::<_, std::io::Error>("v".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "v");

    // Wait for the offloaded write attempt to be recorded.
    for _ in 0..200 {
        if durable.count_ops(|op| matches!(op, StoreOp::Put { .. })) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(durable.count_ops(|op| matches!(op, StoreOp::Put { .. })), 1);
    assert_eq!(durable.len(), Some(0), "nothing landed durably");

    // The entry is memory-only but fully usable.
    assert_eq!(cache.get(key(1)).await.unwrap().unwrap(), "v");
}

#[tokio::test]
async fn durable_read_failure_degrades_to_recomputation() {
    let durable: RecordingStore<CallKey, String> = RecordingStore::new();

    let cache = MemoCache::isolated::<String>(ClockControl::new().to_clock())
        .durable_store(durable.clone())
        .build()
        .unwrap();

    cache.insert(key(1), "stored".to_string()).await.unwrap();
    assert_eq!(durable.len(), Some(1));

    // Fresh engine over the same durable store, but reads now fail.
    let rebuilt = MemoCache::isolated::<String>(ClockControl::new().to_clock())
        .durable_store(durable.clone())
        .build()
        .unwrap();
    durable.fail_when(|op| matches!(op, StoreOp::Get(_)));

    let value = rebuilt
        .get_or_compute(key(1), || async { Ok::<_, std::io::Error>("recomputed".to_string()) })
        .await
        .unwrap();
    assert_eq!(value, "recomputed", "a broken durable tier costs recomputation, not availability");
}

#[tokio::test]
async fn promotion_respects_the_memory_bound() {
    let durable: RecordingStore<CallKey, String> = RecordingStore::new();
    let control = ClockControl::new();

    let seed = MemoCache::isolated::<String>(control.to_clock())
        .durable_store(durable.clone())
        .build()
        .unwrap();
    for k in 1..=3u128 {
        seed.insert(key(k), format!("v{k}")).await.unwrap();
    }

    // A bounded engine over the same durable data.
    let cache = MemoCache::isolated::<String>(control.to_clock())
        .max_entries(2)
        .durable_store(durable.clone())
        .build()
        .unwrap();

    for k in 1..=3u128 {
        let value = cache.get(key(k)).await.unwrap().expect("durable hit");
        assert_eq!(value, format!("v{k}"));
    }

    // All three were promoted through a 2-entry memory tier.
    assert_eq!(cache.len(), Some(2), "promotion is subject to eviction");
}

#[tokio::test]
async fn memoized_wrapper_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let build = |calls: Arc<AtomicUsize>| {
        let cache = MemoCache::isolated::<String>(ClockControl::new().to_clock())
            .persist_dir(dir.path())
            .unwrap()
            .build()
            .unwrap();
        Memoized::new(FunctionIdentity::new("tests::fetch"), cache, move |(url,): (String,)| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(format!("contents of {url}"))
            }
        })
    };

    {
        let fetch = build(Arc::clone(&calls));
        let _ = fetch.call(("https://a".to_string(),)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // Make sure the offloaded write lands before the "restart".
        let fetch_key = fetch.derive_key(&("https://a".to_string(),)).unwrap();
        let path = dir.path().join(format!("{fetch_key}.bin"));
        for _ in 0..200 {
            if path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(path.exists());
    }

    // Same identity, same arguments, fresh process: served from disk.
    let fetch = build(Arc::clone(&calls));
    let value = fetch.call(("https://a".to_string(),)).await.unwrap();
    assert_eq!(value, "contents of https://a");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "the durable hit must not recompute");
}

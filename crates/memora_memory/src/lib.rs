// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Bounded in-memory storage tier with insertion-order eviction.
//!
//! [`MemoryStore`] is the primary tier of the memoizing engine: a
//! mutex-guarded map plus a strict insertion-order queue. The eviction
//! policy is deliberately FIFO — when a new key arrives at capacity, the
//! oldest *inserted* entry goes, regardless of how recently it was read.
//! This is simpler than LRU and intentionally so; workloads that need
//! recency-aware eviction need a different tier, not a flag here.
//!
//! # Examples
//!
//! ```
//! use memora_memory::MemoryStore;
//! use memora_store::{CacheEntry, Store};
//! # futures::executor::block_on(async {
//!
//! let store = MemoryStore::with_capacity(2);
//! store.put(&"k1", CacheEntry::new(1)).await?;
//! store.put(&"k2", CacheEntry::new(2)).await?;
//! store.put(&"k3", CacheEntry::new(3)).await?;
//!
//! // k1 was inserted first, so k1 was evicted.
//! assert!(store.get(&"k1").await?.is_none());
//! assert!(store.get(&"k2").await?.is_some());
//! assert!(store.get(&"k3").await?.is_some());
//! # Ok::<(), memora_store::Error>(())
//! # });
//! ```

mod store;

pub use store::MemoryStore;

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Durable on-disk storage tier.
//!
//! [`DiskStore`] mirrors cache entries beyond process lifetime: one
//! bincode-encoded file per key under a root directory. The engine treats
//! this tier as best-effort — reads sit on the miss path (which is allowed
//! to block before a recomputation) and writes are offloaded off the
//! caller's happy path — so the I/O here is plain synchronous `std::fs`
//! behind the async tier interface, keeping the tier executor-agnostic.
//!
//! # Examples
//!
//! ```
//! use memora_disk::DiskStore;
//! use memora_store::{CacheEntry, Store};
//! use std::time::SystemTime;
//! # futures::executor::block_on(async {
//! # let dir = tempfile::tempdir().unwrap();
//!
//! let store = DiskStore::new(dir.path())?;
//! let entry = CacheEntry::with_created_at(String::from("payload"), SystemTime::now());
//! store.put(&"0042", entry).await?;
//!
//! // A second store over the same directory sees the entry.
//! let reopened = DiskStore::new(dir.path())?;
//! let entry: CacheEntry<String> = reopened.get(&"0042").await?.expect("persisted entry");
//! assert_eq!(entry.value(), "payload");
//! # Ok::<(), memora_store::Error>(())
//! # });
//! ```

mod store;

pub use store::DiskStore;

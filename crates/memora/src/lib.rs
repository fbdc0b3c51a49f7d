// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A memoizing cache engine.
//!
//! `memora` caches the results of callables under deterministic call keys:
//!
//! - **Keys**: a 128-bit fingerprint of the callable's identity and its
//!   arguments, derived through an overridable per-type hash-function
//!   registry ([`memora_key`]).
//! - **Bounding**: a memory tier with strict insertion-order (FIFO)
//!   eviction — deliberately simpler than LRU ([`memora_memory`]).
//! - **Expiry**: lazy TTL checks on every read; expired entries are
//!   treated as absent and eagerly removed. No background sweeper.
//! - **Durability**: optional mirroring to disk; persisted entries keep
//!   their original age, so TTL spans restarts ([`memora_disk`]).
//! - **Coalescing**: concurrent callers missing on one key share a single
//!   computation — and share its failure, which is never cached.
//! - **Mutation policy**: per cache, chosen at construction:
//!   [`SharedMutable`] hands out shared live `Arc`s, [`IsolatedCopy`]
//!   hands out independent copies and warns if the stored value was
//!   mutated behind the cache's back.
//!
//! # Examples
//!
//! ## Memoizing a callable
//!
//! ```
//! use memora::{MemoCache, Memoized};
//! use memora_key::FunctionIdentity;
//! use memora_store::Clock;
//! use std::time::Duration;
//! # futures::executor::block_on(async {
//!
//! async fn fetch(url: String) -> Result<String, std::io::Error> {
//!     Ok(format!("contents of {url}"))
//! }
//!
//! let cache = MemoCache::isolated::<String>(Clock::system())
//!     .max_entries(1000)
//!     .ttl(Duration::from_secs(600))
//!     .build()?;
//!
//! let fetch = Memoized::new(FunctionIdentity::new("docs::fetch"), cache, |(url,): (String,)| fetch(url));
//!
//! // First call computes; the second is served from cache.
//! let a = fetch.call(("https://a".to_string(),)).await?;
//! let b = fetch.call(("https://a".to_string(),)).await?;
//! assert_eq!(a, b);
//! # Ok::<(), memora::Error>(())
//! # });
//! ```
//!
//! ## Sharing one live value across callers
//!
//! ```
//! use memora::MemoCache;
//! use memora_key::CallKey;
//! use memora_store::Clock;
//! # futures::executor::block_on(async {
//!
//! // No `Clone` bound on the value; every caller gets the same Arc.
//! let cache = MemoCache::shared::<Vec<u8>>(Clock::system()).build()?;
//! let key = CallKey::from_digest(7);
//!
//! let a = cache.get_or_compute(key, || async { Ok::<_, std::io::Error>(vec![1, 2]) }).await?;
//! let b = cache.get_or_compute(key, || async { Ok::<_, std::io::Error>(vec![9, 9]) }).await?;
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! # Ok::<(), memora::Error>(())
//! # });
//! ```

pub mod builder;
pub mod cache;
mod error;
mod flight;
pub mod legacy;
mod memoize;
mod policy;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::{MemoCache, NullStore};
pub use error::{Error, Result};
#[doc(inline)]
pub use memoize::Memoized;
#[doc(inline)]
pub use policy::{IsolatedCopy, MutationPolicy, SharedMutable};

#[doc(inline)]
pub use memora_disk::DiskStore;
#[doc(inline)]
pub use memora_key::{ByRegistry, CallKey, FunctionIdentity, HashFuncRegistry, StableHash};
#[doc(inline)]
pub use memora_memory::MemoryStore;
#[doc(inline)]
pub use memora_store::{CacheEntry, Clock, ClockControl, Store};

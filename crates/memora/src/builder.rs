// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring cache instances.
//!
//! Configuration is immutable once a cache is built, and configuration
//! errors surface from `build()` — never at call time. The mutation policy
//! is part of the builder's type, entered through
//! [`MemoCache::shared`](crate::MemoCache::shared) or
//! [`MemoCache::isolated`](crate::MemoCache::isolated); persistence is only
//! reachable from the isolated side, so an unsupported combination cannot
//! be expressed at all.

use std::{marker::PhantomData, path::PathBuf, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use memora_disk::DiskStore;
use memora_key::{CallKey, StableHash};
use memora_memory::MemoryStore;
use memora_store::{Clock, Store};

use crate::{
    Error, MemoCache,
    cache::NullStore,
    policy::{IsolatedCopy, MutationPolicy},
};

/// Builder for a [`MemoCache`].
///
/// # Examples
///
/// ```
/// use memora::MemoCache;
/// use memora_store::Clock;
/// use std::time::Duration;
///
/// let cache = MemoCache::isolated::<String>(Clock::system())
///     .max_entries(500)
///     .ttl(Duration::from_secs(3600))
///     .build()?;
/// # let _ = cache;
/// # Ok::<(), memora::Error>(())
/// ```
#[derive(Debug)]
pub struct CacheBuilder<V, P, D = NullStore> {
    clock: Clock,
    max_entries: Option<u64>,
    ttl: Option<Duration>,
    durable: Option<D>,
    _marker: PhantomData<fn(V, P)>,
}

impl<V, P> CacheBuilder<V, P> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            max_entries: None,
            ttl: None,
            durable: None,
            _marker: PhantomData,
        }
    }
}

impl<V, P, D> CacheBuilder<V, P, D> {
    /// Bounds the memory tier to at most `max_entries` entries.
    ///
    /// When a new key arrives at capacity, the oldest-inserted entry is
    /// evicted (FIFO). Zero is rejected by `build()`.
    #[must_use]
    pub fn max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Sets the time-to-live for entries.
    ///
    /// An entry whose age reaches the TTL is never served again; it is
    /// treated as absent and recomputed on the next call.
    #[must_use]
    pub fn ttl(mut self, ttl: impl Into<Duration>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Returns the builder's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }
}

/// Persistence entry points; only isolated-copy caches have a durable form.
impl<V> CacheBuilder<V, IsolatedCopy>
where
    V: Clone + StableHash + Send + Sync + 'static,
{
    /// Mirrors entries into a directory on disk.
    ///
    /// Entries survive process restarts; a rebuilt cache over the same
    /// directory serves persisted entries without recomputation, TTL
    /// permitting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the directory cannot be created.
    pub fn persist_dir(self, dir: impl Into<PathBuf>) -> Result<CacheBuilder<V, IsolatedCopy, DiskStore<CallKey, V>>, Error>
    where
        V: Serialize + DeserializeOwned,
    {
        let store = DiskStore::new(dir)?;
        Ok(self.durable_store(store))
    }

    /// Uses a caller-provided durable tier.
    ///
    /// This is how tests exercise the best-effort persistence contract with
    /// a failure-injecting store, and how alternative durable backends plug
    /// in.
    #[must_use]
    pub fn durable_store<D2>(self, store: D2) -> CacheBuilder<V, IsolatedCopy, D2>
    where
        D2: Store<CallKey, V> + Send + Sync + 'static,
    {
        CacheBuilder {
            clock: self.clock,
            max_entries: self.max_entries,
            ttl: self.ttl,
            durable: Some(store),
            _marker: PhantomData,
        }
    }
}

impl<V, P, D> CacheBuilder<V, P, D>
where
    V: Send + Sync + 'static,
    P: MutationPolicy<V>,
    D: Store<CallKey, P::Stored> + Send + Sync + 'static,
{
    /// Builds the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `max_entries` is 0 — a cache
    /// that can hold nothing cannot cache anything, and that is caught
    /// here, not on the first call.
    pub fn build(self) -> Result<MemoCache<V, P, D>, Error> {
        let memory = match self.max_entries {
            Some(0) => return Err(Error::invalid_config("max_entries must be at least 1")),
            Some(max) => MemoryStore::with_capacity(max),
            None => MemoryStore::new(),
        };
        let memory = memory.with_clock(self.clock.clone());
        Ok(MemoCache::new(memory, self.durable, self.ttl, self.clock))
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.
//!
//! [`Store`] defines the interface the memoizing engine talks to. Backends
//! implement the four storage operations; expiration checks, eviction of
//! expired entries, and mutation policy all live above this trait in the
//! engine, so a backend only has to move entries in and out.

use crate::{CacheEntry, Error};

/// Trait for cache storage backends.
///
/// Implement this trait to provide a storage tier for the engine. The four
/// core methods are required; `len` and `is_empty` default to `None` for
/// backends that do not track their size.
///
/// Eviction to satisfy a capacity bound is the backend's responsibility and
/// must hold after every mutating operation completes; expiry is not — the
/// engine checks entry freshness itself and removes stale entries through
/// [`remove`](Store::remove).
pub trait Store<K, V>: Send + Sync {
    /// Gets the entry stored under `key`, if any.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<CacheEntry<V>>, Error>> + Send;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn put(&self, key: &K, entry: CacheEntry<V>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the entry stored under `key`. Removing an absent key is not
    /// an error.
    fn remove(&self, key: &K) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every entry.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the number of entries, if this backend tracks it.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the backend is known to contain no entries.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

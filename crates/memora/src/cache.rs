// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The memoizing cache engine.

use std::{marker::PhantomData, sync::Arc, time::Duration};

use memora_key::CallKey;
use memora_memory::MemoryStore;
use memora_store::{CacheEntry, Clock, Store};

use crate::{
    Error,
    builder::CacheBuilder,
    flight::Flight,
    policy::{IsolatedCopy, MutationPolicy, SharedMutable},
};

/// A storage tier that stores nothing.
///
/// The default durable tier: every read misses and every write succeeds by
/// doing nothing. Caches built without persistence carry this so the
/// engine's shape does not change with the configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl<K, V> Store<K, V> for NullStore
where
    K: Send + Sync,
    V: Clone + Send + Sync,
{
    async fn get(&self, _key: &K) -> Result<Option<CacheEntry<V>>, memora_store::Error> {
        Ok(None)
    }

    async fn put(&self, _key: &K, _entry: CacheEntry<V>) -> Result<(), memora_store::Error> {
        Ok(())
    }

    async fn remove(&self, _key: &K) -> Result<(), memora_store::Error> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), memora_store::Error> {
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(0)
    }
}

/// A memoizing cache for one callable.
///
/// `MemoCache` owns the bounded in-memory tier, the optional durable tier,
/// the TTL, and the clock, and routes every lookup through per-key
/// single-flight. The mutation policy `P` decides what callers receive:
/// [`SharedMutable`] hands out shared `Arc`s, [`IsolatedCopy`] hands out
/// verified independent copies.
///
/// Construct instances through [`MemoCache::shared`] or
/// [`MemoCache::isolated`]; one instance per decorated callable, created at
/// decoration time and dropped with it.
///
/// # Examples
///
/// ```
/// use memora::MemoCache;
/// use memora_key::CallKey;
/// use memora_store::Clock;
/// # futures::executor::block_on(async {
///
/// let cache = MemoCache::isolated::<String>(Clock::system()).build()?;
///
/// let key = CallKey::from_digest(1);
/// let value = cache
///     .get_or_compute(key, || async { Ok::<_, std::io::Error>("expensive".to_string()) })
///     .await?;
/// assert_eq!(value, "expensive");
///
/// // The second call is served from cache; the computation does not run.
/// let value = cache
///     .get_or_compute(key, || async { Err(std::io::Error::other("must not run")) })
///     .await?;
/// assert_eq!(value, "expensive");
/// # Ok::<(), memora::Error>(())
/// # });
/// ```
pub struct MemoCache<V, P, D = NullStore>
where
    P: MutationPolicy<V>,
{
    memory: MemoryStore<CallKey, P::Stored>,
    durable: Option<Arc<D>>,
    ttl: Option<Duration>,
    clock: Clock,
    flight: Flight<CallKey, Result<CacheEntry<P::Stored>, Error>>,
    _marker: PhantomData<fn(V) -> V>,
}

impl<V, P, D> std::fmt::Debug for MemoCache<V, P, D>
where
    P: MutationPolicy<V>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("len", &self.memory.len())
            .field("max_entries", &self.memory.max_entries())
            .field("ttl", &self.ttl)
            .field("durable", &self.durable.is_some())
            .finish_non_exhaustive()
    }
}

impl MemoCache<(), SharedMutable> {
    /// Starts building a cache that hands out shared live references.
    ///
    /// Shared caches never copy or hash values and place no `Clone` bound
    /// on `V`; callers observe each other's interior mutations. They are
    /// memory-only: values that may be mutated in place have no meaningful
    /// durable form.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora::MemoCache;
    /// use memora_store::Clock;
    /// use std::time::Duration;
    ///
    /// let cache = MemoCache::shared::<Vec<u8>>(Clock::system())
    ///     .max_entries(100)
    ///     .ttl(Duration::from_secs(300))
    ///     .build()?;
    /// # let _ = cache;
    /// # Ok::<(), memora::Error>(())
    /// ```
    #[must_use]
    pub fn shared<V>(clock: Clock) -> CacheBuilder<V, SharedMutable> {
        CacheBuilder::new(clock)
    }

    /// Starts building a cache that hands out isolated copies.
    ///
    /// Isolated caches record a fingerprint of every stored value and
    /// verify it on each read, so external mutation is detected rather than
    /// silently served. Only isolated caches can mirror entries to a
    /// durable tier.
    #[must_use]
    pub fn isolated<V>(clock: Clock) -> CacheBuilder<V, IsolatedCopy> {
        CacheBuilder::new(clock)
    }
}

impl<V, P, D> MemoCache<V, P, D>
where
    V: Send + Sync + 'static,
    P: MutationPolicy<V>,
    D: Store<CallKey, P::Stored> + Send + Sync + 'static,
{
    pub(crate) fn new(
        memory: MemoryStore<CallKey, P::Stored>,
        durable: Option<D>,
        ttl: Option<Duration>,
        clock: Clock,
    ) -> Self {
        Self {
            memory,
            durable: durable.map(Arc::new),
            ttl,
            clock,
            flight: Flight::new(),
            _marker: PhantomData,
        }
    }

    /// Returns the configured time-to-live, if any.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Returns the configured capacity bound, if any.
    #[must_use]
    pub fn max_entries(&self) -> Option<u64> {
        self.memory.max_entries()
    }

    /// Returns the cache's clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the number of entries in the memory tier.
    #[must_use]
    pub fn len(&self) -> Option<u64> {
        self.memory.len()
    }

    /// Returns `true` if the memory tier is empty.
    #[must_use]
    pub fn is_empty(&self) -> Option<bool> {
        self.memory.is_empty()
    }

    /// Retrieves the value for `key`, computing it on a miss.
    ///
    /// This is the memoizing path: memory tier first, then the durable tier
    /// (a durable hit is promoted into memory), then `compute` runs —
    /// exactly once per key even under concurrent callers. Waiters on the
    /// same in-flight computation share its result; a failure reaches every
    /// waiter identically and is never cached, so the next caller retries.
    ///
    /// Once started, a computation runs to completion; TTL only decides
    /// whether a *future* lookup treats the entry as expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Computation`] if `compute` fails, or
    /// [`Error::Store`] if the memory tier fails. Durable tier failures are
    /// logged and degrade to miss (reads) or memory-only (writes).
    pub async fn get_or_compute<E, Fut>(&self, key: CallKey, compute: impl FnOnce() -> Fut + Send) -> Result<P::Output, Error>
    where
        E: std::error::Error + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send,
    {
        let entry = self
            .flight
            .run(key, || async move {
                if let Some(entry) = self.probe_memory(key).await? {
                    return Ok(entry);
                }
                if let Some(entry) = self.probe_durable(key).await {
                    return Ok(entry);
                }
                tracing::trace!(cache.key = %key, "miss; running computation");
                let value = compute().await.map_err(Error::computation)?;
                self.store_value(key, value).await
            })
            .await?;
        Ok(P::unwrap(key, &entry))
    }

    /// Retrieves the value for `key` without computing on a miss.
    ///
    /// Expiry is checked the same way as on the memoizing path, and a
    /// durable hit is promoted into memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the memory tier fails.
    pub async fn get(&self, key: CallKey) -> Result<Option<P::Output>, Error> {
        let entry = match self.probe_memory(key).await? {
            Some(entry) => Some(entry),
            None => self.probe_durable(key).await,
        };
        Ok(entry.map(|entry| P::unwrap(key, &entry)))
    }

    /// Stores a value under `key` directly.
    ///
    /// The entry is stamped with the current time. The durable write (if a
    /// durable tier is configured) is awaited but best-effort: a failure is
    /// logged and the entry stays memory-only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if the memory tier fails.
    pub async fn insert(&self, key: CallKey, value: V) -> Result<(), Error> {
        let entry = self.make_entry(value);
        self.memory.put(&key, entry.clone()).await?;
        if let Some(durable) = &self.durable
            && let Err(error) = durable.put(&key, entry).await
        {
            tracing::warn!(cache.key = %key, error = %error, "durable write failed; entry stays memory-only");
        }
        Ok(())
    }

    /// Removes the entry for `key` from every tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if either tier fails; explicit invalidation
    /// is not best-effort.
    pub async fn invalidate(&self, key: CallKey) -> Result<(), Error> {
        self.memory.remove(&key).await?;
        if let Some(durable) = &self.durable {
            durable.remove(&key).await?;
        }
        Ok(())
    }

    /// Removes every entry from every tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if either tier fails.
    pub async fn clear(&self) -> Result<(), Error> {
        self.memory.clear().await?;
        if let Some(durable) = &self.durable {
            durable.clear().await?;
        }
        Ok(())
    }

    fn make_entry(&self, value: V) -> CacheEntry<P::Stored> {
        let (stored, fingerprint) = P::wrap(value);
        let mut entry = CacheEntry::with_created_at(stored, self.clock.now());
        if let Some(fingerprint) = fingerprint {
            entry.set_fingerprint(fingerprint);
        }
        entry
    }

    /// Memory probe with lazy expiry: an expired entry is a miss and is
    /// eagerly removed, so stale entries do not linger until eviction.
    async fn probe_memory(&self, key: CallKey) -> Result<Option<CacheEntry<P::Stored>>, Error> {
        let Some(entry) = self.memory.get(&key).await? else {
            return Ok(None);
        };
        if !entry.is_expired(self.ttl, self.clock.now()) {
            return Ok(Some(entry));
        }

        tracing::debug!(cache.key = %key, "entry expired; evicting");
        self.memory.remove(&key).await?;
        if let Some(durable) = &self.durable
            && let Err(error) = durable.remove(&key).await
        {
            tracing::warn!(cache.key = %key, error = %error, "failed to drop expired durable entry");
        }
        Ok(None)
    }

    /// Durable probe. Read failures are logged and degrade to a miss — a
    /// broken durable tier costs recomputation, not availability. Hits keep
    /// their original creation time, so TTL spans restarts.
    async fn probe_durable(&self, key: CallKey) -> Option<CacheEntry<P::Stored>> {
        let durable = self.durable.as_ref()?;
        match durable.get(&key).await {
            Ok(Some(entry)) => {
                if entry.is_expired(self.ttl, self.clock.now()) {
                    tracing::debug!(cache.key = %key, "durable entry expired; dropping");
                    if let Err(error) = durable.remove(&key).await {
                        tracing::warn!(cache.key = %key, error = %error, "failed to drop expired durable entry");
                    }
                    return None;
                }
                // Promote into memory (subject to its eviction policy).
                if let Err(error) = self.memory.put(&key, entry.clone()).await {
                    tracing::warn!(cache.key = %key, error = %error, "failed to promote durable entry");
                } else {
                    tracing::trace!(cache.key = %key, "promoted durable entry into memory");
                }
                Some(entry)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::warn!(cache.key = %key, error = %error, "durable read failed; treating as miss");
                None
            }
        }
    }

    async fn store_value(&self, key: CallKey, value: V) -> Result<CacheEntry<P::Stored>, Error> {
        let entry = self.make_entry(value);
        self.memory.put(&key, entry.clone()).await?;
        if let Some(durable) = &self.durable {
            Self::offload_durable_write(Arc::clone(durable), key, entry.clone());
        }
        Ok(entry)
    }

    /// Mirrors an entry to the durable tier off the caller's happy path: a
    /// freshly computed value is returned immediately, never held back by
    /// disk I/O.
    fn offload_durable_write(durable: Arc<D>, key: CallKey, entry: CacheEntry<P::Stored>) {
        let write = async move {
            if let Err(error) = durable.put(&key, entry).await {
                tracing::warn!(cache.key = %key, error = %error, "durable write failed; entry stays memory-only");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                drop(handle.spawn(write));
            }
            // No async runtime to spawn on; a plain thread still keeps the
            // write off the caller's path.
            Err(_) => {
                drop(std::thread::spawn(move || futures::executor::block_on(write)));
            }
        }
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The deprecated flat-options cache façade.
//!
//! Earlier releases exposed a single `cache` entry point taking one flat
//! option set; the `allow_output_mutation` flag silently picked between two
//! very different value-handling schemes. That split is now explicit —
//! [`MemoCache::shared`] and [`MemoCache::isolated`] — and this module only
//! translates old call sites: it emits a deprecation notice, maps the flag
//! to a policy, and forwards everything else.
//!
//! The `show_spinner` and `suppress_warning` options belong to a UI layer
//! this engine does not have; they are accepted and ignored.

use std::{ops::Deref, path::PathBuf, sync::Arc, time::Duration};

use serde::{Serialize, de::DeserializeOwned};

use memora_disk::DiskStore;
use memora_key::{CacheArgs, CallKey, FunctionIdentity, HashFuncRegistry, StableHash};
use memora_store::Clock;

use crate::{
    Error, MemoCache, Memoized,
    cache::NullStore,
    policy::{IsolatedCopy, SharedMutable},
};

/// The legacy flat option set.
///
/// Field meanings match the old façade:
///
/// - `persist`: mirror entries to disk (ignored with a `debug!` note when
///   `allow_output_mutation` is set — shared-mutable caches are
///   memory-only, as they always were).
/// - `allow_output_mutation`: `true` maps to the shared-mutable policy,
///   `false` to the isolated-copy policy.
/// - `show_spinner`, `suppress_warning`: UI concerns; accepted, ignored.
/// - `hash_funcs`: per-type hash overrides for argument hashing.
/// - `max_entries`: capacity bound for the memory tier (FIFO eviction).
/// - `ttl`: time-to-live for entries.
/// - `persist_dir`: where persisted entries go; defaults to
///   `<temp dir>/memora`.
#[derive(Debug, Clone)]
pub struct LegacyCacheOptions {
    /// Mirror entries to disk.
    pub persist: bool,
    /// Hand out shared live references instead of isolated copies.
    pub allow_output_mutation: bool,
    /// UI concern; ignored.
    pub show_spinner: bool,
    /// UI concern; ignored.
    pub suppress_warning: bool,
    /// Per-type hash overrides for argument hashing.
    pub hash_funcs: Option<HashFuncRegistry>,
    /// Capacity bound for the memory tier.
    pub max_entries: Option<u64>,
    /// Time-to-live for entries.
    pub ttl: Option<Duration>,
    /// Directory for persisted entries.
    pub persist_dir: Option<PathBuf>,
}

impl Default for LegacyCacheOptions {
    fn default() -> Self {
        Self {
            persist: false,
            allow_output_mutation: false,
            show_spinner: true,
            suppress_warning: false,
            hash_funcs: None,
            max_entries: None,
            ttl: None,
            persist_dir: None,
        }
    }
}

/// A value returned through the legacy façade.
///
/// The two successor mechanisms return different things — a shared `Arc`
/// or an owned copy — but old call sites expect one type, so both deref to
/// `&V`.
#[derive(Debug, Clone)]
pub enum LegacyOutput<V> {
    /// A shared live reference (`allow_output_mutation = true`).
    Shared(Arc<V>),
    /// An isolated copy (`allow_output_mutation = false`).
    Owned(V),
}

impl<V> Deref for LegacyOutput<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Shared(value) => value,
            Self::Owned(value) => value,
        }
    }
}

/// A memoized callable built through the legacy façade.
///
/// Which variant a call site gets is decided once, at construction, by the
/// option flags — the per-call path has no policy branching.
#[derive(Debug)]
pub enum LegacyCache<A, V, E, Fut, F>
where
    V: Clone + StableHash + Send + Sync + 'static,
{
    /// `allow_output_mutation = true`.
    Shared(Memoized<A, V, E, Fut, SharedMutable, NullStore, F>),
    /// `allow_output_mutation = false`, `persist = false`.
    Isolated(Memoized<A, V, E, Fut, IsolatedCopy, NullStore, F>),
    /// `allow_output_mutation = false`, `persist = true`.
    Persistent(Memoized<A, V, E, Fut, IsolatedCopy, DiskStore<CallKey, V>, F>),
}

/// Builds a memoized callable from the legacy option set.
///
/// Always emits a deprecation notice, then routes on
/// `allow_output_mutation`: `true` builds on the shared-mutable mechanism,
/// `false` on the isolated-copy mechanism (with persistence if requested).
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for an invalid option combination
/// (e.g. `max_entries == 0`) and [`Error::Store`] if the persistence
/// directory cannot be created — both at construction, never at call time.
///
/// # Examples
///
/// ```
/// use memora::legacy::{self, LegacyCacheOptions};
/// use memora_key::FunctionIdentity;
/// # futures::executor::block_on(async {
///
/// async fn fetch(url: String) -> Result<String, std::io::Error> {
///     Ok(format!("contents of {url}"))
/// }
///
/// #[expect(deprecated, reason = "translating an old call site")]
/// let cached_fetch = legacy::cache(
///     FunctionIdentity::new("docs::fetch"),
///     |(url,): (String,)| fetch(url),
///     LegacyCacheOptions::default(),
/// )?;
///
/// let body = cached_fetch.call(("https://a".to_string(),)).await?;
/// assert_eq!(&*body, "contents of https://a");
/// # Ok::<(), memora::Error>(())
/// # });
/// ```
#[deprecated(note = "use `MemoCache::isolated` or `MemoCache::shared` with `Memoized` directly")]
pub fn cache<A, V, E, Fut, F>(identity: FunctionIdentity, func: F, options: LegacyCacheOptions) -> Result<LegacyCache<A, V, E, Fut, F>, Error>
where
    A: CacheArgs + Send,
    V: Clone + StableHash + Serialize + DeserializeOwned + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send,
    F: Fn(A) -> Fut + Send + Sync,
{
    tracing::warn!(
        "the legacy cache façade is deprecated and will be removed; \
         use the isolated-copy or shared-mutable cache builders directly"
    );

    let registry = options.hash_funcs.unwrap_or_default();
    let clock = Clock::system();

    if options.allow_output_mutation {
        if options.persist {
            tracing::debug!("persist is ignored for shared-mutable caches; they are memory-only");
        }
        let mut builder = MemoCache::shared::<V>(clock);
        if let Some(max) = options.max_entries {
            builder = builder.max_entries(max);
        }
        if let Some(ttl) = options.ttl {
            builder = builder.ttl(ttl);
        }
        let cache = builder.build()?;
        return Ok(LegacyCache::Shared(Memoized::with_hash_funcs(identity, cache, registry, func)));
    }

    let mut builder = MemoCache::isolated::<V>(clock);
    if let Some(max) = options.max_entries {
        builder = builder.max_entries(max);
    }
    if let Some(ttl) = options.ttl {
        builder = builder.ttl(ttl);
    }

    if options.persist {
        let dir = options.persist_dir.unwrap_or_else(|| std::env::temp_dir().join("memora"));
        let cache = builder.persist_dir(dir)?.build()?;
        Ok(LegacyCache::Persistent(Memoized::with_hash_funcs(identity, cache, registry, func)))
    } else {
        let cache = builder.build()?;
        Ok(LegacyCache::Isolated(Memoized::with_hash_funcs(identity, cache, registry, func)))
    }
}

impl<A, V, E, Fut, F> LegacyCache<A, V, E, Fut, F>
where
    A: CacheArgs + Send,
    V: Clone + StableHash + Serialize + DeserializeOwned + Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send,
    F: Fn(A) -> Fut + Send + Sync,
{
    /// Calls the wrapped callable through whichever mechanism the options
    /// selected.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Memoized::call`].
    pub async fn call(&self, args: A) -> Result<LegacyOutput<V>, Error> {
        match self {
            Self::Shared(memo) => Ok(LegacyOutput::Shared(memo.call(args).await?)),
            Self::Isolated(memo) => Ok(LegacyOutput::Owned(memo.call(args).await?)),
            Self::Persistent(memo) => Ok(LegacyOutput::Owned(memo.call(args).await?)),
        }
    }

    /// Clears every cached result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if a tier fails.
    pub async fn clear(&self) -> Result<(), Error> {
        match self {
            Self::Shared(memo) => memo.clear().await,
            Self::Isolated(memo) => memo.clear().await,
            Self::Persistent(memo) => memo.clear().await,
        }
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memoizing wrapper around a callable.
//!
//! [`Memoized`] binds together the three things a decorated callable needs:
//! its [`FunctionIdentity`], the hash-function registry its arguments are
//! keyed through, and the cache instance holding its results. One wrapper
//! per callable, constructed once at decoration time — an explicit handle
//! with an explicit lifecycle, not a hidden global.

use std::marker::PhantomData;

use memora_key::{CacheArgs, CallKey, FunctionIdentity, HashFuncRegistry, KeyBuilder};
use memora_store::Store;

use crate::{Error, MemoCache, policy::MutationPolicy};

/// A callable wrapped with a memoizing cache.
///
/// `call(args)` derives the call key from the argument tuple and either
/// serves the cached result or runs the callable — exactly once per
/// distinct key, even under concurrent callers.
///
/// # Examples
///
/// ```
/// use memora::{MemoCache, Memoized};
/// use memora_key::FunctionIdentity;
/// use memora_store::Clock;
/// # futures::executor::block_on(async {
///
/// async fn fetch(url: String) -> Result<String, std::io::Error> {
///     Ok(format!("contents of {url}"))
/// }
///
/// let cache = MemoCache::isolated::<String>(Clock::system()).build()?;
/// let fetch = Memoized::new(
///     FunctionIdentity::new("docs::fetch"),
///     cache,
///     |(url,): (String,)| fetch(url),
/// );
///
/// let first = fetch.call(("https://a".to_string(),)).await?;
/// let second = fetch.call(("https://a".to_string(),)).await?;
/// assert_eq!(first, second);
/// # Ok::<(), memora::Error>(())
/// # });
/// ```
pub struct Memoized<A, V, E, Fut, P, D, F>
where
    P: MutationPolicy<V>,
{
    identity_digest: u128,
    registry: HashFuncRegistry,
    cache: MemoCache<V, P, D>,
    func: F,
    _marker: PhantomData<fn(A, E, Fut)>,
}

impl<A, V, E, Fut, P, D, F> std::fmt::Debug for Memoized<A, V, E, Fut, P, D, F>
where
    P: MutationPolicy<V>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized")
            .field("identity_digest", &format_args!("{:032x}", self.identity_digest))
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl<A, V, E, Fut, P, D, F> Memoized<A, V, E, Fut, P, D, F>
where
    A: CacheArgs + Send,
    V: Send + Sync + 'static,
    E: std::error::Error + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send,
    P: MutationPolicy<V>,
    D: Store<CallKey, P::Stored> + Send + Sync + 'static,
    F: Fn(A) -> Fut + Send + Sync,
{
    /// Wraps `func` with the given identity and cache, using the default
    /// (structural-only) argument hashing.
    pub fn new(identity: FunctionIdentity, cache: MemoCache<V, P, D>, func: F) -> Self {
        Self::with_hash_funcs(identity, cache, HashFuncRegistry::new(), func)
    }

    /// Wraps `func` with a custom hash-function registry.
    ///
    /// The identity digest is computed once here and reused on every call.
    pub fn with_hash_funcs(identity: FunctionIdentity, cache: MemoCache<V, P, D>, registry: HashFuncRegistry, func: F) -> Self {
        Self {
            identity_digest: identity.digest(),
            registry,
            cache,
            func,
            _marker: PhantomData,
        }
    }

    /// Calls the wrapped callable through the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Key`] if an argument cannot be hashed (nothing is
    /// computed or cached for that call), [`Error::Computation`] if the
    /// callable fails (the failure is shared with concurrent waiters and
    /// never cached), or [`Error::Store`] if the memory tier fails.
    pub async fn call(&self, args: A) -> Result<P::Output, Error> {
        let key = self.derive_key(&args)?;
        self.cache.get_or_compute(key, || (self.func)(args)).await
    }

    /// Derives the call key for an argument tuple without touching the
    /// cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Key`] if an argument cannot be hashed.
    pub fn derive_key(&self, args: &A) -> Result<CallKey, Error> {
        let builder = KeyBuilder::from_identity_digest(self.identity_digest, &self.registry);
        Ok(args.fold(builder)?.finish())
    }

    /// Removes the cached result for one argument tuple.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Key`] if an argument cannot be hashed, or
    /// [`Error::Store`] if a tier fails.
    pub async fn invalidate(&self, args: &A) -> Result<(), Error> {
        let key = self.derive_key(args)?;
        self.cache.invalidate(key).await
    }

    /// Clears every cached result for this callable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] if a tier fails.
    pub async fn clear(&self) -> Result<(), Error> {
        self.cache.clear().await
    }

    /// Returns the underlying cache instance.
    #[must_use]
    pub fn cache(&self) -> &MemoCache<V, P, D> {
        &self.cache
    }

    /// Returns the registry arguments are hashed through.
    #[must_use]
    pub fn hash_funcs(&self) -> &HashFuncRegistry {
        &self.registry
    }
}

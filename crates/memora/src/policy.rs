// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mutation policies: what callers get back from the cache.
//!
//! A cache hands out either shared live references or isolated copies,
//! decided once at construction by picking a policy type — never by a flag
//! checked on the access path. [`SharedMutable`] is the fast, unsafe-ish
//! option: every caller sees one allocation, so one caller's interior
//! mutation is visible to the next. [`IsolatedCopy`] protects the cached
//! value: callers receive clones, and a fingerprint recorded at insertion
//! is re-checked on every read to catch clones that secretly shared state.

use std::sync::Arc;

use memora_key::{CallKey, StableHash, fingerprint};
use memora_store::CacheEntry;

mod sealed {
    pub trait Sealed {}
}

/// How cached values are stored and handed to callers.
///
/// This trait is sealed; [`SharedMutable`] and [`IsolatedCopy`] are the two
/// policies. The policy is a type parameter of the cache, so the choice is
/// fixed at construction and compiled into the access path.
#[expect(private_bounds, reason = "intentionally sealed trait pattern")]
pub trait MutationPolicy<V>: sealed::Sealed + Send + Sync + 'static {
    /// The representation entries hold inside storage tiers.
    type Stored: Clone + Send + Sync + 'static;

    /// What callers receive on a hit.
    type Output;

    /// Prepares a freshly computed value for storage.
    ///
    /// Returns the stored representation and, if the policy records one,
    /// the content fingerprint to stamp on the entry.
    fn wrap(value: V) -> (Self::Stored, Option<u128>);

    /// Produces the caller-facing value from a stored entry.
    fn unwrap(key: CallKey, entry: &CacheEntry<Self::Stored>) -> Self::Output;
}

/// Hand out the cached allocation itself.
///
/// `get` clones an [`Arc`], never the value: all callers share one live
/// allocation, and interior mutation by one caller is observable by every
/// later one. No hashing or copying happens on either the insert or the
/// read path, and `V` needs no `Clone`. Fast, and safe only when callers
/// treat results as immutable or deliberately share state.
#[derive(Debug, Clone, Copy)]
pub struct SharedMutable;

impl sealed::Sealed for SharedMutable {}

impl<V> MutationPolicy<V> for SharedMutable
where
    V: Send + Sync + 'static,
{
    type Stored = Arc<V>;
    type Output = Arc<V>;

    fn wrap(value: V) -> (Self::Stored, Option<u128>) {
        (Arc::new(value), None)
    }

    fn unwrap(_key: CallKey, entry: &CacheEntry<Self::Stored>) -> Self::Output {
        Arc::clone(entry.value())
    }
}

/// Hand out isolated copies and detect mutation of the stored value.
///
/// `put` records a structural fingerprint of the value; `get` hands out a
/// `clone()`. For values whose `Clone` is deep, mutating a returned copy
/// cannot affect the cache. `Clone` can be shallow, though — a value
/// holding an `Arc<Mutex<…>>` clones the handle, not the state — so every
/// read re-hashes the stored value against the recorded fingerprint and
/// emits a warning-level `mutation detected` diagnostic on mismatch. The
/// value is still served; the diagnostic points at a correctness bug in
/// caller code, not in the cache.
#[derive(Debug, Clone, Copy)]
pub struct IsolatedCopy;

impl sealed::Sealed for IsolatedCopy {}

impl<V> MutationPolicy<V> for IsolatedCopy
where
    V: Clone + StableHash + Send + Sync + 'static,
{
    type Stored = V;
    type Output = V;

    fn wrap(value: V) -> (Self::Stored, Option<u128>) {
        let digest = fingerprint(&value);
        (value, Some(digest))
    }

    fn unwrap(key: CallKey, entry: &CacheEntry<Self::Stored>) -> Self::Output {
        if let Some(recorded) = entry.fingerprint() {
            let current = fingerprint(entry.value());
            if current != recorded {
                tracing::warn!(
                    cache.key = %key,
                    "mutation detected: cached value changed after insertion; \
                     a caller likely mutated shared interior state of a returned copy"
                );
            }
        }
        entry.value().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_wrap_records_no_fingerprint() {
        let (stored, fp) = <SharedMutable as MutationPolicy<String>>::wrap("v".to_string());
        assert_eq!(*stored, "v");
        assert!(fp.is_none());
    }

    #[test]
    fn shared_unwrap_aliases_the_stored_allocation() {
        let (stored, _) = <SharedMutable as MutationPolicy<String>>::wrap("v".to_string());
        let entry = CacheEntry::new(stored);
        let a = <SharedMutable as MutationPolicy<String>>::unwrap(CallKey::from_digest(1), &entry);
        let b = <SharedMutable as MutationPolicy<String>>::unwrap(CallKey::from_digest(1), &entry);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn isolated_wrap_records_fingerprint() {
        let (stored, fp) = <IsolatedCopy as MutationPolicy<Vec<u8>>>::wrap(vec![1, 2]);
        assert_eq!(stored, vec![1, 2]);
        assert_eq!(fp, Some(memora_key::fingerprint(&vec![1u8, 2])));
    }

    #[test]
    fn isolated_unwrap_returns_an_independent_copy() {
        let (stored, fp) = <IsolatedCopy as MutationPolicy<Vec<u8>>>::wrap(vec![1, 2]);
        let mut entry = CacheEntry::new(stored);
        entry.set_fingerprint(fp.unwrap());

        let mut copy = <IsolatedCopy as MutationPolicy<Vec<u8>>>::unwrap(CallKey::from_digest(1), &entry);
        copy.push(3);

        assert_eq!(*entry.value(), vec![1, 2]);
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Deterministic call-key derivation for the memora memoizing cache engine.
//!
//! A memoizing cache is only as correct as its keys: two calls with equal
//! arguments must always land on the same key, and two distinguishable calls
//! must never collide. This crate derives a 128-bit [`CallKey`] from a
//! callable's [`FunctionIdentity`] and its arguments, with per-type hashing
//! resolved through a [`HashFuncRegistry`] lookup chain:
//!
//! 1. an exact type match registered in the registry,
//! 2. a qualified-type-name match registered in the registry,
//! 3. the default structural hasher ([`StableHash`]),
//! 4. otherwise the derivation fails with
//!    [`Error::UnhashableArgument`], naming the argument and its type.
//!
//! Hashing is XXH3-128 with a fixed seed, so keys are stable across
//! processes and can address entries in a durable tier.
//!
//! # Examples
//!
//! ```
//! use memora_key::{FunctionIdentity, HashFuncRegistry, KeyBuilder};
//!
//! fn fetch(url: &str) -> String {
//!     url.to_uppercase()
//! }
//!
//! let identity = FunctionIdentity::of(&fetch);
//! let registry = HashFuncRegistry::new();
//!
//! let a = KeyBuilder::new(&identity, &registry).arg(&"https://a")?.finish();
//! let b = KeyBuilder::new(&identity, &registry).arg(&"https://a")?.finish();
//! let c = KeyBuilder::new(&identity, &registry).arg(&"https://b")?.finish();
//!
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! # Ok::<(), memora_key::Error>(())
//! ```

mod arg;
mod error;
mod hasher;
mod identity;
mod key;
mod registry;
mod stable;

pub use arg::{ByRegistry, CacheArg, CacheArgs};
pub use error::Error;
pub use hasher::KeyHasher;
pub use identity::FunctionIdentity;
pub use key::{CallKey, KeyBuilder};
pub use registry::HashFuncRegistry;
pub use stable::StableHash;

/// Computes the structural fingerprint of a value.
///
/// This is the same digest the isolation policy records at insertion time
/// and re-checks on every read to detect external mutation of cached values.
///
/// # Examples
///
/// ```
/// use memora_key::fingerprint;
///
/// let v = vec![1, 2, 3];
/// assert_eq!(fingerprint(&v), fingerprint(&v.clone()));
/// assert_ne!(fingerprint(&v), fingerprint(&vec![1, 2, 4]));
/// ```
#[must_use]
pub fn fingerprint<T: StableHash + ?Sized>(value: &T) -> u128 {
    let mut hasher = KeyHasher::new();
    value.stable_hash(&mut hasher);
    hasher.finish()
}

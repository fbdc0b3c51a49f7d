// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use crate::{CacheArg, Error, FunctionIdentity, HashFuncRegistry, KeyHasher};

const KEY_TAG: u8 = 0x11;

/// The deterministic identifier of one distinguishable invocation.
///
/// A call key combines the callable's identity digest with digests of its
/// positional and named arguments. Everything a cache does hangs off this
/// value: lookups, eviction order bookkeeping, single-flight coalescing,
/// and file names in the durable tier (the `Display` form is 32 hex
/// digits, safe for file systems).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallKey(u128);

impl CallKey {
    /// Creates a key from a raw 128-bit digest.
    #[must_use]
    pub const fn from_digest(digest: u128) -> Self {
        Self(digest)
    }

    /// Returns the raw 128-bit digest.
    #[must_use]
    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl std::fmt::Display for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl std::fmt::Debug for CallKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CallKey({:032x})", self.0)
    }
}

/// Derives a [`CallKey`] from a callable identity and its arguments.
///
/// Positional arguments fold in call order; named arguments fold
/// order-insensitively, so `.named("a", …).named("b", …)` and
/// `.named("b", …).named("a", …)` derive the same key. Each argument is
/// resolved through the registry lookup chain; the first argument that
/// cannot be hashed fails the whole derivation, naming its position or
/// name.
///
/// # Examples
///
/// ```
/// use memora_key::{FunctionIdentity, HashFuncRegistry, KeyBuilder};
///
/// let identity = FunctionIdentity::new("fetch");
/// let registry = HashFuncRegistry::new();
///
/// let ab = KeyBuilder::new(&identity, &registry)
///     .arg(&"https://a")?
///     .named("timeout", &30u64)?
///     .named("retries", &3u8)?
///     .finish();
///
/// let ba = KeyBuilder::new(&identity, &registry)
///     .arg(&"https://a")?
///     .named("retries", &3u8)?
///     .named("timeout", &30u64)?
///     .finish();
///
/// assert_eq!(ab, ba);
/// # Ok::<(), memora_key::Error>(())
/// ```
#[derive(Debug)]
pub struct KeyBuilder<'r> {
    registry: &'r HashFuncRegistry,
    identity: u128,
    positional: KeyHasher,
    positional_count: u32,
    named: Vec<(Cow<'static, str>, u128)>,
}

impl<'r> KeyBuilder<'r> {
    /// Starts a derivation for the given identity.
    #[must_use]
    pub fn new(identity: &FunctionIdentity, registry: &'r HashFuncRegistry) -> Self {
        Self::from_identity_digest(identity.digest(), registry)
    }

    /// Starts a derivation from a precomputed identity digest.
    ///
    /// Wrappers that hold a cache for one callable compute the identity
    /// digest once at construction and reuse it per call.
    #[must_use]
    pub fn from_identity_digest(digest: u128, registry: &'r HashFuncRegistry) -> Self {
        Self {
            registry,
            identity: digest,
            positional: KeyHasher::new(),
            positional_count: 0,
            named: Vec::new(),
        }
    }

    /// Folds the next positional argument into the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnhashableArgument`] (naming the argument position)
    /// if the value has no registry entry and no structural hash, or
    /// [`Error::HashFnMismatch`] if a name-registered hash function rejects
    /// the value's type.
    pub fn arg<A: CacheArg + ?Sized>(mut self, value: &A) -> Result<Self, Error> {
        let position = self.positional_count;
        self.positional_count += 1;
        value
            .key_hash(self.registry, &mut self.positional)
            .map_err(|e| e.for_argument(format!("#{position}")))?;
        Ok(self)
    }

    /// Folds a named argument into the key.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`arg`](Self::arg), naming the argument by its
    /// name instead of a position.
    pub fn named<A: CacheArg + ?Sized>(mut self, name: impl Into<Cow<'static, str>>, value: &A) -> Result<Self, Error> {
        let name = name.into();
        let mut sub = KeyHasher::new();
        sub.write_str(&name);
        value
            .key_hash(self.registry, &mut sub)
            .map_err(|e| e.for_argument(name.as_ref()))?;
        self.named.push((name, sub.finish()));
        Ok(self)
    }

    /// Completes the derivation.
    #[must_use]
    pub fn finish(self) -> CallKey {
        let Self {
            identity,
            positional,
            positional_count,
            mut named,
            ..
        } = self;

        // Canonical order for the named lane.
        named.sort();

        let mut hasher = KeyHasher::new();
        hasher.write_tag(KEY_TAG);
        hasher.write_u128(identity);
        hasher.write_len(positional_count as usize);
        hasher.write_u128(positional.finish());
        hasher.write_len(named.len());
        for (_, digest) in named {
            hasher.write_u128(digest);
        }
        CallKey(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(args: &[&'static str]) -> CallKey {
        let identity = FunctionIdentity::new("f");
        let registry = HashFuncRegistry::new();
        let mut builder = KeyBuilder::new(&identity, &registry);
        for a in args {
            builder = builder.arg(a).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn repeated_derivation_is_stable() {
        assert_eq!(key_of(&["a", "b"]), key_of(&["a", "b"]));
    }

    #[test]
    fn positional_order_matters() {
        assert_ne!(key_of(&["a", "b"]), key_of(&["b", "a"]));
    }

    #[test]
    fn identity_separates_equal_arguments() {
        let registry = HashFuncRegistry::new();
        let f = KeyBuilder::new(&FunctionIdentity::new("f"), &registry).arg(&1u32).unwrap().finish();
        let g = KeyBuilder::new(&FunctionIdentity::new("g"), &registry).arg(&1u32).unwrap().finish();
        assert_ne!(f, g);
    }

    #[test]
    fn named_lane_is_order_insensitive_but_name_sensitive() {
        let registry = HashFuncRegistry::new();
        let identity = FunctionIdentity::new("f");

        let ab = KeyBuilder::new(&identity, &registry)
            .named("a", &1u32)
            .unwrap()
            .named("b", &2u32)
            .unwrap()
            .finish();
        let ba = KeyBuilder::new(&identity, &registry)
            .named("b", &2u32)
            .unwrap()
            .named("a", &1u32)
            .unwrap()
            .finish();
        assert_eq!(ab, ba);

        let swapped = KeyBuilder::new(&identity, &registry)
            .named("a", &2u32)
            .unwrap()
            .named("b", &1u32)
            .unwrap()
            .finish();
        assert_ne!(ab, swapped);
    }

    #[test]
    fn positional_and_named_lanes_are_distinct() {
        let registry = HashFuncRegistry::new();
        let identity = FunctionIdentity::new("f");

        let positional = KeyBuilder::new(&identity, &registry).arg(&1u32).unwrap().finish();
        let named = KeyBuilder::new(&identity, &registry).named("x", &1u32).unwrap().finish();
        assert_ne!(positional, named);
    }

    #[test]
    fn display_renders_as_32_hex_digits() {
        let key = CallKey::from_digest(0xdead_beef);
        let text = key.to_string();
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(text.ends_with("deadbeef"));
    }

    #[test]
    fn unhashable_error_names_the_position() {
        use crate::ByRegistry;

        struct NoHash;

        let registry = HashFuncRegistry::new();
        let identity = FunctionIdentity::new("f");
        let err = KeyBuilder::new(&identity, &registry)
            .arg(&"fine")
            .unwrap()
            .arg(&ByRegistry(&NoHash))
            .unwrap_err();

        assert!(matches!(&err, Error::UnhashableArgument { argument, .. } if argument == "#1"));
    }
}

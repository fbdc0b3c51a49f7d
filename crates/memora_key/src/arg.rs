// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! How argument values participate in key derivation.
//!
//! [`CacheArg`] is implemented for every structurally hashable type (with
//! the registry consulted first), and for [`ByRegistry`], the wrapper that
//! opts a type into registry-only hashing. [`CacheArgs`] lifts the scheme
//! to whole argument tuples.

use std::any::Any;

use crate::{Error, HashFuncRegistry, KeyBuilder, KeyHasher, StableHash};

/// A value that can be folded into a call key.
///
/// Hashing resolves through the registry lookup chain: an exact-type entry,
/// then a qualified-name entry, then — for types that have one — the
/// structural hash. Errors leave the argument position blank; the
/// [`KeyBuilder`] stamps it in.
pub trait CacheArg {
    /// Folds this argument into the hasher via the registry chain.
    fn key_hash(&self, registry: &HashFuncRegistry, hasher: &mut KeyHasher) -> Result<(), Error>;
}

impl<T: StableHash + Any> CacheArg for T {
    fn key_hash(&self, registry: &HashFuncRegistry, hasher: &mut KeyHasher) -> Result<(), Error> {
        match registry.hash_value(self, std::any::type_name::<T>(), hasher) {
            Some(result) => result,
            None => {
                self.stable_hash(hasher);
                Ok(())
            }
        }
    }
}

/// Opts a value into registry-only hashing.
///
/// Types without a structural hash (connections, clients, handles) can
/// still appear as cache arguments when a hash function is registered for
/// them. Wrapping the argument in `ByRegistry` skips the structural
/// fallback entirely: if no registry entry matches, derivation fails with
/// [`Error::UnhashableArgument`] instead of silently hashing nothing.
///
/// # Examples
///
/// ```
/// use memora_key::{ByRegistry, FunctionIdentity, HashFuncRegistry, KeyBuilder};
///
/// struct Client {
///     endpoint: String,
/// }
///
/// let identity = FunctionIdentity::new("query");
/// let client = Client { endpoint: "db:5432".into() };
///
/// // Without a registry entry the argument is rejected, naming it.
/// let empty = HashFuncRegistry::new();
/// let err = KeyBuilder::new(&identity, &empty).arg(&ByRegistry(&client)).unwrap_err();
/// assert!(err.to_string().contains("Client"));
///
/// // With one, the client participates in the key.
/// let mut registry = HashFuncRegistry::new();
/// registry.register(|c: &Client, h| h.write_str(&c.endpoint));
/// let key = KeyBuilder::new(&identity, &registry).arg(&ByRegistry(&client))?.finish();
/// # let _ = key;
/// # Ok::<(), memora_key::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ByRegistry<'a, T>(pub &'a T);

impl<T: Any> CacheArg for ByRegistry<'_, T> {
    fn key_hash(&self, registry: &HashFuncRegistry, hasher: &mut KeyHasher) -> Result<(), Error> {
        match registry.hash_value(self.0, std::any::type_name::<T>(), hasher) {
            Some(result) => result,
            None => Err(Error::UnhashableArgument {
                argument: String::new(),
                type_name: std::any::type_name::<T>(),
            }),
        }
    }
}

/// A tuple of positional arguments.
///
/// Implemented for tuples up to eight elements; a single argument is the
/// one-element tuple `(value,)`. Each element folds in order through
/// [`KeyBuilder::arg`], so failures name the element's position.
pub trait CacheArgs {
    /// Folds every argument into the builder, in order.
    fn fold<'r>(&self, builder: KeyBuilder<'r>) -> Result<KeyBuilder<'r>, Error>;
}

impl CacheArgs for () {
    fn fold<'r>(&self, builder: KeyBuilder<'r>) -> Result<KeyBuilder<'r>, Error> {
        Ok(builder)
    }
}

macro_rules! impl_cache_args {
    ($($name:ident : $index:tt),+) => {
        impl<$($name: CacheArg),+> CacheArgs for ($($name,)+) {
            fn fold<'r>(&self, builder: KeyBuilder<'r>) -> Result<KeyBuilder<'r>, Error> {
                $(let builder = builder.arg(&self.$index)?;)+
                Ok(builder)
            }
        }
    };
}

impl_cache_args!(A: 0);
impl_cache_args!(A: 0, B: 1);
impl_cache_args!(A: 0, B: 1, C: 2);
impl_cache_args!(A: 0, B: 1, C: 2, D: 3);
impl_cache_args!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_cache_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_cache_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_cache_args!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CallKey, FunctionIdentity};

    fn derive<A: CacheArgs>(registry: &HashFuncRegistry, args: &A) -> Result<CallKey, Error> {
        let builder = KeyBuilder::new(&FunctionIdentity::new("f"), registry);
        Ok(args.fold(builder)?.finish())
    }

    #[test]
    fn tuples_fold_positionally() {
        let registry = HashFuncRegistry::new();
        let ab = derive(&registry, &(1u32, "two")).unwrap();
        let ba = derive(&registry, &("two", 1u32)).unwrap();
        assert_ne!(ab, ba);
        assert_eq!(ab, derive(&registry, &(1u32, "two")).unwrap());
    }

    #[test]
    fn empty_tuple_is_a_valid_argument_set() {
        let registry = HashFuncRegistry::new();
        assert_eq!(derive(&registry, &()).unwrap(), derive(&registry, &()).unwrap());
    }

    #[test]
    fn registry_override_beats_structural_hash() {
        // Hash every string to the same digest; equal-by-registry values
        // must collapse to one key.
        let mut registry = HashFuncRegistry::new();
        registry.register(|_: &String, h| h.write_u64(0));

        let a = derive(&registry, &(String::from("a"),)).unwrap();
        let b = derive(&registry, &(String::from("b"),)).unwrap();
        assert_eq!(a, b);

        let structural = derive(&HashFuncRegistry::new(), &(String::from("a"),)).unwrap();
        assert_ne!(a, structural);
    }

    #[test]
    fn by_registry_without_entry_fails() {
        struct Handle;

        let registry = HashFuncRegistry::new();
        let err = derive(&registry, &(ByRegistry(&Handle),)).unwrap_err();
        assert!(matches!(err, Error::UnhashableArgument { argument, .. } if argument == "#0"));
    }
}

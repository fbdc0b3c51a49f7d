// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The per-type hash-function registry.
//!
//! The registry overrides how argument values of particular types are folded
//! into a call key. Lookup order is fixed: exact type match first, then
//! qualified-name match, then the caller falls back to the structural hasher
//! (or fails). Entries are consulted in registration order within each pass.

use std::{
    any::{Any, TypeId},
    borrow::Cow,
    sync::Arc,
};

use crate::{Error, KeyHasher};

type ErasedHashFn = Arc<dyn Fn(&dyn Any, &mut KeyHasher) -> Result<(), Error> + Send + Sync>;

#[derive(Clone)]
struct RegistryEntry {
    /// `None` for entries registered by qualified name only.
    type_id: Option<TypeId>,
    type_name: Cow<'static, str>,
    func: ErasedHashFn,
}

/// An ordered registry of per-type hash functions.
///
/// Registered functions must be pure and total over their declared type:
/// every call-key derivation trusts them to map equal values to equal
/// digests. An impure function here silently serves wrong cache results —
/// there is no downstream check that can catch it.
///
/// Matching is on the argument's exact type: an entry registered for `T`
/// does not apply to a `&T` argument.
///
/// # Examples
///
/// Making an otherwise unhashable type usable as a cache argument:
///
/// ```
/// use memora_key::{ByRegistry, FunctionIdentity, HashFuncRegistry, KeyBuilder};
///
/// // No structural hash: connections are identified by their endpoint.
/// struct Connection {
///     endpoint: String,
/// }
///
/// let mut registry = HashFuncRegistry::new();
/// registry.register(|conn: &Connection, hasher| hasher.write_str(&conn.endpoint));
///
/// let identity = FunctionIdentity::new("query");
/// let conn = Connection { endpoint: "db:5432".into() };
/// let key = KeyBuilder::new(&identity, &registry)
///     .arg(&ByRegistry(&conn))?
///     .finish();
/// # let _ = key;
/// # Ok::<(), memora_key::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct HashFuncRegistry {
    entries: Vec<RegistryEntry>,
}

impl std::fmt::Debug for HashFuncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashFuncRegistry")
            .field("types", &self.entries.iter().map(|e| e.type_name.as_ref()).collect::<Vec<_>>())
            .finish()
    }
}

impl HashFuncRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hash function for values of type `T`.
    ///
    /// The entry matches both by exact type and by `T`'s qualified name.
    pub fn register<T: Any>(&mut self, func: impl Fn(&T, &mut KeyHasher) + Send + Sync + 'static) {
        self.entries.push(RegistryEntry {
            type_id: Some(TypeId::of::<T>()),
            type_name: Cow::Borrowed(std::any::type_name::<T>()),
            func: Self::erase(std::any::type_name::<T>(), func),
        });
    }

    /// Registers a hash function under an explicit qualified name.
    ///
    /// The entry matches by name only, never by exact type. This is the
    /// late-binding form: the name is compared against the qualified type
    /// name of argument values at derivation time, and the value is then
    /// downcast to `T`. A name match whose downcast fails reports
    /// [`Error::HashFnMismatch`] rather than silently falling through.
    pub fn register_as<T: Any>(&mut self, name: impl Into<Cow<'static, str>>, func: impl Fn(&T, &mut KeyHasher) + Send + Sync + 'static) {
        let name = name.into();
        self.entries.push(RegistryEntry {
            type_id: None,
            type_name: name.clone(),
            func: Self::erase_named(name, func),
        });
    }

    /// Returns the number of registered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up and applies a hash function for `value`.
    ///
    /// Returns `None` when no entry matches, in which case the caller falls
    /// back to the structural hasher or reports the value unhashable.
    pub fn hash_value(&self, value: &dyn Any, type_name: &'static str, hasher: &mut KeyHasher) -> Option<Result<(), Error>> {
        let type_id = value.type_id();
        if let Some(entry) = self.entries.iter().find(|e| e.type_id == Some(type_id)) {
            return Some((entry.func)(value, hasher));
        }
        self.entries
            .iter()
            .find(|e| e.type_id.is_none() && e.type_name == type_name)
            .map(|entry| (entry.func)(value, hasher))
    }

    fn erase<T: Any>(registered: &'static str, func: impl Fn(&T, &mut KeyHasher) + Send + Sync + 'static) -> ErasedHashFn {
        Arc::new(move |value, hasher| {
            let value = value.downcast_ref::<T>().ok_or_else(|| Error::HashFnMismatch {
                registered: registered.to_string(),
                type_name: std::any::type_name::<T>(),
            })?;
            func(value, hasher);
            Ok(())
        })
    }

    fn erase_named<T: Any>(registered: Cow<'static, str>, func: impl Fn(&T, &mut KeyHasher) + Send + Sync + 'static) -> ErasedHashFn {
        Arc::new(move |value, hasher| {
            let Some(value) = value.downcast_ref::<T>() else {
                return Err(Error::HashFnMismatch {
                    registered: registered.to_string(),
                    type_name: std::any::type_name::<T>(),
                });
            };
            func(value, hasher);
            Ok(())
        })
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;

use crate::{KeyHasher, StableHash};

const IDENTITY_TAG: u8 = 0x10;

/// A stable fingerprint of a cached callable's behavior.
///
/// Two callables with equal identities and equal arguments are treated as
/// cache-key-equivalent, so an identity must change whenever the behavior
/// it stands for does. The qualified name covers "which function"; the
/// optional detail digest covers everything else that distinguishes
/// behavior — captured closure state, a schema or code version, a build id.
///
/// # Examples
///
/// ```
/// use memora_key::FunctionIdentity;
///
/// fn fetch(url: &str) -> String {
///     url.to_string()
/// }
///
/// // Derive the qualified name from the function item itself.
/// let identity = FunctionIdentity::of(&fetch);
/// assert!(identity.name().ends_with("fetch"));
///
/// // Captured state folds into the identity.
/// let limit = 10u32;
/// let with_state = FunctionIdentity::new("search").with_detail(&limit);
/// assert_ne!(with_state.digest(), FunctionIdentity::new("search").digest());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionIdentity {
    name: Cow<'static, str>,
    detail: u128,
}

impl FunctionIdentity {
    /// Creates an identity from a qualified name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            detail: 0,
        }
    }

    /// Creates an identity from a callable, using its qualified type name.
    ///
    /// Function items carry their full module path in the type name, which
    /// makes this the usual constructor for free functions. Closures only
    /// get a `{{closure}}` name scoped to the enclosing function — sibling
    /// closures can share it, and captures are not part of it — so prefer
    /// [`new`](Self::new) plus [`with_detail`](Self::with_detail) when
    /// caching a closure.
    #[must_use]
    pub fn of<F: ?Sized>(func: &F) -> Self {
        Self::new(std::any::type_name_of_val(func))
    }

    /// Folds extra distinguishing state into the identity.
    ///
    /// Calling this repeatedly folds each detail on top of the previous
    /// digest, so order matters.
    #[must_use]
    pub fn with_detail<T: StableHash + ?Sized>(mut self, detail: &T) -> Self {
        let mut hasher = KeyHasher::new();
        hasher.write_u128(self.detail);
        detail.stable_hash(&mut hasher);
        self.detail = hasher.finish();
        self
    }

    /// Returns the qualified name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the 128-bit digest of this identity.
    #[must_use]
    pub fn digest(&self) -> u128 {
        let mut hasher = KeyHasher::new();
        hasher.write_tag(IDENTITY_TAG);
        hasher.write_str(&self.name);
        hasher.write_u128(self.detail);
        hasher.finish()
    }
}

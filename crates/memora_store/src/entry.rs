// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

/// A cached value with the metadata the engine needs around it.
///
/// `CacheEntry` wraps a stored value with its creation timestamp, the time it
/// was last served, and an optional content fingerprint recorded by the
/// isolation policy. Timestamps are [`SystemTime`] rather than `Instant` so
/// entries written to a durable tier keep aging across process restarts.
///
/// # Examples
///
/// ```
/// use memora_store::CacheEntry;
///
/// let entry = CacheEntry::new("data".to_string());
/// assert_eq!(entry.value(), "data");
/// assert!(entry.created_at().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Option<SystemTime>,
    last_touch: Option<SystemTime>,
    /// Content fingerprint recorded at insertion by the isolation policy.
    fingerprint: Option<u128>,
}

impl<V> CacheEntry<V> {
    /// Creates a new cache entry with the given value.
    ///
    /// The creation timestamp is set by the cache when the entry is inserted.
    pub fn new(value: V) -> Self {
        Self {
            value,
            created_at: None,
            last_touch: None,
            fingerprint: None,
        }
    }

    /// Creates a new cache entry with an explicit creation timestamp.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora_store::CacheEntry;
    /// use std::time::SystemTime;
    ///
    /// let now = SystemTime::now();
    /// let entry = CacheEntry::with_created_at(42, now);
    /// assert_eq!(entry.created_at(), Some(now));
    /// ```
    pub fn with_created_at(value: V, created_at: SystemTime) -> Self {
        Self {
            value,
            created_at: Some(created_at),
            last_touch: None,
            fingerprint: None,
        }
    }

    /// Returns the timestamp recorded when this entry was inserted.
    #[must_use]
    pub fn created_at(&self) -> Option<SystemTime> {
        self.created_at
    }

    /// Sets the creation timestamp if it has not been set yet.
    ///
    /// Entries promoted from a durable tier keep their original timestamp,
    /// so TTL keeps counting from the first computation.
    pub fn ensure_created_at(&mut self, created_at: SystemTime) {
        if self.created_at.is_none() {
            self.created_at = Some(created_at);
        }
    }

    /// Returns the time this entry was last served, if it ever was.
    ///
    /// Maintained for diagnostics; the eviction policy does not consult it.
    #[must_use]
    pub fn last_touch(&self) -> Option<SystemTime> {
        self.last_touch
    }

    /// Records that the entry was served at `now`.
    pub fn touch(&mut self, now: SystemTime) {
        self.last_touch = Some(now);
    }

    /// Returns the content fingerprint recorded at insertion, if any.
    #[must_use]
    pub fn fingerprint(&self) -> Option<u128> {
        self.fingerprint
    }

    /// Records a content fingerprint for the stored value.
    pub fn set_fingerprint(&mut self, fingerprint: u128) {
        self.fingerprint = Some(fingerprint);
    }

    /// Returns whether the entry has outlived `ttl` as of `now`.
    ///
    /// An entry is expired once `now - created_at >= ttl`; the boundary
    /// counts as expired, so an entry must never be served at exactly its
    /// TTL. With a TTL configured, a missing creation timestamp or a system
    /// clock that moved backwards both count as expired.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora_store::CacheEntry;
    /// use std::time::{Duration, SystemTime};
    ///
    /// let t0 = SystemTime::now();
    /// let entry = CacheEntry::with_created_at(1, t0);
    /// let ttl = Some(Duration::from_secs(10));
    ///
    /// assert!(!entry.is_expired(ttl, t0 + Duration::from_secs(9)));
    /// assert!(entry.is_expired(ttl, t0 + Duration::from_secs(10)));
    /// assert!(entry.is_expired(ttl, t0 + Duration::from_secs(11)));
    /// ```
    #[must_use]
    pub fn is_expired(&self, ttl: Option<Duration>, now: SystemTime) -> bool {
        let Some(ttl) = ttl else {
            return false;
        };
        match self.created_at {
            Some(created_at) => match now.duration_since(created_at) {
                Ok(elapsed) => elapsed >= ttl,
                // The system clock went backwards; the entry's age is
                // unknowable, so treat it as expired.
                Err(_) => true,
            },
            // An entry without a timestamp cannot prove it is fresh.
            None => true,
        }
    }

    /// Consumes the entry and returns the inner value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns a reference to the cached value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<V> From<V> for CacheEntry<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

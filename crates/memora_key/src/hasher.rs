// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use xxhash_rust::xxh3::Xxh3;

/// A streaming hasher producing 128-bit digests.
///
/// `KeyHasher` wraps XXH3 with a fixed seed so digests are stable across
/// processes and platforms — a requirement for keys that address entries in
/// a durable tier. Writers are expected to follow the tag-and-length
/// discipline used by [`StableHash`](crate::StableHash): a tag byte per
/// shape, lengths before variable-size data. That discipline is what keeps
/// `("ab", "c")` and `("a", "bc")` from colliding.
///
/// # Examples
///
/// ```
/// use memora_key::KeyHasher;
///
/// let mut h = KeyHasher::new();
/// h.write_str("hello");
/// let d1 = h.finish();
///
/// let mut h = KeyHasher::new();
/// h.write_str("hello");
/// assert_eq!(h.finish(), d1);
/// ```
pub struct KeyHasher {
    inner: Xxh3,
}

impl std::fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyHasher").finish_non_exhaustive()
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyHasher {
    /// Creates a new hasher.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Xxh3::new() }
    }

    /// Writes raw bytes without a length prefix.
    ///
    /// Prefer [`write_bytes`](Self::write_bytes) for variable-size data.
    pub fn write(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Writes a length prefix followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.inner.update(bytes);
    }

    /// Writes a string as length-prefixed UTF-8.
    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Writes a single tag byte.
    pub fn write_tag(&mut self, tag: u8) {
        self.inner.update(&[tag]);
    }

    /// Writes a collection length.
    pub fn write_len(&mut self, len: usize) {
        self.write_u64(len as u64);
    }

    /// Writes a `u64` in a fixed byte order.
    pub fn write_u64(&mut self, value: u64) {
        self.inner.update(&value.to_le_bytes());
    }

    /// Writes a `u128` in a fixed byte order.
    pub fn write_u128(&mut self, value: u128) {
        self.inner.update(&value.to_le_bytes());
    }

    /// Consumes the hasher and returns the 128-bit digest.
    #[must_use]
    pub fn finish(self) -> u128 {
        self.inner.digest128()
    }
}

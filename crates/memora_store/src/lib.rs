// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Storage tier contract for the memora memoizing cache engine.
//!
//! This crate defines the interface that cache storage backends implement:
//! - [`Store`]: the async tier trait (`get`, `put`, `remove`, `clear`)
//! - [`CacheEntry`]: a cached value plus the metadata the engine needs for
//!   expiration and mutation detection
//! - [`Error`]: the opaque tier error type
//! - [`Clock`] / [`ClockControl`]: the time source used for entry
//!   timestamps, with a frozen clock for deterministic tests
//!
//! # Examples
//!
//! ```
//! use memora_store::{CacheEntry, Clock};
//! use std::time::Duration;
//!
//! let clock = Clock::new_frozen();
//! let mut entry = CacheEntry::new(42);
//! entry.ensure_created_at(clock.now());
//!
//! // Fresh entries are not expired.
//! assert!(!entry.is_expired(Some(Duration::from_secs(60)), clock.now()));
//!
//! // Without a TTL, entries never expire.
//! assert!(!entry.is_expired(None, clock.now()));
//! ```

mod clock;
mod entry;
mod error;
mod store;

#[cfg(feature = "test-util")]
pub mod testing;

pub use clock::{Clock, ClockControl};
pub use entry::CacheEntry;
pub use error::{Error, Result};
pub use store::Store;

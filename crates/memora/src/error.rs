// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::{borrow::Cow, sync::Arc};

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a cache operation.
///
/// This type is `Clone`: when concurrent callers coalesce on one in-flight
/// computation, a single failure is handed to every waiter, so the sources
/// are shared behind `Arc`s.
///
/// A failed computation is never cached — the error reaches all current
/// waiters and the next caller recomputes.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Deriving the call key failed; nothing was computed or cached.
    #[error(transparent)]
    Key(#[from] memora_key::Error),

    /// The wrapped computation itself failed.
    ///
    /// Use [`computation_source`](Error::computation_source) to get the
    /// original error back.
    #[error("cached computation failed: {0}")]
    Computation(Arc<dyn std::error::Error + Send + Sync>),

    /// A storage tier operation failed.
    #[error("cache store operation failed: {0}")]
    Store(Arc<memora_store::Error>),

    /// The cache was configured with invalid settings.
    ///
    /// Reported from `build()`, never at call time.
    #[error("invalid cache configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the configuration.
        reason: Cow<'static, str>,
    },
}

impl Error {
    /// Wraps a computation failure.
    pub fn computation(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Computation(Arc::new(source))
    }

    /// Creates a configuration error.
    pub fn invalid_config(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidConfig { reason: reason.into() }
    }

    /// Returns the original computation error, if this is a
    /// [`Computation`](Error::Computation) error of that type.
    ///
    /// # Examples
    ///
    /// ```
    /// use memora::Error;
    ///
    /// let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "fetch timed out");
    /// let error = Error::computation(io);
    ///
    /// let source = error.computation_source::<std::io::Error>().unwrap();
    /// assert_eq!(source.kind(), std::io::ErrorKind::TimedOut);
    /// ```
    #[must_use]
    pub fn computation_source<T: std::error::Error + 'static>(&self) -> Option<&T> {
        match self {
            Self::Computation(source) => source.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl From<memora_store::Error> for Error {
    fn from(error: memora_store::Error) -> Self {
        Self::Store(Arc::new(error))
    }
}

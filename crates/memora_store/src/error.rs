// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for storage tier operations.

use std::borrow::Cow;

/// A specialized [`Result`] type for storage tier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error from a storage tier operation.
///
/// Backends surface their failures through one of three kinds: I/O errors,
/// encode/decode failures for durable representations, and backend-specific
/// conditions that fit neither.
///
/// # Examples
///
/// ```
/// use memora_store::Error;
///
/// let error = Error::backend("connection lost");
/// assert_eq!(error.to_string(), "connection lost");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation against the backing medium failed.
    #[error("store i/o failed")]
    Io(#[from] std::io::Error),

    /// A stored entry could not be encoded or decoded.
    #[error("failed to encode or decode a cache entry")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A backend-specific failure.
    #[error("{0}")]
    Backend(Cow<'static, str>),
}

impl Error {
    /// Creates a codec error from any serialization failure.
    pub fn codec(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Codec(cause.into())
    }

    /// Creates a backend error from a message.
    pub fn backend(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Backend(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error = Error::from(io);
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn codec_error_keeps_source() {
        let error = Error::codec("truncated record");
        let source = std::error::Error::source(&error).expect("codec errors carry a source");
        assert_eq!(source.to_string(), "truncated record");
    }

    #[test]
    fn result_alias_propagates() {
        fn fails() -> super::Result<()> {
            Err(Error::backend("expected failure"))
        }

        let err = fails().expect_err("should fail");
        assert_eq!(err.to_string(), "expected failure");
    }
}

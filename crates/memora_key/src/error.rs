// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for key derivation.

/// An error from deriving a call key.
///
/// Key derivation errors are fatal to the affected call and nothing is
/// cached for it; they are `Clone` because a coalesced in-flight computation
/// propagates one failure to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An argument's type has no registered hash function and no structural
    /// hash.
    #[error(
        "argument {argument} of type `{type_name}` is not hashable: \
         no hash function is registered for it and it has no structural hash"
    )]
    UnhashableArgument {
        /// Which argument could not be hashed: `#0`, `#1`, … for positional
        /// arguments, or the name for named arguments.
        argument: String,
        /// The fully qualified type of the offending argument.
        type_name: &'static str,
    },

    /// A hash function registered under a qualified name was handed a value
    /// of a different type.
    #[error("hash function registered for `{registered}` does not accept values of type `{type_name}`")]
    HashFnMismatch {
        /// The name the hash function was registered under.
        registered: String,
        /// The type of the value that was actually passed.
        type_name: &'static str,
    },
}

impl Error {
    /// Fills in the argument position or name if it is not known yet.
    ///
    /// The argument is only known to the key builder, not to the hash
    /// functions it invokes, so builders stamp it onto errors on the way out.
    #[must_use]
    pub(crate) fn for_argument(mut self, argument: impl Into<String>) -> Self {
        if let Self::UnhashableArgument { argument: slot, .. } = &mut self
            && slot.is_empty()
        {
            *slot = argument.into();
        }
        self
    }
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for provider operations.

use std::fmt::{self, Display, Formatter};

/// The category of a cache [`Error`].
///
/// The orchestrating cache reacts to each category differently: provider failures on reads
/// become misses, corrupt entries are deleted, type mismatches are raised or suppressed
/// depending on configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A store, vary, or dependency backend failed to perform an operation.
    ProviderFailure,
    /// A stored value exists but holds a different type than the one requested.
    TypeMismatch,
    /// A stored value could not be decoded.
    CorruptEntry,
    /// A configuration was rejected while building a policy or cache.
    InvalidConfig,
}

impl ErrorKind {
    /// Returns a stable, lowercase name for this kind, suitable for telemetry.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderFailure => "provider_failure",
            Self::TypeMismatch => "type_mismatch",
            Self::CorruptEntry => "corrupt_entry",
            Self::InvalidConfig => "invalid_config",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a cache provider or from cache configuration.
///
/// The error wraps the underlying cause and carries an [`ErrorKind`] describing how
/// callers are expected to react to it. Use [`std::error::Error::source()`] to reach
/// the underlying cause.
///
/// # Example
///
/// ```
/// use freshet_store::{Error, ErrorKind};
///
/// let error = Error::provider_failure("connection reset");
/// assert_eq!(error.kind(), ErrorKind::ProviderFailure);
/// ```
#[ohno::error]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error signaling that a provider backend failed.
    pub fn provider_failure(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::ProviderFailure, cause)
    }

    /// Creates an error signaling that a stored value has an unexpected type.
    #[must_use]
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Self::caused_by(
            ErrorKind::TypeMismatch,
            format!("stored value has type '{found}', expected '{expected}'"),
        )
    }

    /// Creates an error signaling that a stored value could not be decoded.
    pub fn corrupt_entry(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::CorruptEntry, cause)
    }

    /// Creates an error signaling that a configuration was rejected.
    pub fn invalid_config(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::InvalidConfig, cause)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// A specialized [`Result`] type for provider operations.
pub type Result<T> = std::result::Result<T, Error>;

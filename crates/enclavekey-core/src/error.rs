//! Error types for `enclavekey`.
//!
//! This module provides the error types for all failure modes, organized by
//! domain:
//!
//! - [`EnclaveError`] - Key lifecycle and cryptographic operation failures
//! - [`KeystoreError`] - Keystore adapter failures
//! - [`ConfigError`] - Configuration failures
//!
//! # Example
//!
//! ```rust
//! use enclavekey_core::error::{EnclaveError, KeystoreError};
//! use enclavekey_core::types::Status;
//!
//! fn lookup() -> Result<(), EnclaveError> {
//!     Err(KeystoreError::Duplicate.into())
//! }
//!
//! let err = lookup().unwrap_err();
//! assert_eq!(err.status(), Some(Status::DUPLICATE_ITEM));
//! ```

use crate::types::Status;

// ============================================================================
// EnclaveError
// ============================================================================

/// Errors surfaced by the key service, the crypto operations and the
/// key manager façade.
///
/// Every failure is returned to the caller; nothing is retried except the
/// overwrite-on-duplicate insert of the public key.
#[derive(Debug, thiserror::Error)]
pub enum EnclaveError {
    /// The requested key entry does not exist.
    ///
    /// Expected during lazy creation; not necessarily user-visible.
    #[error("key not found: {label}")]
    NotFound {
        /// Label of the missing entry.
        label: String,
    },

    /// The caller supplied invalid parameters.
    #[error("invalid parameters: {context}")]
    InvalidParameters {
        /// What was wrong.
        context: String,
    },

    /// The digest exceeds the maximum size accepted for signing.
    #[error("digest too large: {len} bytes (max {max})")]
    DigestTooLarge {
        /// Length of the rejected digest.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// A keystore operation returned a non-success status.
    #[error("keystore operation failed: {status}")]
    KeystoreOperationFailed {
        /// Platform status.
        status: Status,
    },

    /// The enclave failed to sign.
    #[error("signing failed: {status}")]
    SigningFailed {
        /// Platform status.
        status: Status,
    },

    /// Signature verification did not succeed.
    #[error("verification failed: {status}")]
    VerificationFailed {
        /// Platform status.
        status: Status,
    },

    /// Encryption or decryption failed.
    #[error("crypto operation failed: {detail}")]
    CryptoOperationFailed {
        /// Description of the failure.
        detail: String,
    },

    /// The enclave could not generate a keypair.
    #[error("key generation failed: {status}")]
    KeyGenerationFailed {
        /// Platform status.
        status: Status,
    },

    /// The access-control policy could not be attached to a key.
    #[error("access control creation failed: {reason}")]
    AccessControlCreationFailed {
        /// Why the policy was rejected.
        reason: String,
    },

    /// A public key failed the EC key sanity check.
    #[error("validation failed: {reason}")]
    ValidationFailed {
        /// Why validation failed.
        reason: String,
    },

    /// The operation is not available at the enclave's capability level.
    #[error("operation not supported on this platform: {operation}")]
    Unsupported {
        /// Name of the unavailable operation.
        operation: String,
    },
}

impl EnclaveError {
    /// Create a `NotFound` error.
    #[must_use]
    pub fn not_found(label: impl Into<String>) -> Self {
        Self::NotFound {
            label: label.into(),
        }
    }

    /// Create an `InvalidParameters` error.
    #[must_use]
    pub fn invalid_parameters(context: impl Into<String>) -> Self {
        Self::InvalidParameters {
            context: context.into(),
        }
    }

    /// Create a `DigestTooLarge` error.
    #[must_use]
    pub const fn digest_too_large(len: usize, max: usize) -> Self {
        Self::DigestTooLarge { len, max }
    }

    /// Create a `KeystoreOperationFailed` error.
    #[must_use]
    pub const fn keystore_failed(status: Status) -> Self {
        Self::KeystoreOperationFailed { status }
    }

    /// Create a `SigningFailed` error.
    #[must_use]
    pub const fn signing_failed(status: Status) -> Self {
        Self::SigningFailed { status }
    }

    /// Create a `VerificationFailed` error.
    #[must_use]
    pub const fn verification_failed(status: Status) -> Self {
        Self::VerificationFailed { status }
    }

    /// Create a `CryptoOperationFailed` error.
    #[must_use]
    pub fn crypto_failed(detail: impl Into<String>) -> Self {
        Self::CryptoOperationFailed {
            detail: detail.into(),
        }
    }

    /// Create a `KeyGenerationFailed` error.
    #[must_use]
    pub const fn key_generation_failed(status: Status) -> Self {
        Self::KeyGenerationFailed { status }
    }

    /// Create an `AccessControlCreationFailed` error.
    #[must_use]
    pub fn access_control_creation_failed(reason: impl Into<String>) -> Self {
        Self::AccessControlCreationFailed {
            reason: reason.into(),
        }
    }

    /// Create a `ValidationFailed` error.
    #[must_use]
    pub fn validation_failed(reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            reason: reason.into(),
        }
    }

    /// Create an `Unsupported` error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// The platform status carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        match self {
            Self::KeystoreOperationFailed { status }
            | Self::SigningFailed { status }
            | Self::VerificationFailed { status }
            | Self::KeyGenerationFailed { status } => Some(*status),
            Self::NotFound { .. } => Some(Status::ITEM_NOT_FOUND),
            _ => None,
        }
    }

    /// A diagnostics link for errors that carry a platform status.
    #[must_use]
    pub fn lookup_url(&self) -> Option<String> {
        self.status().map(Status::lookup_url)
    }

    /// Whether this error means the signature was well-formed but did not
    /// match the digest and key.
    #[must_use]
    pub const fn is_signature_mismatch(&self) -> bool {
        matches!(
            self,
            Self::VerificationFailed { status } if status.code() == Status::VERIFY_FAILED.code()
        )
    }

    /// Whether this is the expected "entry absent" outcome.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ============================================================================
// KeystoreError
// ============================================================================

/// Errors returned by keystore adapters.
#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    /// No entry matched the query.
    #[error("item not found")]
    NotFound,

    /// An entry already occupies the class/label slot.
    #[error("duplicate item")]
    Duplicate,

    /// The backend reported a non-success status.
    #[error("keystore status: {0}")]
    Status(Status),

    /// A persisted entry could not be decoded.
    #[error("invalid keystore entry format")]
    InvalidFormat,

    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl KeystoreError {
    /// The platform status equivalent of this error.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::NotFound => Status::ITEM_NOT_FOUND,
            Self::Duplicate => Status::DUPLICATE_ITEM,
            Self::Status(status) => *status,
            Self::InvalidFormat => Status::DECODE,
            Self::Io(_) => Status::IO,
        }
    }
}

impl From<std::io::Error> for KeystoreError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::Status(Status::AUTH_FAILED),
            _ => Self::Io(error),
        }
    }
}

impl From<KeystoreError> for EnclaveError {
    fn from(error: KeystoreError) -> Self {
        match error {
            KeystoreError::NotFound => Self::not_found("keystore item"),
            other => Self::keystore_failed(other.status()),
        }
    }
}

// ============================================================================
// ConfigError
// ============================================================================

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {context}")]
    ParseFailed {
        /// Context about the parsing failure.
        context: String,
    },

    /// A configuration value is invalid.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The field name with the invalid value.
        field: String,
        /// The invalid value.
        value: String,
    },

    /// A required configuration field is missing.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },

    /// The home directory could not be determined.
    #[error("could not determine home directory")]
    NoHomeDirectory,

    /// I/O error while reading or writing configuration.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a `FileNotFound` error.
    #[must_use]
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a `ParseFailed` error.
    #[must_use]
    pub fn parse_failed(context: impl Into<String>) -> Self {
        Self::ParseFailed {
            context: context.into(),
        }
    }

    /// Create an `InvalidValue` error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a `MissingField` error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create a `NoHomeDirectory` error.
    #[must_use]
    pub const fn no_home_directory() -> Self {
        Self::NoHomeDirectory
    }

    /// Create an `Io` error with context.
    #[must_use]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

// ============================================================================
// Result type aliases
// ============================================================================

/// A `Result` type alias using [`EnclaveError`].
pub type EnclaveResult<T> = std::result::Result<T, EnclaveError>;

/// A `Result` type alias for keystore operations.
pub type KeystoreResult<T> = std::result::Result<T, KeystoreError>;

/// A `Result` type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ============================================================================
// Unit Tests
// ============================================================================

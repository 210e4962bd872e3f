//! # CLI Command Handlers
//!
//! One module per subcommand. Each handler is a struct with `new(...)`,
//! `run()`, which resolves `~/.enclavekey`, and `run_with_base_dir(&Path)`
//! for tests and custom locations. Handlers that produce output also expose
//! `execute`, which returns the text `run` would print.
//!
//! All handlers fail with [`CommandError`]; `main` turns it into a message,
//! an optional `See: <url>` line and an exit code from [`exit_codes`].

use std::io;
use std::path::PathBuf;

use enclavekey_core::config_loader::default_base_dir;
use enclavekey_core::{ConfigError, EnclaveError, KeystoreError};

use crate::runtime::RuntimeError;

pub mod decrypt;
pub mod delete;
pub mod encrypt;
pub mod exit_codes;
pub mod init;
pub mod pem;
pub mod public_key;
pub mod sign;
pub mod status;
pub mod verify;

pub use decrypt::DecryptCommand;
pub use delete::DeleteCommand;
pub use encrypt::EncryptCommand;
pub use exit_codes::{EXIT_ERROR, EXIT_INVALID, EXIT_SUCCESS};
pub use init::InitCommand;
pub use pem::{PemCommand, ARGUMENT_COUNT_MESSAGE};
pub use public_key::PublicKeyCommand;
pub use sign::SignCommand;
pub use status::StatusCommand;
pub use verify::VerifyCommand;

// ============================================================================
// CommandError
// ============================================================================

/// Errors returned by command handlers.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Key service or crypto operation failure.
    #[error(transparent)]
    Enclave(#[from] EnclaveError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Keystore failure outside the key service.
    #[error("Keystore error: {0}")]
    Keystore(#[from] KeystoreError),

    /// The key manager could not be assembled.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Wrong number or shape of arguments.
    #[error("{0}")]
    Usage(String),

    /// An argument could not be decoded.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// `init` found an existing configuration.
    #[error("Configuration already exists at {0}. Use --force to overwrite.")]
    AlreadyInitialized(PathBuf),

    /// The user declined a confirmation.
    #[error("Cancelled")]
    Cancelled,

    /// A confirmation was needed but stdin is not a terminal.
    #[error("Cannot prompt for confirmation: stdin is not a terminal. Use --force to skip confirmation.")]
    NotTerminal,

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl CommandError {
    /// Exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Enclave(e) if e.is_signature_mismatch() => EXIT_INVALID,
            _ => EXIT_ERROR,
        }
    }

    /// Diagnostics link for status-carrying errors.
    #[must_use]
    pub fn lookup_url(&self) -> Option<String> {
        match self {
            Self::Enclave(e) => e.lookup_url(),
            Self::Keystore(e) => Some(e.status().lookup_url()),
            _ => None,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve the default base directory.
pub(crate) fn base_dir() -> Result<PathBuf, CommandError> {
    Ok(default_base_dir()?)
}

/// Decode a hex argument. Surrounding whitespace and a `0x` prefix are ignored.
pub(crate) fn decode_hex(what: &str, value: &str) -> Result<Vec<u8>, CommandError> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| CommandError::InvalidInput(format!("{what} is not valid hex: {e}")))
}

/// Bytes of a data argument: UTF-8 as given, or hex-decoded.
pub(crate) fn data_bytes(data: &str, is_hex: bool) -> Result<Vec<u8>, CommandError> {
    if is_hex {
        decode_hex("data", data)
    } else {
        Ok(data.as_bytes().to_vec())
    }
}

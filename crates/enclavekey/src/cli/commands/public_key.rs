//! # Public Key Command
//!
//! `enclavekey public-key` prints the public key, generating the keypair on
//! first use. The default output is the lowercase hex of the 65-byte
//! uncompressed point; `--format pem` prints a SubjectPublicKeyInfo PEM.

use std::path::{Path, PathBuf};

use enclavekey_crypto::encode_public_key_pem;

use super::{base_dir, CommandError};
use crate::cli::args::KeyFormat;
use crate::logging::{log_security_event, redact_sensitive};
use crate::runtime::Runtime;

/// The `enclavekey public-key` command handler.
#[derive(Debug, Clone, Default)]
pub struct PublicKeyCommand {
    /// Output format.
    pub format: KeyFormat,
    config: Option<PathBuf>,
}

impl PublicKeyCommand {
    /// Create a new `PublicKeyCommand`.
    #[must_use]
    pub const fn new(format: KeyFormat) -> Self {
        Self {
            format,
            config: None,
        }
    }

    /// Read configuration from `path` instead of `<base_dir>/config.toml`.
    #[must_use]
    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config = path;
        self
    }

    /// Print the public key from `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Print the public key from `base_dir`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        let output = self.execute(base_dir)?;
        match self.format {
            KeyFormat::Hex => println!("{output}"),
            KeyFormat::Pem => print!("{output}"),
        }
        Ok(())
    }

    /// Fetch or create the keypair and format its public half.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Enclave`] if generation or the keystore fails.
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;
        let existed = manager.key_pair_exists()?;

        let key = manager.public_key()?;
        let output = match self.format {
            KeyFormat::Hex => key.hex(),
            KeyFormat::Pem => encode_public_key_pem(key.as_bytes())?,
        };

        if !existed {
            log_security_event(
                "key_generated",
                &format!(
                    "label={} public_key={}",
                    manager.service().public_label(),
                    redact_sensitive(&key.hex())
                ),
            );
        }

        Ok(output)
    }
}

//! # Encrypt Command
//!
//! `enclavekey encrypt <DATA>` seals data to the enclave public key and
//! prints the ciphertext as hex. Only the public key is used, so no presence
//! confirmation is requested.

use std::path::{Path, PathBuf};

use super::{base_dir, data_bytes, CommandError};
use crate::runtime::Runtime;

/// The `enclavekey encrypt` command handler.
#[derive(Debug, Clone)]
pub struct EncryptCommand {
    /// Data to encrypt.
    pub data: String,
    /// Whether `data` is hex.
    pub hex: bool,
    config: Option<PathBuf>,
}

impl EncryptCommand {
    /// Create a new `EncryptCommand`.
    #[must_use]
    pub fn new(data: impl Into<String>, hex: bool) -> Self {
        Self {
            data: data.into(),
            hex,
            config: None,
        }
    }

    /// Read configuration from `path` instead of `<base_dir>/config.toml`.
    #[must_use]
    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config = path;
        self
    }

    /// Encrypt to the key in `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Encrypt to the key in `base_dir` and print the ciphertext.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        println!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Encrypt and return the ciphertext hex.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Enclave`] with `Unsupported` below platform
    /// level 10.3.
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let plaintext = data_bytes(&self.data, self.hex)?;
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;

        Ok(hex::encode(manager.encrypt(&plaintext)?))
    }
}

//! # Decrypt Command
//!
//! `enclavekey decrypt <CIPHERTEXT_HEX>` opens a ciphertext produced by
//! `enclavekey encrypt`. The plaintext is printed as UTF-8, or as hex with
//! `--hex`.

use std::path::{Path, PathBuf};

use super::{base_dir, decode_hex, CommandError};
use crate::logging::log_security_event;
use crate::runtime::Runtime;

/// The `enclavekey decrypt` command handler.
#[derive(Debug, Clone)]
pub struct DecryptCommand {
    /// Ciphertext as hex.
    pub ciphertext: String,
    /// Print the plaintext as hex.
    pub hex: bool,
    config: Option<PathBuf>,
}

impl DecryptCommand {
    /// Create a new `DecryptCommand`.
    #[must_use]
    pub fn new(ciphertext: impl Into<String>, hex: bool) -> Self {
        Self {
            ciphertext: ciphertext.into(),
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

    /// Decrypt with the key in `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Decrypt with the key in `base_dir` and print the plaintext.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        println!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Decrypt and return the formatted plaintext.
    ///
    /// # Errors
    ///
    /// - [`CommandError::InvalidInput`] if the ciphertext is not hex, or the
    ///   plaintext is not UTF-8 and `--hex` was not given
    /// - [`CommandError::Enclave`] if the ciphertext does not authenticate or
    ///   presence is declined
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let ciphertext = decode_hex("ciphertext", &self.ciphertext)?;
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;

        let plaintext = manager.decrypt(&ciphertext)?;
        log_security_event("decrypted", &format!("plaintext_len={}", plaintext.len()));

        if self.hex {
            return Ok(hex::encode(plaintext));
        }
        String::from_utf8(plaintext).map_err(|_| {
            CommandError::InvalidInput("plaintext is not UTF-8; use --hex".to_string())
        })
    }
}

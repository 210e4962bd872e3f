//! # Sign Command
//!
//! `enclavekey sign <DATA>` signs the given bytes with the enclave private
//! key and prints the DER-encoded ECDSA signature as hex. The bytes are
//! treated as an already-computed digest of at most 245 bytes.

use std::path::{Path, PathBuf};

use super::{base_dir, data_bytes, CommandError};
use crate::logging::log_security_event;
use crate::runtime::Runtime;

/// The `enclavekey sign` command handler.
#[derive(Debug, Clone)]
pub struct SignCommand {
    /// Data to sign.
    pub data: String,
    /// Whether `data` is hex.
    pub hex: bool,
    config: Option<PathBuf>,
}

impl SignCommand {
    /// Create a new `SignCommand`.
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

    /// Sign with the key in `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Sign with the key in `base_dir` and print the signature.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        println!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Sign and return the signature hex.
    ///
    /// # Errors
    ///
    /// - [`CommandError::InvalidInput`] if `--hex` data does not decode
    /// - [`CommandError::Enclave`] for empty or oversized data, a declined
    ///   presence check, or an enclave failure
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let digest = data_bytes(&self.data, self.hex)?;
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;

        let signature = manager.sign(&digest)?;
        log_security_event("signed", &format!("digest_len={}", digest.len()));

        Ok(hex::encode(signature))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::cli::commands::test_support::write_unattended_config;
    use crate::cli::commands::VerifyCommand;
    use enclavekey_core::EnclaveError;
    use tempfile::TempDir;

    #[test]
    fn test_sign_then_verify() {
        let temp = TempDir::new().expect("temp dir");
        write_unattended_config(temp.path());

        let signature = SignCommand::new("hello", false)
            .execute(temp.path())
            .expect("sign");
        assert!(hex::decode(&signature).is_ok());

        let result = VerifyCommand::new(signature, "hello", false)
            .execute(temp.path())
            .expect("verify");
        assert_eq!(result, "valid");
    }

    #[test]
    fn test_sign_hex_data() {
        let temp = TempDir::new().expect("temp dir");
        write_unattended_config(temp.path());

        let digest = hex::encode([0xab; 32]);
        assert!(SignCommand::new(digest, true).execute(temp.path()).is_ok());
        assert!(matches!(
            SignCommand::new("zz", true).execute(temp.path()),
            Err(CommandError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sign_rejects_oversized_data() {
        let temp = TempDir::new().expect("temp dir");
        write_unattended_config(temp.path());

        let data = "x".repeat(246);
        assert!(matches!(
            SignCommand::new(data, false).execute(temp.path()),
            Err(CommandError::Enclave(EnclaveError::DigestTooLarge { .. }))
        ));
        assert!(matches!(
            SignCommand::new("", false).execute(temp.path()),
            Err(CommandError::Enclave(EnclaveError::InvalidParameters { .. }))
        ));
    }
}

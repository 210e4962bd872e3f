//! # Verify Command
//!
//! `enclavekey verify <SIGNATURE_HEX> <DATA>` checks a DER signature against
//! the enclave public key. Prints `valid` on success; a mismatching signature
//! exits with [`EXIT_INVALID`](super::EXIT_INVALID), every other failure with
//! [`EXIT_ERROR`](super::EXIT_ERROR).

use std::path::{Path, PathBuf};

use super::{base_dir, data_bytes, decode_hex, CommandError};
use crate::runtime::Runtime;

/// The `enclavekey verify` command handler.
#[derive(Debug, Clone)]
pub struct VerifyCommand {
    /// Signature as hex.
    pub signature: String,
    /// Signed data.
    pub data: String,
    /// Whether `data` is hex.
    pub hex: bool,
    config: Option<PathBuf>,
}

impl VerifyCommand {
    /// Create a new `VerifyCommand`.
    #[must_use]
    pub fn new(signature: impl Into<String>, data: impl Into<String>, hex: bool) -> Self {
        Self {
            signature: signature.into(),
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

    /// Verify against the key in `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Verify against the key in `base_dir` and print the result.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        println!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Verify and return `"valid"`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::InvalidInput`] if an argument does not decode
    /// - [`CommandError::Enclave`] with `VERIFY_FAILED` for a mismatch, or
    ///   `DECODE` for a malformed signature
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let signature = decode_hex("signature", &self.signature)?;
        let digest = data_bytes(&self.data, self.hex)?;

        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;
        manager.verify(&signature, &digest)?;

        Ok("valid".to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use crate::cli::commands::test_support::write_unattended_config;
    use crate::cli::commands::{SignCommand, EXIT_ERROR, EXIT_INVALID};
    use tempfile::TempDir;

    #[test]
    fn test_wrong_data_is_a_mismatch() {
        let temp = TempDir::new().expect("temp dir");
        write_unattended_config(temp.path());

        let signature = SignCommand::new("hello", false)
            .execute(temp.path())
            .expect("sign");

        let err = VerifyCommand::new(signature, "goodbye", false)
            .execute(temp.path())
            .expect_err("mismatch");
        assert_eq!(err.exit_code(), EXIT_INVALID);
        assert!(err
            .lookup_url()
            .is_some_and(|url| url.ends_with("search=-67808")));
    }

    #[test]
    fn test_malformed_signature() {
        let temp = TempDir::new().expect("temp dir");
        write_unattended_config(temp.path());

        let err = VerifyCommand::new("3000", "hello", false)
            .execute(temp.path())
            .expect_err("malformed");
        assert_eq!(err.exit_code(), EXIT_ERROR);

        assert!(matches!(
            VerifyCommand::new("not hex", "hello", false).execute(temp.path()),
            Err(CommandError::InvalidInput(_))
        ));
    }
}

//! # PEM Command
//!
//! `enclavekey pem <HEX>` wraps raw public key bytes, given as hex, in a
//! SubjectPublicKeyInfo PEM and checks the result parses as a P-256 key.
//! Spaces inside the argument are ignored. This command does not touch the
//! keystore or the configuration.

use std::fs;
use std::path::{Path, PathBuf};

use enclavekey_crypto::encode_public_key_pem_hex;

use super::CommandError;

/// Printed when the command gets anything but one argument.
pub const ARGUMENT_COUNT_MESSAGE: &str =
    "Err: please pass in exactly one argument\n(Does your data have spaces? Enclose it in quotes!)";

/// The `enclavekey pem` command handler.
#[derive(Debug, Clone)]
pub struct PemCommand {
    /// Positional arguments as given.
    pub args: Vec<String>,
    /// Write the PEM to this file instead of stdout.
    pub output: Option<PathBuf>,
}

impl PemCommand {
    /// Create a new `PemCommand`.
    #[must_use]
    pub const fn new(args: Vec<String>, output: Option<PathBuf>) -> Self {
        Self { args, output }
    }

    /// Encode and print, or write to `--output`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute); also [`CommandError::Io`] if the
    /// output file cannot be written.
    pub fn run(&self) -> Result<(), CommandError> {
        let pem = self.execute()?;
        match &self.output {
            Some(path) => write_pem(path, &pem)?,
            None => print!("{pem}"),
        }
        Ok(())
    }

    /// Encode the single argument.
    ///
    /// # Errors
    ///
    /// - [`CommandError::Usage`] with [`ARGUMENT_COUNT_MESSAGE`] unless
    ///   exactly one argument was given
    /// - [`CommandError::Enclave`] with `ValidationFailed` if the argument is
    ///   not hex or not a valid P-256 point
    pub fn execute(&self) -> Result<String, CommandError> {
        let [hex_bytes] = self.args.as_slice() else {
            return Err(CommandError::Usage(ARGUMENT_COUNT_MESSAGE.to_string()));
        };
        Ok(encode_public_key_pem_hex(hex_bytes)?)
    }
}

fn write_pem(path: &Path, pem: &str) -> Result<(), CommandError> {
    fs::write(path, pem)?;
    tracing::info!(path = %path.display(), "Wrote public key PEM");
    Ok(())
}

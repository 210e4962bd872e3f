//! # Status Command
//!
//! `enclavekey status` reports the configured labels, what the enclave can do
//! at the configured platform level, and whether a keypair is stored. It
//! never creates a key.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::{base_dir, CommandError};
use crate::runtime::Runtime;

/// The `enclavekey status` command handler.
#[derive(Debug, Clone, Default)]
pub struct StatusCommand {
    config: Option<PathBuf>,
}

impl StatusCommand {
    /// Create a new `StatusCommand`.
    #[must_use]
    pub const fn new() -> Self {
        Self { config: None }
    }

    /// Read configuration from `path` instead of `<base_dir>/config.toml`.
    #[must_use]
    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config = path;
        self
    }

    /// Print the status for `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Print the status for `base_dir`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        print!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Build the status report.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Runtime`] if the configuration is invalid and
    /// [`CommandError::Enclave`] if the keystore cannot be queried.
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;
        let capabilities = manager.capabilities();
        let service = manager.service();

        let encryption = capabilities
            .cipher
            .map_or_else(|| "unavailable".to_string(), |suite| suite.to_string());
        let key_pair = if manager.key_pair_exists()? {
            "present"
        } else {
            "absent"
        };

        let mut out = String::new();
        let _ = writeln!(out, "Base directory:  {}", runtime.base_dir().display());
        let _ = writeln!(out, "Public label:    {}", service.public_label());
        let _ = writeln!(out, "Private label:   {}", service.private_label());
        let _ = writeln!(out, "Platform level:  {}", capabilities.level);
        let _ = writeln!(out, "Curve:           {}", capabilities.curve.as_str());
        let _ = writeln!(out, "Encryption:      {encryption}");
        let _ = writeln!(
            out,
            "User presence:   {}",
            if service.policy().requires_user_presence() {
                "required"
            } else {
                "not required"
            }
        );
        let _ = writeln!(out, "Keypair:         {key_pair}");
        Ok(out)
    }
}

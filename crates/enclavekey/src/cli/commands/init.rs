//! # Init Command
//!
//! `enclavekey init` writes the default configuration and prepares the
//! directory layout:
//!
//! ```text
//! ~/.enclavekey/         (0700)
//! ├── config.toml
//! ├── device.key         (0600)
//! └── keystore/          (0700)
//! ```
//!
//! The keypair itself is created lazily by the first command that needs it.

use std::path::Path;

use enclavekey_core::config_loader::ConfigLoader;

use super::{base_dir, CommandError};
use crate::logging::log_security_event;
use crate::runtime::Runtime;

/// The `enclavekey init` command handler.
#[derive(Debug, Clone)]
pub struct InitCommand {
    /// Overwrite an existing configuration.
    pub force: bool,
}

impl InitCommand {
    /// Create a new `InitCommand`.
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self { force }
    }

    /// Initialize `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`run_with_base_dir`](Self::run_with_base_dir).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Initialize `base_dir`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::AlreadyInitialized`] if a configuration exists and
    ///   `force` is not set
    /// - [`CommandError::Config`] or [`CommandError::Runtime`] if files
    ///   cannot be written
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        print!("{}", self.execute(base_dir)?);
        Ok(())
    }

    /// Initialize `base_dir` and return the summary.
    ///
    /// # Errors
    ///
    /// See [`run_with_base_dir`](Self::run_with_base_dir).
    pub fn execute(&self, base_dir: &Path) -> Result<String, CommandError> {
        let loader = ConfigLoader::with_base_dir(base_dir.to_path_buf());
        if loader.exists() && !self.force {
            return Err(CommandError::AlreadyInitialized(loader.config_path()));
        }

        loader.write_default()?;

        let runtime = Runtime::open(base_dir, None)?;
        let keystore_dir = runtime.keystore_dir()?;
        let secret_path = runtime.device_secret_path()?;
        runtime.key_manager()?;

        log_security_event(
            "initialized",
            &format!("configuration written to {}", loader.config_path().display()),
        );

        Ok(format!(
            "Initialized enclavekey in {}\n\
             \n  config:        {}\
             \n  keystore:      {}\
             \n  device secret: {}\n\
             \nThe keypair is created on first use. Next steps:\
             \n  enclavekey public-key\
             \n  enclavekey sign \"hello\"\n",
            base_dir.display(),
            loader.config_path().display(),
            keystore_dir.display(),
            secret_path.display(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use enclavekey_core::config::Config;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout() {
        let temp = TempDir::new().expect("temp dir");
        let output = InitCommand::new(false)
            .execute(temp.path())
            .expect("init");

        assert!(output.contains("Initialized enclavekey"));
        assert!(temp.path().join("config.toml").exists());
        assert!(temp.path().join("device.key").exists());
        assert!(temp.path().join("keystore").is_dir());

        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert_eq!(written, Config::default_toml());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp = TempDir::new().expect("temp dir");
        InitCommand::new(false).execute(temp.path()).expect("init");

        assert!(matches!(
            InitCommand::new(false).execute(temp.path()),
            Err(CommandError::AlreadyInitialized(_))
        ));
        assert!(InitCommand::new(true).execute(temp.path()).is_ok());
    }

    #[test]
    fn test_force_keeps_device_secret() {
        let temp = TempDir::new().expect("temp dir");
        InitCommand::new(false).execute(temp.path()).expect("init");
        let before = std::fs::read(temp.path().join("device.key")).unwrap();

        InitCommand::new(true).execute(temp.path()).expect("re-init");
        let after = std::fs::read(temp.path().join("device.key")).unwrap();
        assert_eq!(before, after);
    }
}

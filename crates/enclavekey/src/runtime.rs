//! Wiring configuration to a [`KeyManager`].
//!
//! A [`Runtime`] loads and validates the configuration, then builds the file
//! keystore, the soft enclave and the manager from it. Relative paths in the
//! configuration resolve against the base directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use enclavekey_core::config::Config;
use enclavekey_core::config_loader::ConfigLoader;
use enclavekey_core::{ConfigError, KeystoreError};
use enclavekey_crypto::{
    load_or_create_device_secret, FileKeystore, KeyManager, PresenceVerifier, SoftEnclave,
};

use crate::presence::TerminalPresence;

/// Errors raised while assembling the key manager.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The device secret could not be read or created.
    #[error("Failed to load device secret {path}: {source}")]
    DeviceSecret {
        /// Location of the secret.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The keystore directory could not be opened.
    #[error("Failed to open keystore: {0}")]
    Keystore(#[from] KeystoreError),
}

/// Loaded configuration bound to a base directory.
#[derive(Debug)]
pub struct Runtime {
    loader: ConfigLoader,
    config: Config,
}

impl Runtime {
    /// Load configuration for `base_dir`.
    ///
    /// `config_path` overrides `<base_dir>/config.toml`. A missing default
    /// file yields the default configuration; a missing override is an error.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the file cannot be parsed or fails
    /// validation.
    pub fn open(base_dir: &Path, config_path: Option<&Path>) -> Result<Self, RuntimeError> {
        let loader = ConfigLoader::with_base_dir(base_dir.to_path_buf());
        let config = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::file_not_found(path.display().to_string()).into());
            }
            Some(path) => ConfigLoader::load_from_path(path)?,
            None => loader.load()?,
        };
        config.validate()?;

        tracing::debug!(
            base_dir = %base_dir.display(),
            public_label = %config.keys.public_label,
            "Loaded configuration"
        );

        Ok(Self { loader, config })
    }

    /// The loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The base directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        self.loader.base_dir()
    }

    /// Resolved keystore directory.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if `~` cannot be expanded.
    pub fn keystore_dir(&self) -> Result<PathBuf, RuntimeError> {
        Ok(self.loader.resolve_path(&self.config.keys.keystore_dir)?)
    }

    /// Resolved device secret path.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if `~` cannot be expanded.
    pub fn device_secret_path(&self) -> Result<PathBuf, RuntimeError> {
        Ok(self.loader.resolve_path(&self.config.enclave.device_secret)?)
    }

    /// Build a manager that confirms presence on the terminal.
    ///
    /// # Errors
    ///
    /// See [`key_manager_with`](Self::key_manager_with).
    pub fn key_manager(&self) -> Result<KeyManager, RuntimeError> {
        self.key_manager_with(Box::new(TerminalPresence))
    }

    /// Build a manager with a custom presence verifier.
    ///
    /// Creates the keystore directory and the device secret if absent.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Config`] for invalid labels or platform level
    /// - [`RuntimeError::Keystore`] if the keystore directory cannot be created
    /// - [`RuntimeError::DeviceSecret`] if the device secret cannot be loaded
    pub fn key_manager_with(
        &self,
        presence: Box<dyn PresenceVerifier>,
    ) -> Result<KeyManager, RuntimeError> {
        let keystore = FileKeystore::with_path(self.keystore_dir()?)?;

        let secret_path = self.device_secret_path()?;
        let secret = load_or_create_device_secret(&secret_path).map_err(|source| {
            RuntimeError::DeviceSecret {
                path: secret_path.clone(),
                source,
            }
        })?;

        let enclave = SoftEnclave::new(secret, self.config.enclave.platform_level()?)
            .with_device_state(self.config.enclave.device_state())
            .with_presence(presence);

        Ok(KeyManager::new(
            Arc::new(keystore),
            Arc::new(enclave),
            self.config.keys.public_label()?,
            self.config.keys.private_label()?,
            self.config.access.policy(),
            self.config.keys.operation_prompt.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;
    use enclavekey_crypto::AlwaysPresent;
    use tempfile::TempDir;

    #[test]
    fn test_open_without_config_uses_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let runtime = Runtime::open(temp.path(), None).expect("open");
        assert_eq!(runtime.config().keys.public_label, "enclavekey.default.public");
        assert_eq!(runtime.keystore_dir().unwrap(), temp.path().join("keystore"));
        assert_eq!(
            runtime.device_secret_path().unwrap(),
            temp.path().join("device.key")
        );
    }

    #[test]
    fn test_missing_override_is_an_error() {
        let temp = TempDir::new().expect("temp dir");
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            Runtime::open(temp.path(), Some(&missing)),
            Err(RuntimeError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            "[keys]\npublic_label = \"same\"\nprivate_label = \"same\"\n",
        )
        .expect("write");

        assert!(matches!(
            Runtime::open(temp.path(), Some(&path)),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_key_manager_creates_state_on_disk() {
        let temp = TempDir::new().expect("temp dir");
        let runtime = Runtime::open(temp.path(), None).expect("open");
        let manager = runtime
            .key_manager_with(Box::new(AlwaysPresent))
            .expect("manager");

        assert!(temp.path().join("device.key").exists());
        assert!(temp.path().join("keystore").is_dir());
        assert!(!manager.key_pair_exists().unwrap());

        let hex_key = manager.public_key_hex().expect("public key");
        assert_eq!(hex_key.len(), 130);
        assert!(manager.key_pair_exists().unwrap());
    }
}

//! Configuration types for `enclavekey`.
//!
//! This module provides the configuration structures that bind a key manager
//! to its label pair, operation prompt, keystore location, enclave capability
//! level and access-control policy.
//!
//! # Configuration File
//!
//! Configuration is stored in TOML format at `~/.enclavekey/config.toml`.
//!
//! # Examples
//!
//! ```
//! use enclavekey_core::config::Config;
//!
//! let config = Config::default();
//! assert_eq!(config.keys.public_label, "enclavekey.default.public");
//! assert_eq!(config.enclave.platform_level, "10.3");
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Default TOML Output
//!
//! ```toml
//! [keys]
//! public_label = "enclavekey.default.public"
//! private_label = "enclavekey.default.private"
//! operation_prompt = "Authenticate to continue"
//! keystore_dir = "keystore"
//!
//! [enclave]
//! platform_level = "10.3"
//! device_secret = "device.key"
//! passcode_set = true
//!
//! [access]
//! accessibility = "after_first_unlock_this_device_only"
//! user_presence = true
//! private_key_usage = true
//! ```

use crate::error::ConfigError;
use crate::types::{
    AccessControlPolicy, AccessFlags, Accessibility, DeviceState, KeyLabel, PlatformLevel,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// - **Keys**: label pair, operation prompt and keystore directory
/// - **Enclave**: capability level and device secret location
/// - **Access**: access-control policy attached to newly generated keys
///
/// # Examples
///
/// ```
/// use enclavekey_core::config::Config;
///
/// let toml_str = r#"
/// [keys]
/// public_label = "com.example.public"
/// private_label = "com.example.private"
///
/// [enclave]
/// platform_level = "9.3"
/// "#;
///
/// let config: Config = toml::from_str(toml_str).expect("valid TOML");
/// assert_eq!(config.keys.public_label, "com.example.public");
/// assert_eq!(config.keys.operation_prompt, "Authenticate to continue");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Key slot configuration.
    #[serde(default)]
    pub keys: KeysConfig,

    /// Enclave configuration.
    #[serde(default)]
    pub enclave: EnclaveConfig,

    /// Access-control policy for generated keys.
    #[serde(default)]
    pub access: AccessConfig,
}

/// Returns the default public key label.
#[must_use]
fn default_public_label() -> String {
    "enclavekey.default.public".to_string()
}

/// Returns the default private key label.
#[must_use]
fn default_private_label() -> String {
    "enclavekey.default.private".to_string()
}

/// Returns the default message shown during private-key use.
#[must_use]
fn default_operation_prompt() -> String {
    "Authenticate to continue".to_string()
}

/// Returns the default keystore directory.
#[must_use]
fn default_keystore_dir() -> String {
    "keystore".to_string()
}

/// Key slot configuration.
///
/// # Examples
///
/// ```
/// use enclavekey_core::config::KeysConfig;
///
/// let config = KeysConfig::default();
/// assert_eq!(config.private_label, "enclavekey.default.private");
/// assert_eq!(config.keystore_dir, "keystore");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeysConfig {
    /// Label of the public key entry.
    #[serde(default = "default_public_label")]
    pub public_label: String,

    /// Label of the private key entry.
    #[serde(default = "default_private_label")]
    pub private_label: String,

    /// Message shown to the user when the private key is used.
    #[serde(default = "default_operation_prompt")]
    pub operation_prompt: String,

    /// Directory of the file-backed keystore. Relative paths resolve against
    /// the base directory; `~` expands to the home directory.
    #[serde(default = "default_keystore_dir")]
    pub keystore_dir: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            public_label: default_public_label(),
            private_label: default_private_label(),
            operation_prompt: default_operation_prompt(),
            keystore_dir: default_keystore_dir(),
        }
    }
}

impl KeysConfig {
    /// Validated public key label.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the label is not a valid [`KeyLabel`].
    pub fn public_label(&self) -> Result<KeyLabel, ConfigError> {
        KeyLabel::new(self.public_label.clone())
            .map_err(|_| ConfigError::invalid_value("keys.public_label", &self.public_label))
    }

    /// Validated private key label.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the label is not a valid [`KeyLabel`].
    pub fn private_label(&self) -> Result<KeyLabel, ConfigError> {
        KeyLabel::new(self.private_label.clone())
            .map_err(|_| ConfigError::invalid_value("keys.private_label", &self.private_label))
    }
}

/// Returns the default platform capability level.
#[must_use]
fn default_platform_level() -> String {
    "10.3".to_string()
}

/// Returns the default device secret path.
#[must_use]
fn default_device_secret() -> String {
    "device.key".to_string()
}

/// Returns whether a device passcode is assumed to be set.
#[must_use]
const fn default_passcode_set() -> bool {
    true
}

/// Enclave configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnclaveConfig {
    /// Platform capability level as `major.minor`.
    ///
    /// Below `10.0` the legacy curve identifier is used; below `10.3`
    /// encryption and decryption are unavailable.
    #[serde(default = "default_platform_level")]
    pub platform_level: String,

    /// Path of the device wrapping secret, resolved like `keys.keystore_dir`.
    #[serde(default = "default_device_secret")]
    pub device_secret: String,

    /// Whether the device has a passcode configured.
    #[serde(default = "default_passcode_set")]
    pub passcode_set: bool,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            platform_level: default_platform_level(),
            device_secret: default_device_secret(),
            passcode_set: default_passcode_set(),
        }
    }
}

impl EnclaveConfig {
    /// Parsed platform level.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the level is not `major[.minor]`.
    pub fn platform_level(&self) -> Result<PlatformLevel, ConfigError> {
        self.platform_level.parse()
    }

    /// Device state derived from the configuration.
    ///
    /// The process runs in an unlocked session, so only the passcode flag
    /// is configurable.
    #[must_use]
    pub const fn device_state(&self) -> DeviceState {
        DeviceState {
            passcode_set: self.passcode_set,
            unlocked: true,
            unlocked_since_boot: true,
        }
    }
}

/// Returns the default accessibility.
#[must_use]
const fn default_accessibility() -> Accessibility {
    Accessibility::AfterFirstUnlockThisDeviceOnly
}

/// Returns the default for boolean access flags.
#[must_use]
const fn default_flag_enabled() -> bool {
    true
}

/// Access-control configuration for generated keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessConfig {
    /// Lock-state requirement.
    #[serde(default = "default_accessibility")]
    pub accessibility: Accessibility,

    /// Require user presence for each private-key use.
    #[serde(default = "default_flag_enabled")]
    pub user_presence: bool,

    /// Allow private-key operations inside the enclave.
    #[serde(default = "default_flag_enabled")]
    pub private_key_usage: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            accessibility: default_accessibility(),
            user_presence: default_flag_enabled(),
            private_key_usage: default_flag_enabled(),
        }
    }
}

impl AccessConfig {
    /// Build the access-control policy.
    ///
    /// ```
    /// use enclavekey_core::config::AccessConfig;
    /// use enclavekey_core::types::AccessControlPolicy;
    ///
    /// assert_eq!(AccessConfig::default().policy(), AccessControlPolicy::default());
    /// ```
    #[must_use]
    pub fn policy(&self) -> AccessControlPolicy {
        let mut flags = AccessFlags::empty();
        if self.user_presence {
            flags = flags | AccessFlags::USER_PRESENCE;
        }
        if self.private_key_usage {
            flags = flags | AccessFlags::PRIVATE_KEY_USAGE;
        }
        AccessControlPolicy::new(self.accessibility, flags)
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - either label is not a valid key label
    /// - the public and private labels are equal
    /// - `keys.operation_prompt` or `keys.keystore_dir` is empty
    /// - `enclave.platform_level` cannot be parsed
    /// - `enclave.device_secret` is empty
    /// - the access policy cannot be attached to an enclave key
    ///
    /// # Examples
    ///
    /// ```
    /// use enclavekey_core::config::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.keys.private_label = config.keys.public_label.clone();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let public = self.keys.public_label()?;
        let private = self.keys.private_label()?;
        if public == private {
            return Err(ConfigError::invalid_value(
                "keys.private_label",
                format!("{private} (same as keys.public_label)"),
            ));
        }

        if self.keys.operation_prompt.trim().is_empty() {
            return Err(ConfigError::invalid_value("keys.operation_prompt", "<empty>"));
        }

        if self.keys.keystore_dir.is_empty() {
            return Err(ConfigError::invalid_value("keys.keystore_dir", "<empty>"));
        }

        self.enclave.platform_level()?;

        if self.enclave.device_secret.is_empty() {
            return Err(ConfigError::invalid_value("enclave.device_secret", "<empty>"));
        }

        self.access
            .policy()
            .validate()
            .map_err(|e| ConfigError::invalid_value("access", e.to_string()))?;

        Ok(())
    }

    /// Generates the default configuration as a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use enclavekey_core::config::Config;
    ///
    /// let toml = Config::default_toml();
    /// assert!(toml.contains("[keys]"));
    /// assert!(toml.contains("[enclave]"));
    /// assert!(toml.contains("[access]"));
    /// ```
    #[must_use]
    pub fn default_toml() -> String {
        r#"# enclavekey configuration

[keys]
# Keystore labels of the managed keypair
public_label = "enclavekey.default.public"
private_label = "enclavekey.default.private"
# Shown whenever the private key is used
operation_prompt = "Authenticate to continue"
keystore_dir = "keystore"

[enclave]
# Below 10.0 the legacy curve identifier is used; below 10.3 encrypt/decrypt are unavailable
platform_level = "10.3"
device_secret = "device.key"
passcode_set = true

[access]
# when_unlocked | after_first_unlock | always | when_passcode_set_this_device_only
# when_unlocked_this_device_only | after_first_unlock_this_device_only | always_this_device_only
accessibility = "after_first_unlock_this_device_only"
user_presence = true
private_key_usage = true
"#
        .to_string()
    }

    /// Creates a configuration builder for customizing values.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for creating customized [`Config`] instances.
///
/// # Examples
///
/// ```
/// use enclavekey_core::config::ConfigBuilder;
/// use enclavekey_core::types::Accessibility;
///
/// let config = ConfigBuilder::new()
///     .labels("app.public", "app.private")
///     .operation_prompt("Sign in to continue")
///     .platform_level("10.2")
///     .accessibility(Accessibility::WhenPasscodeSetThisDeviceOnly)
///     .build();
///
/// assert_eq!(config.keys.public_label, "app.public");
/// assert_eq!(config.enclave.platform_level, "10.2");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Sets the public and private labels.
    #[must_use]
    pub fn labels(mut self, public: impl Into<String>, private: impl Into<String>) -> Self {
        self.config.keys.public_label = public.into();
        self.config.keys.private_label = private.into();
        self
    }

    /// Sets the operation prompt.
    #[must_use]
    pub fn operation_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.keys.operation_prompt = prompt.into();
        self
    }

    /// Sets the keystore directory.
    #[must_use]
    pub fn keystore_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.keys.keystore_dir = dir.into();
        self
    }

    /// Sets the platform level.
    #[must_use]
    pub fn platform_level(mut self, level: impl Into<String>) -> Self {
        self.config.enclave.platform_level = level.into();
        self
    }

    /// Sets the device secret path.
    #[must_use]
    pub fn device_secret(mut self, path: impl Into<String>) -> Self {
        self.config.enclave.device_secret = path.into();
        self
    }

    /// Sets whether a passcode is configured.
    #[must_use]
    pub const fn passcode_set(mut self, set: bool) -> Self {
        self.config.enclave.passcode_set = set;
        self
    }

    /// Sets the accessibility of generated keys.
    #[must_use]
    pub const fn accessibility(mut self, accessibility: Accessibility) -> Self {
        self.config.access.accessibility = accessibility;
        self
    }

    /// Sets whether user presence is required.
    #[must_use]
    pub const fn user_presence(mut self, required: bool) -> Self {
        self.config.access.user_presence = required;
        self
    }

    /// Builds the final configuration.
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::needless_raw_string_hashes
    )]

    use super::*;
    use crate::types::CurveId;

    // -------------------------------------------------------------------------
    // Config basic tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.keys.public_label, "enclavekey.default.public");
        assert_eq!(config.keys.private_label, "enclavekey.default.private");
        assert_eq!(config.keys.operation_prompt, "Authenticate to continue");
        assert_eq!(config.enclave.platform_level, "10.3");
        assert!(config.enclave.passcode_set);
        assert_eq!(config.access.policy(), AccessControlPolicy::default());
        assert_eq!(Config::new(), config);
    }

    #[test]
    fn test_default_toml_parses_to_default() {
        let parsed: Config = toml::from_str(&Config::default_toml()).expect("valid TOML");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let parsed: Config = toml::from_str("").expect("valid TOML");
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_toml_serialization_roundtrip() {
        let config = Config::builder()
            .labels("a.public", "a.private")
            .platform_level("9.3")
            .accessibility(Accessibility::AlwaysThisDeviceOnly)
            .user_presence(false)
            .build();

        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_accessibility_parses_snake_case() {
        let parsed: Config = toml::from_str(
            r#"
[access]
accessibility = "when_passcode_set_this_device_only"
"#,
        )
        .expect("valid TOML");
        assert_eq!(
            parsed.access.accessibility,
            Accessibility::WhenPasscodeSetThisDeviceOnly
        );
    }

    // -------------------------------------------------------------------------
    // Validation tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_validate_passes_for_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_fails_for_invalid_label() {
        let config = Config::builder().labels("../escape", "ok.private").build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "keys.public_label"));
    }

    #[test]
    fn test_validate_fails_for_equal_labels() {
        let config = Config::builder().labels("same", "same").build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_fails_for_empty_prompt() {
        let config = Config::builder().operation_prompt("   ").build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_fails_for_bad_platform_level() {
        let config = Config::builder().platform_level("latest").build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "platform_level"));
    }

    #[test]
    fn test_validate_fails_for_migratable_private_key_usage() {
        let config = Config::builder()
            .accessibility(Accessibility::WhenUnlocked)
            .build();
        assert!(config.validate().is_err());
    }

    // -------------------------------------------------------------------------
    // Derived value tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_platform_level_and_device_state() {
        let config = Config::builder()
            .platform_level("9.3")
            .passcode_set(false)
            .build();
        let level = config.enclave.platform_level().unwrap();
        assert_eq!(level, PlatformLevel::new(9, 3));
        assert_eq!(
            crate::types::Capabilities::for_level(level).curve,
            CurveId::Ec
        );
        assert!(!config.enclave.device_state().passcode_set);
        assert!(config.enclave.device_state().unlocked);
    }

    #[test]
    fn test_access_policy_flags() {
        let policy = Config::builder().user_presence(false).build().access.policy();
        assert!(!policy.flags.contains(AccessFlags::USER_PRESENCE));
        assert!(policy.flags.contains(AccessFlags::PRIVATE_KEY_USAGE));
        assert!(!policy.requires_user_presence());
    }
}

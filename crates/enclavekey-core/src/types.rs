//! Core data types shared across `enclavekey` crates.
//!
//! This module defines the vocabulary of the key lifecycle:
//!
//! - [`Status`] - Platform status codes carried by keystore and enclave failures
//! - [`KeyLabel`] - Validated keystore slot names
//! - [`KeyClass`] - Public or private keystore entries
//! - [`CurveId`] - Modern and legacy identifiers for the P-256 curve
//! - [`AccessControlPolicy`] - When and how the private key may be used
//! - [`PlatformLevel`] and [`Capabilities`] - What the enclave supports
//!
//! # Example
//!
//! ```
//! use enclavekey_core::types::{Capabilities, CurveId, PlatformLevel};
//!
//! let caps = Capabilities::for_level(PlatformLevel::new(10, 3));
//! assert_eq!(caps.curve, CurveId::EcSecPrimeRandom);
//! assert!(caps.supports_encryption());
//!
//! let legacy = Capabilities::for_level(PlatformLevel::new(9, 3));
//! assert_eq!(legacy.curve, CurveId::Ec);
//! assert!(!legacy.supports_encryption());
//! ```

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, EnclaveError};

// ============================================================================
// Status
// ============================================================================

/// A platform status code (`OSStatus`-style signed 32-bit value).
///
/// Zero means success; every other value identifies a failure. The named
/// constants cover the codes this crate produces or branches on.
///
/// # Example
///
/// ```
/// use enclavekey_core::types::Status;
///
/// assert!(Status::SUCCESS.is_success());
/// assert_eq!(Status::ITEM_NOT_FOUND.code(), -25300);
/// assert_eq!(Status::ITEM_NOT_FOUND.to_string(), "errSecItemNotFound (-25300)");
/// assert_eq!(Status::new(-1).to_string(), "status -1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Status(i32);

/// Base URL used to build status-code lookup links.
const STATUS_LOOKUP_URL: &str =
    "https://www.osstatus.com/search/results?platform=all&framework=Security&search=";

impl Status {
    /// The operation completed successfully.
    pub const SUCCESS: Self = Self(0);
    /// Generic I/O failure.
    pub const IO: Self = Self(-36);
    /// One or more parameters were not valid.
    pub const PARAM: Self = Self(-50);
    /// The user cancelled the operation (e.g. declined a presence prompt).
    pub const USER_CANCELED: Self = Self(-128);
    /// Authorization or authentication failed.
    pub const AUTH_FAILED: Self = Self(-25293);
    /// The item already exists.
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    /// The item could not be found.
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    /// User interaction is not allowed in the current state.
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);
    /// Unable to decode the provided data.
    pub const DECODE: Self = Self(-26275);
    /// The signature did not verify.
    pub const VERIFY_FAILED: Self = Self(-67808);

    /// Create a status from a raw code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self(code)
    }

    /// The raw numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Whether this status reports success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// The symbolic name of a known status code.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("errSecSuccess"),
            -36 => Some("errSecIO"),
            -50 => Some("errSecParam"),
            -128 => Some("errSecUserCanceled"),
            -25293 => Some("errSecAuthFailed"),
            -25299 => Some("errSecDuplicateItem"),
            -25300 => Some("errSecItemNotFound"),
            -25308 => Some("errSecInteractionNotAllowed"),
            -26275 => Some("errSecDecode"),
            -67808 => Some("errSecVerifyFailed"),
            _ => None,
        }
    }

    /// A diagnostics link keyed by the numeric code.
    ///
    /// ```
    /// use enclavekey_core::types::Status;
    ///
    /// assert_eq!(
    ///     Status::PARAM.lookup_url(),
    ///     "https://www.osstatus.com/search/results?platform=all&framework=Security&search=-50"
    /// );
    /// ```
    #[must_use]
    pub fn lookup_url(self) -> String {
        format!("{STATUS_LOOKUP_URL}{}", self.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

// ============================================================================
// KeyLabel
// ============================================================================

/// A validated name for a keystore slot.
///
/// Valid labels are non-empty, contain only ASCII alphanumerics, `-`, `_` and
/// `.`, and do not start with `.`. The restriction keeps labels usable as file
/// names in the file-backed keystore without path traversal.
///
/// # Example
///
/// ```
/// use enclavekey_core::types::KeyLabel;
///
/// let label = KeyLabel::new("com.example.signing.public").expect("valid label");
/// assert_eq!(label.as_str(), "com.example.signing.public");
///
/// assert!(KeyLabel::new("").is_err());
/// assert!(KeyLabel::new("../etc/passwd").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyLabel(String);

impl KeyLabel {
    /// Validate and wrap a label.
    ///
    /// # Errors
    ///
    /// Returns [`EnclaveError::InvalidParameters`] if the label is empty,
    /// starts with `.`, or contains a disallowed character.
    pub fn new(label: impl Into<String>) -> Result<Self, EnclaveError> {
        let label = label.into();

        if label.is_empty() {
            return Err(EnclaveError::invalid_parameters("key label is empty"));
        }

        if label.starts_with('.') {
            return Err(EnclaveError::invalid_parameters(format!(
                "key label '{label}' starts with '.'"
            )));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(EnclaveError::invalid_parameters(format!(
                "key label '{label}' contains invalid characters"
            )));
        }

        Ok(Self(label))
    }

    /// The label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for KeyLabel {
    type Error = EnclaveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<KeyLabel> for String {
    fn from(label: KeyLabel) -> Self {
        label.0
    }
}

impl AsRef<str> for KeyLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// KeyClass / CurveId
// ============================================================================

/// The class of a keystore entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyClass {
    /// Exportable public key material.
    Public,
    /// Non-exportable private key token.
    Private,
}

impl KeyClass {
    /// Lowercase name used in file names and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for KeyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-type identifier for the 256-bit NIST P-256 curve.
///
/// Both variants name the same curve. Platforms below level 10.0 only know
/// the legacy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveId {
    /// Modern identifier (`ECSECPrimeRandom`).
    EcSecPrimeRandom,
    /// Legacy identifier (`EC`).
    Ec,
}

impl CurveId {
    /// Key size in bits for every supported curve identifier.
    pub const KEY_SIZE_BITS: u32 = 256;

    /// Identifier name used in persisted entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EcSecPrimeRandom => "ec_sec_prime_random",
            Self::Ec => "ec",
        }
    }

    /// Whether this is the legacy identifier.
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Ec)
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Access control
// ============================================================================

/// When a private key may be used relative to the device lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Only while the device is unlocked.
    WhenUnlocked,
    /// After the first unlock since boot.
    AfterFirstUnlock,
    /// Regardless of lock state.
    Always,
    /// Only while unlocked, and only if a passcode is set. Never migrates.
    WhenPasscodeSetThisDeviceOnly,
    /// Only while unlocked. Never migrates.
    WhenUnlockedThisDeviceOnly,
    /// After the first unlock since boot. Never migrates.
    AfterFirstUnlockThisDeviceOnly,
    /// Regardless of lock state. Never migrates.
    AlwaysThisDeviceOnly,
}

impl Accessibility {
    /// Whether the item is bound to this device.
    #[must_use]
    pub const fn this_device_only(self) -> bool {
        matches!(
            self,
            Self::WhenPasscodeSetThisDeviceOnly
                | Self::WhenUnlockedThisDeviceOnly
                | Self::AfterFirstUnlockThisDeviceOnly
                | Self::AlwaysThisDeviceOnly
        )
    }

    /// Whether creating an item requires a device passcode.
    #[must_use]
    pub const fn requires_passcode(self) -> bool {
        matches!(self, Self::WhenPasscodeSetThisDeviceOnly)
    }

    /// Whether the device state allows using an item with this accessibility.
    ///
    /// ```
    /// use enclavekey_core::types::{Accessibility, DeviceState};
    ///
    /// let locked = DeviceState { passcode_set: true, unlocked: false, unlocked_since_boot: true };
    /// assert!(Accessibility::AfterFirstUnlockThisDeviceOnly.permits(&locked));
    /// assert!(!Accessibility::WhenUnlocked.permits(&locked));
    /// ```
    #[must_use]
    pub const fn permits(self, state: &DeviceState) -> bool {
        match self {
            Self::WhenUnlocked | Self::WhenUnlockedThisDeviceOnly => state.unlocked,
            Self::AfterFirstUnlock | Self::AfterFirstUnlockThisDeviceOnly => {
                state.unlocked_since_boot
            }
            Self::Always | Self::AlwaysThisDeviceOnly => true,
            Self::WhenPasscodeSetThisDeviceOnly => state.passcode_set && state.unlocked,
        }
    }
}

/// Lock state of the device hosting the enclave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    /// A device passcode is configured.
    pub passcode_set: bool,
    /// The device is currently unlocked.
    pub unlocked: bool,
    /// The device has been unlocked at least once since boot.
    pub unlocked_since_boot: bool,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            passcode_set: true,
            unlocked: true,
            unlocked_since_boot: true,
        }
    }
}

/// Access-control constraint flags attached to a private key.
///
/// # Example
///
/// ```
/// use enclavekey_core::types::AccessFlags;
///
/// let flags = AccessFlags::USER_PRESENCE | AccessFlags::PRIVATE_KEY_USAGE;
/// assert!(flags.contains(AccessFlags::USER_PRESENCE));
/// assert!(!flags.contains(AccessFlags::BIOMETRY_ANY));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessFlags(u32);

impl AccessFlags {
    /// Require user presence (passcode or biometry).
    pub const USER_PRESENCE: Self = Self(1 << 0);
    /// Require any enrolled biometry.
    pub const BIOMETRY_ANY: Self = Self(1 << 1);
    /// Require the device passcode.
    pub const DEVICE_PASSCODE: Self = Self(1 << 4);
    /// Allow private-key operations (sign, decrypt) inside the enclave.
    pub const PRIVATE_KEY_USAGE: Self = Self(1 << 30);

    const KNOWN: u32 = Self::USER_PRESENCE.0
        | Self::BIOMETRY_ANY.0
        | Self::DEVICE_PASSCODE.0
        | Self::PRIVATE_KEY_USAGE.0;

    /// No flags.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, rejecting unknown bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & !Self::KNOWN == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any interactive authentication flag is set.
    #[must_use]
    pub const fn requires_interaction(self) -> bool {
        self.0 & (Self::USER_PRESENCE.0 | Self::BIOMETRY_ANY.0 | Self::DEVICE_PASSCODE.0) != 0
    }
}

impl BitOr for AccessFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Describes when and how a private key may be used.
///
/// Attached at generation time and persisted with the private entry; changing
/// it requires regenerating the keypair.
///
/// # Example
///
/// ```
/// use enclavekey_core::types::{AccessControlPolicy, AccessFlags, Accessibility};
///
/// let policy = AccessControlPolicy::default();
/// assert_eq!(policy.accessibility, Accessibility::AfterFirstUnlockThisDeviceOnly);
/// assert!(policy.flags.contains(AccessFlags::USER_PRESENCE | AccessFlags::PRIVATE_KEY_USAGE));
/// assert!(policy.validate().is_ok());
///
/// let strict = AccessControlPolicy::passcode_required();
/// assert_eq!(strict.accessibility, Accessibility::WhenPasscodeSetThisDeviceOnly);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessControlPolicy {
    /// Lock-state requirement.
    pub accessibility: Accessibility,
    /// Authentication and usage constraints.
    pub flags: AccessFlags,
}

impl AccessControlPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(accessibility: Accessibility, flags: AccessFlags) -> Self {
        Self {
            accessibility,
            flags,
        }
    }

    /// Passcode-gated preset: `WhenPasscodeSetThisDeviceOnly` with user
    /// presence and private-key usage.
    #[must_use]
    pub const fn passcode_required() -> Self {
        Self::new(
            Accessibility::WhenPasscodeSetThisDeviceOnly,
            AccessFlags(AccessFlags::USER_PRESENCE.0 | AccessFlags::PRIVATE_KEY_USAGE.0),
        )
    }

    /// Whether each private-key use must confirm user presence.
    #[must_use]
    pub const fn requires_user_presence(&self) -> bool {
        self.flags.requires_interaction()
    }

    /// Check that the policy can be attached to an enclave key.
    ///
    /// # Errors
    ///
    /// Returns [`EnclaveError::AccessControlCreationFailed`] if the flags
    /// contain unknown bits, or if private-key usage is requested with an
    /// accessibility that allows the item to leave this device.
    pub fn validate(&self) -> Result<(), EnclaveError> {
        if AccessFlags::from_bits(self.flags.bits()).is_none() {
            return Err(EnclaveError::access_control_creation_failed(format!(
                "unknown access flags {:#x}",
                self.flags.bits()
            )));
        }

        if self.flags.contains(AccessFlags::PRIVATE_KEY_USAGE)
            && !self.accessibility.this_device_only()
        {
            return Err(EnclaveError::access_control_creation_failed(
                "private key usage requires a this-device-only accessibility",
            ));
        }

        Ok(())
    }
}

impl Default for AccessControlPolicy {
    fn default() -> Self {
        Self::new(
            Accessibility::AfterFirstUnlockThisDeviceOnly,
            AccessFlags::USER_PRESENCE | AccessFlags::PRIVATE_KEY_USAGE,
        )
    }
}

// ============================================================================
// Platform level and capabilities
// ============================================================================

/// A `major.minor` platform capability level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlatformLevel {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
}

impl PlatformLevel {
    /// First level that understands the modern curve identifier.
    pub const MODERN_CURVE: Self = Self::new(10, 0);

    /// First level that supports enclave encryption and decryption.
    pub const HYBRID_ENCRYPTION: Self = Self::new(10, 3);

    /// Create a level.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for PlatformLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for PlatformLevel {
    type Err = ConfigError;

    /// Parse `"major"` or `"major.minor"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::invalid_value("platform_level", s);
        let mut parts = s.trim().splitn(2, '.');

        let major = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let minor = match parts.next() {
            Some(p) => p.parse::<u16>().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self::new(major, minor))
    }
}

/// Hybrid encryption scheme offered by the enclave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    /// Ephemeral-static ECDH on P-256, ANSI X9.63 KDF with SHA-256, and
    /// ChaCha20-Poly1305.
    EciesX963Sha256ChaCha20Poly1305,
}

impl CipherSuite {
    /// Scheme name for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EciesX963Sha256ChaCha20Poly1305 => "ecies-x963-sha256-chacha20poly1305",
        }
    }
}

impl fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an enclave at a given platform level can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Platform level the capabilities were derived from.
    pub level: PlatformLevel,
    /// Curve identifier to request at key generation.
    pub curve: CurveId,
    /// Hybrid encryption scheme, if available.
    pub cipher: Option<CipherSuite>,
}

impl Capabilities {
    /// Derive capabilities from a platform level.
    #[must_use]
    pub fn for_level(level: PlatformLevel) -> Self {
        let curve = if level >= PlatformLevel::MODERN_CURVE {
            CurveId::EcSecPrimeRandom
        } else {
            CurveId::Ec
        };
        let cipher = (level >= PlatformLevel::HYBRID_ENCRYPTION)
            .then_some(CipherSuite::EciesX963Sha256ChaCha20Poly1305);

        Self {
            level,
            curve,
            cipher,
        }
    }

    /// Whether encrypt/decrypt are available.
    #[must_use]
    pub const fn supports_encryption(&self) -> bool {
        self.cipher.is_some()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    // ------------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------------

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::SUCCESS.code(), 0);
        assert_eq!(Status::PARAM.code(), -50);
        assert_eq!(Status::ITEM_NOT_FOUND.code(), -25300);
        assert_eq!(Status::DUPLICATE_ITEM.code(), -25299);
        assert_eq!(Status::VERIFY_FAILED.code(), -67808);
        assert_eq!(Status::AUTH_FAILED.code(), -25293);
        assert_eq!(Status::USER_CANCELED.code(), -128);
        assert_eq!(Status::INTERACTION_NOT_ALLOWED.code(), -25308);
        assert_eq!(Status::DECODE.code(), -26275);
    }

    #[test]
    fn test_status_display_and_names() {
        assert_eq!(Status::SUCCESS.to_string(), "errSecSuccess (0)");
        assert_eq!(Status::VERIFY_FAILED.to_string(), "errSecVerifyFailed (-67808)");
        assert_eq!(Status::new(-9999).to_string(), "status -9999");
        assert!(Status::new(-9999).name().is_none());
        assert!(!Status::PARAM.is_success());
        assert_eq!(Status::from(-50), Status::PARAM);
    }

    #[test]
    fn test_status_lookup_url() {
        assert!(Status::DECODE
            .lookup_url()
            .ends_with("framework=Security&search=-26275"));
    }

    // ------------------------------------------------------------------------
    // KeyLabel
    // ------------------------------------------------------------------------

    #[test]
    fn test_valid_labels() {
        for label in [
            "a",
            "default",
            "no.agens.demo.publicKey",
            "com.example_key-1",
            "a..b",
        ] {
            assert!(KeyLabel::new(label).is_ok(), "label '{label}' should be valid");
        }
    }

    #[test]
    fn test_invalid_labels() {
        for label in ["", ".hidden", "..", "../x", "a/b", "a b", "key\0", "ключ"] {
            assert!(
                matches!(
                    KeyLabel::new(label),
                    Err(EnclaveError::InvalidParameters { .. })
                ),
                "label '{label}' should be rejected"
            );
        }
    }

    #[test]
    fn test_label_serde_validates() {
        let ok: Result<KeyLabel, _> = parse_label_toml("\"abc.def\"");
        assert_eq!(ok.unwrap().as_str(), "abc.def");

        let bad: Result<KeyLabel, _> = parse_label_toml("\"../x\"");
        assert!(bad.is_err());
    }

    /// Deserialize a TOML value through a wrapper table.
    fn parse_label_toml(value: &str) -> Result<KeyLabel, toml::de::Error> {
        #[derive(Deserialize)]
        struct Wrapper {
            label: KeyLabel,
        }
        toml::from_str::<Wrapper>(&format!("label = {value}")).map(|w| w.label)
    }

    // ------------------------------------------------------------------------
    // Access control
    // ------------------------------------------------------------------------

    #[test]
    fn test_default_policy() {
        let policy = AccessControlPolicy::default();
        assert_eq!(
            policy.accessibility,
            Accessibility::AfterFirstUnlockThisDeviceOnly
        );
        assert!(policy.requires_user_presence());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_rejects_unknown_flags() {
        let policy = AccessControlPolicy::new(
            Accessibility::AlwaysThisDeviceOnly,
            AccessFlags(1 << 12),
        );
        assert!(matches!(
            policy.validate(),
            Err(EnclaveError::AccessControlCreationFailed { .. })
        ));
    }

    #[test]
    fn test_policy_rejects_migratable_private_key_usage() {
        let policy = AccessControlPolicy::new(
            Accessibility::AfterFirstUnlock,
            AccessFlags::PRIVATE_KEY_USAGE,
        );
        assert!(matches!(
            policy.validate(),
            Err(EnclaveError::AccessControlCreationFailed { .. })
        ));
    }

    #[test]
    fn test_policy_without_interaction() {
        let policy = AccessControlPolicy::new(
            Accessibility::AlwaysThisDeviceOnly,
            AccessFlags::PRIVATE_KEY_USAGE,
        );
        assert!(!policy.requires_user_presence());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_access_flags_from_bits() {
        assert_eq!(
            AccessFlags::from_bits(AccessFlags::USER_PRESENCE.bits()),
            Some(AccessFlags::USER_PRESENCE)
        );
        assert!(AccessFlags::from_bits(1 << 2).is_none());
        assert_eq!(AccessFlags::empty().bits(), 0);
    }

    #[test]
    fn test_accessibility_permits() {
        let locked_after_boot = DeviceState {
            passcode_set: true,
            unlocked: false,
            unlocked_since_boot: true,
        };
        let fresh_boot = DeviceState {
            passcode_set: false,
            unlocked: false,
            unlocked_since_boot: false,
        };

        assert!(Accessibility::AfterFirstUnlock.permits(&locked_after_boot));
        assert!(!Accessibility::WhenUnlockedThisDeviceOnly.permits(&locked_after_boot));
        assert!(!Accessibility::AfterFirstUnlockThisDeviceOnly.permits(&fresh_boot));
        assert!(Accessibility::AlwaysThisDeviceOnly.permits(&fresh_boot));
        assert!(!Accessibility::WhenPasscodeSetThisDeviceOnly.permits(&DeviceState {
            passcode_set: false,
            ..DeviceState::default()
        }));
        assert!(Accessibility::WhenPasscodeSetThisDeviceOnly.permits(&DeviceState::default()));
    }

    // ------------------------------------------------------------------------
    // Platform level and capabilities
    // ------------------------------------------------------------------------

    #[test]
    fn test_platform_level_parse() {
        assert_eq!("10.3".parse::<PlatformLevel>().unwrap(), PlatformLevel::new(10, 3));
        assert_eq!("11".parse::<PlatformLevel>().unwrap(), PlatformLevel::new(11, 0));
        assert_eq!(" 9.2 ".parse::<PlatformLevel>().unwrap(), PlatformLevel::new(9, 2));
        assert!("".parse::<PlatformLevel>().is_err());
        assert!("ten".parse::<PlatformLevel>().is_err());
        assert!("10.x".parse::<PlatformLevel>().is_err());
        assert_eq!(PlatformLevel::new(10, 3).to_string(), "10.3");
    }

    #[test]
    fn test_platform_level_ordering() {
        assert!(PlatformLevel::new(10, 2) < PlatformLevel::HYBRID_ENCRYPTION);
        assert!(PlatformLevel::new(11, 0) > PlatformLevel::HYBRID_ENCRYPTION);
        assert!(PlatformLevel::new(9, 9) < PlatformLevel::MODERN_CURVE);
    }

    #[test]
    fn test_capabilities_by_level() {
        let legacy = Capabilities::for_level(PlatformLevel::new(9, 0));
        assert_eq!(legacy.curve, CurveId::Ec);
        assert!(legacy.curve.is_legacy());
        assert!(!legacy.supports_encryption());

        let no_cipher = Capabilities::for_level(PlatformLevel::new(10, 2));
        assert_eq!(no_cipher.curve, CurveId::EcSecPrimeRandom);
        assert!(!no_cipher.supports_encryption());

        let full = Capabilities::for_level(PlatformLevel::new(10, 3));
        assert_eq!(
            full.cipher,
            Some(CipherSuite::EciesX963Sha256ChaCha20Poly1305)
        );
    }
}

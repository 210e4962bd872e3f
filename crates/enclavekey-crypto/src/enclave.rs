//! The enclave seam and its software implementation.
//!
//! An [`Enclave`] generates P-256 keypairs and performs every operation that
//! needs a private key. Private scalars never cross this boundary: callers
//! only ever hold a [`PrivateKeyReference`] wrapping a sealed token.
//!
//! [`SoftEnclave`] keeps a device wrapping secret and seals each generated
//! scalar under it (see [`crate::sealing`]). Every private-key use is gated on
//!
//! 1. the key's accessibility permitting the current [`DeviceState`],
//! 2. user presence, when the access flags ask for it, and
//! 3. the token unsealing under this device's secret.
//!
//! # Example
//!
//! ```rust
//! use enclavekey_core::{AccessControlPolicy, CurveId, KeyLabel, PlatformLevel};
//! use enclavekey_crypto::enclave::{Enclave, KeyGenerationRequest, SoftEnclave};
//!
//! let enclave = SoftEnclave::ephemeral(PlatformLevel::new(10, 3));
//! let pair = enclave
//!     .generate(&KeyGenerationRequest::new(
//!         KeyLabel::new("app.private").expect("valid label"),
//!         CurveId::EcSecPrimeRandom,
//!         AccessControlPolicy::default(),
//!     ))
//!     .expect("generation failed");
//!
//! assert_eq!(pair.public_key.len(), 65);
//! ```

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use enclavekey_core::{
    AccessControlPolicy, AccessFlags, Capabilities, CurveId, DeviceState, EnclaveError, KeyLabel,
    PlatformLevel, Status,
};
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::Zeroize;

use crate::handles::PrivateKeyReference;
use crate::hybrid;
use crate::keys::{SecretKey, SECRET_KEY_LEN};
use crate::sealing::{seal_key, unseal_key, SealedKey};

// ============================================================================
// Presence
// ============================================================================

/// Confirms that a user is present before a private key is used.
pub trait PresenceVerifier: Send + Sync {
    /// Ask the user to confirm `prompt`.
    ///
    /// # Errors
    ///
    /// Returns the status describing why presence was not confirmed, for
    /// example [`Status::USER_CANCELED`] when the user declines.
    fn verify_presence(&self, prompt: &str) -> Result<(), Status>;
}

/// A verifier that always confirms presence.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysPresent;

impl PresenceVerifier for AlwaysPresent {
    fn verify_presence(&self, _prompt: &str) -> Result<(), Status> {
        Ok(())
    }
}

/// A verifier that always declines with [`Status::USER_CANCELED`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverPresent;

impl PresenceVerifier for NeverPresent {
    fn verify_presence(&self, _prompt: &str) -> Result<(), Status> {
        Err(Status::USER_CANCELED)
    }
}

// ============================================================================
// Enclave trait
// ============================================================================

/// Parameters of a keypair generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGenerationRequest {
    /// Label the private key will be stored under; bound into the sealed token.
    pub label: KeyLabel,
    /// Curve identifier to generate with.
    pub curve: CurveId,
    /// Requested key size in bits.
    pub key_size_bits: u32,
    /// Access-control policy attached to the private key.
    pub policy: AccessControlPolicy,
}

impl KeyGenerationRequest {
    /// A 256-bit request.
    #[must_use]
    pub fn new(label: KeyLabel, curve: CurveId, policy: AccessControlPolicy) -> Self {
        Self {
            label,
            curve,
            key_size_bits: CurveId::KEY_SIZE_BITS,
            policy,
        }
    }
}

/// A freshly generated keypair.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedKeyPair {
    /// Uncompressed SEC1 public key (65 bytes).
    pub public_key: Vec<u8>,
    /// Token only the issuing enclave can use.
    pub sealed_private_key: Vec<u8>,
}

impl std::fmt::Debug for GeneratedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedKeyPair")
            .field("public_key", &hex::encode(&self.public_key))
            .field("sealed_private_key", &"[REDACTED]")
            .finish()
    }
}

/// A hardware-isolated key module.
///
/// Implementations must be `Send + Sync`; calls may block on user presence.
pub trait Enclave: Send + Sync {
    /// What this enclave supports.
    fn capabilities(&self) -> Capabilities;

    /// Generate a keypair inside the enclave.
    ///
    /// # Errors
    ///
    /// Returns the platform status of the failure.
    fn generate(&self, request: &KeyGenerationRequest) -> Result<GeneratedKeyPair, Status>;

    /// ECDSA-sign a 32-byte digest with the referenced key.
    ///
    /// Returns the DER-encoded signature.
    ///
    /// # Errors
    ///
    /// Returns the platform status of the failure.
    fn sign(
        &self,
        key: &PrivateKeyReference,
        digest: &[u8; 32],
        prompt: &str,
    ) -> Result<Vec<u8>, Status>;

    /// Decrypt a hybrid ciphertext addressed to the referenced key.
    ///
    /// # Errors
    ///
    /// - [`EnclaveError::Unsupported`] below the hybrid encryption level
    /// - [`EnclaveError::CryptoOperationFailed`] if the key cannot be used
    ///   or the ciphertext does not authenticate
    fn decrypt(
        &self,
        key: &PrivateKeyReference,
        ciphertext: &[u8],
        prompt: &str,
    ) -> Result<Vec<u8>, EnclaveError>;
}

// ============================================================================
// SoftEnclave
// ============================================================================

/// A software enclave sealing private keys under a device secret.
pub struct SoftEnclave {
    device_secret: SecretKey,
    level: PlatformLevel,
    state: DeviceState,
    presence: Box<dyn PresenceVerifier>,
}

impl SoftEnclave {
    /// Create an enclave around an existing device secret.
    ///
    /// Presence is always confirmed and the device is unlocked with a
    /// passcode set; see [`with_presence`](Self::with_presence) and
    /// [`with_device_state`](Self::with_device_state).
    #[must_use]
    pub fn new(device_secret: SecretKey, level: PlatformLevel) -> Self {
        Self {
            device_secret,
            level,
            state: DeviceState::default(),
            presence: Box::new(AlwaysPresent),
        }
    }

    /// Create an enclave with a random device secret.
    ///
    /// Keys it generates cannot be used by any other instance.
    #[must_use]
    pub fn ephemeral(level: PlatformLevel) -> Self {
        Self::new(SecretKey::generate(), level)
    }

    /// Replace the presence verifier.
    #[must_use]
    pub fn with_presence(mut self, presence: Box<dyn PresenceVerifier>) -> Self {
        self.presence = presence;
        self
    }

    /// Replace the device state.
    #[must_use]
    pub fn with_device_state(mut self, state: DeviceState) -> Self {
        self.state = state;
        self
    }

    /// The current device state.
    #[must_use]
    pub const fn device_state(&self) -> DeviceState {
        self.state
    }

    /// Run the access checks for a private-key use and unseal the scalar.
    fn authorize(
        &self,
        key: &PrivateKeyReference,
        prompt: &str,
    ) -> Result<p256::SecretKey, Status> {
        let policy = key.access_control();

        if !policy.accessibility.permits(&self.state) {
            tracing::debug!(label = %key.label(), "Key not accessible in current device state");
            return Err(Status::INTERACTION_NOT_ALLOWED);
        }

        if !policy.flags.contains(AccessFlags::PRIVATE_KEY_USAGE) {
            return Err(Status::PARAM);
        }

        if policy.requires_user_presence() {
            self.presence.verify_presence(prompt)?;
        }

        let sealed = SealedKey::from_bytes(key.sealed()).map_err(|_| Status::DECODE)?;
        unseal_key(&sealed, &self.device_secret, key.label())
            .map_err(|_| Status::DECODE)?
            .into_p256()
            .map_err(|_| Status::DECODE)
    }
}

impl std::fmt::Debug for SoftEnclave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftEnclave")
            .field("level", &self.level)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Enclave for SoftEnclave {
    fn capabilities(&self) -> Capabilities {
        Capabilities::for_level(self.level)
    }

    fn generate(&self, request: &KeyGenerationRequest) -> Result<GeneratedKeyPair, Status> {
        if request.key_size_bits != CurveId::KEY_SIZE_BITS {
            return Err(Status::PARAM);
        }

        if request.policy.validate().is_err()
            || !request.policy.flags.contains(AccessFlags::PRIVATE_KEY_USAGE)
        {
            return Err(Status::PARAM);
        }

        if request.policy.accessibility.requires_passcode() && !self.state.passcode_set {
            return Err(Status::AUTH_FAILED);
        }

        let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
        let public_key = secret.public_key().to_encoded_point(false).as_bytes().to_vec();

        let scalar = SecretKey::from_p256(&secret);
        let sealed = seal_key(&scalar, &self.device_secret, &request.label)
            .map_err(|_| Status::PARAM)?;

        tracing::debug!(
            label = %request.label,
            curve = %request.curve,
            "Generated enclave keypair"
        );

        Ok(GeneratedKeyPair {
            public_key,
            sealed_private_key: sealed.to_bytes(),
        })
    }

    fn sign(
        &self,
        key: &PrivateKeyReference,
        digest: &[u8; 32],
        prompt: &str,
    ) -> Result<Vec<u8>, Status> {
        let secret = self.authorize(key, prompt)?;
        let signing_key = SigningKey::from(&secret);

        let signature: Signature = signing_key
            .sign_prehash(digest)
            .map_err(|_| Status::PARAM)?;

        Ok(signature.to_der().as_bytes().to_vec())
    }

    fn decrypt(
        &self,
        key: &PrivateKeyReference,
        ciphertext: &[u8],
        prompt: &str,
    ) -> Result<Vec<u8>, EnclaveError> {
        if !self.capabilities().supports_encryption() {
            return Err(EnclaveError::unsupported("decrypt"));
        }

        let secret = self.authorize(key, prompt).map_err(|status| {
            EnclaveError::crypto_failed(format!("private key unavailable: {status}"))
        })?;

        hybrid::open(&secret, ciphertext)
    }
}

// ============================================================================
// Device secret
// ============================================================================

/// Read the device wrapping secret at `path`, creating it if absent.
///
/// A new secret is staged in a mode 0600 temp file and linked into place
/// only if `path` is still free. When another process creates it first,
/// that secret is read and returned instead.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read or written, or
/// [`io::ErrorKind::InvalidData`] if an existing file is not 32 bytes.
pub fn load_or_create_device_secret(path: &Path) -> io::Result<SecretKey> {
    match read_device_secret(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        existing => return existing,
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let secret = SecretKey::generate();
    let mut staged = tempfile::Builder::new()
        .prefix(".device-secret.")
        .suffix(".tmp")
        .tempfile_in(dir)?;

    #[cfg(unix)]
    staged
        .as_file()
        .set_permissions(fs::Permissions::from_mode(0o600))?;

    staged.write_all(secret.as_bytes())?;
    staged.as_file().sync_all()?;

    match staged.persist_noclobber(path) {
        Ok(_) => {
            tracing::info!(path = %path.display(), "Created device secret");
            Ok(secret)
        }
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
            tracing::debug!(path = %path.display(), "Device secret created concurrently");
            read_device_secret(path)
        }
        Err(e) => Err(e.error),
    }
}

fn read_device_secret(path: &Path) -> io::Result<SecretKey> {
    let mut bytes = Vec::with_capacity(SECRET_KEY_LEN);
    File::open(path)?.read_to_end(&mut bytes)?;
    let secret =
        SecretKey::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e));
    bytes.zeroize();
    secret
}

//! Key handles returned by the key service.
//!
//! - [`PublicKeyHandle`] is a value type: the exported SEC1 bytes plus the
//!   parsed point. It can be cloned, logged and shared freely.
//! - [`PrivateKeyReference`] is opaque. It holds the label, curve and
//!   access-control policy of a private entry together with a token only the
//!   enclave that issued it can use. It cannot be cloned and offers no way
//!   to read key bytes.

use std::fmt;

use enclavekey_core::{AccessControlPolicy, CurveId, EnclaveError, KeyClass, KeyLabel};
use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::keystore::ItemReference;

/// Length of an uncompressed SEC1 P-256 point.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Leading byte of an uncompressed SEC1 point.
pub const UNCOMPRESSED_TAG: u8 = 0x04;

// ============================================================================
// PublicKeyHandle
// ============================================================================

/// An exported P-256 public key.
///
/// # Example
///
/// ```rust
/// use enclavekey_crypto::handles::PublicKeyHandle;
/// use p256::elliptic_curve::sec1::ToEncodedPoint;
///
/// let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
/// let point = secret.public_key().to_encoded_point(false);
///
/// let handle = PublicKeyHandle::from_sec1_bytes(point.as_bytes()).expect("valid point");
/// assert_eq!(handle.as_bytes().len(), 65);
/// assert_eq!(handle.hex(), hex::encode(point.as_bytes()));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKeyHandle {
    bytes: [u8; PUBLIC_KEY_LEN],
    key: p256::PublicKey,
}

impl PublicKeyHandle {
    /// Parse an uncompressed SEC1 point.
    ///
    /// # Errors
    ///
    /// Returns [`EnclaveError::ValidationFailed`] if the bytes are not a
    /// 65-byte uncompressed point on P-256.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, EnclaveError> {
        let raw: [u8; PUBLIC_KEY_LEN] = bytes.try_into().map_err(|_| {
            EnclaveError::validation_failed(format!(
                "public key must be {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;

        if raw[0] != UNCOMPRESSED_TAG {
            return Err(EnclaveError::validation_failed(
                "public key is not an uncompressed point",
            ));
        }

        let key = p256::PublicKey::from_sec1_bytes(&raw)
            .map_err(|_| EnclaveError::validation_failed("public key is not a point on P-256"))?;

        Ok(Self { bytes: raw, key })
    }

    /// Wrap a parsed key.
    #[must_use]
    pub fn from_public_key(key: p256::PublicKey) -> Self {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(key.to_encoded_point(false).as_bytes());
        Self { bytes, key }
    }

    /// The raw exported bytes (`0x04 || X || Y`).
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.bytes
    }

    /// Lowercase hex of the raw bytes.
    #[must_use]
    pub fn hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The parsed key.
    #[must_use]
    pub const fn key(&self) -> &p256::PublicKey {
        &self.key
    }

    /// The ECDSA verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> p256::ecdsa::VerifyingKey {
        p256::ecdsa::VerifyingKey::from(&self.key)
    }
}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKeyHandle").field(&self.hex()).finish()
    }
}

impl AsRef<[u8]> for PublicKeyHandle {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

// ============================================================================
// PrivateKeyReference
// ============================================================================

/// An opaque, non-exportable reference to an enclave private key.
///
/// Only the key service creates references, from keystore lookups. The
/// enclave reads the sealed token; nothing else can.
pub struct PrivateKeyReference {
    label: KeyLabel,
    curve: CurveId,
    access_control: AccessControlPolicy,
    sealed: Vec<u8>,
}

impl PrivateKeyReference {
    pub(crate) const fn new(
        label: KeyLabel,
        curve: CurveId,
        access_control: AccessControlPolicy,
        sealed: Vec<u8>,
    ) -> Self {
        Self {
            label,
            curve,
            access_control,
            sealed,
        }
    }

    /// Convert a keystore reference to a private entry.
    pub(crate) fn from_item_reference(reference: ItemReference) -> Result<Self, EnclaveError> {
        if reference.class != KeyClass::Private {
            return Err(EnclaveError::invalid_parameters(
                "keystore reference is not a private key",
            ));
        }

        let access_control = reference.access_control.ok_or_else(|| {
            EnclaveError::access_control_creation_failed(format!(
                "private key '{}' has no access control",
                reference.label
            ))
        })?;

        Ok(Self::new(
            reference.label,
            reference.key_type,
            access_control,
            reference.payload,
        ))
    }

    /// Label of the private entry.
    #[must_use]
    pub const fn label(&self) -> &KeyLabel {
        &self.label
    }

    /// Curve identifier the key was generated with.
    #[must_use]
    pub const fn curve(&self) -> CurveId {
        self.curve
    }

    /// Access-control policy attached at generation.
    #[must_use]
    pub const fn access_control(&self) -> AccessControlPolicy {
        self.access_control
    }

    pub(crate) fn sealed(&self) -> &[u8] {
        &self.sealed
    }
}

impl fmt::Debug for PrivateKeyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyReference")
            .field("label", &self.label)
            .field("curve", &self.curve)
            .field("access_control", &self.access_control)
            .field("sealed", &"[REDACTED]")
            .finish()
    }
}

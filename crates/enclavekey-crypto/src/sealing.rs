//! Sealing of private scalars under the enclave's device secret.
//!
//! A private key generated by the soft enclave never leaves it in the clear.
//! The scalar is encrypted with ChaCha20-Poly1305 under the device wrapping
//! secret, with the key label authenticated as associated data, and only the
//! resulting token is handed to the keystore.
//!
//! # Sealed Token Format
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ version: 1 (1 byte)                 │
//! │ nonce: [u8; 12]                     │
//! │ ciphertext: [u8; 32]                │
//! │ tag: [u8; 16]                       │
//! └─────────────────────────────────────┘
//! ```
//!
//! A token unseals only under the same device secret and label it was sealed
//! with. Moving it to another label or another device yields
//! [`SealError::UnsealFailed`].
//!
//! # Example
//!
//! ```rust
//! use enclavekey_core::KeyLabel;
//! use enclavekey_crypto::keys::SecretKey;
//! use enclavekey_crypto::sealing::{seal_key, unseal_key, SealedKey};
//!
//! let device = SecretKey::generate();
//! let label = KeyLabel::new("app.private").expect("valid label");
//! let scalar = SecretKey::generate();
//!
//! let token = seal_key(&scalar, &device, &label).expect("sealing failed").to_bytes();
//!
//! let sealed = SealedKey::from_bytes(&token).expect("invalid format");
//! let unsealed = unseal_key(&sealed, &device, &label).expect("unsealing failed");
//! assert_eq!(unsealed, scalar);
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use enclavekey_core::KeyLabel;
use rand::RngCore;
use zeroize::Zeroize;

use crate::keys::{SecretKey, SECRET_KEY_LEN};

// ============================================================================
// Constants
// ============================================================================

/// Current sealed token format version.
pub const SEAL_VERSION: u8 = 1;

/// Length of the nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Length of the authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Total length of a sealed token in bytes.
///
/// Layout: version (1) + nonce (12) + ciphertext (32) + tag (16) = 61
pub const SEALED_KEY_LEN: usize = 1 + NONCE_LEN + SECRET_KEY_LEN + TAG_LEN;

// ============================================================================
// Errors
// ============================================================================

/// Errors produced while sealing or unsealing a private scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SealError {
    /// The token has the wrong length or an unknown version.
    #[error("invalid sealed key format")]
    InvalidFormat,

    /// Encryption failed.
    #[error("sealing failed")]
    SealFailed,

    /// The token does not authenticate under this secret and label.
    #[error("unsealing failed")]
    UnsealFailed,
}

// ============================================================================
// SealedKey
// ============================================================================

/// A private scalar sealed under a device secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedKey {
    /// Format version (currently always 1).
    pub version: u8,
    /// Random nonce used for ChaCha20-Poly1305.
    pub nonce: [u8; NONCE_LEN],
    /// Encrypted scalar with authentication tag (48 bytes: 32 + 16).
    pub ciphertext: Vec<u8>,
}

impl SealedKey {
    /// Serialize to `version || nonce || ciphertext || tag`.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SEALED_KEY_LEN);
        bytes.push(self.version);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse a serialized token.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidFormat`] if the input is not exactly
    /// [`SEALED_KEY_LEN`] bytes or the version byte is not recognized.
    ///
    /// ```rust
    /// use enclavekey_crypto::sealing::SealedKey;
    ///
    /// assert!(SealedKey::from_bytes(&[0u8; 10]).is_err());
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SealError> {
        if bytes.len() != SEALED_KEY_LEN {
            return Err(SealError::InvalidFormat);
        }

        let (&version, rest) = bytes.split_first().ok_or(SealError::InvalidFormat)?;
        if version != SEAL_VERSION {
            return Err(SealError::InvalidFormat);
        }

        let (nonce_slice, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce_slice
            .try_into()
            .map_err(|_| SealError::InvalidFormat)?;

        Ok(Self {
            version,
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

// ============================================================================
// Seal / Unseal
// ============================================================================

/// Seal a private scalar under `device_secret`, bound to `label`.
///
/// A fresh random nonce is drawn for every call.
///
/// # Errors
///
/// Returns [`SealError::SealFailed`] if the cipher rejects its input.
pub fn seal_key(
    scalar: &SecretKey,
    device_secret: &SecretKey,
    label: &KeyLabel,
) -> Result<SealedKey, SealError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = ChaCha20Poly1305::new_from_slice(device_secret.as_bytes())
        .map_err(|_| SealError::SealFailed)?;

    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: scalar.as_bytes(),
                aad: label.as_str().as_bytes(),
            },
        )
        .map_err(|_| SealError::SealFailed)?;

    Ok(SealedKey {
        version: SEAL_VERSION,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Recover a private scalar sealed by [`seal_key`].
///
/// # Errors
///
/// Returns [`SealError::UnsealFailed`] if the token was sealed under a
/// different secret or label, or has been modified.
/// Returns [`SealError::InvalidFormat`] if the plaintext is not 32 bytes.
pub fn unseal_key(
    sealed: &SealedKey,
    device_secret: &SecretKey,
    label: &KeyLabel,
) -> Result<SecretKey, SealError> {
    let cipher = ChaCha20Poly1305::new_from_slice(device_secret.as_bytes())
        .map_err(|_| SealError::UnsealFailed)?;

    let mut plaintext = cipher
        .decrypt(
            Nonce::from_slice(&sealed.nonce),
            Payload {
                msg: &sealed.ciphertext,
                aad: label.as_str().as_bytes(),
            },
        )
        .map_err(|_| SealError::UnsealFailed)?;

    let result = SecretKey::from_slice(&plaintext).map_err(|_| SealError::InvalidFormat);
    plaintext.zeroize();
    result
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn label(s: &str) -> KeyLabel {
        KeyLabel::new(s).expect("valid label")
    }

    #[test]
    fn test_sealed_len_is_61() {
        let sealed = seal_key(
            &SecretKey::generate(),
            &SecretKey::generate(),
            &label("k.private"),
        )
        .expect("seal");
        let bytes = sealed.to_bytes();
        assert_eq!(bytes.len(), SEALED_KEY_LEN);
        assert_eq!(bytes.len(), 61);
        assert_eq!(bytes[0], SEAL_VERSION);
    }

    #[test]
    fn test_seal_unseal_roundtrip() {
        let device = SecretKey::generate();
        let scalar = SecretKey::new([0x11; 32]);
        let sealed = seal_key(&scalar, &device, &label("a")).expect("seal");

        let parsed = SealedKey::from_bytes(&sealed.to_bytes()).expect("parse");
        assert_eq!(parsed, sealed);
        assert_eq!(unseal_key(&parsed, &device, &label("a")).unwrap(), scalar);
    }

    #[test]
    fn test_nonce_is_fresh_per_seal() {
        let device = SecretKey::generate();
        let scalar = SecretKey::generate();
        let a = seal_key(&scalar, &device, &label("a")).expect("seal");
        let b = seal_key(&scalar, &device, &label("a")).expect("seal");
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_unseal_with_other_device_fails() {
        let sealed = seal_key(&SecretKey::generate(), &SecretKey::generate(), &label("a"))
            .expect("seal");
        assert_eq!(
            unseal_key(&sealed, &SecretKey::generate(), &label("a")).unwrap_err(),
            SealError::UnsealFailed
        );
    }

    #[test]
    fn test_unseal_with_other_label_fails() {
        let device = SecretKey::generate();
        let sealed = seal_key(&SecretKey::generate(), &device, &label("a")).expect("seal");
        assert_eq!(
            unseal_key(&sealed, &device, &label("b")).unwrap_err(),
            SealError::UnsealFailed
        );
    }

    #[test]
    fn test_tampered_token_fails() {
        let device = SecretKey::generate();
        let sealed = seal_key(&SecretKey::generate(), &device, &label("a")).expect("seal");
        let mut bytes = sealed.to_bytes();
        bytes[20] ^= 0x80;
        let tampered = SealedKey::from_bytes(&bytes).expect("parse");
        assert!(unseal_key(&tampered, &device, &label("a")).is_err());
    }

    #[test]
    fn test_from_bytes_rejects_bad_input() {
        assert_eq!(
            SealedKey::from_bytes(&[1u8; 60]).unwrap_err(),
            SealError::InvalidFormat
        );
        let mut bytes = [0u8; SEALED_KEY_LEN];
        bytes[0] = 2;
        assert_eq!(
            SealedKey::from_bytes(&bytes).unwrap_err(),
            SealError::InvalidFormat
        );
    }
}

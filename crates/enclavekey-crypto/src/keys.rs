//! Zeroizing 32-byte secrets.
//!
//! [`SecretKey`] carries two kinds of material inside this crate: the soft
//! enclave's device wrapping secret, which lives for the whole process, and
//! P-256 private scalars, which exist only between unsealing and use.
//! Either way the bytes are wiped on drop, compared in constant time and
//! hidden from `Debug`.

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every secret handled here.
pub const SECRET_KEY_LEN: usize = 32;

/// Secret bytes that never outlive their owner.
///
/// There is no `Clone`; move the value or borrow it.
///
/// ```
/// use enclavekey_crypto::keys::SecretKey;
///
/// let device = SecretKey::generate();
/// assert_eq!(device.as_bytes().len(), 32);
/// assert_eq!(format!("{device:?}"), "SecretKey(..)");
/// ```
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: [u8; SECRET_KEY_LEN],
}

impl SecretKey {
    /// Take ownership of `bytes`.
    #[must_use]
    pub const fn new(bytes: [u8; SECRET_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Fresh random bytes from the OS.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = Self::new([0u8; SECRET_KEY_LEN]);
        rand::rngs::OsRng.fill_bytes(&mut key.bytes);
        key
    }

    /// Copy from a slice, e.g. the contents of a device secret file.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::InvalidLength`] unless `bytes` holds exactly
    /// [`SECRET_KEY_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SecretKeyError> {
        if bytes.len() != SECRET_KEY_LEN {
            return Err(SecretKeyError::InvalidLength { len: bytes.len() });
        }
        let mut key = Self::new([0u8; SECRET_KEY_LEN]);
        key.bytes.copy_from_slice(bytes);
        Ok(key)
    }

    /// Capture the scalar of a P-256 private key.
    #[must_use]
    pub fn from_p256(secret: &p256::SecretKey) -> Self {
        let mut scalar = secret.to_bytes();
        let mut key = Self::new([0u8; SECRET_KEY_LEN]);
        key.bytes.copy_from_slice(&scalar);
        scalar.as_mut_slice().zeroize();
        key
    }

    /// Borrow the bytes for the operation at hand. Do not copy them out.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.bytes
    }

    /// Rebuild the P-256 private key this scalar belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`SecretKeyError::NotAScalar`] for zero or for values not
    /// below the group order.
    pub fn into_p256(self) -> Result<p256::SecretKey, SecretKeyError> {
        p256::SecretKey::from_bytes((&self.bytes).into()).map_err(|_| SecretKeyError::NotAScalar)
    }
}

/// Why bytes could not become a [`SecretKey`] or a P-256 scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SecretKeyError {
    /// Wrong input size.
    #[error("expected {SECRET_KEY_LEN} secret bytes, got {len}")]
    InvalidLength {
        /// Size that was supplied.
        len: usize,
    },

    /// Not a valid P-256 private scalar.
    #[error("bytes are not a valid P-256 scalar")]
    NotAScalar,
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.ct_eq(&other.bytes).into()
    }
}

impl Eq for SecretKey {}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_generated_secrets_differ() {
        assert_ne!(SecretKey::generate(), SecretKey::generate());
    }

    #[test]
    fn test_from_slice() {
        let key = SecretKey::from_slice(&[7u8; 32]).unwrap();
        assert_eq!(key, SecretKey::new([7u8; 32]));

        assert_eq!(
            SecretKey::from_slice(&[7u8; 33]).unwrap_err(),
            SecretKeyError::InvalidLength { len: 33 }
        );
        assert_eq!(
            SecretKey::from_slice(&[]).unwrap_err(),
            SecretKeyError::InvalidLength { len: 0 }
        );
    }

    #[test]
    fn test_debug_is_opaque() {
        let key = SecretKey::new([0xAB; SECRET_KEY_LEN]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "SecretKey(..)");
        assert!(!rendered.to_lowercase().contains("ab"));
    }

    #[test]
    fn test_equality_is_bytewise() {
        let mut flipped = [0x42u8; SECRET_KEY_LEN];
        flipped[0] ^= 0x80;
        assert_eq!(SecretKey::new([0x42; 32]), SecretKey::new([0x42; 32]));
        assert_ne!(SecretKey::new([0x42; 32]), SecretKey::new(flipped));
    }

    #[test]
    fn test_scalar_survives_wrapping() {
        let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
        let restored = SecretKey::from_p256(&secret).into_p256().unwrap();
        assert_eq!(restored.public_key(), secret.public_key());
    }

    #[test]
    fn test_out_of_range_scalars() {
        for bytes in [[0u8; SECRET_KEY_LEN], [0xFF; SECRET_KEY_LEN]] {
            assert_eq!(
                SecretKey::new(bytes).into_p256().unwrap_err(),
                SecretKeyError::NotAScalar
            );
        }
    }

    #[test]
    fn test_thread_safe() {
        fn check<T: Send + Sync>() {}
        check::<SecretKey>();
    }
}

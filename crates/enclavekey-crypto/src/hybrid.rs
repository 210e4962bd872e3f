//! Hybrid public-key encryption on P-256.
//!
//! The scheme is ECIES in the "standard X9.63" style:
//!
//! 1. An ephemeral P-256 keypair is generated per message.
//! 2. ECDH between the ephemeral secret and the recipient key yields `Z`.
//! 3. The ANSI X9.63 KDF with SHA-256 and the ephemeral public key as shared
//!    info stretches `Z` into a 32-byte key and a 12-byte nonce.
//! 4. The plaintext is sealed with ChaCha20-Poly1305.
//!
//! # Ciphertext Format
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │ ephemeral public key: [u8; 65]      │
//! │ ciphertext: [u8; plaintext_len]     │
//! │ tag: [u8; 16]                       │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use enclavekey_crypto::hybrid::{open, seal, CIPHERTEXT_OVERHEAD};
//!
//! let recipient = p256::SecretKey::random(&mut rand::rngs::OsRng);
//! let ciphertext = seal(&recipient.public_key(), b"hello").expect("seal failed");
//! assert_eq!(ciphertext.len(), 5 + CIPHERTEXT_OVERHEAD);
//!
//! let plaintext = open(&recipient, &ciphertext).expect("open failed");
//! assert_eq!(plaintext, b"hello");
//! ```

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use enclavekey_core::EnclaveError;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::handles::PUBLIC_KEY_LEN;

/// Length of the authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Bytes added to every plaintext: ephemeral key plus tag.
pub const CIPHERTEXT_OVERHEAD: usize = PUBLIC_KEY_LEN + TAG_LEN;

/// Largest plaintext accepted for encryption (1 MiB).
pub const MAX_PLAINTEXT_LEN: usize = 1 << 20;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` to `recipient`.
///
/// # Errors
///
/// Returns [`EnclaveError::CryptoOperationFailed`] if the plaintext exceeds
/// [`MAX_PLAINTEXT_LEN`] or the cipher fails.
pub fn seal(recipient: &p256::PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnclaveError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(EnclaveError::crypto_failed(format!(
            "plaintext of {} bytes exceeds {MAX_PLAINTEXT_LEN}",
            plaintext.len()
        )));
    }

    let ephemeral = p256::ecdh::EphemeralSecret::random(&mut rand::rngs::OsRng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(recipient);

    let material = derive_key_material(
        shared.raw_secret_bytes().as_slice(),
        ephemeral_public.as_bytes(),
    )?;
    let body = cipher_for(&material)?
        .encrypt(nonce_for(&material), plaintext)
        .map_err(|_| EnclaveError::crypto_failed("encryption failed"))?;

    let mut out = Vec::with_capacity(PUBLIC_KEY_LEN + body.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decrypt a ciphertext produced by [`seal`] for `recipient`'s public key.
///
/// # Errors
///
/// Returns [`EnclaveError::CryptoOperationFailed`] if the ciphertext is too
/// short, its ephemeral key is invalid, or authentication fails.
pub fn open(recipient: &p256::SecretKey, ciphertext: &[u8]) -> Result<Vec<u8>, EnclaveError> {
    if ciphertext.len() < CIPHERTEXT_OVERHEAD {
        return Err(EnclaveError::crypto_failed(format!(
            "ciphertext of {} bytes is shorter than {CIPHERTEXT_OVERHEAD}",
            ciphertext.len()
        )));
    }

    let (ephemeral_bytes, body) = ciphertext.split_at(PUBLIC_KEY_LEN);
    let ephemeral = p256::PublicKey::from_sec1_bytes(ephemeral_bytes)
        .map_err(|_| EnclaveError::crypto_failed("invalid ephemeral public key"))?;

    let shared = p256::ecdh::diffie_hellman(recipient.to_nonzero_scalar(), ephemeral.as_affine());

    let material = derive_key_material(shared.raw_secret_bytes().as_slice(), ephemeral_bytes)?;
    cipher_for(&material)?
        .decrypt(nonce_for(&material), body)
        .map_err(|_| EnclaveError::crypto_failed("decryption failed: authentication tag mismatch"))
}

/// ANSI X9.63 KDF with SHA-256, producing `key || nonce`.
fn derive_key_material(
    shared_secret: &[u8],
    shared_info: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN + NONCE_LEN]>, EnclaveError> {
    let mut output = Zeroizing::new([0u8; KEY_LEN + NONCE_LEN]);
    ansi_x963_kdf::derive_key_into::<Sha256>(shared_secret, shared_info, output.as_mut_slice())
        .map_err(|e| EnclaveError::crypto_failed(format!("key derivation failed: {e}")))?;
    Ok(output)
}

fn cipher_for(material: &[u8; KEY_LEN + NONCE_LEN]) -> Result<ChaCha20Poly1305, EnclaveError> {
    ChaCha20Poly1305::new_from_slice(&material[..KEY_LEN])
        .map_err(|_| EnclaveError::crypto_failed("invalid derived key"))
}

fn nonce_for(material: &[u8; KEY_LEN + NONCE_LEN]) -> &Nonce {
    Nonce::from_slice(&material[KEY_LEN..])
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use sha2::Digest;

    fn recipient() -> p256::SecretKey {
        p256::SecretKey::random(&mut rand::rngs::OsRng)
    }

    #[test]
    fn test_roundtrip() {
        let key = recipient();
        let long = [0x5au8; 1000];
        for plaintext in [&b""[..], &b"x"[..], &long[..]] {
            let ct = seal(&key.public_key(), plaintext).expect("seal");
            assert_eq!(ct.len(), plaintext.len() + CIPHERTEXT_OVERHEAD);
            assert_eq!(ct[0], 0x04);
            assert_eq!(open(&key, &ct).expect("open"), plaintext);
        }
    }

    #[test]
    fn test_ciphertexts_are_randomized() {
        let key = recipient();
        let a = seal(&key.public_key(), b"same").expect("seal");
        let b = seal(&key.public_key(), b"same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let ct = seal(&recipient().public_key(), b"secret").expect("seal");
        assert!(matches!(
            open(&recipient(), &ct),
            Err(EnclaveError::CryptoOperationFailed { .. })
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = recipient();
        let mut ct = seal(&key.public_key(), b"secret").expect("seal");
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(open(&key, &ct).is_err());
    }

    #[test]
    fn test_short_and_malformed_ciphertext() {
        let key = recipient();
        assert!(open(&key, &[0u8; CIPHERTEXT_OVERHEAD - 1]).is_err());
        assert!(open(&key, &[0u8; CIPHERTEXT_OVERHEAD]).is_err());
    }

    #[test]
    fn test_oversized_plaintext_rejected() {
        let key = recipient();
        let big = vec![0u8; MAX_PLAINTEXT_LEN + 1];
        assert!(matches!(
            seal(&key.public_key(), &big),
            Err(EnclaveError::CryptoOperationFailed { .. })
        ));
    }

    #[test]
    fn test_kdf_counter_blocks() {
        let material = derive_key_material(b"z", b"info").expect("derive");
        let first = Sha256::new()
            .chain_update(b"z")
            .chain_update(1u32.to_be_bytes())
            .chain_update(b"info")
            .finalize();
        let second = Sha256::new()
            .chain_update(b"z")
            .chain_update(2u32.to_be_bytes())
            .chain_update(b"info")
            .finalize();
        assert_eq!(&material[..32], first.as_slice());
        assert_eq!(&material[32..], &second[..12]);
    }

    #[test]
    fn test_kdf_rejects_empty_secret() {
        assert!(matches!(
            derive_key_material(b"", b"info"),
            Err(EnclaveError::CryptoOperationFailed { .. })
        ));
    }
}

//! Sign, verify, encrypt and decrypt against an [`Enclave`].
//!
//! [`CryptoOperations`] enforces the digest bounds and maps enclave statuses
//! to [`EnclaveError`]. Hybrid encryption is a runtime capability: use
//! [`CryptoOperations::cipher`] to obtain [`CipherOperations`] when the
//! enclave supports it.
//!
//! # Digest Handling
//!
//! Digests of 1 to [`MAX_DIGEST_LEN`] bytes are accepted. Before signing or
//! verifying, a digest is converted to the 32-byte ECDSA input with SEC1
//! `bits2int`: shorter digests are left-padded with zeros, longer ones are
//! truncated to their leftmost 32 bytes. See [`normalize_digest`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use enclavekey_core::{AccessControlPolicy, KeyLabel, PlatformLevel};
//! use enclavekey_crypto::enclave::{Enclave, SoftEnclave};
//! use enclavekey_crypto::keystore::MemoryKeystore;
//! use enclavekey_crypto::operations::CryptoOperations;
//! use enclavekey_crypto::service::EnclaveKeyService;
//!
//! let enclave: Arc<dyn Enclave> = Arc::new(SoftEnclave::ephemeral(PlatformLevel::new(10, 3)));
//! let service = EnclaveKeyService::new(
//!     Arc::new(MemoryKeystore::new()),
//!     Arc::clone(&enclave),
//!     KeyLabel::new("doc.public").expect("valid label"),
//!     KeyLabel::new("doc.private").expect("valid label"),
//!     AccessControlPolicy::default(),
//! );
//! let (public, private) = service.get_or_create_key_pair().expect("keypair");
//!
//! let ops = CryptoOperations::new(enclave);
//! let digest = [0x42u8; 32];
//! let signature = ops.sign(&digest, &private, "Sign").expect("sign");
//! assert!(ops.verify(&signature, &digest, &public).expect("verify"));
//! ```

use std::sync::Arc;

use enclavekey_core::{CipherSuite, EnclaveError, Status};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::Signature;

use crate::enclave::Enclave;
use crate::handles::{PrivateKeyReference, PublicKeyHandle};
use crate::hybrid;

/// Nominal block size of a 2048-bit RSA key, kept as the digest bound.
pub const BLOCK_SIZE: usize = 256;

/// Largest digest accepted for signing: `BLOCK_SIZE - 11` (PKCS#1 v1.5 padding).
pub const MAX_DIGEST_LEN: usize = BLOCK_SIZE - 11;

/// Length of the ECDSA P-256 signing input.
pub const DIGEST_LEN: usize = 32;

/// Largest DER-encoded P-256 signature.
pub const MAX_SIGNATURE_LEN: usize = 72;

/// Convert a digest to the 32-byte ECDSA input (SEC1 `bits2int`).
///
/// ```rust
/// use enclavekey_crypto::operations::normalize_digest;
///
/// let short = normalize_digest(&[0xAB]);
/// assert_eq!(short[31], 0xAB);
/// assert!(short[..31].iter().all(|b| *b == 0));
///
/// let long = [0x11u8; 64];
/// assert_eq!(normalize_digest(&long), [0x11u8; 32]);
/// ```
#[must_use]
pub fn normalize_digest(digest: &[u8]) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    if digest.len() >= DIGEST_LEN {
        out.copy_from_slice(&digest[..DIGEST_LEN]);
    } else {
        out[DIGEST_LEN - digest.len()..].copy_from_slice(digest);
    }
    out
}

// ============================================================================
// CryptoOperations
// ============================================================================

/// Signing and verification against an enclave.
#[derive(Clone)]
pub struct CryptoOperations {
    enclave: Arc<dyn Enclave>,
}

impl CryptoOperations {
    /// Wrap an enclave.
    #[must_use]
    pub fn new(enclave: Arc<dyn Enclave>) -> Self {
        Self { enclave }
    }

    /// Sign `digest` with the referenced key.
    ///
    /// Returns the DER-encoded signature, at most [`MAX_SIGNATURE_LEN`] bytes.
    /// The enclave may prompt for user presence with `prompt`.
    ///
    /// # Errors
    ///
    /// - [`EnclaveError::InvalidParameters`] for an empty digest, or when the
    ///   enclave rejects the parameters
    /// - [`EnclaveError::DigestTooLarge`] when the digest exceeds
    ///   [`MAX_DIGEST_LEN`]; the enclave is not called
    /// - [`EnclaveError::SigningFailed`] for any other enclave failure
    pub fn sign(
        &self,
        digest: &[u8],
        key: &PrivateKeyReference,
        prompt: &str,
    ) -> Result<Vec<u8>, EnclaveError> {
        if digest.is_empty() {
            return Err(EnclaveError::invalid_parameters("digest is empty"));
        }
        if digest.len() > MAX_DIGEST_LEN {
            return Err(EnclaveError::digest_too_large(digest.len(), MAX_DIGEST_LEN));
        }

        let input = normalize_digest(digest);
        let signature = self
            .enclave
            .sign(key, &input, prompt)
            .map_err(|status| {
                if status == Status::PARAM {
                    EnclaveError::invalid_parameters(format!(
                        "enclave rejected signing parameters: {status}"
                    ))
                } else {
                    EnclaveError::signing_failed(status)
                }
            })?;

        tracing::debug!(
            label = %key.label(),
            digest_len = digest.len(),
            signature_len = signature.len(),
            "Signed digest"
        );

        Ok(signature)
    }

    /// Verify a DER signature over `digest` against `public_key`.
    ///
    /// Returns `Ok(true)` on success and never `Ok(false)`.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::VerificationFailed`] carrying
    /// - [`Status::VERIFY_FAILED`] if the signature does not match
    ///   (see [`EnclaveError::is_signature_mismatch`])
    /// - [`Status::DECODE`] if the signature is not valid DER
    /// - [`Status::PARAM`] if the digest is empty or too large
    pub fn verify(
        &self,
        signature: &[u8],
        digest: &[u8],
        public_key: &PublicKeyHandle,
    ) -> Result<bool, EnclaveError> {
        if digest.is_empty() || digest.len() > MAX_DIGEST_LEN {
            return Err(EnclaveError::verification_failed(Status::PARAM));
        }

        let signature = Signature::from_der(signature)
            .map_err(|_| EnclaveError::verification_failed(Status::DECODE))?;

        public_key
            .verifying_key()
            .verify_prehash(&normalize_digest(digest), &signature)
            .map_err(|_| EnclaveError::verification_failed(Status::VERIFY_FAILED))?;

        Ok(true)
    }

    /// Hybrid encryption, if the enclave supports it.
    #[must_use]
    pub fn cipher(&self) -> Option<CipherOperations> {
        self.enclave
            .capabilities()
            .cipher
            .map(|suite| CipherOperations {
                enclave: Arc::clone(&self.enclave),
                suite,
            })
    }
}

impl std::fmt::Debug for CryptoOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoOperations")
            .field("capabilities", &self.enclave.capabilities())
            .finish()
    }
}

// ============================================================================
// CipherOperations
// ============================================================================

/// Hybrid encryption to an enclave key.
///
/// Only obtainable through [`CryptoOperations::cipher`].
#[derive(Clone)]
pub struct CipherOperations {
    enclave: Arc<dyn Enclave>,
    suite: CipherSuite,
}

impl CipherOperations {
    /// The negotiated cipher suite.
    #[must_use]
    pub const fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Encrypt `plaintext` to `public_key`.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::CryptoOperationFailed`] if the plaintext exceeds
    /// [`hybrid::MAX_PLAINTEXT_LEN`] or encryption fails.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        public_key: &PublicKeyHandle,
    ) -> Result<Vec<u8>, EnclaveError> {
        hybrid::seal(public_key.key(), plaintext)
    }

    /// Decrypt `ciphertext` with the referenced key inside the enclave.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::CryptoOperationFailed`] if the key cannot be used or
    /// the ciphertext does not authenticate.
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &PrivateKeyReference,
        prompt: &str,
    ) -> Result<Vec<u8>, EnclaveError> {
        self.enclave.decrypt(key, ciphertext, prompt)
    }
}

impl std::fmt::Debug for CipherOperations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherOperations")
            .field("suite", &self.suite)
            .finish_non_exhaustive()
    }
}

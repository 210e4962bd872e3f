//! Single entry point for one enclave keypair.
//!
//! [`KeyManager`] combines an [`EnclaveKeyService`] with [`CryptoOperations`].
//! Every call takes the manager's mutex and resolves fresh handles from the
//! keystore, creating the keypair on first use. Nothing is cached between
//! calls.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use enclavekey_core::{AccessControlPolicy, KeyLabel, PlatformLevel};
//! use enclavekey_crypto::enclave::SoftEnclave;
//! use enclavekey_crypto::keystore::MemoryKeystore;
//! use enclavekey_crypto::manager::KeyManager;
//!
//! let manager = KeyManager::new(
//!     Arc::new(MemoryKeystore::new()),
//!     Arc::new(SoftEnclave::ephemeral(PlatformLevel::new(10, 3))),
//!     KeyLabel::new("app.public").expect("valid label"),
//!     KeyLabel::new("app.private").expect("valid label"),
//!     AccessControlPolicy::default(),
//!     "Authenticate to continue",
//! );
//!
//! let digest = [0x24u8; 32];
//! let signature = manager.sign(&digest).expect("sign");
//! assert!(manager.verify(&signature, &digest).expect("verify"));
//!
//! let ciphertext = manager.encrypt(b"hello").expect("encrypt");
//! assert_eq!(manager.decrypt(&ciphertext).expect("decrypt"), b"hello");
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use enclavekey_core::{AccessControlPolicy, Capabilities, EnclaveError, KeyLabel};

use crate::enclave::Enclave;
use crate::handles::PublicKeyHandle;
use crate::keystore::Keystore;
use crate::operations::CryptoOperations;
use crate::pem::encode_public_key_pem;
use crate::service::EnclaveKeyService;

/// Façade over the key service and the crypto operations for one label pair.
pub struct KeyManager {
    service: EnclaveKeyService,
    operations: CryptoOperations,
    prompt: String,
    lock: Mutex<()>,
}

impl KeyManager {
    /// Create a manager.
    ///
    /// No keystore or enclave call is made until the first operation.
    #[must_use]
    pub fn new(
        keystore: Arc<dyn Keystore>,
        enclave: Arc<dyn Enclave>,
        public_label: KeyLabel,
        private_label: KeyLabel,
        policy: AccessControlPolicy,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            service: EnclaveKeyService::new(
                keystore,
                Arc::clone(&enclave),
                public_label,
                private_label,
                policy,
            ),
            operations: CryptoOperations::new(enclave),
            prompt: prompt.into(),
            lock: Mutex::new(()),
        }
    }

    /// The underlying key service.
    #[must_use]
    pub const fn service(&self) -> &EnclaveKeyService {
        &self.service
    }

    /// Prompt shown when the enclave asks for user presence.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The public key, creating the keypair if needed.
    ///
    /// # Errors
    ///
    /// See [`EnclaveKeyService::get_or_create_key_pair`].
    pub fn public_key(&self) -> Result<PublicKeyHandle, EnclaveError> {
        let _guard = self.guard();
        self.service.get_or_create_key_pair().map(|(public, _)| public)
    }

    /// Lowercase hex of the raw public key bytes.
    ///
    /// # Errors
    ///
    /// See [`public_key`](Self::public_key).
    pub fn public_key_hex(&self) -> Result<String, EnclaveError> {
        self.public_key().map(|key| key.hex())
    }

    /// PEM SubjectPublicKeyInfo of the public key.
    ///
    /// # Errors
    ///
    /// See [`public_key`](Self::public_key); also
    /// [`EnclaveError::ValidationFailed`] if the PEM does not validate.
    pub fn public_key_pem(&self) -> Result<String, EnclaveError> {
        let key = self.public_key()?;
        encode_public_key_pem(key.as_bytes())
    }

    /// Sign `digest` with the private key.
    ///
    /// # Errors
    ///
    /// See [`CryptoOperations::sign`].
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, EnclaveError> {
        let _guard = self.guard();
        let (_, private) = self.service.get_or_create_key_pair()?;
        self.operations.sign(digest, &private, &self.prompt)
    }

    /// Verify a DER signature over `digest` against the public key.
    ///
    /// # Errors
    ///
    /// See [`CryptoOperations::verify`].
    pub fn verify(&self, signature: &[u8], digest: &[u8]) -> Result<bool, EnclaveError> {
        let _guard = self.guard();
        let (public, _) = self.service.get_or_create_key_pair()?;
        self.operations.verify(signature, digest, &public)
    }

    /// Encrypt `data` to the public key.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::Unsupported`] below the hybrid encryption level;
    /// otherwise see [`CipherOperations::encrypt`](crate::operations::CipherOperations::encrypt).
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, EnclaveError> {
        let _guard = self.guard();
        let cipher = self
            .operations
            .cipher()
            .ok_or_else(|| EnclaveError::unsupported("encrypt"))?;
        let (public, _) = self.service.get_or_create_key_pair()?;
        cipher.encrypt(data, &public)
    }

    /// Decrypt `data` with the private key.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::Unsupported`] below the hybrid encryption level;
    /// otherwise see [`CipherOperations::decrypt`](crate::operations::CipherOperations::decrypt).
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, EnclaveError> {
        let _guard = self.guard();
        let cipher = self
            .operations
            .cipher()
            .ok_or_else(|| EnclaveError::unsupported("decrypt"))?;
        let (_, private) = self.service.get_or_create_key_pair()?;
        cipher.decrypt(data, &private, &self.prompt)
    }

    /// Delete both halves of the keypair.
    ///
    /// # Errors
    ///
    /// See [`EnclaveKeyService::delete_key_pair`].
    pub fn delete_key_pair(&self) -> Result<(), EnclaveError> {
        let _guard = self.guard();
        self.service.delete_key_pair()
    }

    /// Whether both halves are stored, without creating them.
    ///
    /// # Errors
    ///
    /// Returns keystore failures other than a missing entry.
    pub fn key_pair_exists(&self) -> Result<bool, EnclaveError> {
        let _guard = self.guard();
        self.service.key_pair_exists()
    }

    /// Capabilities of the enclave.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.service.capabilities()
    }

    /// Whether [`encrypt`](Self::encrypt) and [`decrypt`](Self::decrypt) are available.
    #[must_use]
    pub fn supports_encryption(&self) -> bool {
        self.capabilities().supports_encryption()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("service", &self.service)
            .field("prompt", &self.prompt)
            .finish_non_exhaustive()
    }
}

//! Lifecycle of one labeled enclave keypair.
//!
//! [`EnclaveKeyService`] binds a public label, a private label and an
//! access-control policy to a [`Keystore`] and an [`Enclave`]. Keys are
//! created lazily on first access, re-read from the keystore on every call,
//! and removed as a pair.
//!
//! # Lookup-or-create
//!
//! Creation and deletion hold the keystore's [`LifecycleLock`], so services
//! in different processes sharing one keystore agree on a single keypair.
//!
//! ```text
//! find(public) + find(private) ──both present──▶ return
//!        │ NotFound
//!        ▼
//! delete stale halves ─▶ validate policy ─▶ enclave.generate
//!        ─▶ add(private) ─▶ add_overwriting(public) ─▶ find both ─▶ return
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use enclavekey_core::{
    AccessControlPolicy, Capabilities, EnclaveError, KeyClass, KeyLabel, KeystoreError,
};

use crate::enclave::{Enclave, KeyGenerationRequest};
use crate::handles::{PrivateKeyReference, PublicKeyHandle};
use crate::keystore::{ItemQuery, Keystore, LifecycleLock, NewItem};

/// Owner of one named enclave keypair.
pub struct EnclaveKeyService {
    keystore: Arc<dyn Keystore>,
    enclave: Arc<dyn Enclave>,
    public_label: KeyLabel,
    private_label: KeyLabel,
    policy: AccessControlPolicy,
    lock: Mutex<()>,
}

impl EnclaveKeyService {
    /// Create a service for the given label pair.
    #[must_use]
    pub fn new(
        keystore: Arc<dyn Keystore>,
        enclave: Arc<dyn Enclave>,
        public_label: KeyLabel,
        private_label: KeyLabel,
        policy: AccessControlPolicy,
    ) -> Self {
        Self {
            keystore,
            enclave,
            public_label,
            private_label,
            policy,
            lock: Mutex::new(()),
        }
    }

    /// Label of the public entry.
    #[must_use]
    pub const fn public_label(&self) -> &KeyLabel {
        &self.public_label
    }

    /// Label of the private entry.
    #[must_use]
    pub const fn private_label(&self) -> &KeyLabel {
        &self.private_label
    }

    /// Policy attached to newly generated keys.
    #[must_use]
    pub const fn policy(&self) -> AccessControlPolicy {
        self.policy
    }

    /// Capabilities of the underlying enclave.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.enclave.capabilities()
    }

    /// Return the stored keypair, generating one if either half is missing.
    ///
    /// Both handles always come from a keystore read, including right after
    /// generation. The lookup and any generation run under the keystore's
    /// lifecycle lock.
    ///
    /// # Errors
    ///
    /// - [`EnclaveError::AccessControlCreationFailed`] if the policy is invalid
    /// - [`EnclaveError::KeyGenerationFailed`] if the enclave cannot generate
    /// - [`EnclaveError::KeystoreOperationFailed`] for other keystore failures
    pub fn get_or_create_key_pair(
        &self,
    ) -> Result<(PublicKeyHandle, PrivateKeyReference), EnclaveError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _held = self.lifecycle_lock()?;

        match self.lookup_pair() {
            Ok(pair) => return Ok(pair),
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    public_label = %self.public_label,
                    private_label = %self.private_label,
                    "Keypair incomplete, generating"
                );
            }
            Err(e) => return Err(e),
        }

        self.delete_stale()?;
        self.generate()?;
        self.lookup_pair()
    }

    /// Look up the public half.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::NotFound`] if absent, [`EnclaveError::ValidationFailed`]
    /// if the stored bytes are not a P-256 point.
    pub fn public_key(&self) -> Result<PublicKeyHandle, EnclaveError> {
        let query = ItemQuery::new(KeyClass::Public, self.public_label.clone()).returning_data();
        let item = self
            .keystore
            .find(&query)
            .map_err(|e| self.keystore_error(e, &self.public_label))?;

        let data = item
            .data
            .ok_or_else(|| EnclaveError::not_found(self.public_label.as_str()))?;

        tracing::debug!(label = %self.public_label, "Found public key");
        PublicKeyHandle::from_sec1_bytes(&data)
    }

    /// Look up the private half.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::NotFound`] if absent.
    pub fn private_key(&self) -> Result<PrivateKeyReference, EnclaveError> {
        let query =
            ItemQuery::new(KeyClass::Private, self.private_label.clone()).returning_reference();
        let item = self
            .keystore
            .find(&query)
            .map_err(|e| self.keystore_error(e, &self.private_label))?;

        let reference = item
            .reference
            .ok_or_else(|| EnclaveError::not_found(self.private_label.as_str()))?;

        tracing::debug!(label = %self.private_label, "Found private key reference");
        PrivateKeyReference::from_item_reference(reference)
    }

    /// Store `bytes` under the public label, replacing any existing entry.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::KeystoreOperationFailed`] if the insert fails.
    pub fn force_save_public_key(&self, bytes: &[u8]) -> Result<(), EnclaveError> {
        let item = NewItem::public(
            self.public_label.clone(),
            self.enclave.capabilities().curve,
            bytes.to_vec(),
        );
        self.keystore
            .add_overwriting(&item)
            .map_err(|e| EnclaveError::keystore_failed(e.status()))
    }

    /// Delete the public entry, then the private entry.
    ///
    /// Both deletions are attempted; the first failure is reported.
    ///
    /// # Errors
    ///
    /// [`EnclaveError::KeystoreOperationFailed`] carrying the status of the
    /// first failed deletion, `ITEM_NOT_FOUND` when a half was absent.
    pub fn delete_key_pair(&self) -> Result<(), EnclaveError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _held = self.lifecycle_lock()?;

        let public = self
            .keystore
            .delete(&ItemQuery::new(KeyClass::Public, self.public_label.clone()));
        let private = self
            .keystore
            .delete(&ItemQuery::new(KeyClass::Private, self.private_label.clone()));

        match (public, private) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    public_label = %self.public_label,
                    private_label = %self.private_label,
                    "Deleted keypair"
                );
                Ok(())
            }
            (Err(e), _) | (Ok(()), Err(e)) => {
                tracing::debug!(error = %e, "Keypair deletion incomplete");
                Err(EnclaveError::keystore_failed(e.status()))
            }
        }
    }

    /// Whether both halves are present.
    ///
    /// # Errors
    ///
    /// Returns keystore failures other than a missing entry.
    pub fn key_pair_exists(&self) -> Result<bool, EnclaveError> {
        match self.lookup_pair() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn lookup_pair(&self) -> Result<(PublicKeyHandle, PrivateKeyReference), EnclaveError> {
        let public = self.public_key()?;
        let private = self.private_key()?;
        Ok((public, private))
    }

    fn lifecycle_lock(&self) -> Result<LifecycleLock<'_>, EnclaveError> {
        self.keystore
            .lifecycle_lock()
            .map_err(|e| EnclaveError::keystore_failed(e.status()))
    }

    fn delete_stale(&self) -> Result<(), EnclaveError> {
        let stale = [
            ItemQuery::new(KeyClass::Public, self.public_label.clone()),
            ItemQuery::new(KeyClass::Private, self.private_label.clone()),
        ];
        for query in &stale {
            match self.keystore.delete(query) {
                Ok(()) => {
                    tracing::debug!(class = %query.class, label = %query.label, "Removed stale key half");
                }
                Err(KeystoreError::NotFound) => {}
                Err(e) => return Err(EnclaveError::keystore_failed(e.status())),
            }
        }
        Ok(())
    }

    fn generate(&self) -> Result<(), EnclaveError> {
        self.policy.validate()?;

        let curve = self.enclave.capabilities().curve;
        let request = KeyGenerationRequest::new(self.private_label.clone(), curve, self.policy);
        let pair = self
            .enclave
            .generate(&request)
            .map_err(EnclaveError::key_generation_failed)?;

        self.keystore
            .add(&NewItem::private(
                self.private_label.clone(),
                curve,
                self.policy,
                pair.sealed_private_key,
            ))
            .map_err(|e| EnclaveError::keystore_failed(e.status()))?;

        self.keystore
            .add_overwriting(&NewItem::public(
                self.public_label.clone(),
                curve,
                pair.public_key,
            ))
            .map_err(|e| EnclaveError::keystore_failed(e.status()))?;

        tracing::info!(
            public_label = %self.public_label,
            private_label = %self.private_label,
            curve = %curve,
            "Generated keypair"
        );
        Ok(())
    }

    fn keystore_error(&self, error: KeystoreError, label: &KeyLabel) -> EnclaveError {
        match error {
            KeystoreError::NotFound => EnclaveError::not_found(label.as_str()),
            other => {
                tracing::debug!(label = %label, error = %other, "Keystore lookup failed");
                EnclaveError::keystore_failed(other.status())
            }
        }
    }
}

impl std::fmt::Debug for EnclaveKeyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveKeyService")
            .field("public_label", &self.public_label)
            .field("private_label", &self.private_label)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

//! # enclavekey-crypto
//!
//! Enclave-backed key lifecycle and cryptographic operations for `enclavekey`.
//!
//! ## Internal Crate Warning
//!
//! **This crate is an internal implementation detail of `enclavekey`.** The API
//! is unstable and may change between any versions.
//!
//! ## Modules
//!
//! - [`keys`] - Zeroizing secret key container
//! - [`sealing`] - Wrapping private scalars under the device secret
//! - [`keystore`] - The [`Keystore`] trait with memory and file backends
//! - [`enclave`] - The [`Enclave`] trait and [`SoftEnclave`]
//! - [`handles`] - [`PublicKeyHandle`] and the opaque [`PrivateKeyReference`]
//! - [`service`] - Lookup-or-create lifecycle of one labeled keypair
//! - [`operations`] - Sign, verify, encrypt and decrypt with size checks
//! - [`hybrid`] - ECDH P-256 / X9.63 KDF / ChaCha20-Poly1305 encryption
//! - [`manager`] - The [`KeyManager`] façade
//! - [`pem`] - PEM SubjectPublicKeyInfo encoding
//!
//! ## Security
//!
//! - No unsafe code allowed
//! - Private scalars exist only inside the enclave, sealed or for the
//!   duration of one operation, and are zeroized on drop
//! - Private key references cannot be cloned and expose no key bytes

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod enclave;
pub mod handles;
pub mod hybrid;
pub mod keys;
pub mod keystore;
pub mod manager;
pub mod operations;
pub mod pem;
pub mod sealing;
pub mod service;

pub use crate::enclave::{
    load_or_create_device_secret, AlwaysPresent, Enclave, GeneratedKeyPair, KeyGenerationRequest,
    NeverPresent, PresenceVerifier, SoftEnclave,
};
pub use crate::handles::{PrivateKeyReference, PublicKeyHandle, PUBLIC_KEY_LEN};
pub use crate::keys::{SecretKey, SecretKeyError, SECRET_KEY_LEN};
pub use crate::keystore::{
    FileKeystore, ItemQuery, ItemReference, Keystore, KeystoreItem, LifecycleLock, MemoryKeystore,
    NewItem, ReturnFields,
};
pub use crate::manager::KeyManager;
pub use crate::operations::{CipherOperations, CryptoOperations, MAX_DIGEST_LEN};
pub use crate::pem::{
    decode_public_key_pem, encode_public_key_pem, encode_public_key_pem_hex,
    validate_public_key_pem,
};
pub use crate::service::EnclaveKeyService;

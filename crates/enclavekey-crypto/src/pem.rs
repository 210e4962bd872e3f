//! PEM SubjectPublicKeyInfo encoding for P-256 public keys.
//!
//! Raw exported key bytes are wrapped, using the `spki` and `der` types that
//! `p256::pkcs8` re-exports, as
//!
//! ```text
//! SEQUENCE {
//!   SEQUENCE {
//!     OBJECT IDENTIFIER 1.2.840.10045.2.1    -- ecPublicKey
//!     OBJECT IDENTIFIER 1.2.840.10045.3.1.7  -- prime256v1
//!   }
//!   BIT STRING (0 unused bits) <raw key bytes>
//! }
//! ```
//!
//! DER-encoded, base64-wrapped at 64 columns with LF line endings, between
//! `-----BEGIN PUBLIC KEY-----` and `-----END PUBLIC KEY-----`.
//!
//! # Example
//!
//! ```rust
//! use enclavekey_crypto::pem::{decode_public_key_pem, encode_public_key_pem};
//! use p256::elliptic_curve::sec1::ToEncodedPoint;
//!
//! let secret = p256::SecretKey::random(&mut rand::rngs::OsRng);
//! let raw = secret.public_key().to_encoded_point(false).as_bytes().to_vec();
//!
//! let pem = encode_public_key_pem(&raw).expect("valid key");
//! assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
//! assert_eq!(decode_public_key_pem(&pem).expect("decodes"), raw);
//! ```

use ::pem::{EncodeConfig, LineEnding, Pem};
use enclavekey_core::EnclaveError;
use p256::pkcs8::der::asn1::{AnyRef, BitStringRef, ObjectIdentifier};
use p256::pkcs8::der::Encode;
use p256::pkcs8::spki::{AlgorithmIdentifier, SubjectPublicKeyInfoRef};
use p256::pkcs8::DecodePublicKey;

/// PEM label of a SubjectPublicKeyInfo block.
pub const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

/// Base64 line width.
pub const LINE_WRAP: usize = 64;

/// `id-ecPublicKey`.
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// `prime256v1`, the named-curve parameter.
const PRIME256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

// ============================================================================
// Public API
// ============================================================================

/// Encode raw public key bytes as a PEM SubjectPublicKeyInfo.
///
/// The result is checked to parse as a P-256 public key before it is
/// returned.
///
/// # Errors
///
/// Returns [`EnclaveError::ValidationFailed`] if the bytes are not a valid
/// P-256 point.
pub fn encode_public_key_pem(bytes: &[u8]) -> Result<String, EnclaveError> {
    let pem = armor(bytes)?;
    validate_public_key_pem(&pem)?;
    Ok(pem)
}

/// Encode hex-encoded public key bytes. Spaces are stripped first.
///
/// # Errors
///
/// Returns [`EnclaveError::ValidationFailed`] if the input is not valid hex
/// (including odd length) or does not encode a P-256 point.
///
/// ```rust
/// use enclavekey_crypto::pem::encode_public_key_pem_hex;
///
/// assert!(encode_public_key_pem_hex("04 ab").is_err());
/// assert!(encode_public_key_pem_hex("zz").is_err());
/// ```
pub fn encode_public_key_pem_hex(hex_bytes: &str) -> Result<String, EnclaveError> {
    let compact: String = hex_bytes.chars().filter(|c| *c != ' ').collect();
    let bytes = hex::decode(&compact)
        .map_err(|e| EnclaveError::validation_failed(format!("invalid hex key bytes: {e}")))?;
    encode_public_key_pem(&bytes)
}

/// Extract the raw key bytes from a PEM SubjectPublicKeyInfo.
///
/// # Errors
///
/// Returns [`EnclaveError::ValidationFailed`] if the input is not a
/// `PUBLIC KEY` PEM block holding an EC P-256 SubjectPublicKeyInfo.
pub fn decode_public_key_pem(pem: &str) -> Result<Vec<u8>, EnclaveError> {
    let block = ::pem::parse(pem)
        .map_err(|e| EnclaveError::validation_failed(format!("invalid PEM: {e}")))?;

    if block.tag() != PUBLIC_KEY_TAG {
        return Err(EnclaveError::validation_failed(format!(
            "unexpected PEM label '{}'",
            block.tag()
        )));
    }

    subject_public_key(block.contents())
        .map(<[u8]>::to_vec)
        .map_err(|e| EnclaveError::validation_failed(format!("malformed SubjectPublicKeyInfo: {e}")))
}

/// Check that a PEM block parses as an EC P-256 public key.
///
/// # Errors
///
/// Returns [`EnclaveError::ValidationFailed`] otherwise.
pub fn validate_public_key_pem(pem: &str) -> Result<(), EnclaveError> {
    p256::PublicKey::from_public_key_pem(pem)
        .map(|_| ())
        .map_err(|e| EnclaveError::validation_failed(format!("invalid EC public key: {e}")))
}

// ============================================================================
// DER
// ============================================================================

/// Wrap raw key bytes as PEM without checking that they form a point.
fn armor(bytes: &[u8]) -> Result<String, EnclaveError> {
    let der = spki_der(bytes)
        .map_err(|e| EnclaveError::validation_failed(format!("cannot encode key: {e}")))?;
    let block = Pem::new(PUBLIC_KEY_TAG, der);
    Ok(::pem::encode_config(
        &block,
        EncodeConfig::new()
            .set_line_ending(LineEnding::LF)
            .set_line_wrap(LINE_WRAP),
    ))
}

fn spki_der(key: &[u8]) -> p256::pkcs8::spki::Result<Vec<u8>> {
    let info = SubjectPublicKeyInfoRef {
        algorithm: AlgorithmIdentifier {
            oid: EC_PUBLIC_KEY,
            parameters: Some(AnyRef::from(&PRIME256V1)),
        },
        subject_public_key: BitStringRef::from_bytes(key)?,
    };
    Ok(info.to_der()?)
}

/// The key bytes of an EC P-256 SubjectPublicKeyInfo. Trailing data and a
/// bit string with unused bits are rejected.
fn subject_public_key(der: &[u8]) -> p256::pkcs8::spki::Result<&[u8]> {
    let info = SubjectPublicKeyInfoRef::try_from(der)?;
    info.algorithm.assert_oids(EC_PUBLIC_KEY, PRIME256V1)?;
    info.subject_public_key
        .as_bytes()
        .ok_or(p256::pkcs8::spki::Error::KeyMalformed)
}

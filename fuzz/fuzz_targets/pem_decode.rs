//! Fuzz target for PEM public key decoding.
//!
//! Arbitrary text must never panic the decoder, and anything it accepts
//! must re-encode to a PEM that decodes to the same bytes.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run pem_decode
//! ```

#![no_main]

use enclavekey_crypto::{decode_public_key_pem, encode_public_key_pem, validate_public_key_pem};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = validate_public_key_pem(text);

    if let Ok(bytes) = decode_public_key_pem(text) {
        if let Ok(pem) = encode_public_key_pem(&bytes) {
            assert_eq!(decode_public_key_pem(&pem).ok(), Some(bytes));
        }
    }
});

//! Hybrid encryption through the command handlers.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use enclavekey::cli::commands::{CommandError, DecryptCommand, EncryptCommand, SignCommand};
use enclavekey_core::EnclaveError;

use crate::common::{unattended_dir, write_config};

#[test]
fn test_encrypt_decrypt_round_trip() {
    let temp = unattended_dir();

    let ciphertext = EncryptCommand::new("hello enclave", false)
        .execute(temp.path())
        .expect("encrypt");
    let plaintext = DecryptCommand::new(&ciphertext, false)
        .execute(temp.path())
        .expect("decrypt");
    assert_eq!(plaintext, "hello enclave");

    // Accepts a 0x prefix and surrounding whitespace.
    let plaintext = DecryptCommand::new(format!(" 0x{ciphertext}\n"), false)
        .execute(temp.path())
        .expect("decrypt");
    assert_eq!(plaintext, "hello enclave");
}

#[test]
fn test_ciphertexts_are_randomized() {
    let temp = unattended_dir();

    let a = EncryptCommand::new("same", false).execute(temp.path()).unwrap();
    let b = EncryptCommand::new("same", false).execute(temp.path()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_cipher_commands_gated_by_platform_level() {
    let temp = unattended_dir();
    let legacy = write_config(
        temp.path(),
        "legacy.toml",
        "[enclave]\nplatform_level = \"9.3\"\n[access]\nuser_presence = false\n",
    );

    for result in [
        EncryptCommand::new("x", false)
            .with_config(Some(legacy.clone()))
            .execute(temp.path()),
        DecryptCommand::new("00", false)
            .with_config(Some(legacy.clone()))
            .execute(temp.path()),
    ] {
        assert!(matches!(
            result,
            Err(CommandError::Enclave(EnclaveError::Unsupported { .. }))
        ));
    }

    // Signing still works with the legacy curve identifier.
    assert!(SignCommand::new("x", false)
        .with_config(Some(legacy))
        .execute(temp.path())
        .is_ok());
}

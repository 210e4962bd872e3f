//! Key lifecycle through the command handlers.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::sync::{Arc, Barrier};
use std::thread;

use enclavekey::cli::commands::{
    CommandError, DeleteCommand, InitCommand, PemCommand, PublicKeyCommand, SignCommand,
    StatusCommand, VerifyCommand, EXIT_ERROR, EXIT_INVALID,
};
use enclavekey::cli::KeyFormat;
use enclavekey_core::{EnclaveError, Status};
use enclavekey_crypto::{decode_public_key_pem, validate_public_key_pem};

use crate::common::{unattended_dir, write_config};

#[test]
fn test_init_then_sign_and_verify() {
    let temp = tempfile::TempDir::new().expect("temp dir");
    InitCommand::new(false)
        .execute(temp.path())
        .expect("init");
    let config = write_config(
        temp.path(),
        "unattended.toml",
        "[access]\nuser_presence = false\n",
    );

    let signature = SignCommand::new("deadbeef", true)
        .with_config(Some(config.clone()))
        .execute(temp.path())
        .expect("sign");
    let verdict = VerifyCommand::new(&signature, "deadbeef", true)
        .with_config(Some(config.clone()))
        .execute(temp.path())
        .expect("verify");
    assert_eq!(verdict, "valid");

    let status = StatusCommand::new()
        .with_config(Some(config))
        .execute(temp.path())
        .expect("status");
    assert!(status.contains("Keypair:         present"));
}

#[test]
fn test_public_key_is_created_once() {
    let temp = unattended_dir();

    let hex_key = PublicKeyCommand::new(KeyFormat::Hex)
        .execute(temp.path())
        .expect("hex");
    let pem = PublicKeyCommand::new(KeyFormat::Pem)
        .execute(temp.path())
        .expect("pem");

    assert!(validate_public_key_pem(&pem).is_ok());
    assert_eq!(hex::encode(decode_public_key_pem(&pem).unwrap()), hex_key);

    // The standalone encoder agrees with the manager.
    let standalone = PemCommand::new(vec![hex_key], None)
        .execute()
        .expect("pem command");
    assert_eq!(standalone, pem);
}

#[test]
fn test_signatures_do_not_survive_key_deletion() {
    let temp = unattended_dir();

    let signature = SignCommand::new("message", false)
        .execute(temp.path())
        .expect("sign");
    DeleteCommand::new(true)
        .run_with_base_dir(temp.path())
        .expect("delete");

    // A new keypair is generated on demand; the old signature no longer verifies.
    let err = VerifyCommand::new(signature, "message", false)
        .execute(temp.path())
        .expect_err("old signature");
    assert_eq!(err.exit_code(), EXIT_INVALID);
}

#[test]
fn test_delete_twice_reports_item_not_found() {
    let temp = unattended_dir();
    PublicKeyCommand::default()
        .execute(temp.path())
        .expect("public key");

    DeleteCommand::new(true)
        .run_with_base_dir(temp.path())
        .expect("first delete");
    let err = DeleteCommand::new(true)
        .run_with_base_dir(temp.path())
        .expect_err("second delete");

    match err {
        CommandError::Enclave(EnclaveError::KeystoreOperationFailed { status }) => {
            assert_eq!(status, Status::ITEM_NOT_FOUND);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_base_dirs_hold_independent_keys() {
    let first = unattended_dir();
    let second = unattended_dir();

    let a = PublicKeyCommand::default().execute(first.path()).unwrap();
    let b = PublicKeyCommand::default().execute(second.path()).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_parallel_first_use_of_one_base_dir_yields_one_keypair() {
    let temp = unattended_dir();
    let base = temp.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(6));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let base = base.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                PublicKeyCommand::new(KeyFormat::Hex)
                    .execute(&base)
                    .expect("public key")
            })
        })
        .collect();

    let keys: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(keys.windows(2).all(|w| w[0] == w[1]));

    let signature = SignCommand::new("cafe", true).execute(&base).expect("sign");
    assert_eq!(
        VerifyCommand::new(&signature, "cafe", true)
            .execute(&base)
            .expect("verify"),
        "valid"
    );
    assert_eq!(
        PublicKeyCommand::new(KeyFormat::Hex)
            .execute(&base)
            .expect("public key"),
        keys[0]
    );
}

#[test]
fn test_invalid_config_is_an_error() {
    let temp = unattended_dir();
    let config = write_config(
        temp.path(),
        "broken.toml",
        "[enclave]\nplatform_level = \"latest\"\n",
    );

    let err = StatusCommand::new()
        .with_config(Some(config))
        .execute(temp.path())
        .expect_err("invalid platform level");
    assert!(matches!(err, CommandError::Runtime(_)));
    assert_eq!(err.exit_code(), EXIT_ERROR);
    assert!(err.lookup_url().is_none());
}

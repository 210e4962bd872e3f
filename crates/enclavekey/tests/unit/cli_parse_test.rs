//! Argument parsing and dispatch shapes.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::path::PathBuf;

use clap::Parser;
use enclavekey::cli::commands::{CommandError, PemCommand, ARGUMENT_COUNT_MESSAGE, EXIT_ERROR};
use enclavekey::cli::{Cli, Commands, KeyFormat};

#[test]
fn test_cli_command_dispatch() {
    let cli = Cli::try_parse_from(["enclavekey", "init"]).expect("should parse");
    assert!(matches!(cli.command, Commands::Init { force: false }));

    let cli = Cli::try_parse_from(["enclavekey", "init", "--force"]).expect("should parse");
    assert!(matches!(cli.command, Commands::Init { force: true }));

    let cli = Cli::try_parse_from(["enclavekey", "delete", "-f"]).expect("should parse");
    assert!(matches!(cli.command, Commands::Delete { force: true }));

    let cli = Cli::try_parse_from(["enclavekey", "public-key", "-f", "pem"]).expect("should parse");
    assert!(matches!(
        cli.command,
        Commands::PublicKey {
            format: KeyFormat::Pem
        }
    ));
}

#[test]
fn test_sign_and_encrypt_arguments() {
    let cli = Cli::try_parse_from(["enclavekey", "sign", "hello world"]).expect("should parse");
    match cli.command {
        Commands::Sign { data, hex } => {
            assert_eq!(data, "hello world");
            assert!(!hex);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    let cli = Cli::try_parse_from(["enclavekey", "decrypt", "abcd", "--hex"]).expect("should parse");
    assert!(matches!(cli.command, Commands::Decrypt { hex: true, .. }));

    assert!(Cli::try_parse_from(["enclavekey", "sign"]).is_err());
}

#[test]
fn test_pem_output_flag() {
    let cli = Cli::try_parse_from(["enclavekey", "pem", "04ab", "-o", "key.pem"])
        .expect("should parse");
    match cli.command {
        Commands::Pem { args, output } => {
            assert_eq!(args, vec!["04ab".to_string()]);
            assert_eq!(output, Some(PathBuf::from("key.pem")));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_pem_argument_count_message() {
    let err = PemCommand::new(vec!["04".into(), "ab".into()], None)
        .execute()
        .expect_err("two arguments");
    assert!(matches!(err, CommandError::Usage(_)));
    assert_eq!(err.to_string(), ARGUMENT_COUNT_MESSAGE);
    assert_eq!(err.exit_code(), EXIT_ERROR);
}

//! # `enclavekey`
//!
//! Enclave-backed P-256 keypair manager.
//!
//! ## Usage
//!
//! ```bash
//! # Write ~/.enclavekey/config.toml
//! enclavekey init
//!
//! # Print the public key (creates the keypair on first use)
//! enclavekey public-key --format pem
//!
//! # Sign and verify
//! enclavekey sign "hello"
//! enclavekey verify 3045... "hello"
//!
//! # Encrypt to the key and decrypt with it
//! enclavekey decrypt "$(enclavekey encrypt secret)"
//!
//! # Wrap raw key bytes as PEM
//! enclavekey pem "04 6b17d1f2 ..."
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use clap::Parser;
use enclavekey::cli::commands::{
    CommandError, DecryptCommand, DeleteCommand, EncryptCommand, InitCommand, PemCommand,
    PublicKeyCommand, SignCommand, StatusCommand, VerifyCommand, EXIT_ERROR,
};
use enclavekey::cli::{Cli, Commands};
use enclavekey::logging::{init_logging, verbosity_to_level, LogConfig, LogError, LogFormat, LogGuard};

/// Set up logging based on verbosity level.
///
/// # Errors
///
/// Returns [`LogError`] if logging initialization fails.
fn setup_logging(verbose: u8) -> Result<LogGuard, LogError> {
    let config = LogConfig {
        level: verbosity_to_level(verbose),
        format: LogFormat::Pretty,
        file_path: None,
    };
    init_logging(&config)
}

fn main() {
    let cli = Cli::parse();

    let _guard = match setup_logging(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            std::process::exit(EXIT_ERROR);
        }
    };

    if let Err(e) = dispatch(cli) {
        if matches!(e, CommandError::Usage(_)) {
            eprintln!("{e}");
        } else {
            eprintln!("Error: {e}");
        }
        if let Some(url) = e.lookup_url() {
            eprintln!("See: {url}");
        }
        std::process::exit(e.exit_code());
    }
}

/// Run the selected command.
fn dispatch(cli: Cli) -> Result<(), CommandError> {
    let config = cli.config;

    match cli.command {
        Commands::Init { force } => InitCommand::new(force).run(),
        Commands::Status => StatusCommand::new().with_config(config).run(),
        Commands::PublicKey { format } => PublicKeyCommand::new(format).with_config(config).run(),
        Commands::Sign { data, hex } => SignCommand::new(data, hex).with_config(config).run(),
        Commands::Verify {
            signature,
            data,
            hex,
        } => VerifyCommand::new(signature, data, hex)
            .with_config(config)
            .run(),
        Commands::Encrypt { data, hex } => EncryptCommand::new(data, hex).with_config(config).run(),
        Commands::Decrypt { ciphertext, hex } => DecryptCommand::new(ciphertext, hex)
            .with_config(config)
            .run(),
        Commands::Delete { force } => DeleteCommand::new(force).with_config(config).run(),
        Commands::Pem { args, output } => PemCommand::new(args, output).run(),
    }
}

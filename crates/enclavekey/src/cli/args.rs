//! # CLI Argument Definitions
//!
//! - `enclavekey init [--force]` - Write the default configuration
//! - `enclavekey status` - Show labels, capabilities and key presence
//! - `enclavekey public-key [--format hex|pem]` - Print the public key
//! - `enclavekey sign <DATA> [--hex]` - Sign data with the enclave key
//! - `enclavekey verify <SIGNATURE_HEX> <DATA> [--hex]` - Verify a signature
//! - `enclavekey encrypt <DATA> [--hex]` - Encrypt to the enclave key
//! - `enclavekey decrypt <CIPHERTEXT_HEX> [--hex]` - Decrypt with the enclave key
//! - `enclavekey delete [--force]` - Delete the keypair
//! - `enclavekey pem <HEX> [--output PATH]` - Encode raw key bytes as PEM
//!
//! ## Global Options
//!
//! - `-v, --verbose` - Increase verbosity level
//! - `-c, --config <PATH>` - Path to configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Enclave-backed P-256 keypair manager.
#[derive(Debug, Parser)]
#[command(name = "enclavekey")]
#[command(author, version, about = "Enclave-backed P-256 keypair manager")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file
    ///
    /// Defaults to `~/.enclavekey/config.toml`.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write the default configuration to ~/.enclavekey
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show labels, enclave capabilities and whether a keypair exists
    Status,

    /// Print the public key, creating the keypair if needed
    PublicKey {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = KeyFormat::Hex)]
        format: KeyFormat,
    },

    /// Sign data with the enclave private key
    ///
    /// The data is signed as given: UTF-8 text by default, or hex-decoded
    /// bytes with --hex. At most 245 bytes are accepted.
    Sign {
        /// Data to sign
        data: String,

        /// Treat DATA as hex
        #[arg(long)]
        hex: bool,
    },

    /// Verify a signature against the enclave public key
    ///
    /// Prints `valid` on success. Exits 1 if the signature does not match.
    Verify {
        /// DER signature as hex
        signature: String,

        /// Signed data
        data: String,

        /// Treat DATA as hex
        #[arg(long)]
        hex: bool,
    },

    /// Encrypt data to the enclave public key
    Encrypt {
        /// Data to encrypt
        data: String,

        /// Treat DATA as hex
        #[arg(long)]
        hex: bool,
    },

    /// Decrypt a ciphertext with the enclave private key
    Decrypt {
        /// Ciphertext as hex
        ciphertext: String,

        /// Print the plaintext as hex instead of UTF-8
        #[arg(long)]
        hex: bool,
    },

    /// Delete both halves of the keypair
    Delete {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Encode hex public key bytes as a PEM SubjectPublicKeyInfo
    ///
    /// Takes exactly one argument; spaces inside it are ignored.
    Pem {
        /// Hex-encoded public key bytes
        #[arg(num_args = 0.., value_name = "HEX")]
        args: Vec<String>,

        /// Write the PEM to this file instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Public key output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum KeyFormat {
    /// Lowercase hex of the raw key bytes
    #[default]
    Hex,
    /// PEM SubjectPublicKeyInfo
    Pem,
}

//! # CLI Module
//!
//! Command-line interface for `enclavekey`.
//!
//! - [`args`] - Argument parsing and CLI structure definitions
//! - [`commands`] - Command handler implementations
//!
//! ```no_run
//! use clap::Parser;
//! use enclavekey::cli::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Pem { args, .. } = cli.command {
//!     println!("{} argument(s)", args.len());
//! }
//! ```

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, KeyFormat};

//! # Enclavekey Library
//!
//! Command-line front end for an enclave-backed P-256 keypair.
//!
//! The binary is a thin dispatcher over this library, which exposes the
//! argument definitions, the command handlers, and the wiring from a
//! configuration file to a [`KeyManager`](enclavekey_crypto::KeyManager).
//!
//! ## Modules
//!
//! - [`cli`] - Argument parsing and command handlers
//! - [`logging`] - `tracing` subscriber setup and security events
//! - [`presence`] - Terminal-backed user presence confirmation
//! - [`runtime`] - Configuration to key manager wiring
//!
//! ## Usage
//!
//! ```no_run
//! use enclavekey::runtime::Runtime;
//! use enclavekey_core::config_loader::default_base_dir;
//!
//! let runtime = Runtime::open(&default_base_dir()?, None)?;
//! let manager = runtime.key_manager()?;
//! println!("{}", manager.public_key_hex()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod logging;
pub mod presence;
pub mod runtime;

pub use logging::{
    init_logging, log_security_event, redact_sensitive, verbosity_to_level, LogConfig, LogError,
    LogFormat, LogGuard, LogLevel,
};
pub use presence::{TerminalPresence, PRESENCE_ENV_VAR};
pub use runtime::{Runtime, RuntimeError};

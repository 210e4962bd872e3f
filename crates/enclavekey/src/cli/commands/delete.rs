//! # Delete Command
//!
//! `enclavekey delete` removes both halves of the keypair. Without `--force`
//! it asks for confirmation on the terminal and refuses to run when stdin is
//! not a terminal. The next command that needs a key generates a new one.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use super::{base_dir, CommandError};
use crate::logging::log_security_event;
use crate::presence::is_affirmative;
use crate::runtime::Runtime;

/// The `enclavekey delete` command handler.
#[derive(Debug, Clone)]
pub struct DeleteCommand {
    /// Skip the confirmation prompt.
    pub force: bool,
    config: Option<PathBuf>,
}

impl DeleteCommand {
    /// Create a new `DeleteCommand`.
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self {
            force,
            config: None,
        }
    }

    /// Read configuration from `path` instead of `<base_dir>/config.toml`.
    #[must_use]
    pub fn with_config(mut self, path: Option<PathBuf>) -> Self {
        self.config = path;
        self
    }

    /// Delete the keypair in `~/.enclavekey`.
    ///
    /// # Errors
    ///
    /// See [`run_with_base_dir`](Self::run_with_base_dir).
    pub fn run(&self) -> Result<(), CommandError> {
        self.run_with_base_dir(&base_dir()?)
    }

    /// Delete the keypair in `base_dir`.
    ///
    /// # Errors
    ///
    /// - [`CommandError::NotTerminal`] if confirmation is needed but stdin is
    ///   not a terminal
    /// - [`CommandError::Cancelled`] if the user declines
    /// - [`CommandError::Enclave`] if either deletion fails; a keypair that
    ///   was never created reports `ITEM_NOT_FOUND`
    pub fn run_with_base_dir(&self, base_dir: &Path) -> Result<(), CommandError> {
        let runtime = Runtime::open(base_dir, self.config.as_deref())?;
        let manager = runtime.key_manager()?;
        let label = manager.service().private_label().to_string();

        if !self.force {
            confirm(&label, io::stdin().is_terminal(), || ask(&label))?;
        }

        manager.delete_key_pair()?;
        log_security_event("key_deleted", &format!("label={label}"));
        println!("Deleted keypair {label}");
        Ok(())
    }
}

fn confirm(
    label: &str,
    interactive: bool,
    ask: impl FnOnce() -> io::Result<String>,
) -> Result<(), CommandError> {
    if !interactive {
        return Err(CommandError::NotTerminal);
    }
    if is_affirmative(&ask()?) {
        Ok(())
    } else {
        tracing::debug!(label, "Deletion declined");
        Err(CommandError::Cancelled)
    }
}

fn ask(label: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "Delete keypair '{label}'? This cannot be undone. [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

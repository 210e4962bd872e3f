//! User presence confirmation for the command line.
//!
//! [`TerminalPresence`] decides in this order:
//!
//! 1. `ENCLAVEKEY_USER_PRESENT` is set: `1` confirms, anything else declines.
//! 2. stdin is a terminal: ask `"<prompt> [y/N]"` on stderr.
//! 3. Otherwise fail with `INTERACTION_NOT_ALLOWED`.

use std::io::{self, BufRead, IsTerminal, Write};

use enclavekey_core::Status;
use enclavekey_crypto::PresenceVerifier;

/// Environment variable for non-interactive confirmation.
pub const PRESENCE_ENV_VAR: &str = "ENCLAVEKEY_USER_PRESENT";

/// Presence verifier backed by the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPresence;

impl PresenceVerifier for TerminalPresence {
    fn verify_presence(&self, prompt: &str) -> Result<(), Status> {
        let env_value = std::env::var(PRESENCE_ENV_VAR).ok();
        decide(env_value.as_deref(), io::stdin().is_terminal(), || {
            ask(prompt)
        })
    }
}

fn decide(
    env_value: Option<&str>,
    interactive: bool,
    ask: impl FnOnce() -> io::Result<String>,
) -> Result<(), Status> {
    if let Some(value) = env_value {
        return if value.trim() == "1" {
            Ok(())
        } else {
            Err(Status::USER_CANCELED)
        };
    }

    if !interactive {
        tracing::debug!("No terminal for presence confirmation");
        return Err(Status::INTERACTION_NOT_ALLOWED);
    }

    let answer = ask().map_err(|_| Status::IO)?;
    if is_affirmative(&answer) {
        Ok(())
    } else {
        Err(Status::USER_CANCELED)
    }
}

fn ask(prompt: &str) -> io::Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

/// Whether a typed answer means yes.
pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

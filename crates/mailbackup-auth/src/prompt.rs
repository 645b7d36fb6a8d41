//! Interactive prompts for missing credentials

use crate::{AuthError, AuthResult};
use std::io::{self, BufRead, Write};

/// Asks the user for a value
pub trait Prompter {
    fn prompt(&self, label: &str) -> AuthResult<String>;

    /// Like [`Prompter::prompt`] but without echoing the input
    fn prompt_secret(&self, label: &str) -> AuthResult<String>;
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt(&self, label: &str) -> AuthResult<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{}: ", label)?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(AuthError::PromptFailed(format!(
                "end of input while reading {}",
                label
            )));
        }
        Ok(line.trim().to_string())
    }

    fn prompt_secret(&self, label: &str) -> AuthResult<String> {
        rpassword::prompt_password(format!("{}: ", label))
            .map_err(|e| AuthError::PromptFailed(e.to_string()))
    }
}

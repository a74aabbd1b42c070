//! Interactive prompts
//!
//! Every prompt fails with a configuration error when stdin or stdout is not
//! a terminal, naming the flag that would have supplied the answer.

use dialoguer::{Confirm, Input, Password, Select};
use eag_core::{Error, Result};
use std::io::IsTerminal;

/// Whether both stdin and stdout are connected to a terminal
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

fn require_terminal(flag: &str) -> Result<()> {
    if is_interactive() {
        Ok(())
    } else {
        Err(Error::config(format!(
            "{} is required when not running in a terminal",
            flag
        )))
    }
}

fn prompt_failed(e: dialoguer::Error) -> Error {
    Error::config(format!("Prompt failed: {}", e))
}

/// Prompt for a non-empty line of text
pub fn text(prompt: &str, flag: &str) -> Result<String> {
    require_terminal(flag)?;
    let value: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| -> std::result::Result<(), &str> {
            if input.trim().is_empty() {
                Err("a value is required")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(prompt_failed)?;
    Ok(value.trim().to_string())
}

/// Prompt for a secret without echoing it
pub fn secret(prompt: &str, flag: &str) -> Result<String> {
    require_terminal(flag)?;
    Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(prompt_failed)
}

/// Ask a yes/no question (default: no)
pub fn confirm(prompt: &str) -> Result<bool> {
    require_terminal("--confirm")?;
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(prompt_failed)
}

/// Pick one of `items`, returning its index
pub fn select(prompt: &str, items: &[String], flag: &str) -> Result<usize> {
    require_terminal(flag)?;
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(prompt_failed)
}

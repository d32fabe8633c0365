use color_eyre::Result;
use dialoguer::{Confirm, Input};
use media_sync_sources::AuthorizationPrompt;
use owo_colors::OwoColorize;

/// Prompt for a string value with optional default
pub fn prompt_string(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut input_builder = Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true);

    if let Some(default_value) = default {
        input_builder = input_builder.default(default_value.to_string());
    }

    input_builder.interact().map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}

/// Prompt for yes/no with optional default
pub fn prompt_yes_no(prompt: &str, default: Option<bool>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder.interact().map_err(|e| color_eyre::eyre::eyre!("Failed to read confirmation: {}", e))
}

/// Prompt for a positive number, re-asking until the input parses
pub fn prompt_number<T>(prompt: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    loop {
        let input = Input::<String>::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact()
            .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))?;

        match input.trim().parse::<T>() {
            Ok(num) => return Ok(num),
            Err(_) => eprintln!("{} Invalid input. Please enter a valid number.", "✗".red()),
        }
    }
}

/// Asks the user to open the authorization page and paste back the code.
///
/// Instructions go to stderr so JSON output on stdout stays clean.
pub struct TerminalPrompt;

impl AuthorizationPrompt for TerminalPrompt {
    fn authorization_code(&self, service: &str, authorize_url: &str) -> anyhow::Result<String> {
        eprintln!();
        eprintln!("{} Authorize simkl-migrate with {}:", "→".bright_blue(), service.bold());
        eprintln!("  1. Open {}", authorize_url.bright_cyan());
        eprintln!("  2. Approve access");
        eprintln!("  3. Paste the code (or the whole redirect URL) below");
        eprintln!();

        let code = Input::<String>::new()
            .with_prompt(format!("{} authorization code", service))
            .interact()
            .map_err(|e| anyhow::anyhow!("Failed to read authorization code: {}", e))?;
        Ok(code.trim().to_string())
    }
}

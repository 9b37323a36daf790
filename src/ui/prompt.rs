//! Confirmation and selection prompts

use inquire::{Confirm, Select};

use crate::error::{RegistryError, Result};

/// Asks the user questions
pub trait Prompter {
    /// Yes / no question
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool>;

    /// Pick one of `options`, returning its index
    fn select(&mut self, message: &str, options: &[String]) -> Result<usize>;
}

/// Prompts on the terminal through inquire
pub struct InteractivePrompter;

impl Prompter for InteractivePrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        Ok(Confirm::new(message)
            .with_default(default)
            .with_help_message("Press Enter to accept the default")
            .prompt()?)
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<usize> {
        let choice = Select::new(message, options.to_vec())
            .with_page_size(options.len().clamp(1, 11))
            .raw_prompt()?;
        Ok(choice.index)
    }
}

/// Answers every question without a terminal
///
/// Confirmations take their default. Selections cannot be answered.
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        tracing::debug!(message, default, "no terminal, taking the default answer");
        Ok(default)
    }

    fn select(&mut self, message: &str, _options: &[String]) -> Result<usize> {
        Err(RegistryError::Refused {
            action: format!("answer '{message}' without an interactive terminal"),
        })
    }
}

/// Replays canned answers
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedPrompter {
    pub confirms: std::collections::VecDeque<bool>,
    pub selections: std::collections::VecDeque<usize>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        self.asked.push(message.to_string());
        Ok(self.confirms.pop_front().unwrap_or(default))
    }

    fn select(&mut self, message: &str, options: &[String]) -> Result<usize> {
        self.asked.push(message.to_string());
        let index = self.selections.pop_front().unwrap_or(0);
        assert!(index < options.len(), "scripted selection out of range");
        Ok(index)
    }
}

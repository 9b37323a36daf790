//! Terminal presentation layer
//!
//! This module handles:
//! - Progress spinners while remotes are cloned or fetched
//! - Confirmation and selection prompts (see [`prompt`])
//! - Coloured diffs and include hints (see [`display`])
//!
//! Everything interactive sits behind a trait so that commands run the same
//! way with and without a terminal, and so tests can script the answers.

pub mod display;
pub mod prompt;

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

pub use prompt::{InteractivePrompter, NonInteractivePrompter, Prompter};

const TICKS: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Progress reporter for long-running steps
pub trait ProgressReporter {
    /// Show that a step started
    fn start(&mut self, message: &str);

    /// The step completed
    fn finish(&mut self);

    /// The step failed
    fn abandon(&mut self);
}

/// Spinner on stderr
///
/// indicatif hides the spinner by itself when stderr is not a terminal.
#[derive(Default)]
pub struct InteractiveProgressReporter {
    spinner: Option<ProgressBar>,
}

impl InteractiveProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for InteractiveProgressReporter {
    fn start(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
            spinner.set_style(style.tick_strings(&TICKS));
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn abandon(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.abandon();
        }
    }
}

/// No-op reporter for tests and non-interactive runs
#[derive(Default)]
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start(&mut self, _message: &str) {}

    fn finish(&mut self) {}

    fn abandon(&mut self) {}
}

/// Whether a person is sitting at the terminal
pub fn is_interactive() -> bool {
    console::user_attended() && console::user_attended_stderr()
}

/// Reporter matching the current terminal
pub fn progress_reporter() -> Box<dyn ProgressReporter> {
    if is_interactive() {
        Box::new(InteractiveProgressReporter::new())
    } else {
        Box::new(SilentProgressReporter)
    }
}

/// Prompter matching the current terminal
pub fn prompter() -> Box<dyn Prompter> {
    if is_interactive() {
        Box::new(InteractivePrompter)
    } else {
        Box::new(NonInteractivePrompter)
    }
}

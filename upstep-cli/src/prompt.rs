//! Interactive target selection

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use upstep_core::{MigrationError, TargetVersion};

pub const CONFIRM_PROMPT: &str = "Do you want to update to the max version? [yes/no]: ";
pub const VERSION_PROMPT: &str = "To Version: ";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Invalid arguments, please enter [yes/no]")]
    InvalidAnswer,

    #[error(transparent)]
    Version(#[from] MigrationError),

    #[error("Failed to read input: {0}")]
    Input(#[from] ReadlineError),
}

/// Source of operator answers
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError>;
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadlineError> {
        self.readline(prompt)
    }
}

/// `Some(true)` for yes, `Some(false)` for no, `None` for anything else
pub fn parse_confirmation(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Ask whether to go to the highest version, and for a version if not
pub fn ask_target(reader: &mut impl LineReader) -> Result<TargetVersion, PromptError> {
    let answer = reader.read_line(CONFIRM_PROMPT)?;
    match parse_confirmation(&answer) {
        Some(true) => Ok(TargetVersion::Highest),
        Some(false) => {
            let version = reader.read_line(VERSION_PROMPT)?;
            Ok(version.parse::<TargetVersion>()?)
        }
        None => Err(PromptError::InvalidAnswer),
    }
}

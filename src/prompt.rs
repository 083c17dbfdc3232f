//! Operator interaction: separator correction and overwrite confirmation.

use std::io::{self, BufRead, Write};
use std::path::Path;

use tracing::{error, info};

use crate::error::{Error, Result};
use crate::owners::{separator_byte, separator_matches};

pub trait Prompt {
    /// Shows `question` and returns the operator's answer without the newline.
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Prompts on stdout and reads answers from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let mut stdout = io::stdout();
        write!(stdout, "{question}")?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim_end_matches(['\r', '\n']).to_string())
    }
}

pub trait Confirm {
    /// Asks whether an existing file may be overwritten.
    fn confirm_overwrite(&mut self, path: &Path) -> io::Result<bool>;
}

impl<P: Prompt> Confirm for P {
    fn confirm_overwrite(&mut self, path: &Path) -> io::Result<bool> {
        let answer = self.ask(&format!(
            "The file '{}' already exists. Do you want to overwrite it? (y/n): ",
            path.display()
        ))?;
        Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Returns a separator found in the header of `path`, asking the operator
/// for another one as long as it is not. An empty answer gives up.
pub fn resolve_separator<P: Prompt + ?Sized>(
    path: &Path,
    separator: &str,
    prompt: &mut P,
) -> Result<String> {
    let mut current = separator.to_string();
    loop {
        if separator_byte(&current).is_ok() && separator_matches(path, &current)? {
            return Ok(current);
        }
        error!("CSV separator '{}' does not match the file format", current);

        let answer = prompt
            .ask("Please enter the correct CSV separator (empty to abort): ")
            .map_err(Error::Prompt)?;
        if answer.is_empty() {
            return Err(Error::SeparatorMismatch {
                separator: current,
                path: path.to_path_buf(),
            });
        }
        info!("CSV separator changed to '{}'", answer);
        current = answer;
    }
}

// src/step/prompt.rs

//! Answering Prompt steps.
//!
//! The engine asks a [`Prompter`]; production uses [`StdinPrompter`], tests
//! plug in a scripted one.

use std::fmt::Debug;
use std::future::Future;
use std::io::{BufRead, Write};
use std::pin::Pin;

use tracing::debug;

use crate::errors::StepError;

/// Source of yes/no answers.
pub trait Prompter: Send + Sync + Debug {
    fn ask<'a>(
        &'a self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StepError>> + Send + 'a>>;
}

/// Interactive prompter reading from the process stdin.
///
/// Re-asks until the answer starts with `y` or `n` (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask<'a>(
        &'a self,
        question: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, StepError>> + Send + 'a>> {
        let question = question.to_string();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || ask_blocking(&question))
                .await
                .map_err(|e| StepError::Internal(format!("prompt reader failed: {e}")))?
        })
    }
}

fn ask_blocking(question: &str) -> Result<bool, StepError> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("{question} (y/n) ");
        stdout.flush().map_err(|e| StepError::io("<stdout>", e))?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|e| StepError::io("<stdin>", e))?;
        if read == 0 {
            return Err(StepError::io("<stdin>", "unexpected end of input"));
        }

        match parse_answer(&line) {
            Some(answer) => return Ok(answer),
            None => debug!(input = %line.trim(), "unrecognised prompt answer; asking again"),
        }
    }
}

/// `Some(true)` for answers starting with `y`, `Some(false)` for `n`.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('y') => Some(true),
        Some('n') => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_answer;

    #[test]
    fn answers_by_first_letter() {
        assert_eq!(parse_answer("yes\n"), Some(true));
        assert_eq!(parse_answer("  Y"), Some(true));
        assert_eq!(parse_answer("nope"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }
}

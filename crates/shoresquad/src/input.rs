//! Interactive input for actions that need it.
//!
//! Creating a crew needs a name, joining needs an id, deleting needs a
//! confirmation. The controller and the crew registry ask an
//! [`InputProvider`] for these instead of reading the terminal directly, so
//! they can run unattended and under test.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use tracing::debug;

use crate::error::{Error, Result};

/// Source of answers to prompts and confirmations.
pub trait InputProvider {
    /// Ask for a line of text. `Ok(None)` means the user gave no answer.
    ///
    /// # Errors
    ///
    /// Returns an error if the input source cannot be read.
    fn prompt(&mut self, message: &str) -> Result<Option<String>>;

    /// Ask a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if the input source cannot be read.
    fn confirm(&mut self, message: &str) -> Result<bool>;
}

/// Prompts on a writer and reads answers line by line from a reader.
///
/// [`TerminalInput::stdio`] wires it to the process's stdin and stderr.
#[derive(Debug)]
pub struct TerminalInput<R, W> {
    reader: R,
    writer: W,
}

impl TerminalInput<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// Prompt on stderr, read from stdin.
    ///
    /// Stdin is locked per read, so async readers of stdin are not blocked
    /// while this exists.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalInput<R, W> {
    /// Create a terminal input over arbitrary streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn read_answer(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.writer, "{message} ")?;
        self.writer.flush()?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .map_err(|e| Error::input(e.to_string()))?;
        if read == 0 {
            debug!("Input closed while prompting");
            return Ok(None);
        }

        let answer = line.trim_end_matches(['\r', '\n']);
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer.to_string()))
        }
    }
}

impl<R: BufRead, W: Write> InputProvider for TerminalInput<R, W> {
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        self.read_answer(message)
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        let answer = self.read_answer(&format!("{message} [y/N]"))?;
        Ok(matches!(
            answer.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes")
        ))
    }
}

/// Fixed answers, for non-interactive use (`--yes`) and tests.
///
/// Prompts are answered from a queue and return `None` once it runs out.
/// Every confirmation returns the same answer.
#[derive(Debug, Clone, Default)]
pub struct StaticInput {
    answers: VecDeque<String>,
    confirm: bool,
    asked: Vec<String>,
}

impl StaticInput {
    /// Answer no prompts and confirm with `confirm`.
    #[must_use]
    pub fn confirming(confirm: bool) -> Self {
        Self {
            confirm,
            ..Self::default()
        }
    }

    /// Queue answers for upcoming prompts.
    #[must_use]
    pub fn with_answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Messages shown so far, prompts and confirmations alike.
    #[must_use]
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl InputProvider for StaticInput {
    fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        self.asked.push(message.to_string());
        Ok(self.answers.pop_front())
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.asked.push(message.to_string());
        Ok(self.confirm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(input: &str) -> TerminalInput<&[u8], Vec<u8>> {
        TerminalInput::new(input.as_bytes(), Vec::new())
    }

    #[test]
    fn test_terminal_prompt_reads_line() {
        let mut input = terminal("Beach Buddies\n");
        let answer = input.prompt("Enter your crew name:").unwrap();

        assert_eq!(answer.as_deref(), Some("Beach Buddies"));
        assert_eq!(
            String::from_utf8(input.writer).unwrap(),
            "Enter your crew name: "
        );
    }

    #[test]
    fn test_terminal_prompt_empty_line_is_none() {
        let mut input = terminal("\n");
        assert!(input.prompt("Name:").unwrap().is_none());
    }

    #[test]
    fn test_terminal_prompt_eof_is_none() {
        let mut input = terminal("");
        assert!(input.prompt("Name:").unwrap().is_none());
    }

    #[test]
    fn test_terminal_prompt_strips_crlf() {
        let mut input = terminal("123\r\n");
        assert_eq!(input.prompt("Id:").unwrap().as_deref(), Some("123"));
    }

    #[test]
    fn test_terminal_confirm() {
        assert!(terminal("y\n").confirm("Delete?").unwrap());
        assert!(terminal("YES\n").confirm("Delete?").unwrap());
        assert!(!terminal("n\n").confirm("Delete?").unwrap());
        assert!(!terminal("\n").confirm("Delete?").unwrap());
        assert!(!terminal("").confirm("Delete?").unwrap());
    }

    #[test]
    fn test_terminal_confirm_shows_hint() {
        let mut input = terminal("y\n");
        input.confirm("Delete?").unwrap();
        assert_eq!(String::from_utf8(input.writer).unwrap(), "Delete? [y/N] ");
    }

    #[test]
    fn test_static_input_answers_in_order() {
        let mut input = StaticInput::confirming(false).with_answers(["first", "second"]);

        assert_eq!(input.prompt("a").unwrap().as_deref(), Some("first"));
        assert_eq!(input.prompt("b").unwrap().as_deref(), Some("second"));
        assert!(input.prompt("c").unwrap().is_none());
        assert!(!input.confirm("d").unwrap());
        assert_eq!(input.asked(), ["a", "b", "c", "d"]);
    }
}

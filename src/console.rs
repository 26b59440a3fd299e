//! Line-oriented operator I/O.
//!
//! [`Console`] pairs an async line reader (stdin in production, a byte slice
//! in tests) with a plain writer for the transcript. Write failures are
//! logged and otherwise ignored; read failures and end of input surface as
//! [`InputError`].

use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::warn;

use crate::validate::{mask_secret, ValidationError};

/// Attempts allowed per prompted field.
pub const MAX_ATTEMPTS: u32 = 3;

/// Errors reading operator input.
#[derive(Debug, Error)]
pub enum InputError {
    /// End of input. Drivers treat this as a clean exit.
    #[error("input closed")]
    Closed,
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a bounded-retry prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Every attempt failed validation.
    #[error("maximum attempts reached ({0}/{0})")]
    Exhausted(u32),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Operator console over any line source and transcript sink.
pub struct Console<R, W> {
    reader: R,
    out: W,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(reader: R, out: W) -> Self {
        Self { reader, out }
    }

    /// Print one line.
    pub fn say(&mut self, line: impl AsRef<str>) {
        if let Err(e) = writeln!(self.out, "{}", line.as_ref()) {
            warn!("stdout write error: {}", e);
        }
    }

    /// Print an empty line.
    pub fn blank(&mut self) {
        self.say("");
    }

    /// Print without a newline and flush, for prompts.
    pub fn print(&mut self, text: impl AsRef<str>) {
        if let Err(e) = write!(self.out, "{}", text.as_ref()).and_then(|()| self.out.flush()) {
            warn!("stdout write error: {}", e);
        }
    }

    /// Read the next line, trimmed. `Ok(None)` at end of input.
    pub async fn read_line(&mut self) -> Result<Option<String>, InputError> {
        let mut line = String::new();
        match self.reader.read_line(&mut line).await? {
            0 => Ok(None),
            _ => Ok(Some(line.trim().to_string())),
        }
    }

    /// Print `prompt` and read the answer. End of input is [`InputError::Closed`].
    pub async fn ask(&mut self, prompt: &str) -> Result<String, InputError> {
        self.print(prompt);
        self.read_line().await?.ok_or(InputError::Closed)
    }

    /// Consume the console and return the transcript sink.
    pub fn into_output(self) -> W {
        self.out
    }
}

/// Description of one prompted field.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub label: &'a str,
    /// Value reused when the operator submits an empty line.
    pub default: Option<&'a str>,
    /// Mask the default when displaying it.
    pub secret: bool,
}

impl<'a> Field<'a> {
    pub fn new(label: &'a str) -> Self {
        Self {
            label,
            default: None,
            secret: false,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn with_default(mut self, default: &'a str) -> Self {
        self.default = Some(default);
        self
    }

    fn prompt_text(&self) -> String {
        match self.default {
            Some(d) if self.secret => format!("{} [{}]: ", self.label, mask_secret(d)),
            Some(d) => format!("{} [{}]: ", self.label, d),
            None => format!("{}: ", self.label),
        }
    }
}

/// Prompt for `field` until `validate` accepts the answer, at most
/// `max_attempts` times. An empty answer takes the field default, which is
/// validated like any other input.
pub async fn prompt_with_retry<R, W, T, F>(
    console: &mut Console<R, W>,
    field: Field<'_>,
    max_attempts: u32,
    validate: F,
) -> Result<T, PromptError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Fn(&str) -> Result<T, ValidationError>,
{
    let prompt = field.prompt_text();
    for attempt in 1..=max_attempts {
        let mut input = console.ask(&prompt).await?;
        if input.is_empty() {
            if let Some(d) = field.default {
                input = d.to_string();
            }
        }

        match validate(&input) {
            Ok(value) => return Ok(value),
            Err(e) => {
                console.say(format!("Error: {e}"));
                if attempt < max_attempts {
                    console.say(format!(
                        "Please try again ({}/{} attempts remaining).",
                        max_attempts - attempt,
                        max_attempts
                    ));
                }
            }
        }
    }
    Err(PromptError::Exhausted(max_attempts))
}

#[cfg(test)]
pub(crate) fn scripted(input: &str) -> Console<&[u8], Vec<u8>> {
    Console::new(input.as_bytes(), Vec::new())
}

#[cfg(test)]
pub(crate) fn transcript(console: Console<&[u8], Vec<u8>>) -> String {
    String::from_utf8(console.into_output()).unwrap()
}

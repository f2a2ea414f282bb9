//! Async readline input handling for the chat loop.
//!
//! Wraps `rustyline_async::Readline` to provide async line reading with
//! handling of EOF (Ctrl+D) and interrupt (Ctrl+C) signals, plus a y/N
//! confirmation that reuses the same line editor.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

/// Events produced by the input handler.
#[derive(Debug)]
pub enum InputEvent {
    /// User submitted a line.
    Message(String),
    /// End of file (Ctrl+D).
    Eof,
    /// Interrupt signal (Ctrl+C).
    Interrupted,
}

/// Async input handler wrapping rustyline_async.
pub struct ChatInput {
    rl: Readline,
    prompt: String,
}

impl ChatInput {
    /// Create a new chat input handler with the given initial prompt.
    ///
    /// Returns the input handler and a `SharedWriter` that can be used to
    /// print output without interfering with the readline prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, stdout) = Readline::new(prompt.clone())?;
        Ok((Self { rl, prompt }, stdout))
    }

    /// Update the prompt displayed to the user.
    pub fn update_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
        let _ = self.rl.update_prompt(prompt);
    }

    /// Read a line of input, trimmed.
    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    self.rl.add_history_entry(trimmed.clone());
                }
                InputEvent::Message(trimmed)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(_) => InputEvent::Eof,
        }
    }

    /// Ask a y/N question on the input line. Anything but `y`/`yes` declines.
    pub async fn confirm(&mut self, question: &str) -> bool {
        let previous = std::mem::take(&mut self.prompt);
        let _ = self.rl.update_prompt(&format!("  {question} [y/N] "));
        let answer = match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => is_yes(&line),
            _ => false,
        };
        self.update_prompt(&previous);
        answer
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

//! Non-echoing secret input

use std::collections::VecDeque;
use std::io;

use crossterm::style::{style, Color, Stylize};
use layerbak_core::LayerColor;
use secrecy::SecretString;

/// Source of masked secret input.
///
/// Blocks until a line is entered. Implementations must fail rather than
/// fall back to echoing input when no terminal is available.
pub trait SecretPrompt {
    fn prompt_secret(&mut self, message: &str, color: LayerColor) -> io::Result<SecretString>;
}

/// Reads from the controlling terminal via rpassword.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt_secret(&mut self, message: &str, color: LayerColor) -> io::Result<SecretString> {
        let styled = style(message).with(terminal_color(color)).bold().to_string();
        rpassword::prompt_password(styled).map(SecretString::from)
    }
}

fn terminal_color(color: LayerColor) -> Color {
    // crossterm's undecorated names are the bright variants
    match color {
        LayerColor::BrightRed => Color::Red,
        LayerColor::BrightGreen => Color::Green,
        LayerColor::BrightBlue => Color::Blue,
        LayerColor::BrightYellow => Color::Yellow,
        LayerColor::BrightMagenta => Color::Magenta,
        LayerColor::BrightCyan => Color::Cyan,
        LayerColor::White => Color::White,
    }
}

/// Replays a fixed sequence of answers. For tests and non-interactive callers.
///
/// Records every message it was shown. Running out of answers is an
/// `UnexpectedEof` error, the same as a closed terminal.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Prompt messages shown so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl SecretPrompt for ScriptedPrompt {
    fn prompt_secret(&mut self, message: &str, _color: LayerColor) -> io::Result<SecretString> {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .map(SecretString::from)
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no input available"))
    }
}

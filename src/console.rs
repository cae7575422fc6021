//! Console collaborator used by every command.
//!
//! Commands never talk to the terminal directly; they ask questions and print styled lines
//! through [`Console`], so the interactive layer can be swapped out.

use colored::Colorize;
use inquire::{Confirm, Password, Select, Text};

use crate::error::Result;

/// Visual weight of a printed line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    Heading,
    Info,
    Success,
    Warning,
    Error,
    Dim,
}

/// A single interactive question
#[derive(Debug, Clone, Default)]
pub struct Question {
    prompt: String,
    default: Option<String>,
    password: bool,
    choices: Vec<String>,
}

impl Question {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Value returned when the operator submits an empty answer
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Hide the typed input
    pub fn password(mut self) -> Self {
        self.password = true;
        self
    }

    /// Restrict the answer to one of `choices`
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_password(&self) -> bool {
        self.password
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

/// Interactive input and styled output
pub trait Console {
    /// Asks `question`; an empty answer yields the question's default
    fn ask(&mut self, question: &Question) -> Result<String>;

    /// Yes/no confirmation
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    fn print(&mut self, style: Style, message: &str);

    fn plain(&mut self, message: &str) {
        self.print(Style::Plain, message);
    }

    fn heading(&mut self, message: &str) {
        self.print(Style::Heading, message);
    }

    fn info(&mut self, message: &str) {
        self.print(Style::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.print(Style::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.print(Style::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.print(Style::Error, message);
    }

    fn dim(&mut self, message: &str) {
        self.print(Style::Dim, message);
    }
}

/// Terminal console backed by `inquire` prompts and `colored` output
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl TerminalConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for TerminalConsole {
    fn ask(&mut self, question: &Question) -> Result<String> {
        let prompt_message = format!("{}", question.prompt().blue());
        let default = question.default_value().unwrap_or_default();

        if !question.choices().is_empty() {
            let choices: Vec<String> = question.choices().to_vec();
            let starting_cursor = choices
                .iter()
                .position(|choice| choice == default)
                .unwrap_or(0);
            let answer: String = Select::new(&prompt_message, choices)
                .with_starting_cursor(starting_cursor)
                .prompt()?;
            return Ok(answer);
        }

        if question.is_password() {
            let answer: String = Password::new(&prompt_message)
                .without_confirmation()
                .with_display_toggle_enabled()
                .prompt()?;
            return Ok(if answer.is_empty() {
                default.to_string()
            } else {
                answer
            });
        }

        let mut text = Text::new(&prompt_message);
        if !default.is_empty() {
            text = text.with_default(default);
        }
        Ok(text.prompt()?.trim().to_string())
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let prompt_message = format!("{}", prompt.yellow());
        Ok(Confirm::new(&prompt_message).with_default(default).prompt()?)
    }

    fn print(&mut self, style: Style, message: &str) {
        match style {
            Style::Plain => println!("{message}"),
            Style::Heading => println!("{}", message.bold()),
            Style::Info => println!("{}", message.blue()),
            Style::Success => println!("{}", message.green()),
            Style::Warning => println!("{}", message.yellow()),
            Style::Error => println!("{}", message.red()),
            Style::Dim => println!("{}", message.dimmed()),
        }
    }
}

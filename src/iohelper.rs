/**
 * Helper functions for terminal input and output.
 */
use colored::*;
use rustyline::error::ReadlineError;

use super::common::{QuizError, Result};

#[macro_export]
macro_rules! my_println {
    ($($arg:tt)*) => ({
        use ::std::io::Write;
        writeln!(::std::io::stdout(), $($arg)*).map_err($crate::common::QuizError::Io)
    });
}

#[macro_export]
macro_rules! my_print {
    ($($arg:tt)*) => ({
        use ::std::io::Write;
        write!(::std::io::stdout(), $($arg)*).map_err($crate::common::QuizError::Io)
    });
}


/// Reads lines from the terminal, remembering earlier answers so that they can be
/// recalled with the arrow keys.
pub struct Prompter {
    editor: rustyline::Editor<()>,
}


impl Prompter {
    pub fn new() -> Self {
        Prompter { editor: rustyline::Editor::<()>::new() }
    }

    /// Display a prompt and read a line from standard input continually until the user
    /// enters a line with at least one non-whitespace character. If the user presses
    /// Ctrl+D then `Ok(None)` is returned, and Ctrl+C gives `ReadlineInterrupted`.
    /// Otherwise the line is returned without leading and trailing whitespace.
    pub fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(message) {
                Ok(response) => {
                    let response = response.trim();
                    if !response.is_empty() {
                        self.editor.add_history_entry(response);
                        return Ok(Some(response.to_string()));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    return Err(QuizError::ReadlineInterrupted);
                }
                Err(ReadlineError::Eof) => {
                    return Ok(None);
                }
                Err(ReadlineError::Io(e)) => {
                    return Err(QuizError::Io(e));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "ignoring readline error");
                }
            }
        }
    }
}


/// Prompt the user with a yes-no question and return `true` if they enter yes.
pub fn confirm(message: &str) -> bool {
    match Prompter::new().prompt(message) {
        Ok(Some(response)) => response.to_lowercase().starts_with('y'),
        _ => false,
    }
}


/// Print `message` to standard output, breaking lines according to the current width
/// of the terminal. Prepend `prefix` to the first line and indent all subsequent lines
/// by its width.
pub fn prettyprint(message: &str, prefix: &str) -> Result<()> {
    prettyprint_colored(message, prefix, None, None)
}

pub fn prettyprint_colored(
    message: &str,
    prefix: &str,
    message_color: Option<Color>,
    prefix_color: Option<Color>,
) -> Result<()> {
    // Hangul syllables take up two columns, but the prefixes are all ASCII.
    let prefix_width = prefix.chars().count();
    let width = textwrap::termwidth().saturating_sub(prefix_width).max(20);
    let mut lines = textwrap::wrap_iter(message, width);

    if let Some(first_line) = lines.next() {
        let colored_prefix = color_optional(prefix, prefix_color);
        let colored_line = color_optional(&first_line, message_color);
        my_println!("{}{}", colored_prefix, colored_line)?;
    }

    let indent = " ".repeat(prefix_width);
    for line in lines {
        let colored_line = color_optional(&line, message_color);
        my_println!("{}{}", indent, colored_line)?;
    }
    Ok(())
}

fn color_optional(text: &str, color: Option<Color>) -> ColoredString {
    if let Some(color) = color {
        text.color(color)
    } else {
        text.normal()
    }
}

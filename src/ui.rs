/**
 * The command-line user interface for taking quizzes.
 */
use colored::*;

use super::common::Result;
use super::iohelper::{prettyprint, prettyprint_colored, Prompter};
use super::session::{Presentation, PresentationMode, SessionSummary};
use super::vocab::VocabularyItem;


/// What the learner typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Guess(String),
    /// `!flip`: show the answer.
    Flip,
    /// `!grad`: mark the word as learned.
    Graduate,
    /// `!rm`: drop the word from this session.
    Remove,
    /// `!next`: give up on the word and move on.
    Next,
    /// Ctrl+D.
    Quit,
}


impl Input {
    pub fn parse(line: &str) -> Input {
        match line {
            "!flip" | "!f" => Input::Flip,
            "!grad" | "!g" => Input::Graduate,
            "!rm" => Input::Remove,
            "!next" | "!n" => Input::Next,
            _ => Input::Guess(String::from(line)),
        }
    }
}


pub struct CmdUI {
    number: usize,
    prompter: Prompter,
}


impl CmdUI {
    pub fn new() -> Self {
        Self { number: 0, prompter: Prompter::new() }
    }

    pub fn present(&mut self, presentation: &Presentation) -> Result<()> {
        self.number += 1;
        my_print!("\n")?;
        let prefix = format!("  ({}) ", self.number);
        let text = match presentation.mode {
            PresentationMode::Audio => String::from("Write down the word you hear."),
            _ => String::from(presentation.prompt()),
        };
        prettyprint_colored(&text, &prefix, None, Some(Color::Cyan))?;
        my_print!("\n")
    }

    pub fn prompt(&mut self) -> Result<Input> {
        match self.prompter.prompt("> ")? {
            Some(line) => Ok(Input::parse(&line)),
            None => Ok(Input::Quit),
        }
    }

    pub fn correct(&mut self) -> Result<()> {
        prettyprint(&format!("{}", "Correct!".green()), "")
    }

    pub fn correct_after_peek(&mut self) -> Result<()> {
        let message = format!("{} (You peeked, so it counts as a miss.)", "Correct.".green());
        prettyprint(&message, "")
    }

    pub fn incorrect(&mut self, correction: &str) -> Result<()> {
        let message = format!(
            "{} The correct answer was {}. Type it to continue, or !next to skip.",
            "Incorrect.".red(),
            correction.green(),
        );
        prettyprint(&message, "")
    }

    /// Show the whole card after `!flip`.
    pub fn reveal(&mut self, word: &VocabularyItem) -> Result<()> {
        let message = format!("{} = {}", word.korean.green(), word.english);
        prettyprint(&message, "  ")?;
        if let Some(example) = &word.example {
            prettyprint_colored(example, "  ", Some(Color::BrightBlue), None)?;
        }
        Ok(())
    }

    pub fn status(&mut self, text: &str) -> Result<()> {
        my_println!("{}", text)
    }

    pub fn instructions(&mut self, text: &str) -> Result<()> {
        my_print!("\n")?;
        prettyprint_colored(text, "  ", Some(Color::BrightBlue), None)?;
        my_print!("\n")
    }

    pub fn warning(&mut self, text: &str) -> Result<()> {
        prettyprint_colored(&format!("Warning: {}", text), "  ", Some(Color::Red), None)
    }

    pub fn results(&mut self, summary: &SessionSummary) -> Result<()> {
        if summary.total_attempts == 0 {
            return Ok(());
        }

        let score = 100.0 * summary.total_successes as f64 / summary.total_attempts as f64;
        let incorrect = summary.total_attempts - summary.total_successes;
        my_print!("\n\n")?;
        my_print!("Score: ")?;
        my_print!("{}", format!("{:.1}%", score).cyan())?;
        my_print!(" out of ")?;
        my_print!("{}", format!("{}", summary.total_attempts).cyan())?;
        if summary.total_attempts == 1 {
            my_println!(" answer")?;
        } else {
            my_println!(" answers")?;
        }
        my_print!("  {}", format!("{}", summary.total_successes).green())?;
        my_print!(" correct\n")?;
        my_print!("  {}", format!("{}", incorrect).red())?;
        my_print!(" incorrect\n\n")?;

        for line in summary_lines(summary) {
            my_println!("{}", line)?;
        }
        Ok(())
    }
}


/// One line per word that was asked at least once, without colors.
pub fn summary_lines(summary: &SessionSummary) -> Vec<String> {
    summary
        .words
        .iter()
        .filter(|w| w.attempts > 0)
        .map(|w| {
            let mark = if w.graduated { "*" } else { " " };
            format!(
                "{} {:>5.1}%  of {:>2}  (recent {:>5.1}%)  {}",
                mark,
                100.0 * w.success_rate,
                w.attempts,
                100.0 * w.recent_success_rate,
                w.korean,
            )
        })
        .collect()
}

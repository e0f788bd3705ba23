/**
 * Definitions of data structures used by several modules, such as `QuizError` and the
 * various structs that hold command-line arguments.
 */
use std::io;
use std::path::PathBuf;

use structopt::StructOpt;
use thiserror::Error;

use super::session::PresentationMode;


#[derive(Debug, Error)]
pub enum QuizError {
    /// For when the application directory cannot be created.
    #[error("unable to create application directory at {}", .0.to_string_lossy())]
    CannotMakeAppDir(PathBuf),
    /// For JSON errors.
    #[error("could not parse JSON ({0})")]
    Json(#[from] serde_json::Error),
    #[error("database error ({0})")]
    Sql(#[from] rusqlite::Error),
    #[error("IO error ({0})")]
    Io(#[from] io::Error),
    #[error("")]
    ReadlineInterrupted,
    #[error("no words found")]
    EmptyQuiz,
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    /// A request at the JSON boundary that does not match any known variant.
    #[error("invalid request ({0})")]
    InvalidRequest(String),
    #[error("no session with id {0}")]
    UnknownSession(u64),
    #[error("no word '{0}' in the word list")]
    WordNotFound(String),
    #[error("{0}")]
    Engine(#[from] EngineError),
}

pub type Result<T> = ::std::result::Result<T, QuizError>;


/// Requests the quiz engine turns down. The engine's state is left exactly as it was,
/// so callers may treat any of these as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// For example, a guess submitted when no word is being presented.
    #[error("cannot {action} while {state}")]
    InvalidStateTransition { action: &'static str, state: &'static str },
    #[error("no word '{0}' in this session")]
    UnknownWord(String),
    #[error("word '{0}' is already in this session")]
    DuplicateWord(String),
}


pub fn is_broken_pipe(e: &QuizError) -> bool {
    if let QuizError::Io(e) = e {
        if let io::ErrorKind::BrokenPipe = e.kind() {
            return true;
        }
    }
    false
}


/// Holds the command-line configuration for the application.
#[derive(StructOpt)]
#[structopt(name = "hangul-drill", about = "Drill Korean vocabulary from the command line.")]
pub struct Options {
    /// Keep the word database and config file in a particular directory.
    #[structopt(short = "d", long = "directory")]
    pub directory: Option<PathBuf>,
    /// Whose word list to use.
    #[structopt(long = "owner", default_value = "default")]
    pub owner: String,
    /// Do not emit colorized output.
    #[structopt(long = "no-color")]
    pub no_color: bool,
    /// Log more (repeat for even more).
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: u8,
    #[structopt(subcommand)]
    pub cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Take a quiz.
    #[structopt(name = "take")]
    Take(TakeOptions),
    /// Import a word list into the database.
    #[structopt(name = "import")]
    Import(ImportOptions),
    /// List stored words and their results.
    #[structopt(name = "words")]
    Words(WordsOptions),
    /// Delete a word and its results.
    #[structopt(name = "rm")]
    Rm(RmOptions),
    /// Drive quiz sessions with JSON requests on standard input.
    #[structopt(name = "api")]
    Api,
}

#[derive(StructOpt)]
pub struct TakeOptions {
    /// Quiz on the words in this file instead of the stored word list.
    #[structopt(long = "file")]
    pub file: Option<PathBuf>,
    /// How the words are presented: `en-ko`, `ko-en` or `mixed`.
    #[structopt(long = "mode")]
    pub mode: Option<String>,
    /// Number of words in active rotation at once.
    #[structopt(long = "window")]
    pub window: Option<usize>,
    /// Correct answers in a row required to graduate a word.
    #[structopt(long = "streak")]
    pub streak: Option<u32>,
    /// Chance that a graduated word comes back for review.
    #[structopt(long = "recurrence")]
    pub recurrence: Option<f64>,
    /// Do not save results.
    #[structopt(long = "no-save")]
    pub no_save: bool,
}

#[derive(StructOpt)]
pub struct ImportOptions {
    /// Path to a word list (`korean = english` lines) or a JSON array of words.
    pub path: PathBuf,
}

#[derive(StructOpt)]
pub struct RmOptions {
    /// The Korean word to delete.
    pub korean: String,
    /// Do not ask for confirmation.
    #[structopt(short = "f", long = "force")]
    pub force: bool,
}

#[derive(StructOpt)]
pub struct WordsOptions {
    /// One of 'best', 'worst', 'most' or 'least'. Defaults to 'best'.
    #[structopt(short = "s", long = "sort", default_value = "best")]
    pub sort: String,
    /// Only show the first `n` words.
    #[structopt(short = "n")]
    pub num_to_show: Option<usize>,
}


/// Parse the `--mode` argument into the list of presentation modes to rotate through.
pub fn parse_modes(mode: &str) -> Option<Vec<PresentationMode>> {
    match mode {
        "en-ko" => Some(vec![PresentationMode::EnglishToKorean]),
        "ko-en" => Some(vec![PresentationMode::KoreanToEnglish]),
        "mixed" => Some(vec![
            PresentationMode::EnglishToKorean,
            PresentationMode::KoreanToEnglish,
        ]),
        _ => None,
    }
}

/**
 * Drill Korean vocabulary from the command line.
 */
#[macro_use]
extern crate hangul_drill;

use std::cmp::Ordering;
use std::io;

use colored::*;
use structopt::StructOpt;

use hangul_drill::api::SessionService;
use hangul_drill::common::{
    is_broken_pipe, parse_modes, Command, EngineError, ImportOptions, Options, QuizError, Result,
    RmOptions, TakeOptions, WordsOptions,
};
use hangul_drill::config::EngineConfig;
use hangul_drill::iohelper::{confirm, prettyprint_colored};
use hangul_drill::logging;
use hangul_drill::persistence::{
    self, OutcomeRecord, OutcomeSink, SqliteStore, VocabularySource,
};
use hangul_drill::retry::RetryPolicy;
use hangul_drill::session::{Guess, GuessResult, Session, SessionState};
use hangul_drill::ui::{CmdUI, Input};
use hangul_drill::vocab;


fn main() {
    let options = parse_options();

    if options.no_color {
        colored::control::set_override(false);
    }
    logging::init_logging(options.verbose, !options.no_color);

    if let Err(e) = run(options) {
        if !is_broken_pipe(&e) {
            eprintln!("{}: {}", "Error".red(), e);
            ::std::process::exit(2);
        }
    }
}


fn run(options: Options) -> Result<()> {
    let app_dir = persistence::require_app_dir_path(options.directory.as_deref())?;
    let store = SqliteStore::open(&persistence::get_db_path(&app_dir))?;
    let config = EngineConfig::load(&persistence::get_config_path(&app_dir))?;
    let owner = options.owner;

    match options.cmd {
        Command::Take(options) => main_take(&store, &owner, config, options),
        Command::Import(options) => main_import(&store, &owner, options),
        Command::Words(options) => main_words(&store, &owner, options),
        Command::Rm(options) => main_rm(&store, &owner, options),
        Command::Api => main_api(store, &owner, config),
    }
}


/// The main function for the `take` subcommand.
fn main_take(store: &SqliteStore, owner: &str, config: EngineConfig, options: TakeOptions) -> Result<()> {
    let config = apply_overrides(config, &options);
    let words = match &options.file {
        Some(path) => vocab::load_word_list(path)?,
        None => store.load_vocabulary(owner)?,
    };
    if words.is_empty() {
        return Err(QuizError::EmptyQuiz);
    }

    let retry = RetryPolicy::default();
    let mut session = Session::start(words, &config);
    let mut ui = CmdUI::new();
    ui.instructions(
        "Type !flip to see the answer, !grad if you already know the word, !rm to drop it \
         from this session, or !next to move on after a miss. Press Ctrl+D to stop.",
    )?;

    'words: while let Some(presentation) = session.current_presentation() {
        ui.present(&presentation)?;
        loop {
            let input = match ui.prompt() {
                Err(QuizError::ReadlineInterrupted) => Input::Quit,
                other => other?,
            };

            match input {
                Input::Quit => break 'words,
                Input::Flip => {
                    let word = session.flip()?.clone();
                    ui.reveal(&word)?;
                }
                Input::Graduate => {
                    let unanswered = session.state() == SessionState::Presenting;
                    if !ignore_rejected(&mut ui, session.force_graduate(&presentation.word.korean))? {
                        continue;
                    }
                    ui.status("Marked as learned.")?;
                    if !unanswered && session.state() != SessionState::Complete {
                        session.advance()?;
                    }
                    break;
                }
                Input::Remove => {
                    if ignore_rejected(&mut ui, session.remove_from_session(&presentation.word.korean))? {
                        ui.status("Removed from this session.")?;
                        break;
                    }
                }
                Input::Next => {
                    if session.state() == SessionState::Presenting {
                        ui.status("Answer first, or type !flip to see the answer.")?;
                    } else if ignore_rejected(&mut ui, session.advance())? {
                        break;
                    }
                }
                Input::Guess(text) => {
                    let guess = if presentation.mode.expects_korean() {
                        Guess::korean(&text)
                    } else {
                        Guess::english(&text)
                    };
                    let result = session.submit_guess(&guess)?;
                    let sink = if options.no_save { None } else { Some(store) };
                    respond_to_guess(sink, owner, &retry, &result, presentation.answer(), |feedback| {
                        show_feedback(&mut ui, feedback)
                    })?;
                    if result.is_correct {
                        session.advance()?;
                        break;
                    }
                }
            }
        }
    }

    ui.results(&session.summary())
}


/// Show a request the session turned down as a warning. Returns whether it went through.
fn ignore_rejected(ui: &mut CmdUI, result: ::std::result::Result<(), EngineError>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) => {
            ui.warning(&e.to_string())?;
            Ok(false)
        }
    }
}


/// What the learner is told after a guess.
#[derive(Debug, Clone, PartialEq)]
enum Feedback {
    Correct,
    CorrectAfterPeek,
    Incorrect(String),
    TryAgain,
    Warning(String),
}


fn show_feedback(ui: &mut CmdUI, feedback: Feedback) -> Result<()> {
    match feedback {
        Feedback::Correct => ui.correct(),
        Feedback::CorrectAfterPeek => ui.correct_after_peek(),
        Feedback::Incorrect(answer) => ui.incorrect(&answer),
        Feedback::TryAgain => ui.status("Not quite. Try again."),
        Feedback::Warning(text) => ui.warning(&text),
    }
}


fn verdict(result: &GuessResult, answer: &str) -> Feedback {
    let scored_miss = result.recorded.as_ref().map(|r| !r.succeeded).unwrap_or(false);
    if result.is_correct {
        if scored_miss {
            Feedback::CorrectAfterPeek
        } else {
            Feedback::Correct
        }
    } else if result.recorded.is_some() {
        Feedback::Incorrect(String::from(answer))
    } else {
        Feedback::TryAgain
    }
}


/// Show the verdict on a guess, then save the scored outcome to `sink` (if any). A save
/// that keeps failing is reported as a warning after the verdict.
fn respond_to_guess<S, F>(
    sink: Option<&S>,
    owner: &str,
    retry: &RetryPolicy,
    result: &GuessResult,
    answer: &str,
    mut show: F,
) -> Result<()>
where
    S: OutcomeSink,
    F: FnMut(Feedback) -> Result<()>,
{
    show(verdict(result, answer))?;

    if let (Some(sink), Some(outcome)) = (sink, &result.recorded) {
        let record = OutcomeRecord::from(outcome);
        let saved = retry.run("persist outcome", || sink.persist_outcome(owner, &outcome.korean, &record));
        if let Err(e) = saved {
            show(Feedback::Warning(format!("could not save result for '{}': {}", outcome.korean, e)))?;
        }
    }
    Ok(())
}


fn apply_overrides(mut config: EngineConfig, options: &TakeOptions) -> EngineConfig {
    if let Some(modes) = options.mode.as_deref().and_then(parse_modes) {
        config.modes = modes;
    }
    if let Some(window) = options.window {
        config.active_window_size = window;
    }
    if let Some(streak) = options.streak {
        config.consecutive_successes_required = streak;
    }
    if let Some(recurrence) = options.recurrence {
        config.graduated_word_recurrence_rate = recurrence;
    }
    config
}


/// The main function for the `import` subcommand.
fn main_import(store: &SqliteStore, owner: &str, options: ImportOptions) -> Result<()> {
    let words = vocab::load_word_list(&options.path)?;
    if words.is_empty() {
        return Err(QuizError::EmptyQuiz);
    }
    let count = store.import_words(owner, &words)?;
    if count == 1 {
        my_println!("Imported 1 word.")
    } else {
        my_println!("Imported {} words.", count)
    }
}


/// The main function for the `words` subcommand.
fn main_words(store: &SqliteStore, owner: &str, options: WordsOptions) -> Result<()> {
    let stats = store.load_stats(owner)?;

    if stats.is_empty() {
        my_println!("No words have been imported yet.")?;
        return Ok(());
    }

    let mut aggregated: Vec<CmpWordResult> = stats
        .into_iter()
        .filter_map(|s| s.score().map(|score| (score, s.attempts, s.korean)))
        .collect();

    if aggregated.is_empty() {
        my_println!("No results have been recorded yet.")?;
        return Ok(());
    }

    match options.sort.as_str() {
        "worst" => aggregated.sort_by(cmp_results_worst),
        "most" => aggregated.sort_by(cmp_results_most),
        "least" => aggregated.sort_by(cmp_results_least),
        _ => aggregated.sort_by(cmp_results_best),
    }

    if let Some(n) = options.num_to_show {
        aggregated.truncate(n);
    }

    for (score, attempts, korean) in aggregated.iter() {
        let prefix = format!("{:>5.1}%  of {:>2}   ", score, attempts);
        prettyprint_colored(korean, &prefix, None, Some(Color::Cyan))?;
    }
    Ok(())
}


/// The main function for the `rm` subcommand.
fn main_rm(store: &SqliteStore, owner: &str, options: RmOptions) -> Result<()> {
    let ask_prompt = format!("Are you sure you want to delete '{}' and its results? ", options.korean);
    if options.force || confirm(&ask_prompt) {
        if !store.remove_word(owner, &options.korean)? {
            return Err(QuizError::WordNotFound(options.korean));
        }
    }
    Ok(())
}


/// The main function for the `api` subcommand.
fn main_api(store: SqliteStore, owner: &str, config: EngineConfig) -> Result<()> {
    let mut service = SessionService::new(store, owner, config);
    let stdin = io::stdin();
    let stdout = io::stdout();
    service.serve(stdin.lock(), stdout.lock())
}


/// Parse command-line arguments, exiting on values structopt cannot check by itself.
fn parse_options() -> Options {
    let options = Options::from_args();

    match &options.cmd {
        Command::Words(words) => {
            let s = words.sort.as_str();
            if s != "most" && s != "least" && s != "best" && s != "worst" {
                eprintln!("{}: unknown value `{}` for --sort.", "Error".red(), s);
                ::std::process::exit(2);
            }
        }
        Command::Take(take) => {
            if let Some(mode) = &take.mode {
                if parse_modes(mode).is_none() {
                    eprintln!("{}: unknown value `{}` for --mode.", "Error".red(), mode);
                    ::std::process::exit(2);
                }
            }
        }
        _ => {}
    }

    options
}


/// Percentage correct, number of attempts, and the word.
type CmpWordResult = (f64, u32, String);


/// Best results first, ties broken by number of attempts.
fn cmp_results_best(a: &CmpWordResult, b: &CmpWordResult) -> Ordering {
    match b.0.partial_cmp(&a.0) {
        Some(Ordering::Equal) | None => cmp_results_most(a, b),
        Some(ordering) => ordering,
    }
}


fn cmp_results_worst(a: &CmpWordResult, b: &CmpWordResult) -> Ordering {
    cmp_results_best(a, b).reverse()
}


/// Most attempts first.
fn cmp_results_most(a: &CmpWordResult, b: &CmpWordResult) -> Ordering {
    b.1.cmp(&a.1)
}


fn cmp_results_least(a: &CmpWordResult, b: &CmpWordResult) -> Ordering {
    cmp_results_most(a, b).reverse()
}


#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use hangul_drill::retry::Backoff;
    use hangul_drill::session::RecordedOutcome;
    use hangul_drill::tracker::OutcomeTracker;

    use super::*;

    /// Records every save attempt in `events` and fails all of them.
    struct BrokenSink<'a> {
        events: &'a RefCell<Vec<String>>,
    }

    impl<'a> OutcomeSink for BrokenSink<'a> {
        fn persist_outcome(&self, _owner: &str, korean: &str, _record: &OutcomeRecord) -> Result<()> {
            self.events.borrow_mut().push(format!("save {}", korean));
            Err(QuizError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
        }
    }

    fn scored(succeeded: bool, is_correct: bool) -> GuessResult {
        let mut tracker = OutcomeTracker::new();
        let stats = tracker.record_outcome("가다", succeeded).clone();
        GuessResult {
            is_correct,
            is_session_complete: false,
            recorded: Some(RecordedOutcome { korean: String::from("가다"), succeeded, stats }),
        }
    }

    fn respond(sink: Option<&BrokenSink>, result: &GuessResult, events: &RefCell<Vec<String>>) {
        let retry = RetryPolicy { max_attempts: 2, backoff: Backoff::None };
        respond_to_guess(sink, "me", &retry, result, "가다", |feedback| {
            events.borrow_mut().push(format!("{:?}", feedback));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn verdict_is_shown_before_saving() {
        let events = RefCell::new(Vec::new());
        let sink = BrokenSink { events: &events };
        respond(Some(&sink), &scored(false, false), &events);

        assert_eq!(
            *events.borrow(),
            vec![
                String::from("Incorrect(\"가다\")"),
                String::from("save 가다"),
                String::from("save 가다"),
                String::from("Warning(\"could not save result for '가다': IO error (disk full)\")"),
            ]
        );
    }

    #[test]
    fn unscored_retry_and_no_save_skip_the_sink() {
        let events = RefCell::new(Vec::new());
        let sink = BrokenSink { events: &events };
        let retry_hit = GuessResult { is_correct: true, is_session_complete: false, recorded: None };
        respond(Some(&sink), &retry_hit, &events);
        respond(None, &scored(true, true), &events);
        respond(None, &scored(false, true), &events);

        assert_eq!(
            *events.borrow(),
            vec![String::from("Correct"), String::from("Correct"), String::from("CorrectAfterPeek")]
        );
    }

    fn result(score: f64, attempts: u32, korean: &str) -> CmpWordResult {
        (score, attempts, String::from(korean))
    }

    #[test]
    fn sorts_best_then_most() {
        let mut results = vec![result(50.0, 2, "가다"), result(100.0, 1, "오다"), result(50.0, 6, "자다")];
        results.sort_by(cmp_results_best);
        let order: Vec<&str> = results.iter().map(|r| r.2.as_str()).collect();
        assert_eq!(order, vec!["오다", "자다", "가다"]);

        results.sort_by(cmp_results_least);
        assert_eq!(results[0].2, "오다");
    }

    #[test]
    fn command_line_overrides_config_file() {
        let options = TakeOptions {
            file: None,
            mode: Some(String::from("ko-en")),
            window: Some(3),
            streak: None,
            recurrence: Some(0.0),
            no_save: false,
        };
        let config = apply_overrides(EngineConfig::default(), &options);
        assert_eq!(config.active_window_size, 3);
        assert_eq!(config.consecutive_successes_required, 5);
        assert_eq!(config.graduated_word_recurrence_rate, 0.0);
        assert_eq!(config.modes, vec![hangul_drill::session::PresentationMode::KoreanToEnglish]);
    }
}

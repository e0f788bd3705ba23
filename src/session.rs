/**
 * A single learner's quiz session.
 *
 * The session moves through these states:
 *
 *   AwaitingWord -> Presenting -> AwaitingGuess -> Resolved -> AwaitingWord | Complete
 *
 * A word is presented, the learner guesses, and only the first guess on each
 * presentation is scored. After a wrong first guess the learner sees the answer and
 * may keep guessing until they get it; those retries never touch the statistics.
 * Peeking at the answer before a correct first guess still counts as a miss.
 *
 * Nothing here performs I/O. Callers that persist results do so with the outcome
 * returned from `submit_guess`, after the in-memory state has already changed.
 */
use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::answer;
use super::common::EngineError;
use super::config::EngineConfig;
use super::pool::{PoolEntry, Tier, WordPool};
use super::tracker::WordStats;
use super::vocab::VocabularyItem;


#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// Show the English, expect the Korean.
    EnglishToKorean,
    /// Show the Korean, expect one of the English spellings.
    KoreanToEnglish,
    /// Play the Korean aloud, expect it written down.
    Audio,
}


impl PresentationMode {
    pub fn expects_korean(self) -> bool {
        match self {
            PresentationMode::EnglishToKorean | PresentationMode::Audio => true,
            PresentationMode::KoreanToEnglish => false,
        }
    }
}


#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingWord,
    Presenting,
    /// The first guess was wrong; further guesses are allowed but not scored.
    AwaitingGuess,
    Resolved,
    Complete,
}


impl SessionState {
    fn name(self) -> &'static str {
        match self {
            SessionState::AwaitingWord => "awaiting a word",
            SessionState::Presenting => "presenting",
            SessionState::AwaitingGuess => "awaiting a guess",
            SessionState::Resolved => "resolved",
            SessionState::Complete => "complete",
        }
    }
}


/// What the caller should show the learner.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Presentation {
    pub word: VocabularyItem,
    pub mode: PresentationMode,
}


impl Presentation {
    /// The side of the card shown as the question. Empty for audio, where the caller
    /// plays `word.korean` instead.
    pub fn prompt(&self) -> &str {
        match self.mode {
            PresentationMode::EnglishToKorean => &self.word.english,
            PresentationMode::KoreanToEnglish => &self.word.korean,
            PresentationMode::Audio => "",
        }
    }

    /// The answer in the form shown after a miss or a peek.
    pub fn answer(&self) -> &str {
        if self.mode.expects_korean() {
            &self.word.korean
        } else {
            self.word.canonical_english()
        }
    }
}


#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Guess {
    #[serde(default)]
    pub korean_guess: Option<String>,
    #[serde(default)]
    pub english_guess: Option<String>,
    /// Whether the learner peeked at the answer before submitting.
    #[serde(default)]
    pub was_flipped: bool,
}


impl Guess {
    pub fn korean(guess: &str) -> Self {
        Guess { korean_guess: Some(String::from(guess)), ..Guess::default() }
    }

    pub fn english(guess: &str) -> Self {
        Guess { english_guess: Some(String::from(guess)), ..Guess::default() }
    }

    pub fn flipped(mut self) -> Self {
        self.was_flipped = true;
        self
    }
}


/// An outcome handed to the outcome tracker, for callers that persist it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecordedOutcome {
    pub korean: String,
    pub succeeded: bool,
    pub stats: WordStats,
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GuessResult {
    /// What the learner is told. A correct guess after peeking is still correct here.
    pub is_correct: bool,
    pub is_session_complete: bool,
    /// Present only for the first guess on a presentation.
    pub recorded: Option<RecordedOutcome>,
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: SessionState,
    pub active_words: Vec<PoolEntry>,
    pub graduated_words: Vec<PoolEntry>,
    pub pending_words: Vec<PoolEntry>,
    pub removed_words: Vec<String>,
    pub stats: BTreeMap<String, WordStats>,
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WordSummary {
    pub korean: String,
    pub attempts: u32,
    pub successes: u32,
    pub success_rate: f64,
    pub recent_success_rate: f64,
    pub graduated: bool,
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub total_attempts: u32,
    /// Successes without peeking.
    pub total_successes: u32,
    pub words: Vec<WordSummary>,
}


#[derive(Debug, Clone)]
struct Current {
    word: VocabularyItem,
    mode: PresentationMode,
    flipped: bool,
    /// The scored outcome of the first guess, once there has been one.
    first_outcome: Option<bool>,
}


#[derive(Debug)]
pub struct Session<R = StdRng> {
    vocabulary: Vec<VocabularyItem>,
    config: EngineConfig,
    pool: WordPool,
    state: SessionState,
    current: Option<Current>,
    summary: Option<SessionSummary>,
    rng: R,
}


impl Session<StdRng> {
    pub fn start(vocabulary: Vec<VocabularyItem>, config: &EngineConfig) -> Self {
        Session::start_with_rng(vocabulary, config, StdRng::from_entropy())
    }
}


impl<R: Rng> Session<R> {
    /// Start a session over `vocabulary` and present the first word. A session with no
    /// words starts out complete.
    pub fn start_with_rng(vocabulary: Vec<VocabularyItem>, config: &EngineConfig, rng: R) -> Self {
        let config = config.clamped();
        let pool = WordPool::new(vocabulary.clone(), &config);
        let mut session = Session {
            vocabulary,
            config,
            pool,
            state: SessionState::AwaitingWord,
            current: None,
            summary: None,
            rng,
        };
        session.present_next();
        session
    }

    /// Throw away all progress and start over from the original word list.
    pub fn restart(&mut self) {
        self.pool = WordPool::new(self.vocabulary.clone(), &self.config);
        self.state = SessionState::AwaitingWord;
        self.current = None;
        self.summary = None;
        self.present_next();
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    /// The word being shown, or `None` between words and once the session is complete.
    pub fn current_presentation(&self) -> Option<Presentation> {
        self.current.as_ref().map(|c| Presentation { word: c.word.clone(), mode: c.mode })
    }

    /// Reveal the answer. The next first guess will be scored as a miss even if it is
    /// right.
    pub fn flip(&mut self) -> Result<&VocabularyItem, EngineError> {
        let state = self.state;
        match self.current.as_mut() {
            Some(current) => {
                current.flipped = true;
                Ok(&current.word)
            }
            None => Err(rejected("flip", state)),
        }
    }

    pub fn submit_guess(&mut self, guess: &Guess) -> Result<GuessResult, EngineError> {
        let state = self.state;
        let current = match (state, self.current.as_mut()) {
            (SessionState::Presenting, Some(current))
            | (SessionState::AwaitingGuess, Some(current))
            | (SessionState::Resolved, Some(current)) => current,
            _ => return Err(rejected("submit a guess", state)),
        };

        let is_correct = evaluate(&current.word, current.mode, guess);
        if guess.was_flipped {
            current.flipped = true;
        }

        let mut recorded = None;
        if current.first_outcome.is_none() {
            let succeeded = is_correct && !current.flipped;
            if is_correct && !succeeded {
                tracing::debug!(korean = %current.word.korean, "correct after peeking, scored as a miss");
            }
            let stats = self.pool.on_outcome(&current.word.korean, succeeded)?;
            current.first_outcome = Some(succeeded);
            recorded = Some(RecordedOutcome {
                korean: current.word.korean.clone(),
                succeeded,
                stats,
            });
        }

        self.state = if is_correct || state == SessionState::Resolved {
            SessionState::Resolved
        } else {
            SessionState::AwaitingGuess
        };

        Ok(GuessResult {
            is_correct,
            is_session_complete: self.pool.is_complete(),
            recorded,
        })
    }

    /// Move on to the next word, or finish the session if every word has graduated.
    pub fn advance(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Resolved | SessionState::AwaitingGuess => {
                self.current = None;
                self.state = SessionState::AwaitingWord;
                self.present_next();
                Ok(())
            }
            state => Err(rejected("advance", state)),
        }
    }

    pub fn force_graduate(&mut self, korean: &str) -> Result<(), EngineError> {
        self.pool.force_graduate(korean)?;
        let unanswered = self.state == SessionState::Presenting;
        self.after_pool_change(korean, unanswered);
        Ok(())
    }

    pub fn remove_from_session(&mut self, korean: &str) -> Result<(), EngineError> {
        self.pool.remove_from_session(korean)?;
        self.after_pool_change(korean, true);
        Ok(())
    }

    /// Apply a spelling edit made while the session is running. Words removed from the
    /// session are renamed too, so that a restart enrolls the new spelling.
    pub fn update_word(&mut self, old_korean: &str, word: VocabularyItem) -> Result<(), EngineError> {
        self.pool.update_word(old_korean, word.clone())?;
        if let Some(item) = self.vocabulary.iter_mut().find(|w| w.korean == old_korean) {
            *item = word.clone();
        }
        if let Some(current) = self.current.as_mut() {
            if current.word.korean == old_korean {
                current.word = word;
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let cloned = |tier: Tier| -> Vec<PoolEntry> {
            self.pool.words_in(tier).into_iter().cloned().collect()
        };
        Snapshot {
            state: self.state,
            active_words: cloned(Tier::Active),
            graduated_words: cloned(Tier::Graduated),
            pending_words: cloned(Tier::Pending),
            removed_words: self.pool.removed().to_vec(),
            stats: self
                .pool
                .tracker()
                .all()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// The final statistics once the session is complete, or the running totals before
    /// that.
    pub fn summary(&self) -> SessionSummary {
        match &self.summary {
            Some(summary) => summary.clone(),
            None => self.compute_summary(),
        }
    }

    fn compute_summary(&self) -> SessionSummary {
        let tracker = self.pool.tracker();
        let enrolled = self.pool.entries().iter().map(|e| (&e.item.korean, e.tier == Tier::Graduated));
        let removed = self.pool.removed().iter().map(|k| (k, false));

        let mut words = Vec::new();
        for (korean, graduated) in enrolled.chain(removed) {
            let stats = tracker.get(korean).cloned().unwrap_or_default();
            words.push(WordSummary {
                korean: korean.clone(),
                attempts: stats.session_attempts,
                successes: stats.session_successes,
                success_rate: stats.session_success_rate(),
                recent_success_rate: stats.recent_success_rate,
                graduated,
            });
        }

        SessionSummary {
            total_attempts: words.iter().map(|w| w.attempts).sum(),
            total_successes: words.iter().map(|w| w.successes).sum(),
            words,
        }
    }

    fn present_next(&mut self) {
        if self.pool.is_complete() {
            self.finish();
            return;
        }

        let korean = match self.pool.select(&mut self.rng) {
            Some(korean) => korean,
            None => {
                self.finish();
                return;
            }
        };
        let word = match self.pool.entry(&korean) {
            Some(entry) => entry.item.clone(),
            None => {
                self.finish();
                return;
            }
        };
        let mode = self
            .config
            .modes
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(PresentationMode::EnglishToKorean);

        self.current = Some(Current { word, mode, flipped: false, first_outcome: None });
        self.state = SessionState::Presenting;
    }

    fn finish(&mut self) {
        self.current = None;
        self.state = SessionState::Complete;
        let summary = self.compute_summary();
        tracing::info!(
            attempts = summary.total_attempts,
            successes = summary.total_successes,
            "session complete"
        );
        self.summary = Some(summary);
    }

    /// Keep the presentation consistent after a word was graduated or removed out of
    /// turn. `replace_current` says whether the word, if it is the one being shown,
    /// should be swapped for another.
    fn after_pool_change(&mut self, korean: &str, replace_current: bool) {
        if self.state == SessionState::Complete {
            return;
        }
        if self.pool.is_complete() {
            self.finish();
            return;
        }
        let is_current = self.current.as_ref().map(|c| c.word.korean == korean).unwrap_or(false);
        if is_current && replace_current {
            self.current = None;
            self.state = SessionState::AwaitingWord;
            self.present_next();
        }
    }

}


fn rejected(action: &'static str, state: SessionState) -> EngineError {
    tracing::debug!(action, state = state.name(), "ignoring request");
    EngineError::InvalidStateTransition { action, state: state.name() }
}


fn evaluate(word: &VocabularyItem, mode: PresentationMode, guess: &Guess) -> bool {
    if mode.expects_korean() {
        guess.korean_guess.as_deref().map(|g| answer::check_korean(word, g)).unwrap_or(false)
    } else {
        guess.english_guess.as_deref().map(|g| answer::check_english(word, g)).unwrap_or(false)
    }
}

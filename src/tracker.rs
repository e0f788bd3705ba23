/**
 * Per-word statistics for the current session.
 *
 * Besides plain attempt and success counts, each word keeps its last `RECENT_WINDOW`
 * outcomes. The mean of that window is the recent success rate, which the selection
 * scorer uses so that a word's early mistakes stop counting against it once it has
 * been learned.
 */
use std::collections::{HashMap, VecDeque};

use serde::Serialize;


/// How many of the most recent outcomes are kept for each word.
pub const RECENT_WINDOW: usize = 10;


#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct WordStats {
    pub session_attempts: u32,
    pub session_successes: u32,
    /// Oldest first.
    pub recent_outcomes: VecDeque<bool>,
    /// Mean of `recent_outcomes`, or 0 when there are none.
    pub recent_success_rate: f64,
}


impl WordStats {
    fn record(&mut self, succeeded: bool) {
        self.session_attempts += 1;
        if succeeded {
            self.session_successes += 1;
        }

        self.recent_outcomes.push_back(succeeded);
        while self.recent_outcomes.len() > RECENT_WINDOW {
            self.recent_outcomes.pop_front();
        }

        let successes = self.recent_outcomes.iter().filter(|o| **o).count();
        self.recent_success_rate = successes as f64 / self.recent_outcomes.len() as f64;
    }

    /// Fraction of all attempts this session that succeeded.
    pub fn session_success_rate(&self) -> f64 {
        if self.session_attempts == 0 {
            0.0
        } else {
            self.session_successes as f64 / self.session_attempts as f64
        }
    }
}


/// Statistics for every word that has had an outcome recorded, keyed by its Korean text.
#[derive(Debug, Default)]
pub struct OutcomeTracker {
    stats: HashMap<String, WordStats>,
}


impl OutcomeTracker {
    pub fn new() -> Self {
        OutcomeTracker { stats: HashMap::new() }
    }

    /// Record one resolved guess for `korean` and return its updated statistics. Words
    /// seen for the first time start from zero.
    ///
    /// Callers must pass `succeeded = false` for guesses made after peeking at the
    /// answer, even if the guess itself was right.
    pub fn record_outcome(&mut self, korean: &str, succeeded: bool) -> &WordStats {
        let stats = self.stats.entry(String::from(korean)).or_default();
        stats.record(succeeded);
        stats
    }

    pub fn get(&self, korean: &str) -> Option<&WordStats> {
        self.stats.get(korean)
    }

    pub fn all(&self) -> &HashMap<String, WordStats> {
        &self.stats
    }

    /// Move the statistics kept under `old` to `new`.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(stats) = self.stats.remove(old) {
            self.stats.insert(String::from(new), stats);
        }
    }
}

/**
 * The pool of words enrolled in a session, split into three tiers:
 *
 *   Pending:   enrolled but waiting for room in the active window
 *   Active:    in rotation; candidates for selection
 *   Graduated: answered correctly enough times in a row to leave the rotation
 *
 * At most `active_window_size` words are active at once. Whenever a word graduates or
 * leaves the session, the earliest-enrolled pending word takes its place.
 */
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::common::EngineError;
use super::config::{EngineConfig, ScoringConfig};
use super::scorer::{self, SelectionHistory};
use super::tracker::{OutcomeTracker, WordStats};
use super::vocab::VocabularyItem;


#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pending,
    Active,
    Graduated,
}


#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub item: VocabularyItem,
    pub tier: Tier,
    /// Reset to 0 by any outcome other than an unpenalized success.
    pub consecutive_successes: u32,
}


impl PoolEntry {
    pub fn new(item: VocabularyItem, tier: Tier) -> Self {
        PoolEntry { item, tier, consecutive_successes: 0 }
    }
}


#[derive(Debug)]
pub struct WordPool {
    /// In enrollment order.
    entries: Vec<PoolEntry>,
    /// Words taken out of the session, in the order they were removed.
    removed: Vec<String>,
    tracker: OutcomeTracker,
    history: SelectionHistory,
    active_window_size: usize,
    consecutive_successes_required: u32,
    recurrence_rate: f64,
    scoring: ScoringConfig,
}


impl WordPool {
    /// Enroll `vocabulary` as pending words and fill the active window. Words whose
    /// Korean text repeats an earlier word are skipped.
    pub fn new(vocabulary: Vec<VocabularyItem>, config: &EngineConfig) -> Self {
        let config = config.clamped();
        let mut entries: Vec<PoolEntry> = Vec::with_capacity(vocabulary.len());
        for item in vocabulary {
            if entries.iter().any(|e| e.item.korean == item.korean) {
                tracing::warn!(korean = %item.korean, "skipping duplicate word");
                continue;
            }
            entries.push(PoolEntry::new(item, Tier::Pending));
        }

        let mut pool = WordPool {
            entries,
            removed: Vec::new(),
            tracker: OutcomeTracker::new(),
            history: SelectionHistory::new(),
            active_window_size: config.active_window_size,
            consecutive_successes_required: config.consecutive_successes_required,
            recurrence_rate: config.graduated_word_recurrence_rate,
            scoring: config.scoring,
        };
        pool.admit();
        pool
    }

    /// Promote pending words, earliest first, until the active window is full or no
    /// pending words remain.
    pub fn admit(&mut self) {
        let mut active = self.count(Tier::Active);
        for entry in self.entries.iter_mut() {
            if active >= self.active_window_size {
                break;
            }
            if entry.tier == Tier::Pending {
                entry.tier = Tier::Active;
                active += 1;
                tracing::debug!(korean = %entry.item.korean, "admitted to active rotation");
            }
        }
    }

    /// Record a resolved guess. `succeeded` must already account for peeking. An active
    /// word graduates once its streak reaches the required length; graduated words
    /// reviewed through recurrence only update their statistics.
    pub fn on_outcome(&mut self, korean: &str, succeeded: bool) -> Result<WordStats, EngineError> {
        let required = self.consecutive_successes_required;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.item.korean == korean)
            .ok_or_else(|| EngineError::UnknownWord(String::from(korean)))?;

        let stats = self.tracker.record_outcome(korean, succeeded).clone();

        let mut graduated = false;
        if entry.tier == Tier::Active {
            if succeeded {
                entry.consecutive_successes += 1;
            } else {
                entry.consecutive_successes = 0;
            }
            if entry.consecutive_successes >= required {
                entry.tier = Tier::Graduated;
                graduated = true;
                tracing::debug!(korean, "graduated");
            }
        }

        if graduated {
            self.admit();
        }
        Ok(stats)
    }

    /// Pick the next word to present, or `None` if nothing is active.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        let candidates = candidates(&self.entries, self.recurrence_rate, rng);
        if candidates.is_empty() {
            return None;
        }
        let weights = scorer::score_all(&candidates, self.tracker.all(), &self.scoring);
        let chosen = scorer::choose(&weights, &mut self.history, rng)?;
        Some(chosen.item.korean.clone())
    }

    /// Graduate a word immediately, whatever its streak.
    pub fn force_graduate(&mut self, korean: &str) -> Result<(), EngineError> {
        let entry = self.entry_mut(korean)?;
        if entry.tier != Tier::Graduated {
            entry.tier = Tier::Graduated;
            tracing::debug!(korean, "graduated by request");
            self.admit();
        }
        Ok(())
    }

    /// Take a word out of this session. The stored vocabulary is not affected.
    pub fn remove_from_session(&mut self, korean: &str) -> Result<(), EngineError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.item.korean == korean)
            .ok_or_else(|| EngineError::UnknownWord(String::from(korean)))?;
        let entry = self.entries.remove(index);
        self.removed.push(entry.item.korean);
        self.admit();
        Ok(())
    }

    /// Replace the word known as `old_korean`, carrying over its tier, streak,
    /// statistics and selection history under the new Korean text. A word already
    /// removed from the session is renamed in the removed list.
    pub fn update_word(&mut self, old_korean: &str, word: VocabularyItem) -> Result<(), EngineError> {
        let new_korean = word.korean.clone();
        if new_korean != old_korean && self.knows(&new_korean) {
            return Err(EngineError::DuplicateWord(new_korean));
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.item.korean == old_korean) {
            entry.item = word;
        } else if let Some(removed) = self.removed.iter_mut().find(|k| *k == old_korean) {
            *removed = new_korean.clone();
        } else {
            return Err(EngineError::UnknownWord(String::from(old_korean)));
        }

        if new_korean != old_korean {
            self.tracker.rename(old_korean, &new_korean);
            self.history.rename(old_korean, &new_korean);
        }
        Ok(())
    }

    /// `true` if `korean` is in the session or was removed from it.
    fn knows(&self, korean: &str) -> bool {
        self.entry(korean).is_some() || self.removed.iter().any(|k| k == korean)
    }

    /// `true` once every word still in the session has graduated.
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.tier == Tier::Graduated)
    }

    pub fn entry(&self, korean: &str) -> Option<&PoolEntry> {
        self.entries.iter().find(|e| e.item.korean == korean)
    }

    fn entry_mut(&mut self, korean: &str) -> Result<&mut PoolEntry, EngineError> {
        self.entries
            .iter_mut()
            .find(|e| e.item.korean == korean)
            .ok_or_else(|| EngineError::UnknownWord(String::from(korean)))
    }

    /// Words in `tier`, in enrollment order.
    pub fn words_in(&self, tier: Tier) -> Vec<&PoolEntry> {
        self.entries.iter().filter(|e| e.tier == tier).collect()
    }

    pub fn count(&self, tier: Tier) -> usize {
        self.entries.iter().filter(|e| e.tier == tier).count()
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn tracker(&self) -> &OutcomeTracker {
        &self.tracker
    }
}


/// The active words, plus, with probability `recurrence_rate`, one graduated word
/// chosen at random.
fn candidates<'a, R: Rng + ?Sized>(
    entries: &'a [PoolEntry],
    recurrence_rate: f64,
    rng: &mut R,
) -> Vec<&'a PoolEntry> {
    let mut candidates: Vec<&PoolEntry> = entries.iter().filter(|e| e.tier == Tier::Active).collect();
    if candidates.is_empty() {
        return candidates;
    }

    let graduated: Vec<&PoolEntry> = entries.iter().filter(|e| e.tier == Tier::Graduated).collect();
    if !graduated.is_empty() && recurrence_rate > 0.0 && rng.gen_bool(recurrence_rate) {
        if let Some(review) = graduated.choose(rng) {
            tracing::debug!(korean = %review.item.korean, "reviewing graduated word");
            candidates.push(*review);
        }
    }
    candidates
}

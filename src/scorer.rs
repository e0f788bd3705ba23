/**
 * Choose the next word to present based on how it has been going this session.
 *
 * Each candidate gets two signals in [0, 1]:
 *
 *   session score: attempts this session, relative to the most-attempted candidate
 *   success score: 1 - the recent success rate, rescaled over the candidates
 *
 * which are blended into a single score and turned into probabilities with a softmax.
 * Words that keep being asked and keep being missed come up most often, but every
 * candidate keeps a nonzero chance.
 */
use std::collections::{HashMap, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::ScoringConfig;
use super::pool::PoolEntry;
use super::tracker::WordStats;


/// Number of previous selections remembered for the anti-repetition rule.
pub const HISTORY_LEN: usize = 4;
/// How many times to re-sample before giving up on the distribution entirely.
pub const MAX_RESAMPLES: usize = 10;


#[derive(Debug, Clone)]
pub struct SelectionWeight<'a> {
    pub entry: &'a PoolEntry,
    pub score: f64,
    pub probability: f64,
}


/// Compute a selection weight for every candidate. The probabilities of a non-empty
/// result sum to 1.
pub fn score_all<'a>(
    candidates: &[&'a PoolEntry],
    stats: &HashMap<String, WordStats>,
    config: &ScoringConfig,
) -> Vec<SelectionWeight<'a>> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let lookup = |entry: &PoolEntry| stats.get(&entry.item.korean);
    let attempts: Vec<f64> = candidates
        .iter()
        .map(|e| lookup(e).map(|s| s.session_attempts).unwrap_or(0) as f64)
        .collect();
    let rates: Vec<f64> = candidates
        .iter()
        .map(|e| lookup(e).map(|s| s.recent_success_rate).unwrap_or(0.0))
        .collect();

    let max_attempts = attempts.iter().cloned().fold(0.0, f64::max).max(1.0);
    let min_rate = rates.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_rate = rates.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let scores: Vec<f64> = attempts
        .iter()
        .zip(rates.iter())
        .map(|(&a, &r)| {
            let session_score = a / max_attempts;
            let normalized_rate = if max_rate > min_rate {
                (r - min_rate) / (max_rate - min_rate)
            } else if max_rate > 0.0 {
                r / max_rate
            } else {
                r
            };
            let success_score = 1.0 - normalized_rate;
            config.session_weight * session_score + config.success_weight * success_score
        })
        .collect();

    let probabilities = softmax(&scores, config.temperature);
    candidates
        .iter()
        .zip(scores.into_iter().zip(probabilities.into_iter()))
        .map(|(entry, (score, probability))| SelectionWeight { entry, score, probability })
        .collect()
}


fn softmax(scores: &[f64], temperature: f64) -> Vec<f64> {
    // Shifting by the maximum leaves the result unchanged and keeps exp() finite.
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| ((s - max) / temperature).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}


/// Draw one weight at random according to the probabilities. Returns `None` only for
/// an empty slice.
pub fn sample<'w, 'a, R: Rng + ?Sized>(
    weights: &'w [SelectionWeight<'a>],
    rng: &mut R,
) -> Option<&'w SelectionWeight<'a>> {
    let mut remaining: f64 = rng.gen();
    for weight in weights.iter() {
        remaining -= weight.probability;
        if remaining < 0.0 {
            return Some(weight);
        }
    }
    // Rounding can leave `remaining` just above zero after the last weight.
    weights.last()
}


/// The last few words that were selected, most recent last.
#[derive(Debug, Default, Clone)]
pub struct SelectionHistory {
    recent: VecDeque<String>,
}


impl SelectionHistory {
    pub fn new() -> Self {
        SelectionHistory { recent: VecDeque::with_capacity(HISTORY_LEN) }
    }

    /// The word selected on each of the last `HISTORY_LEN` draws, if it was the same
    /// word every time.
    pub fn streak(&self) -> Option<&str> {
        let first = self.recent.front()?;
        if self.recent.len() == HISTORY_LEN && self.recent.iter().all(|k| k == first) {
            Some(first.as_str())
        } else {
            None
        }
    }

    pub fn push(&mut self, korean: &str) {
        self.recent.push_back(String::from(korean));
        while self.recent.len() > HISTORY_LEN {
            self.recent.pop_front();
        }
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        for k in self.recent.iter_mut() {
            if k == old {
                *k = String::from(new);
            }
        }
    }
}


/// Sample a word from `weights`, refusing to extend a streak of `HISTORY_LEN`
/// selections of the same word to a further draw when any other candidate exists.
pub fn choose<'a, R: Rng + ?Sized>(
    weights: &[SelectionWeight<'a>],
    history: &mut SelectionHistory,
    rng: &mut R,
) -> Option<&'a PoolEntry> {
    let mut chosen = sample(weights, rng)?.entry;

    if let Some(streak) = history.streak() {
        let others: Vec<&'a PoolEntry> = weights
            .iter()
            .map(|w| w.entry)
            .filter(|e| e.item.korean != streak)
            .collect();

        if chosen.item.korean == streak && !others.is_empty() {
            tracing::debug!(korean = streak, "breaking selection streak");
            for _ in 0..MAX_RESAMPLES {
                if let Some(weight) = sample(weights, rng) {
                    chosen = weight.entry;
                }
                if chosen.item.korean != streak {
                    break;
                }
            }
            if chosen.item.korean == streak {
                if let Some(other) = others.choose(rng) {
                    chosen = *other;
                }
            }
        }
    }

    history.push(&chosen.item.korean);
    Some(chosen)
}


#[cfg(test)]
mod tests {
    use super::*;

    use rand::rngs::mock::StepRng;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::pool::Tier;
    use crate::tracker::OutcomeTracker;
    use crate::vocab::VocabularyItem;

    fn entries(words: &[&str]) -> Vec<PoolEntry> {
        words
            .iter()
            .map(|w| PoolEntry::new(VocabularyItem::new(w, "x"), Tier::Active))
            .collect()
    }

    fn total(weights: &[SelectionWeight<'_>]) -> f64 {
        weights.iter().map(|w| w.probability).sum()
    }

    #[test]
    fn probabilities_sum_to_one() {
        let pool = entries(&["가다", "오다", "먹다", "자다"]);
        let candidates: Vec<&PoolEntry> = pool.iter().collect();
        let mut tracker = OutcomeTracker::new();
        tracker.record_outcome("가다", true);
        tracker.record_outcome("가다", false);
        tracker.record_outcome("오다", true);
        for _ in 0..5 {
            tracker.record_outcome("먹다", false);
        }

        let weights = score_all(&candidates, tracker.all(), &ScoringConfig::default());
        assert_eq!(weights.len(), 4);
        assert!((total(&weights) - 1.0).abs() < 1e-9);
        for w in weights.iter() {
            assert!(w.probability > 0.0);
        }
    }

    #[test]
    fn unseen_words_are_equally_likely() {
        let pool = entries(&["가다", "오다", "먹다"]);
        let candidates: Vec<&PoolEntry> = pool.iter().collect();
        let weights = score_all(&candidates, &HashMap::new(), &ScoringConfig::default());
        for w in weights.iter() {
            assert!((w.probability - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn missed_words_are_favored() {
        let pool = entries(&["가다", "오다"]);
        let candidates: Vec<&PoolEntry> = pool.iter().collect();
        let mut tracker = OutcomeTracker::new();
        for _ in 0..3 {
            tracker.record_outcome("가다", true);
            tracker.record_outcome("오다", false);
        }

        let weights = score_all(&candidates, tracker.all(), &ScoringConfig::default());
        assert_eq!(weights[0].entry.item.korean, "가다");
        assert!(weights[1].score > weights[0].score);
        assert!(weights[1].probability > weights[0].probability);
        // With the default constants the gap is exp(0.6 / 0.75).
        let ratio = weights[1].probability / weights[0].probability;
        assert!((ratio - (0.6f64 / 0.75).exp()).abs() < 1e-9);
    }

    #[test]
    fn lower_temperature_sharpens_distribution() {
        let pool = entries(&["가다", "오다"]);
        let candidates: Vec<&PoolEntry> = pool.iter().collect();
        let mut tracker = OutcomeTracker::new();
        tracker.record_outcome("가다", true);
        tracker.record_outcome("오다", false);

        let warm = score_all(&candidates, tracker.all(), &ScoringConfig::default());
        let cold_config = ScoringConfig { temperature: 0.1, ..ScoringConfig::default() };
        let cold = score_all(&candidates, tracker.all(), &cold_config);
        assert!(cold[1].probability > warm[1].probability);
    }

    #[test]
    fn sample_walks_the_weights_in_order() {
        let pool = entries(&["가다", "오다"]);
        let weights = vec![
            SelectionWeight { entry: &pool[0], score: 0.0, probability: 0.25 },
            SelectionWeight { entry: &pool[1], score: 0.0, probability: 0.25 },
        ];

        // A draw of 0 lands on the first weight.
        let mut low = StepRng::new(0, 0);
        assert_eq!(sample(&weights, &mut low).unwrap().entry.item.korean, "가다");

        // A draw just below 1 never crosses zero here, so the last weight is used.
        let mut high = StepRng::new(u64::MAX, 0);
        assert_eq!(sample(&weights, &mut high).unwrap().entry.item.korean, "오다");

        let empty: Vec<SelectionWeight<'_>> = Vec::new();
        assert!(sample(&empty, &mut low).is_none());
    }

    #[test]
    fn history_detects_streaks() {
        let mut history = SelectionHistory::new();
        for _ in 0..HISTORY_LEN - 1 {
            history.push("가다");
        }
        assert_eq!(history.streak(), None);
        history.push("가다");
        assert_eq!(history.streak(), Some("가다"));
        history.push("오다");
        assert_eq!(history.streak(), None);
    }

    #[test]
    fn choose_never_extends_a_streak_when_another_word_exists() {
        let pool = entries(&["가다", "오다"]);
        // The first word is overwhelmingly likely.
        let weights = vec![
            SelectionWeight { entry: &pool[0], score: 1.0, probability: 1.0 },
            SelectionWeight { entry: &pool[1], score: 0.0, probability: 0.0 },
        ];
        let mut history = SelectionHistory::new();
        let mut rng = StdRng::seed_from_u64(7);

        let mut run = 0;
        for _ in 0..100 {
            let chosen = choose(&weights, &mut history, &mut rng).unwrap();
            if chosen.item.korean == "가다" {
                run += 1;
            } else {
                run = 0;
            }
            assert!(run <= HISTORY_LEN);
        }
    }

    #[test]
    fn streak_breaks_onto_a_graduated_review_word() {
        let active = PoolEntry::new(VocabularyItem::new("가다", "go"), Tier::Active);
        let review = PoolEntry::new(VocabularyItem::new("오다", "come"), Tier::Graduated);
        let candidates = vec![&active, &review];
        let mut tracker = OutcomeTracker::new();
        for _ in 0..8 {
            tracker.record_outcome("가다", false);
        }
        tracker.record_outcome("오다", true);

        let cold = ScoringConfig { temperature: 0.01, ..ScoringConfig::default() };
        let weights = score_all(&candidates, tracker.all(), &cold);
        assert!(weights[0].probability > 0.999_999);

        let mut history = SelectionHistory::new();
        for _ in 0..HISTORY_LEN {
            history.push("가다");
        }
        let mut rng = StepRng::new(0, 0);
        assert_eq!(choose(&weights, &mut history, &mut rng).unwrap().item.korean, "오다");
        assert_eq!(history.streak(), None);
        assert_eq!(choose(&weights, &mut history, &mut rng).unwrap().item.korean, "가다");
    }

    #[test]
    fn choose_repeats_a_lone_candidate() {
        let pool = entries(&["가다"]);
        let candidates: Vec<&PoolEntry> = pool.iter().collect();
        let weights = score_all(&candidates, &HashMap::new(), &ScoringConfig::default());
        let mut history = SelectionHistory::new();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(choose(&weights, &mut history, &mut rng).unwrap().item.korean, "가다");
        }
    }
}

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hangul_drill::answer;
use hangul_drill::config::{EngineConfig, ScoringConfig};
use hangul_drill::pool::{PoolEntry, Tier, WordPool};
use hangul_drill::scorer;
use hangul_drill::session::{Guess, Session, SessionState};
use hangul_drill::tracker::{OutcomeTracker, RECENT_WINDOW};
use hangul_drill::vocab::VocabularyItem;


fn vocabulary(words: &[(&str, &str)]) -> Vec<VocabularyItem> {
    words.iter().map(|(k, e)| VocabularyItem::new(k, e)).collect()
}

fn numbered(n: usize) -> Vec<VocabularyItem> {
    (0..n).map(|i| VocabularyItem::new(&format!("단어{}", i), &format!("word {}", i))).collect()
}

fn no_recurrence() -> EngineConfig {
    EngineConfig { graduated_word_recurrence_rate: 0.0, ..EngineConfig::default() }
}

fn koreans(entries: Vec<&PoolEntry>) -> Vec<String> {
    entries.into_iter().map(|e| e.item.korean.clone()).collect()
}


#[test]
fn two_successes_graduate_a_word() {
    let config = EngineConfig { consecutive_successes_required: 2, ..no_recurrence() };
    let mut pool = WordPool::new(vocabulary(&[("가다", "go"), ("오다", "come")]), &config);
    assert_eq!(pool.count(Tier::Active), 2);

    pool.on_outcome("가다", true).unwrap();
    assert_eq!(pool.entry("가다").unwrap().tier, Tier::Active);
    pool.on_outcome("가다", true).unwrap();

    assert_eq!(pool.entry("가다").unwrap().tier, Tier::Graduated);
    assert_eq!(pool.count(Tier::Pending), 0);
    assert_eq!(koreans(pool.words_in(Tier::Active)), vec![String::from("오다")]);
}


#[test]
fn sloppy_english_guess_is_accepted() {
    let word = VocabularyItem::new("가다", "go, to go");
    assert!(answer::check_english(&word, "Go "));
    assert!(answer::check_english(&word, "  TO   go"));
    assert!(!answer::check_english(&word, "gone"));
}


#[test]
fn peeking_is_correct_for_the_learner_but_a_miss_for_the_stats() {
    let config = EngineConfig { consecutive_successes_required: 3, ..no_recurrence() };
    let mut session =
        Session::start_with_rng(vocabulary(&[("가다", "go")]), &config, StdRng::seed_from_u64(1));

    let first = session.submit_guess(&Guess::korean("가다")).unwrap();
    assert!(first.is_correct);
    session.advance().unwrap();
    assert_eq!(session.snapshot().active_words[0].consecutive_successes, 1);

    let peeked = session.submit_guess(&Guess::korean("가다").flipped()).unwrap();
    assert!(peeked.is_correct);
    assert_eq!(peeked.recorded.map(|r| r.succeeded), Some(false));

    let snapshot = session.snapshot();
    assert_eq!(snapshot.active_words[0].consecutive_successes, 0);
    assert_eq!(snapshot.stats["가다"].session_attempts, 2);
    assert_eq!(snapshot.stats["가다"].session_successes, 1);
}


#[test]
fn retry_after_a_miss_is_not_recorded() {
    let mut session = Session::start_with_rng(
        vocabulary(&[("가다", "go")]),
        &no_recurrence(),
        StdRng::seed_from_u64(2),
    );
    let miss = session.submit_guess(&Guess::korean("기다")).unwrap();
    assert!(!miss.is_correct);
    assert!(miss.recorded.is_some());

    let hit = session.submit_guess(&Guess::korean("가다")).unwrap();
    assert!(hit.is_correct);
    assert!(hit.recorded.is_none());

    let stats = &session.snapshot().stats["가다"];
    assert_eq!(stats.session_attempts, 1);
    assert_eq!(stats.session_successes, 0);
    assert_eq!(stats.recent_success_rate, 0.0);
}


#[test]
fn graduating_everything_completes_the_session() {
    let mut session = Session::start_with_rng(
        vocabulary(&[("가다", "go"), ("오다", "come")]),
        &no_recurrence(),
        StdRng::seed_from_u64(3),
    );
    session.force_graduate("가다").unwrap();
    assert!(!session.is_complete());
    session.force_graduate("오다").unwrap();

    assert!(session.is_complete());
    assert_eq!(session.state(), SessionState::Complete);
    assert!(session.current_presentation().is_none());
    assert!(session.submit_guess(&Guess::korean("가다")).is_err());
    assert_eq!(session.snapshot().graduated_words.len(), 2);
}


#[test]
fn recent_window_is_bounded_and_averaged() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut tracker = OutcomeTracker::new();
    for _ in 0..500 {
        let stats = tracker.record_outcome("가다", rng.gen_bool(0.6));
        assert!(stats.recent_outcomes.len() <= RECENT_WINDOW);
        let successes = stats.recent_outcomes.iter().filter(|&&s| s).count();
        let mean = successes as f64 / stats.recent_outcomes.len() as f64;
        assert!((stats.recent_success_rate - mean).abs() < 1e-12);
    }
    assert_eq!(tracker.get("가다").unwrap().session_attempts, 500);
}


#[test]
fn probabilities_sum_to_one() {
    let mut rng = StdRng::seed_from_u64(5);
    for n in 1..12 {
        let entries: Vec<PoolEntry> =
            numbered(n).into_iter().map(|item| PoolEntry::new(item, Tier::Active)).collect();
        let mut tracker = OutcomeTracker::new();
        for entry in entries.iter() {
            for _ in 0..rng.gen_range(0..15) {
                tracker.record_outcome(&entry.item.korean, rng.gen_bool(0.5));
            }
        }

        let candidates: Vec<&PoolEntry> = entries.iter().collect();
        let weights = scorer::score_all(&candidates, tracker.all(), &ScoringConfig::default());
        let total: f64 = weights.iter().map(|w| w.probability).sum();
        assert!((total - 1.0).abs() < 1e-9, "probabilities for {} words sum to {}", n, total);
    }
}


#[test]
fn graduation_is_final_and_active_tier_stays_within_window() {
    let config = EngineConfig {
        active_window_size: 3,
        consecutive_successes_required: 2,
        graduated_word_recurrence_rate: 0.5,
        ..EngineConfig::default()
    };
    let mut pool = WordPool::new(numbered(8), &config);
    let mut rng = StdRng::seed_from_u64(6);
    let mut graduated: HashSet<String> = HashSet::new();

    for _ in 0..2000 {
        let korean = match pool.select(&mut rng) {
            Some(korean) => korean,
            None => break,
        };
        let before = pool.entry(&korean).unwrap().consecutive_successes;
        let succeeded = rng.gen_bool(0.7);
        pool.on_outcome(&korean, succeeded).unwrap();
        let entry = pool.entry(&korean).unwrap();

        if !graduated.contains(&korean) && entry.tier != Tier::Graduated {
            if succeeded {
                assert_eq!(entry.consecutive_successes, before + 1);
            } else {
                assert_eq!(entry.consecutive_successes, 0);
            }
        }

        assert!(pool.count(Tier::Active) <= 3);
        for g in graduated.iter() {
            assert_eq!(pool.entry(g).unwrap().tier, Tier::Graduated, "{} left the graduated tier", g);
        }
        graduated.extend(koreans(pool.words_in(Tier::Graduated)));
    }

    assert!(pool.is_complete());
    assert_eq!(graduated.len(), 8);
}


#[test]
fn normalizing_twice_changes_nothing() {
    let samples = [
        "  Go  ",
        "to go!",
        "가다",
        "\u{1100}\u{1161}\u{1103}\u{1161}",
        "It's (a) \"test\"...",
        "Ｆｕｌｌ　ｗｉｄｔｈ",
        "go\u{37E}",
        "a\u{387}b",
        "e.\u{301}",
        "",
    ];
    for s in samples.iter() {
        let once = answer::normalize(s);
        assert_eq!(answer::normalize(&once), once, "normalizing {:?}", s);
    }
}


#[test]
fn no_word_is_selected_five_times_in_a_row() {
    let config = EngineConfig {
        // At a low temperature the word with more attempts is drawn almost every time.
        scoring: ScoringConfig { temperature: 0.05, ..ScoringConfig::default() },
        ..no_recurrence()
    };
    let mut session =
        Session::start_with_rng(vocabulary(&[("가다", "go"), ("오다", "come")]), &config, StdRng::seed_from_u64(7));

    let mut previous = String::new();
    let mut run = 0;
    for _ in 0..300 {
        let korean = session.current_presentation().unwrap().word.korean;
        if korean == previous {
            run += 1;
        } else {
            run = 1;
            previous = korean.clone();
        }
        assert!(run <= 4, "{} was selected {} times in a row", korean, run);

        // Never answer correctly, so that nothing graduates.
        session.submit_guess(&Guess::korean("틀림")).unwrap();
        session.advance().unwrap();
    }
}

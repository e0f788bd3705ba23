/**
 * Engine configuration. Every option has a documented range; values outside of it are
 * clamped to the nearest bound rather than rejected.
 */
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::common::Result;
use super::session::PresentationMode;


pub const WINDOW_RANGE: (usize, usize) = (1, 10);
pub const STREAK_RANGE: (u32, u32) = (1, 10);
pub const RECURRENCE_RANGE: (f64, f64) = (0.0, 0.5);
const MIN_TEMPERATURE: f64 = 0.05;


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// How many words may be in active rotation at once.
    pub active_window_size: usize,
    /// Correct answers in a row after which a word graduates.
    pub consecutive_successes_required: u32,
    /// Chance, on each selection, that one graduated word is mixed back in.
    pub graduated_word_recurrence_rate: f64,
    /// Presentation modes in rotation. Each presentation picks one at random.
    pub modes: Vec<PresentationMode>,
    pub scoring: ScoringConfig,
}


/// Constants of the selection scorer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Weight of how often a word has been attempted this session.
    pub session_weight: f64,
    /// Weight of how badly a word has been going recently.
    pub success_weight: f64,
    /// Softmax temperature. Lower values favor high-scoring words more strongly.
    pub temperature: f64,
}


impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            active_window_size: 5,
            consecutive_successes_required: 5,
            graduated_word_recurrence_rate: 0.2,
            modes: vec![PresentationMode::EnglishToKorean],
            scoring: ScoringConfig::default(),
        }
    }
}


impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            session_weight: 0.4,
            success_weight: 0.6,
            temperature: 0.75,
        }
    }
}


impl EngineConfig {
    /// Load the configuration file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<EngineConfig> {
        match fs::read_to_string(path) {
            Ok(data) => {
                let config: EngineConfig = serde_json::from_str(&data)?;
                Ok(config.clamped())
            }
            Err(ref e) if e.kind() == io::ErrorKind::NotFound => Ok(EngineConfig::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Return a copy with every option brought into its valid range.
    pub fn clamped(&self) -> EngineConfig {
        let window = clamp_logged(
            "active_window_size",
            self.active_window_size,
            WINDOW_RANGE.0,
            WINDOW_RANGE.1,
        );
        let streak = clamp_logged(
            "consecutive_successes_required",
            self.consecutive_successes_required,
            STREAK_RANGE.0,
            STREAK_RANGE.1,
        );
        let recurrence = if self.graduated_word_recurrence_rate.is_nan() {
            tracing::warn!("graduated_word_recurrence_rate is NaN, using 0");
            RECURRENCE_RANGE.0
        } else {
            clamp_logged(
                "graduated_word_recurrence_rate",
                self.graduated_word_recurrence_rate,
                RECURRENCE_RANGE.0,
                RECURRENCE_RANGE.1,
            )
        };

        let mut modes = self.modes.clone();
        modes.dedup();
        if modes.is_empty() {
            tracing::warn!("no presentation modes configured, using English to Korean");
            modes.push(PresentationMode::EnglishToKorean);
        }

        EngineConfig {
            active_window_size: window,
            consecutive_successes_required: streak,
            graduated_word_recurrence_rate: recurrence,
            modes,
            scoring: self.scoring.clamped(),
        }
    }
}


impl ScoringConfig {
    pub fn clamped(&self) -> ScoringConfig {
        let mut session_weight = non_negative("session_weight", self.session_weight);
        let mut success_weight = non_negative("success_weight", self.success_weight);
        if session_weight + success_weight == 0.0 {
            tracing::warn!("scoring weights are both zero, using defaults");
            let defaults = ScoringConfig::default();
            session_weight = defaults.session_weight;
            success_weight = defaults.success_weight;
        }

        let temperature = if self.temperature.is_finite() && self.temperature >= MIN_TEMPERATURE {
            self.temperature
        } else {
            tracing::warn!(value = self.temperature, "temperature out of range, clamping");
            MIN_TEMPERATURE
        };

        ScoringConfig { session_weight, success_weight, temperature }
    }
}


fn non_negative(name: &str, value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!(option = name, value, "scoring weight out of range, using 0");
        0.0
    }
}


fn clamp_logged<T>(name: &str, value: T, low: T, high: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Debug,
{
    if value < low {
        tracing::warn!(option = name, value = ?value, "configuration below range, clamping");
        low
    } else if value > high {
        tracing::warn!(option = name, value = ?value, "configuration above range, clamping");
        high
    } else {
        value
    }
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::unit::QuestionKind;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("a session needs at least one unit")]
    EmptyUnits,

    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("at least one question kind must be configured")]
    NoKinds,

    #[error("repeat count must be > 0")]
    InvalidRepeatCount,

    #[error("base points for {0} must be > 0")]
    InvalidBasePoints(QuestionKind),

    #[error("wrong-answer penalty for {0} must be > 0")]
    InvalidPenalty(QuestionKind),

    #[error("starting hearts must be > 0")]
    InvalidHearts,

    #[error("streak threshold must be > 0")]
    InvalidStreakThreshold,

    #[error("rating thresholds must satisfy 0 < two-star <= three-star <= 100")]
    InvalidRatingThresholds,

    #[error("timer limit must be > 0 seconds")]
    InvalidTimerLimit,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

//
// ─── PER-KIND TABLE ────────────────────────────────────────────────────────────
//

/// A value per question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerKind {
    pub mcq: u32,
    pub writing: u32,
    pub drag: u32,
}

impl PerKind {
    #[must_use]
    pub fn get(&self, kind: QuestionKind) -> u32 {
        match kind {
            QuestionKind::Mcq => self.mcq,
            QuestionKind::Writing => self.writing,
            QuestionKind::Drag => self.drag,
        }
    }
}

//
// ─── TIMER LIMITS ──────────────────────────────────────────────────────────────
//

/// Seconds allowed per question in timed sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerLimits {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl TimerLimits {
    #[must_use]
    pub fn for_difficulty(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

impl Default for TimerLimits {
    fn default() -> Self {
        Self {
            easy: 20,
            medium: 30,
            hard: 40,
        }
    }
}

//
// ─── STREAKS & RATING ──────────────────────────────────────────────────────────
//

/// Bonus paid on every correct answer once the run reaches `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRule {
    pub threshold: u32,
    pub bonus: u32,
}

impl Default for StreakRule {
    fn default() -> Self {
        Self {
            threshold: 3,
            bonus: 5,
        }
    }
}

/// Percent-of-maximum cut-offs for star ratings. One star is any score
/// above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingThresholds {
    pub three_star_percent: u8,
    pub two_star_percent: u8,
}

impl Default for RatingThresholds {
    fn default() -> Self {
        Self {
            three_star_percent: 100,
            two_star_percent: 75,
        }
    }
}

//
// ─── ENGINE CONFIG ─────────────────────────────────────────────────────────────
//

/// Tunables for the assessment engine.
///
/// Defaults:
/// - MCQ and writing questions for every unit, each set repeated twice
/// - 10 points for MCQ, 15 for writing/drag; penalties of 2 and 3
/// - 3 distractors per MCQ, 3 hearts, +5 streak bonus from the 3rd in a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kinds: Vec<QuestionKind>,
    pub base_points: PerKind,
    pub wrong_penalty: PerKind,
    pub repeat_count: u32,
    pub distractor_count: usize,
    pub starting_hearts: u32,
    pub streak: StreakRule,
    pub rating: RatingThresholds,
    pub timer_limits: TimerLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kinds: vec![QuestionKind::Mcq, QuestionKind::Writing],
            base_points: PerKind {
                mcq: 10,
                writing: 15,
                drag: 15,
            },
            wrong_penalty: PerKind {
                mcq: 2,
                writing: 3,
                drag: 3,
            },
            repeat_count: 2,
            distractor_count: 3,
            starting_hearts: 3,
            streak: StreakRule::default(),
            rating: RatingThresholds::default(),
            timer_limits: TimerLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Check every tunable.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::NoKinds);
        }
        if self.repeat_count == 0 {
            return Err(ConfigError::InvalidRepeatCount);
        }
        for kind in QuestionKind::ALL {
            if self.base_points.get(kind) == 0 {
                return Err(ConfigError::InvalidBasePoints(kind));
            }
            if self.wrong_penalty.get(kind) == 0 {
                return Err(ConfigError::InvalidPenalty(kind));
            }
        }
        if self.starting_hearts == 0 {
            return Err(ConfigError::InvalidHearts);
        }
        if self.streak.threshold == 0 {
            return Err(ConfigError::InvalidStreakThreshold);
        }
        let RatingThresholds {
            three_star_percent,
            two_star_percent,
        } = self.rating;
        if two_star_percent == 0 || two_star_percent > three_star_percent || three_star_percent > 100
        {
            return Err(ConfigError::InvalidRatingThresholds);
        }
        let limits = self.timer_limits;
        if limits.easy == 0 || limits.medium == 0 || limits.hard == 0 {
            return Err(ConfigError::InvalidTimerLimit);
        }
        Ok(())
    }

    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<QuestionKind>) -> Self {
        self.kinds = kinds;
        self
    }

    #[must_use]
    pub fn with_repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    #[must_use]
    pub fn with_starting_hearts(mut self, hearts: u32) -> Self {
        self.starting_hearts = hearts;
        self
    }
}

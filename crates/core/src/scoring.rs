//! Points, streaks and star ratings.

use crate::model::{AnswerResult, QuestionInstance, RatingThresholds, StarRating, StreakRule};

/// Bonus for the `n`-th consecutive correct answer.
///
/// Paid on *every* answer from the threshold onwards, not once per streak.
#[must_use]
pub fn streak_bonus(rule: StreakRule, n: u32) -> u32 {
    if n >= rule.threshold { rule.bonus } else { 0 }
}

/// Bucket a score against the session maximum.
///
/// Any positive score earns at least one star; an empty maximum rates zero.
#[must_use]
pub fn star_rating(total: u32, max_possible: u32, thresholds: RatingThresholds) -> StarRating {
    if total == 0 || max_possible == 0 {
        return StarRating::Zero;
    }
    let scaled = u64::from(total) * 100;
    let max = u64::from(max_possible);
    if scaled >= max * u64::from(thresholds.three_star_percent) {
        StarRating::Three
    } else if scaled >= max * u64::from(thresholds.two_star_percent) {
        StarRating::Two
    } else {
        StarRating::One
    }
}

/// Score ceiling for a freshly built queue: every instance answered right
/// the first time, in one unbroken streak.
#[must_use]
pub fn max_possible_score<'a>(
    instances: impl IntoIterator<Item = &'a QuestionInstance>,
    rule: StreakRule,
) -> u32 {
    let mut total = 0_u32;
    let mut run = 0_u32;
    for instance in instances {
        run = run.saturating_add(1);
        total = total
            .saturating_add(instance.starting_points)
            .saturating_add(streak_bonus(rule, run));
    }
    total
}

/// Running score and streak for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreKeeper {
    rule: StreakRule,
    total: u32,
    streak: u32,
}

impl ScoreKeeper {
    #[must_use]
    pub fn new(rule: StreakRule) -> Self {
        Self {
            rule,
            total: 0,
            streak: 0,
        }
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Score one answer and return the points it earned.
    pub fn record_answer(&mut self, result: AnswerResult, points_at_stake: u32) -> u32 {
        let earned = match result {
            AnswerResult::Correct => {
                self.streak = self.streak.saturating_add(1);
                points_at_stake.saturating_add(streak_bonus(self.rule, self.streak))
            }
            AnswerResult::Wrong => {
                self.streak = 0;
                0
            }
        };
        self.total = self.total.saturating_add(earned);
        earned
    }

    pub fn reset(&mut self) {
        self.total = 0;
        self.streak = 0;
    }
}

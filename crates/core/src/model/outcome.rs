use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::answer::AnswerRecord;
use crate::model::ids::{SessionId, UnitSetId};

/// Badge awarded for finishing a session without losing a heart.
pub const PERFECTIONIST_BADGE: &str = "Perfectionist";

//
// ─── STAR RATING ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StarRating {
    Zero,
    One,
    Two,
    Three,
}

impl StarRating {
    #[must_use]
    pub fn stars(self) -> u8 {
        match self {
            StarRating::Zero => 0,
            StarRating::One => 1,
            StarRating::Two => 2,
            StarRating::Three => 3,
        }
    }

    #[must_use]
    pub fn from_stars(stars: u8) -> Option<Self> {
        match stars {
            0 => Some(Self::Zero),
            1 => Some(Self::One),
            2 => Some(Self::Two),
            3 => Some(Self::Three),
            _ => None,
        }
    }
}

//
// ─── SESSION END ───────────────────────────────────────────────────────────────
//

/// Why a finished session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEnd {
    /// Every question instance was resolved.
    Completed,
    /// Hearts ran out first.
    GameOver,
}

//
// ─── OUTCOME ───────────────────────────────────────────────────────────────────
//

/// Final result of a session. Computed once at finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub total_score: u32,
    pub star_rating: StarRating,
    pub badges: BTreeSet<String>,
    pub game_over: bool,
}

/// Payload of the finalize event handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeReport {
    pub session_id: SessionId,
    pub unit_set_id: UnitSetId,
    pub total_score: u32,
    pub max_possible_score: u32,
    pub star_rating: StarRating,
    pub answer_log: Vec<AnswerRecord>,
    pub hearts_used: u32,
    pub badges: BTreeSet<String>,
    pub time_spent_secs: u64,
    pub game_over: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl FinalizeReport {
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome {
            total_score: self.total_score,
            star_rating: self.star_rating,
            badges: self.badges.clone(),
            game_over: self.game_over,
        }
    }
}

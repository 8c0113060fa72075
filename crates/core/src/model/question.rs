use serde::{Deserialize, Serialize};

use crate::model::ids::InstanceId;
use crate::model::unit::{QuestionKind, TestableUnit};

/// One concrete, stateful presentation of a unit in a given kind.
///
/// Owned by the session queue. `points_remaining` only ever goes down; the
/// value it started with is kept in `starting_points` for the score ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionInstance {
    pub id: InstanceId,
    pub unit: TestableUnit,
    pub kind: QuestionKind,
    /// Shuffled answer options. Only populated for `QuestionKind::Mcq`.
    pub options: Option<Vec<String>>,
    pub points_remaining: u32,
    pub starting_points: u32,
    pub attempted: bool,
}

impl QuestionInstance {
    #[must_use]
    pub fn new(id: InstanceId, unit: TestableUnit, kind: QuestionKind, points: u32) -> Self {
        Self {
            id,
            unit,
            kind,
            options: None,
            points_remaining: points,
            starting_points: points,
            attempted: false,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = Some(options);
        self
    }

    /// Deduct a wrong-answer penalty, saturating at zero, and mark the
    /// instance as attempted. Returns the points left.
    pub fn apply_penalty(&mut self, penalty: u32) -> u32 {
        self.points_remaining = self.points_remaining.saturating_sub(penalty);
        self.attempted = true;
        self.points_remaining
    }

    #[must_use]
    pub fn is_depleted(&self) -> bool {
        self.points_remaining == 0
    }
}

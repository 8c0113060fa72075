use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use quiz_core::model::{FinalizeReport, SessionId, UnitSetId};
use storage::repository::{
    AnswerLogRepository, AttemptRecord, AttemptRepository, AttemptRow, ProgressRecord,
    ProgressRepository,
};
use tracing::info;

use crate::error::PersistenceError;

//
// ─── BADGE RULES ───────────────────────────────────────────────────────────────
//

/// Extra badges granted by attempt number, e.g. "first try of lesson 3".
///
/// This is policy data owned by the caller; the engine itself only awards
/// the perfect-run badge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeRules {
    rules: HashMap<(UnitSetId, u32), BTreeSet<String>>,
}

impl BadgeRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `badge` on the given attempt number of `unit_set_id`.
    #[must_use]
    pub fn award(mut self, unit_set_id: UnitSetId, attempt_number: u32, badge: impl Into<String>) -> Self {
        self.rules
            .entry((unit_set_id, attempt_number))
            .or_default()
            .insert(badge.into());
        self
    }

    #[must_use]
    pub fn badges_for(&self, unit_set_id: UnitSetId, attempt_number: u32) -> BTreeSet<String> {
        self.rules
            .get(&(unit_set_id, attempt_number))
            .cloned()
            .unwrap_or_default()
    }
}

//
// ─── RECEIPT ───────────────────────────────────────────────────────────────────
//

/// What the finalize write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeReceipt {
    pub attempt_id: i64,
    pub attempt_number: u32,
    pub badges: BTreeSet<String>,
    pub progress: ProgressRecord,
    pub experience_total: u64,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Writes finished sessions and reads the learner's progress back.
#[derive(Clone)]
pub struct ProgressService {
    answers: Arc<dyn AnswerLogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    progress: Arc<dyn ProgressRepository>,
    rules: BadgeRules,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        answers: Arc<dyn AnswerLogRepository>,
        attempts: Arc<dyn AttemptRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            answers,
            attempts,
            progress,
            rules: BadgeRules::default(),
        }
    }

    #[must_use]
    pub fn with_rules(mut self, rules: BadgeRules) -> Self {
        self.rules = rules;
        self
    }

    /// Persist a finished session.
    ///
    /// Inserts the attempt (with policy badges added), folds it into the unit
    /// set's bests and adds the score to the experience total.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` if any write fails; earlier writes
    /// are not rolled back.
    pub async fn finalize(&self, report: &FinalizeReport) -> Result<FinalizeReceipt, PersistenceError> {
        let attempt_number = self
            .attempts
            .count_attempts(report.unit_set_id)
            .await?
            .saturating_add(1);

        let mut badges = report.badges.clone();
        badges.extend(self.rules.badges_for(report.unit_set_id, attempt_number));

        let attempt = AttemptRecord::from_report(report, attempt_number, badges.clone());
        let attempt_id = self.attempts.insert_attempt(&attempt).await?;
        let progress = self
            .progress
            .merge_progress(
                report.unit_set_id,
                report.total_score,
                report.star_rating,
                report.completed_at,
            )
            .await?;
        let experience_total = self
            .progress
            .add_experience(u64::from(report.total_score))
            .await?;

        info!(
            session_id = %report.session_id,
            unit_set_id = %report.unit_set_id,
            attempt_number,
            total_score = report.total_score,
            stars = report.star_rating.stars(),
            experience_total,
            "session finalized"
        );

        Ok(FinalizeReceipt {
            attempt_id,
            attempt_number,
            badges,
            progress,
            experience_total,
        })
    }

    /// Drop telemetry written for a session that was abandoned.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` if the delete fails.
    pub async fn discard_session(&self, session_id: SessionId) -> Result<u64, PersistenceError> {
        Ok(self.answers.delete_session_answers(session_id).await?)
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn progress_for(
        &self,
        unit_set_id: UnitSetId,
    ) -> Result<Option<ProgressRecord>, PersistenceError> {
        Ok(self.progress.get_progress(unit_set_id).await?)
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn experience_total(&self) -> Result<u64, PersistenceError> {
        Ok(self.progress.total_experience().await?)
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn recent_attempts(
        &self,
        unit_set_id: UnitSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, PersistenceError> {
        Ok(self.attempts.list_attempts(unit_set_id, limit).await?)
    }
}

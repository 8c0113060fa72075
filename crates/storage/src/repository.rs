use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerRecord, FinalizeReport, SessionId, StarRating, UnitSetId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// One per-answer telemetry row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerLogEntry {
    pub session_id: SessionId,
    pub unit_set_id: UnitSetId,
    /// Position of the answer within its session, starting at 1.
    pub sequence: u32,
    pub record: AnswerRecord,
    pub recorded_at: DateTime<Utc>,
}

/// Full record of a finished attempt, written once at finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub session_id: SessionId,
    pub unit_set_id: UnitSetId,
    pub attempt_number: u32,
    pub total_score: u32,
    pub max_possible_score: u32,
    pub stars: StarRating,
    pub hearts_used: u32,
    pub badges: BTreeSet<String>,
    pub time_spent_secs: u64,
    pub game_over: bool,
    pub answer_log: Vec<AnswerRecord>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl AttemptRecord {
    /// Build the stored attempt from a finalize report.
    ///
    /// `badges` replaces the report's badge set so callers can add
    /// policy-driven badges first.
    #[must_use]
    pub fn from_report(
        report: &FinalizeReport,
        attempt_number: u32,
        badges: BTreeSet<String>,
    ) -> Self {
        Self {
            session_id: report.session_id,
            unit_set_id: report.unit_set_id,
            attempt_number,
            total_score: report.total_score,
            max_possible_score: report.max_possible_score,
            stars: report.star_rating,
            hearts_used: report.hearts_used,
            badges,
            time_spent_secs: report.time_spent_secs,
            game_over: report.game_over,
            answer_log: report.answer_log.clone(),
            started_at: report.started_at,
            completed_at: report.completed_at,
        }
    }
}

/// Attempt plus its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRow {
    pub id: i64,
    pub attempt: AttemptRecord,
}

/// Best results per unit set. Bests only ever go up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub unit_set_id: UnitSetId,
    pub best_score: u32,
    pub best_stars: StarRating,
    pub attempts: u32,
    pub last_played_at: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn first(
        unit_set_id: UnitSetId,
        score: u32,
        stars: StarRating,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            unit_set_id,
            best_score: score,
            best_stars: stars,
            attempts: 1,
            last_played_at: at,
        }
    }

    /// Fold one more attempt into the record.
    #[must_use]
    pub fn merged(self, score: u32, stars: StarRating, at: DateTime<Utc>) -> Self {
        Self {
            unit_set_id: self.unit_set_id,
            best_score: self.best_score.max(score),
            best_stars: self.best_stars.max(stars),
            attempts: self.attempts.saturating_add(1),
            last_played_at: at.max(self.last_played_at),
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Per-answer telemetry.
#[async_trait]
pub trait AnswerLogRepository: Send + Sync {
    /// Append one answer row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_answer(&self, entry: &AnswerLogEntry) -> Result<i64, StorageError>;

    /// All rows of a session, in answer order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<AnswerLogEntry>, StorageError>;

    /// Discard every row of a session. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn delete_session_answers(&self, session_id: SessionId) -> Result<u64, StorageError>;
}

/// Finished attempts.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Insert a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session was already stored.
    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn count_attempts(&self, unit_set_id: UnitSetId) -> Result<u32, StorageError>;

    /// Most recent attempts first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_attempts(
        &self,
        unit_set_id: UnitSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError>;
}

/// Best scores per unit set and the learner's experience total.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Merge an attempt into the unit set's progress by monotonic max.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn merge_progress(
        &self,
        unit_set_id: UnitSetId,
        score: u32,
        stars: StarRating,
        at: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn get_progress(
        &self,
        unit_set_id: UnitSetId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Add experience points and return the new total.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn add_experience(&self, points: u64) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn total_experience(&self) -> Result<u64, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    answers: Vec<(i64, AnswerLogEntry)>,
    attempts: Vec<(i64, AttemptRecord)>,
    progress: HashMap<UnitSetId, ProgressRecord>,
    experience: u64,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl AnswerLogRepository for InMemoryRepository {
    async fn append_answer(&self, entry: &AnswerLogEntry) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        let id = guard.next_id();
        guard.answers.push((id, entry.clone()));
        Ok(id)
    }

    async fn list_answers(&self, session_id: SessionId) -> Result<Vec<AnswerLogEntry>, StorageError> {
        let guard = self.lock()?;
        let mut out: Vec<AnswerLogEntry> = guard
            .answers
            .iter()
            .filter(|(_, e)| e.session_id == session_id)
            .map(|(_, e)| e.clone())
            .collect();
        out.sort_by_key(|e| e.sequence);
        Ok(out)
    }

    async fn delete_session_answers(&self, session_id: SessionId) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.answers.len();
        guard.answers.retain(|(_, e)| e.session_id != session_id);
        Ok((before - guard.answers.len()) as u64)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn insert_attempt(&self, attempt: &AttemptRecord) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .attempts
            .iter()
            .any(|(_, a)| a.session_id == attempt.session_id)
        {
            return Err(StorageError::Conflict);
        }
        let id = guard.next_id();
        guard.attempts.push((id, attempt.clone()));
        Ok(id)
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, StorageError> {
        let guard = self.lock()?;
        guard
            .attempts
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, a)| a.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn count_attempts(&self, unit_set_id: UnitSetId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard
            .attempts
            .iter()
            .filter(|(_, a)| a.unit_set_id == unit_set_id)
            .count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("attempt count overflow".into()))
    }

    async fn list_attempts(
        &self,
        unit_set_id: UnitSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let guard = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .attempts
            .iter()
            .rev()
            .filter(|(_, a)| a.unit_set_id == unit_set_id)
            .take(limit)
            .map(|(id, a)| AttemptRow {
                id: *id,
                attempt: a.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn merge_progress(
        &self,
        unit_set_id: UnitSetId,
        score: u32,
        stars: StarRating,
        at: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let mut guard = self.lock()?;
        let merged = match guard.progress.remove(&unit_set_id) {
            Some(existing) => existing.merged(score, stars, at),
            None => ProgressRecord::first(unit_set_id, score, stars, at),
        };
        guard.progress.insert(unit_set_id, merged.clone());
        Ok(merged)
    }

    async fn get_progress(
        &self,
        unit_set_id: UnitSetId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&unit_set_id).cloned())
    }

    async fn add_experience(&self, points: u64) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        guard.experience = guard.experience.saturating_add(points);
        Ok(guard.experience)
    }

    async fn total_experience(&self) -> Result<u64, StorageError> {
        Ok(self.lock()?.experience)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub answers: Arc<dyn AnswerLogRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let answers: Arc<dyn AnswerLogRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            answers,
            attempts,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerResult, QuestionKind};
    use quiz_core::time::fixed_now;

    fn record(result: AnswerResult, points: u32) -> AnswerRecord {
        AnswerRecord {
            symbol: "ᚹ".into(),
            label: "wunjo".into(),
            kind: QuestionKind::Mcq,
            expected: "w".into(),
            result,
            points_earned: points,
            time_taken: None,
        }
    }

    fn attempt(session_id: SessionId, unit_set: u64) -> AttemptRecord {
        AttemptRecord {
            session_id,
            unit_set_id: UnitSetId::new(unit_set),
            attempt_number: 1,
            total_score: 10,
            max_possible_score: 10,
            stars: StarRating::Three,
            hearts_used: 0,
            badges: BTreeSet::new(),
            time_spent_secs: 12,
            game_over: false,
            answer_log: vec![record(AnswerResult::Correct, 10)],
            started_at: fixed_now(),
            completed_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn answers_are_listed_and_deleted_per_session() {
        let repo = InMemoryRepository::new();
        let keep = SessionId::new();
        let drop = SessionId::new();
        for (session_id, sequence) in [(keep, 2), (keep, 1), (drop, 1)] {
            repo.append_answer(&AnswerLogEntry {
                session_id,
                unit_set_id: UnitSetId::new(1),
                sequence,
                record: record(AnswerResult::Wrong, 0),
                recorded_at: fixed_now(),
            })
            .await
            .unwrap();
        }

        assert_eq!(repo.delete_session_answers(drop).await.unwrap(), 1);
        let kept = repo.list_answers(keep).await.unwrap();
        assert_eq!(kept.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert!(repo.list_answers(drop).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_session_attempt_conflicts() {
        let repo = InMemoryRepository::new();
        let session_id = SessionId::new();
        let id = repo.insert_attempt(&attempt(session_id, 1)).await.unwrap();
        assert_eq!(repo.get_attempt(id).await.unwrap().total_score, 10);
        let err = repo.insert_attempt(&attempt(session_id, 1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.count_attempts(UnitSetId::new(1)).await.unwrap(), 1);
        assert_eq!(repo.count_attempts(UnitSetId::new(2)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn progress_merge_never_decreases_bests() {
        let repo = InMemoryRepository::new();
        let set = UnitSetId::new(4);
        repo.merge_progress(set, 80, StarRating::Two, fixed_now()).await.unwrap();
        let merged = repo
            .merge_progress(set, 40, StarRating::One, fixed_now())
            .await
            .unwrap();
        assert_eq!(merged.best_score, 80);
        assert_eq!(merged.best_stars, StarRating::Two);
        assert_eq!(merged.attempts, 2);

        let merged = repo
            .merge_progress(set, 95, StarRating::Three, fixed_now())
            .await
            .unwrap();
        assert_eq!(merged.best_score, 95);
        assert_eq!(merged.best_stars, StarRating::Three);
    }

    #[tokio::test]
    async fn experience_accumulates() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.total_experience().await.unwrap(), 0);
        assert_eq!(repo.add_experience(30).await.unwrap(), 30);
        assert_eq!(repo.add_experience(12).await.unwrap(), 42);
    }
}

//! Best-effort persistence capability injected into the session controller.
//!
//! Calls never block and never fail from the controller's point of view.
//! `StorageSink` queues every event to a single background task so writes
//! for one session land in the order they were emitted; failures are logged
//! and dropped.

use std::sync::Arc;

use quiz_core::model::{FinalizeReport, SessionId};
use storage::repository::{AnswerLogEntry, AnswerLogRepository};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::progress_service::ProgressService;

pub trait SessionSink: Send + Sync {
    /// Per-answer telemetry. Fire-and-forget.
    fn answer_recorded(&self, entry: &AnswerLogEntry);

    /// Emitted exactly once for a completed or game-over session.
    fn session_finalized(&self, report: &FinalizeReport);

    /// Emitted when the learner quits; telemetry for the session may be
    /// discarded.
    fn session_abandoned(&self, session_id: SessionId);
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl SessionSink for NullSink {
    fn answer_recorded(&self, _entry: &AnswerLogEntry) {}
    fn session_finalized(&self, _report: &FinalizeReport) {}
    fn session_abandoned(&self, _session_id: SessionId) {}
}

enum SinkEvent {
    Answer(AnswerLogEntry),
    Finalize(Box<FinalizeReport>),
    Abandon(SessionId),
    Flush(oneshot::Sender<()>),
}

/// Sink that writes through to storage on a background task.
#[derive(Clone)]
pub struct StorageSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl StorageSink {
    /// Spawn the writer task on the current tokio runtime.
    ///
    /// The task ends once every clone of the sink has been dropped and the
    /// queue is drained.
    #[must_use]
    pub fn spawn(
        answers: Arc<dyn AnswerLogRepository>,
        progress: ProgressService,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_writer(rx, answers, progress));
        (Self { tx }, handle)
    }

    /// Wait until every event queued before this call has been handled.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::WorkerStopped` if the writer task is gone.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(SinkEvent::Flush(done_tx))
            .map_err(|_| PersistenceError::WorkerStopped)?;
        done_rx.await.map_err(|_| PersistenceError::WorkerStopped)
    }

    fn enqueue(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            warn!("persistence worker stopped; dropping session event");
        }
    }
}

impl SessionSink for StorageSink {
    fn answer_recorded(&self, entry: &AnswerLogEntry) {
        self.enqueue(SinkEvent::Answer(entry.clone()));
    }

    fn session_finalized(&self, report: &FinalizeReport) {
        self.enqueue(SinkEvent::Finalize(Box::new(report.clone())));
    }

    fn session_abandoned(&self, session_id: SessionId) {
        self.enqueue(SinkEvent::Abandon(session_id));
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<SinkEvent>,
    answers: Arc<dyn AnswerLogRepository>,
    progress: ProgressService,
) {
    while let Some(event) = rx.recv().await {
        match event {
            SinkEvent::Answer(entry) => {
                if let Err(err) = answers.append_answer(&entry).await {
                    warn!(
                        session_id = %entry.session_id,
                        sequence = entry.sequence,
                        error = %err,
                        "failed to store answer telemetry"
                    );
                }
            }
            SinkEvent::Finalize(report) => {
                if let Err(err) = progress.finalize(&report).await {
                    warn!(
                        session_id = %report.session_id,
                        error = %err,
                        "failed to store finished session"
                    );
                }
            }
            SinkEvent::Abandon(session_id) => match progress.discard_session(session_id).await {
                Ok(removed) => debug!(%session_id, removed, "discarded abandoned session telemetry"),
                Err(err) => warn!(%session_id, error = %err, "failed to discard session telemetry"),
            },
            SinkEvent::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{AnswerRecord, AnswerResult, QuestionKind, StarRating, UnitSetId};
    use quiz_core::time::fixed_now;
    use std::collections::BTreeSet;
    use storage::repository::{Storage, StorageError};

    struct BrokenAnswers;

    #[async_trait]
    impl AnswerLogRepository for BrokenAnswers {
        async fn append_answer(&self, _entry: &AnswerLogEntry) -> Result<i64, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn list_answers(&self, _id: SessionId) -> Result<Vec<AnswerLogEntry>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn delete_session_answers(&self, _id: SessionId) -> Result<u64, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn entry(session_id: SessionId, sequence: u32) -> AnswerLogEntry {
        AnswerLogEntry {
            session_id,
            unit_set_id: UnitSetId::new(1),
            sequence,
            record: AnswerRecord {
                symbol: "ᛊ".into(),
                label: "sowilo".into(),
                kind: QuestionKind::Mcq,
                expected: "s".into(),
                result: AnswerResult::Correct,
                points_earned: 10,
                time_taken: None,
            },
            recorded_at: fixed_now(),
        }
    }

    fn progress(storage: &Storage) -> ProgressService {
        ProgressService::new(
            Arc::clone(&storage.answers),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        )
    }

    #[tokio::test]
    async fn abandon_runs_after_pending_answers() {
        let storage = Storage::in_memory();
        let (sink, _worker) = StorageSink::spawn(Arc::clone(&storage.answers), progress(&storage));
        let session_id = SessionId::new();

        sink.answer_recorded(&entry(session_id, 1));
        sink.answer_recorded(&entry(session_id, 2));
        sink.session_abandoned(session_id);
        sink.flush().await.unwrap();

        assert!(storage.answers.list_answers(session_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_writes_do_not_stop_the_worker() {
        let storage = Storage::in_memory();
        let (sink, worker) = StorageSink::spawn(Arc::new(BrokenAnswers), progress(&storage));
        let session_id = SessionId::new();

        sink.answer_recorded(&entry(session_id, 1));
        sink.session_finalized(&FinalizeReport {
            session_id,
            unit_set_id: UnitSetId::new(1),
            total_score: 10,
            max_possible_score: 10,
            star_rating: StarRating::Three,
            answer_log: vec![entry(session_id, 1).record],
            hearts_used: 0,
            badges: BTreeSet::new(),
            time_spent_secs: 3,
            game_over: false,
            started_at: fixed_now(),
            completed_at: fixed_now(),
        });
        sink.flush().await.unwrap();

        let stored = storage
            .progress
            .get_progress(UnitSetId::new(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.best_score, 10);

        drop(sink);
        worker.await.unwrap();
    }
}

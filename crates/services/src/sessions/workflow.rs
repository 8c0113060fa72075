use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{EngineConfig, UnitSetId};
use storage::repository::{AttemptRow, ProgressRecord, Storage};
use tracing::info;

use super::controller::SessionController;
use super::runner::SessionRunner;
use super::view::SessionRequest;
use crate::error::{AppServicesError, PersistenceError, SessionError};
use crate::progress_service::{BadgeRules, ProgressService};
use crate::sink::StorageSink;

/// Starts sessions wired to persistent storage and reads progress back.
///
/// Every controller handed out shares one `StorageSink`, so answer
/// telemetry and finalize writes from all sessions go through a single
/// ordered writer.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    config: EngineConfig,
    sink: StorageSink,
    progress: ProgressService,
}

impl SessionLoopService {
    /// Must be called from within a tokio runtime; the storage writer is
    /// spawned here.
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, config: EngineConfig, rules: BadgeRules) -> Self {
        let progress = ProgressService::new(
            Arc::clone(&storage.answers),
            Arc::clone(&storage.attempts),
            Arc::clone(&storage.progress),
        )
        .with_rules(rules);
        let (sink, _worker) = StorageSink::spawn(Arc::clone(&storage.answers), progress.clone());
        Self {
            clock,
            config,
            sink,
            progress,
        }
    }

    /// Build the service on a migrated `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the config is invalid or storage
    /// initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: EngineConfig,
        rules: BadgeRules,
    ) -> Result<Self, AppServicesError> {
        config.validate()?;
        let storage = Storage::sqlite(db_url).await?;
        info!(db_url, "session storage ready");
        Ok(Self::new(clock, &storage, config, rules))
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    /// Start a session whose answers and result are persisted.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid config or request.
    pub fn start_session(&self, request: SessionRequest) -> Result<SessionController, SessionError> {
        let mut controller = self.controller();
        controller.start(request)?;
        Ok(controller)
    }

    /// Like `start_session`, with reproducible shuffles.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid config or request.
    pub fn start_seeded(
        &self,
        request: SessionRequest,
        seed: u64,
    ) -> Result<SessionController, SessionError> {
        let mut controller = self.controller().with_seed(seed);
        controller.start(request)?;
        Ok(controller)
    }

    /// Start a session and wrap it in an async runner.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Config` for an invalid config or request.
    pub fn start_runner(&self, request: SessionRequest) -> Result<SessionRunner, SessionError> {
        Ok(SessionRunner::new(self.start_session(request)?))
    }

    /// Wait for every queued write to land.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::WorkerStopped` if the writer is gone.
    pub async fn flush(&self) -> Result<(), PersistenceError> {
        self.sink.flush().await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn progress_for(
        &self,
        unit_set_id: UnitSetId,
    ) -> Result<Option<ProgressRecord>, PersistenceError> {
        self.progress.progress_for(unit_set_id).await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn experience_total(&self) -> Result<u64, PersistenceError> {
        self.progress.experience_total().await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError::Storage` on read failures.
    pub async fn recent_attempts(
        &self,
        unit_set_id: UnitSetId,
        limit: u32,
    ) -> Result<Vec<AttemptRow>, PersistenceError> {
        self.progress.recent_attempts(unit_set_id, limit).await
    }

    fn controller(&self) -> SessionController {
        SessionController::new(self.config.clone(), self.clock, Arc::new(self.sink.clone()))
    }
}

//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::ConfigError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session controller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already started")]
    AlreadyStarted,
    #[error("session is not in progress")]
    NotInProgress,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors emitted while writing session results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("persistence worker has stopped")]
    WorkerStopped,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

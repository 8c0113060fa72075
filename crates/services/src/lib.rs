#![forbid(unsafe_code)]

pub mod error;
pub mod progress_service;
pub mod sessions;
pub mod sink;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{AppServicesError, PersistenceError, SessionError};
pub use progress_service::{BadgeRules, FinalizeReceipt, ProgressService};
pub use sink::{NullSink, SessionSink, StorageSink};

pub use sessions::{
    AnswerFeedback, Presentation, RunOutcome, RunnerEvent, RunnerInput, SessionController,
    SessionLoopService, SessionPhase, SessionProgress, SessionRequest, SessionRunner,
    SubmitOutcome, TickOutcome,
};

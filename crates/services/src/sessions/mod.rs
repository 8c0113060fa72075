mod controller;
mod runner;
mod ticker;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::SessionController;
pub use runner::{RunnerEvent, RunnerInput, SessionRunner};
pub use ticker::{Ticker, TimerTick};
pub use view::{
    AnswerFeedback, Presentation, RunOutcome, SessionPhase, SessionProgress, SessionRequest,
    SubmitOutcome, TickOutcome,
};
pub use workflow::SessionLoopService;

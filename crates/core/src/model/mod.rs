mod answer;
mod config;
mod ids;
mod outcome;
mod question;
mod unit;

pub use answer::{AnswerRecord, AnswerResult, Submission};
pub use config::{
    ConfigError, Difficulty, EngineConfig, PerKind, RatingThresholds, StreakRule, TimerLimits,
};
pub use ids::{InstanceId, ParseIdError, QuestionToken, SessionId, UnitSetId};
pub use outcome::{FinalizeReport, Outcome, PERFECTIONIST_BADGE, SessionEnd, StarRating};
pub use question::QuestionInstance;
pub use unit::{QuestionKind, TestableUnit, UnknownKind};

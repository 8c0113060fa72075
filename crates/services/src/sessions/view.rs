use quiz_core::model::{
    AnswerRecord, Difficulty, FinalizeReport, Outcome, QuestionInstance, QuestionToken,
    SessionEnd, SessionId, TestableUnit, UnitSetId,
};
use quiz_core::queue::QueueChange;

//
// ─── REQUEST ───────────────────────────────────────────────────────────────────
//

/// Everything the caller picks before a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub unit_set_id: UnitSetId,
    pub units: Vec<TestableUnit>,
    pub difficulty: Difficulty,
    /// Number of distinct units to draw; `None` uses them all.
    pub question_count: Option<usize>,
    pub timed: bool,
    /// Extra distractor candidates for multiple-choice questions.
    pub distractor_pool: Vec<String>,
}

impl SessionRequest {
    #[must_use]
    pub fn new(unit_set_id: UnitSetId, units: Vec<TestableUnit>) -> Self {
        Self {
            unit_set_id,
            units,
            difficulty: Difficulty::default(),
            question_count: None,
            timed: false,
            distractor_pool: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_question_count(mut self, count: usize) -> Self {
        self.question_count = Some(count);
        self
    }

    #[must_use]
    pub fn timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    #[must_use]
    pub fn with_distractor_pool(mut self, pool: Vec<String>) -> Self {
        self.distractor_pool = pool;
        self
    }
}

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Setup,
    InProgress,
    Finished(SessionEnd),
    Abandoned,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Finished(_) | SessionPhase::Abandoned)
    }
}

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

/// The question currently shown, with what the UI needs around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub session_id: SessionId,
    pub token: QuestionToken,
    pub instance: QuestionInstance,
    pub hearts: u32,
    /// Seconds left on the clock; `None` for untimed sessions.
    pub remaining_secs: Option<u32>,
    pub position: usize,
    pub remaining_questions: usize,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub answered: usize,
    pub remaining: usize,
    pub hearts: u32,
    pub streak: u32,
    pub total_score: u32,
    pub max_possible_score: u32,
}

/// Result of one processed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub record: AnswerRecord,
    pub change: QueueChange,
    pub hearts: u32,
    pub streak: u32,
    pub total_score: u32,
    /// Set when this answer ended the session.
    pub outcome: Option<Outcome>,
    /// The question presented next, if the session continues.
    pub next: Option<Presentation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted(Box<AnswerFeedback>),
    /// Stale token or no session in progress; nothing changed.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Running { remaining: u32 },
    /// Time ran out and the question was auto-submitted.
    Expired(Box<AnswerFeedback>),
}

/// Terminal state of a session driven by `SessionRunner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub phase: SessionPhase,
    pub report: Option<FinalizeReport>,
}

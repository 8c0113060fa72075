use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// How a unit is put to the learner.
///
/// - `Mcq`: pick the expected answer among shuffled options
/// - `Writing`: draw or type the symbol; judged by a recognizer or by text match
/// - `Drag`: drag the symbol onto its target; judged by the drag comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Mcq,
    Writing,
    Drag,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [QuestionKind::Mcq, QuestionKind::Writing, QuestionKind::Drag];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::Writing => "writing",
            QuestionKind::Drag => "drag",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a question kind label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown question kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for QuestionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcq" => Ok(Self::Mcq),
            "writing" => Ok(Self::Writing),
            "drag" => Ok(Self::Drag),
            _ => Err(UnknownKind(s.to_owned())),
        }
    }
}

//
// ─── TESTABLE UNIT ─────────────────────────────────────────────────────────────
//

/// One piece of content under test: a glyph or a word, with the answer the
/// learner must produce for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestableUnit {
    pub symbol: String,
    pub expected_answer: String,
    pub label: String,
    /// Restricts the unit to a single kind instead of the configured list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type_hint: Option<QuestionKind>,
}

impl TestableUnit {
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        expected_answer: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            expected_answer: expected_answer.into(),
            label: label.into(),
            question_type_hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, kind: QuestionKind) -> Self {
        self.question_type_hint = Some(kind);
        self
    }
}

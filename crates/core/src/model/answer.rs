use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::unit::QuestionKind;

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnswerResult {
    Correct,
    Wrong,
}

impl AnswerResult {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, AnswerResult::Correct)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerResult::Correct => "CORRECT",
            AnswerResult::Wrong => "WRONG",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CORRECT" => Some(Self::Correct),
            "WRONG" => Some(Self::Wrong),
            _ => None,
        }
    }
}

impl fmt::Display for AnswerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// What the UI hands back for the presented question.
///
/// Typed and multiple-choice answers arrive as text and are judged here.
/// Handwriting and drag answers are judged by an external recognizer or
/// comparator, which only passes its verdict along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submission {
    Value(String),
    Verdict(AnswerResult),
}

impl Submission {
    #[must_use]
    pub fn value(value: impl Into<String>) -> Self {
        Self::Value(value.into())
    }

    #[must_use]
    pub fn verdict(result: AnswerResult) -> Self {
        Self::Verdict(result)
    }

    /// Judge this submission against the expected answer.
    ///
    /// Text is compared trimmed and case-insensitively.
    #[must_use]
    pub fn judge(&self, expected: &str) -> AnswerResult {
        match self {
            Submission::Verdict(result) => *result,
            Submission::Value(value) => {
                if answers_match(value, expected) {
                    AnswerResult::Correct
                } else {
                    AnswerResult::Wrong
                }
            }
        }
    }
}

fn answers_match(given: &str, expected: &str) -> bool {
    let given = given.trim();
    !given.is_empty() && given.to_lowercase() == expected.trim().to_lowercase()
}

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// One submitted answer. Append-only: a unit answered wrong twice and then
/// correctly produces three records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub symbol: String,
    pub label: String,
    pub kind: QuestionKind,
    pub expected: String,
    pub result: AnswerResult,
    pub points_earned: u32,
    /// Seconds on the clock for timed sessions; `None` when untimed.
    pub time_taken: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_submission_is_trimmed_and_case_insensitive() {
        assert_eq!(Submission::value(" NG ").judge("ng"), AnswerResult::Correct);
        assert_eq!(Submission::value("n").judge("ng"), AnswerResult::Wrong);
        assert_eq!(Submission::value("   ").judge(""), AnswerResult::Wrong);
    }

    #[test]
    fn verdict_submission_is_taken_as_is() {
        assert_eq!(
            Submission::verdict(AnswerResult::Wrong).judge("anything"),
            AnswerResult::Wrong
        );
        assert_eq!(
            Submission::verdict(AnswerResult::Correct).judge("anything"),
            AnswerResult::Correct
        );
    }

    #[test]
    fn result_labels_round_trip() {
        assert_eq!(AnswerResult::parse("CORRECT"), Some(AnswerResult::Correct));
        assert_eq!(AnswerResult::parse(AnswerResult::Wrong.as_str()), Some(AnswerResult::Wrong));
        assert_eq!(AnswerResult::parse("maybe"), None);
    }
}

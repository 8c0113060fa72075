//! Async driver that feeds a `SessionController` from a UI channel and a
//! per-question countdown.

use std::time::Duration;

use quiz_core::model::{FinalizeReport, QuestionToken, SessionId, Submission};
use tokio::sync::mpsc;
use tracing::debug;

use super::controller::SessionController;
use super::ticker::{Ticker, TimerTick};
use super::view::{AnswerFeedback, Presentation, RunOutcome, SubmitOutcome, TickOutcome};

/// What the UI sends to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerInput {
    Answer {
        token: QuestionToken,
        submission: Submission,
    },
    /// Current contents of the answer field; submitted if time runs out.
    Draft { token: QuestionToken, value: String },
    Quit,
}

/// What a running session reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerEvent {
    Presented(Presentation),
    TimeLeft {
        token: QuestionToken,
        remaining: u32,
    },
    Answered(Box<AnswerFeedback>),
    Finished(Box<FinalizeReport>),
    Abandoned(SessionId),
}

/// Owns a started controller until the session ends.
#[derive(Debug)]
pub struct SessionRunner {
    controller: SessionController,
    tick_period: Duration,
}

impl SessionRunner {
    #[must_use]
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller,
            tick_period: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Drive the session to a terminal phase.
    ///
    /// Answers and countdown ticks are handled one at a time in arrival
    /// order. Closing the input channel quits the session. Events are
    /// best-effort: a dropped receiver does not stop the session.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<RunnerInput>,
        events: mpsc::UnboundedSender<RunnerEvent>,
    ) -> RunOutcome {
        let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<TimerTick>();
        let mut ticker: Option<Ticker> = None;

        if let Some(first) = self.controller.presentation() {
            emit(&events, RunnerEvent::Presented(first));
        }

        while self.controller.is_in_progress() {
            if self.controller.is_timed() {
                let current = self.controller.presentation().map(|p| p.token);
                if ticker.as_ref().map(Ticker::token) != current {
                    ticker = current.map(|token| Ticker::start(token, self.tick_period, tick_tx.clone()));
                }
            }

            tokio::select! {
                input = inputs.recv() => match input {
                    Some(RunnerInput::Answer { token, submission }) => {
                        if let SubmitOutcome::Accepted(feedback) = self.controller.submit(token, submission) {
                            emit_feedback(&events, feedback);
                        }
                    }
                    Some(RunnerInput::Draft { token, value }) => {
                        self.controller.update_draft(token, value);
                    }
                    Some(RunnerInput::Quit) | None => {
                        if self.controller.abandon().is_ok() {
                            emit(&events, RunnerEvent::Abandoned(self.controller.session_id()));
                        }
                    }
                },
                Some(tick) = tick_rx.recv() => match self.controller.tick(tick.token) {
                    TickOutcome::Ignored => {}
                    TickOutcome::Running { remaining } => {
                        emit(&events, RunnerEvent::TimeLeft { token: tick.token, remaining });
                    }
                    TickOutcome::Expired(feedback) => emit_feedback(&events, feedback),
                },
            }
        }

        drop(ticker);
        if let Some(report) = self.controller.report() {
            emit(&events, RunnerEvent::Finished(Box::new(report.clone())));
        }
        RunOutcome {
            phase: self.controller.phase(),
            report: self.controller.report().cloned(),
        }
    }
}

fn emit_feedback(events: &mpsc::UnboundedSender<RunnerEvent>, feedback: Box<AnswerFeedback>) {
    let next = feedback.next.clone();
    emit(events, RunnerEvent::Answered(feedback));
    if let Some(next) = next {
        emit(events, RunnerEvent::Presented(next));
    }
}

fn emit(events: &mpsc::UnboundedSender<RunnerEvent>, event: RunnerEvent) {
    if events.send(event).is_err() {
        debug!("runner event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use crate::sessions::view::{SessionPhase, SessionRequest};
    use quiz_core::model::{
        AnswerResult, EngineConfig, QuestionKind, SessionEnd, TestableUnit, UnitSetId,
    };
    use quiz_core::time::fixed_clock;
    use std::sync::Arc;

    fn started(config: EngineConfig, timed: bool) -> SessionRunner {
        let units = vec![
            TestableUnit::new("ᚠ", "f", "fehu"),
            TestableUnit::new("ᚢ", "u", "uruz"),
            TestableUnit::new("ᚦ", "th", "thurisaz"),
        ];
        let mut controller =
            SessionController::new(config, fixed_clock(), Arc::new(NullSink)).with_seed(9);
        controller
            .start(SessionRequest::new(UnitSetId::new(1), units).timed(timed))
            .unwrap();
        SessionRunner::new(controller)
    }

    fn single_pass() -> EngineConfig {
        EngineConfig::default()
            .with_kinds(vec![QuestionKind::Mcq])
            .with_repeat_count(1)
    }

    #[tokio::test]
    async fn answers_from_channel_complete_the_session() {
        let runner = started(single_pass(), false);
        let (input_tx, input_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let run = tokio::spawn(runner.run(input_rx, event_tx));

        let mut finished = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                RunnerEvent::Presented(p) => {
                    let answer = Submission::value(p.instance.unit.expected_answer.clone());
                    input_tx
                        .send(RunnerInput::Answer { token: p.token, submission: answer })
                        .await
                        .unwrap();
                }
                RunnerEvent::Finished(report) => finished = Some(report),
                _ => {}
            }
        }

        let outcome = run.await.unwrap();
        assert_eq!(outcome.phase, SessionPhase::Finished(SessionEnd::Completed));
        let report = outcome.report.unwrap();
        assert_eq!(report.total_score, 35);
        assert_eq!(finished.as_deref(), Some(&report));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timed_session_runs_out_of_hearts() {
        let runner = started(single_pass(), true);
        let (_input_tx, input_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let outcome = runner.run(input_rx, event_tx).await;

        assert_eq!(outcome.phase, SessionPhase::Finished(SessionEnd::GameOver));
        let report = outcome.report.unwrap();
        assert!(report.game_over);
        assert_eq!(report.hearts_used, 3);
        assert_eq!(report.answer_log.len(), 3);
        assert!(report
            .answer_log
            .iter()
            .all(|r| r.result == AnswerResult::Wrong && r.time_taken == Some(30)));

        let mut time_left = 0;
        while let Ok(event) = event_rx.try_recv() {
            if matches!(event, RunnerEvent::TimeLeft { .. }) {
                time_left += 1;
            }
        }
        assert_eq!(time_left, 3 * 29);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_is_submitted_when_time_runs_out() {
        let runner = started(single_pass(), true);
        let first = runner.controller().presentation().unwrap();
        let (input_tx, input_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        input_tx
            .send(RunnerInput::Draft {
                token: first.token,
                value: first.instance.unit.expected_answer.clone(),
            })
            .await
            .unwrap();
        let run = tokio::spawn(runner.run(input_rx, event_tx));

        let feedback = loop {
            match event_rx.recv().await {
                Some(RunnerEvent::Answered(feedback)) => break feedback,
                Some(_) => {}
                None => panic!("runner stopped early"),
            }
        };
        assert_eq!(feedback.record.result, AnswerResult::Correct);
        assert_eq!(feedback.record.time_taken, Some(30));

        input_tx.send(RunnerInput::Quit).await.unwrap();
        let outcome = run.await.unwrap();
        assert_eq!(outcome.phase, SessionPhase::Abandoned);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn closed_input_abandons() {
        let runner = started(single_pass(), false);
        let session_id = runner.controller().session_id();
        let (input_tx, input_rx) = mpsc::channel(1);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        drop(input_tx);

        let outcome = runner.run(input_rx, event_tx).await;
        assert_eq!(outcome.phase, SessionPhase::Abandoned);

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(RunnerEvent::Presented(_))));
        assert_eq!(events.last(), Some(&RunnerEvent::Abandoned(session_id)));
    }
}

use std::time::Duration;

use quiz_core::model::QuestionToken;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// One second of countdown for the question presented under `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub token: QuestionToken,
}

/// Background task that sends a `TimerTick` every `period`.
///
/// Every tick carries the token it was started with, so ticks still in
/// flight after the question changes are recognised as stale. The task is
/// aborted when the `Ticker` is dropped.
#[derive(Debug)]
pub struct Ticker {
    token: QuestionToken,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn on the current tokio runtime. The first tick fires one
    /// `period` from now.
    #[must_use]
    pub fn start(
        token: QuestionToken,
        period: Duration,
        tx: mpsc::UnboundedSender<TimerTick>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if tx.send(TimerTick { token }).is_err() {
                    break;
                }
            }
        });
        Self { token, handle }
    }

    #[must_use]
    pub fn token(&self) -> QuestionToken {
        self.token
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

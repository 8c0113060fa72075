//! Per-question countdown for timed sessions.
//!
//! The gate is a plain state value; whatever produces the once-per-second
//! ticks (a tokio task in services, a loop in tests) passes the token of the
//! question it was started for. A tick for any other token, or after the
//! gate was disarmed, does nothing.

use crate::model::QuestionToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Countdown {
    token: QuestionToken,
    limit: u32,
    remaining: u32,
}

/// Result of feeding one tick to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Stale or unarmed; nothing changed.
    Ignored,
    Running { remaining: u32 },
    /// Reached zero. The gate is disarmed and the question must be
    /// auto-submitted.
    Expired { limit: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerGate {
    countdown: Option<Countdown>,
}

impl TimerGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down `limit` seconds for `token`, replacing any
    /// running countdown.
    pub fn arm(&mut self, token: QuestionToken, limit: u32) {
        self.countdown = Some(Countdown {
            token,
            limit,
            remaining: limit,
        });
    }

    /// Cancel the running countdown. Returns whether one was running.
    pub fn disarm(&mut self) -> bool {
        self.countdown.take().is_some()
    }

    #[must_use]
    pub fn is_armed_for(&self, token: QuestionToken) -> bool {
        self.countdown.is_some_and(|c| c.token == token)
    }

    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.countdown.map(|c| c.remaining)
    }

    /// Seconds used so far on the running countdown.
    #[must_use]
    pub fn elapsed(&self) -> Option<u32> {
        self.countdown.map(|c| c.limit - c.remaining)
    }

    pub fn tick(&mut self, token: QuestionToken) -> Tick {
        let Some(countdown) = self.countdown.as_mut() else {
            return Tick::Ignored;
        };
        if countdown.token != token {
            return Tick::Ignored;
        }
        countdown.remaining = countdown.remaining.saturating_sub(1);
        if countdown.remaining == 0 {
            let limit = countdown.limit;
            self.countdown = None;
            Tick::Expired { limit }
        } else {
            Tick::Running {
                remaining: countdown.remaining,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let token = QuestionToken::new(1);
        let mut gate = TimerGate::new();
        gate.arm(token, 3);
        assert_eq!(gate.tick(token), Tick::Running { remaining: 2 });
        assert_eq!(gate.elapsed(), Some(1));
        assert_eq!(gate.tick(token), Tick::Running { remaining: 1 });
        assert_eq!(gate.tick(token), Tick::Expired { limit: 3 });
        assert_eq!(gate.tick(token), Tick::Ignored);
        assert!(!gate.is_armed_for(token));
    }

    #[test]
    fn stale_token_is_ignored() {
        let old = QuestionToken::new(1);
        let new = old.next();
        let mut gate = TimerGate::new();
        gate.arm(old, 5);
        gate.arm(new, 5);
        assert_eq!(gate.tick(old), Tick::Ignored);
        assert_eq!(gate.remaining(), Some(5));
        assert_eq!(gate.tick(new), Tick::Running { remaining: 4 });
    }

    #[test]
    fn disarm_cancels() {
        let token = QuestionToken::new(7);
        let mut gate = TimerGate::new();
        gate.arm(token, 2);
        assert!(gate.disarm());
        assert!(!gate.disarm());
        assert_eq!(gate.tick(token), Tick::Ignored);
        assert_eq!(gate.remaining(), None);
    }
}

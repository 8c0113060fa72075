//! Ordered queue of pending question instances and the retry algorithm.
//!
//! The queue only ever shrinks: a correct answer removes the presented
//! instance, a wrong answer either drops a depleted instance or moves it to
//! a random later slot. `current` always points at a pending instance while
//! the queue is non-empty.

use rand::Rng;

use crate::model::{InstanceId, QuestionInstance};

/// What a resolved answer did to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueChange {
    /// Answered correctly and removed for good.
    Cleared { id: InstanceId },
    /// Answered wrong and moved to `new_index`, with fewer points at stake.
    Requeued {
        id: InstanceId,
        points_remaining: u32,
        new_index: usize,
    },
    /// Answered wrong with no points left; abandoned for this session.
    Dropped { id: InstanceId },
}

impl QueueChange {
    #[must_use]
    pub fn id(&self) -> InstanceId {
        match *self {
            QueueChange::Cleared { id }
            | QueueChange::Requeued { id, .. }
            | QueueChange::Dropped { id } => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQueue {
    items: Vec<QuestionInstance>,
    current: usize,
}

impl SessionQueue {
    #[must_use]
    pub fn new(items: Vec<QuestionInstance>) -> Self {
        Self { items, current: 0 }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&QuestionInstance> {
        self.items.get(self.current)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuestionInstance> {
        self.items.iter()
    }

    #[must_use]
    pub fn position_of(&self, id: InstanceId) -> Option<usize> {
        self.items.iter().position(|q| q.id == id)
    }

    /// Remove the presented instance after a correct answer.
    ///
    /// Returns `None` when the queue is empty.
    pub fn resolve_correct(&mut self) -> Option<QueueChange> {
        if self.current >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(self.current);
        self.clamp_current();
        Some(QueueChange::Cleared { id: removed.id })
    }

    /// Apply a wrong answer to the presented instance.
    ///
    /// The instance loses `penalty` points (floored at zero). If nothing is
    /// left it is dropped; otherwise it is reinserted uniformly at random
    /// anywhere after the next question to be presented, so it never comes
    /// straight back. The one exception is a queue holding only this
    /// instance, where it necessarily becomes the next question again.
    ///
    /// Returns `None` when the queue is empty.
    pub fn resolve_wrong<R: Rng + ?Sized>(
        &mut self,
        penalty: u32,
        rng: &mut R,
    ) -> Option<QueueChange> {
        if self.current >= self.items.len() {
            return None;
        }
        let mut instance = self.items.remove(self.current);
        let id = instance.id;
        let points_remaining = instance.apply_penalty(penalty);

        if instance.is_depleted() {
            self.clamp_current();
            return Some(QueueChange::Dropped { id });
        }

        let len = self.items.len();
        if len == 0 {
            self.items.push(instance);
            self.current = 0;
            return Some(QueueChange::Requeued {
                id,
                points_remaining,
                new_index: 0,
            });
        }

        // When the answered instance was last in line the next question is
        // the new tail, so the window still starts after it.
        let next = self.current.min(len - 1);
        let new_index = rng.random_range(next + 1..=len);
        self.items.insert(new_index, instance);
        self.current = next;

        Some(QueueChange::Requeued {
            id,
            points_remaining,
            new_index,
        })
    }

    fn clamp_current(&mut self) {
        self.current = if self.items.is_empty() {
            0
        } else {
            self.current.min(self.items.len() - 1)
        };
    }
}

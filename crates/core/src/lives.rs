/// Hearts: how many wrong answers a session can absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivesTracker {
    starting: u32,
    hearts: u32,
}

impl LivesTracker {
    #[must_use]
    pub fn new(starting: u32) -> Self {
        Self {
            starting,
            hearts: starting,
        }
    }

    #[must_use]
    pub fn hearts(&self) -> u32 {
        self.hearts
    }

    #[must_use]
    pub fn starting(&self) -> u32 {
        self.starting
    }

    #[must_use]
    pub fn hearts_used(&self) -> u32 {
        self.starting - self.hearts
    }

    /// Take one heart for a wrong answer, stopping at zero. Returns the
    /// hearts left.
    pub fn lose_heart(&mut self) -> u32 {
        self.hearts = self.hearts.saturating_sub(1);
        self.hearts
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.hearts == 0
    }

    pub fn reset(&mut self) {
        self.hearts = self.starting;
    }
}

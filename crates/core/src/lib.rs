#![forbid(unsafe_code)]

pub mod lives;
pub mod model;
pub mod question_bank;
pub mod queue;
pub mod scoring;
pub mod time;
pub mod timer;

pub use time::Clock;

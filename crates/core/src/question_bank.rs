//! Expands caller-supplied units into shuffled question instances.
//!
//! Stateless: every function takes the RNG it draws from, so sessions
//! reshuffle independently while tests can seed.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{EngineConfig, InstanceId, QuestionInstance, QuestionKind, TestableUnit};
use crate::queue::SessionQueue;

/// Build multiple-choice options for `correct`.
///
/// Draws up to `distractor_count` distinct values from `pool` (ignoring the
/// correct answer and blanks), adds the correct answer and shuffles. A pool
/// that is too small yields fewer options rather than an error.
pub fn generate_options<R: Rng + ?Sized>(
    correct: &str,
    pool: &[String],
    distractor_count: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut eligible: Vec<&String> = Vec::with_capacity(pool.len());
    for candidate in pool {
        if candidate.trim().is_empty() || candidate == correct || eligible.contains(&candidate) {
            continue;
        }
        eligible.push(candidate);
    }

    eligible.shuffle(rng);
    let mut options: Vec<String> = eligible
        .into_iter()
        .take(distractor_count)
        .cloned()
        .collect();
    options.push(correct.to_owned());
    options.shuffle(rng);
    options
}

/// Keep a random subset of `count` units. `None` or a count at least as
/// large as the input keeps them all, in their original order.
pub fn select_units<R: Rng + ?Sized>(
    mut units: Vec<TestableUnit>,
    count: Option<usize>,
    rng: &mut R,
) -> Vec<TestableUnit> {
    match count {
        Some(count) if count < units.len() => {
            units.shuffle(rng);
            units.truncate(count);
            units
        }
        _ => units,
    }
}

/// Kinds a unit is asked in: its hint if it has one, else the configured list.
#[must_use]
pub fn kinds_for(unit: &TestableUnit, config: &EngineConfig) -> Vec<QuestionKind> {
    match unit.question_type_hint {
        Some(kind) => vec![kind],
        None => config.kinds.clone(),
    }
}

/// Expand `units` into the initial session queue.
///
/// Each unit yields one instance per kind, the whole set is repeated
/// `repeat_count` times and the result is Fisher–Yates shuffled. MCQ
/// instances get their own option shuffle drawn from the other units'
/// answers plus `extra_pool`.
pub fn build_queue<R: Rng + ?Sized>(
    units: &[TestableUnit],
    config: &EngineConfig,
    extra_pool: &[String],
    rng: &mut R,
) -> SessionQueue {
    let pool: Vec<String> = units
        .iter()
        .map(|u| u.expected_answer.clone())
        .chain(extra_pool.iter().cloned())
        .collect();

    let mut next_id = 0_u32;
    let mut instances = Vec::new();
    for _ in 0..config.repeat_count {
        for unit in units {
            for kind in kinds_for(unit, config) {
                let points = config.base_points.get(kind);
                let mut instance =
                    QuestionInstance::new(InstanceId::new(next_id), unit.clone(), kind, points);
                if kind == QuestionKind::Mcq {
                    let options = generate_options(
                        &unit.expected_answer,
                        &pool,
                        config.distractor_count,
                        rng,
                    );
                    instance = instance.with_options(options);
                }
                next_id = next_id.wrapping_add(1);
                instances.push(instance);
            }
        }
    }

    instances.shuffle(rng);
    SessionQueue::new(instances)
}

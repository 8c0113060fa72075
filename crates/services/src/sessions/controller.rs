use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use quiz_core::Clock;
use quiz_core::lives::LivesTracker;
use quiz_core::model::{
    AnswerRecord, AnswerResult, ConfigError, EngineConfig, FinalizeReport, PERFECTIONIST_BADGE,
    QuestionToken, SessionEnd, SessionId, Submission, UnitSetId,
};
use quiz_core::question_bank::{build_queue, select_units};
use quiz_core::queue::SessionQueue;
use quiz_core::scoring::{ScoreKeeper, max_possible_score, star_rating};
use quiz_core::timer::{Tick, TimerGate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use storage::repository::AnswerLogEntry;
use tracing::{debug, info};

use super::view::{
    AnswerFeedback, Presentation, SessionPhase, SessionProgress, SessionRequest, SubmitOutcome,
    TickOutcome,
};
use crate::error::SessionError;
use crate::sink::SessionSink;

//
// ─── SESSION STATE ─────────────────────────────────────────────────────────────
//

/// Mutable state of a session in progress. Dropped when the session ends.
struct SessionState {
    unit_set_id: UnitSetId,
    queue: SessionQueue,
    lives: LivesTracker,
    score: ScoreKeeper,
    timer: TimerGate,
    time_limit: Option<u32>,
    token: QuestionToken,
    draft: Option<String>,
    answer_log: Vec<AnswerRecord>,
    max_possible_score: u32,
    started_at: DateTime<Utc>,
}

impl SessionState {
    /// Issue a fresh token for the question now at the front and restart
    /// the countdown for it.
    fn present_next(&mut self) {
        self.token = self.token.next();
        self.draft = None;
        match self.time_limit {
            Some(limit) => self.timer.arm(self.token, limit),
            None => {
                self.timer.disarm();
            }
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Session state machine: `Setup → InProgress → Finished | Abandoned`.
///
/// Single-threaded and synchronous. Answers and timer ticks both carry the
/// `QuestionToken` of the question they belong to; whichever arrives first
/// is processed and the other is ignored.
pub struct SessionController {
    config: EngineConfig,
    clock: Clock,
    rng: StdRng,
    sink: Arc<dyn SessionSink>,
    session_id: SessionId,
    phase: SessionPhase,
    state: Option<SessionState>,
    report: Option<FinalizeReport>,
}

impl SessionController {
    #[must_use]
    pub fn new(config: EngineConfig, clock: Clock, sink: Arc<dyn SessionSink>) -> Self {
        Self {
            config,
            clock,
            rng: StdRng::from_rng(&mut rand::rng()),
            sink,
            session_id: SessionId::new(),
            phase: SessionPhase::Setup,
            state: None,
            report: None,
        }
    }

    /// Use a seeded RNG so shuffles and reinsertion slots are reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.time_limit.is_some())
    }

    /// The finalize report, once the session has finished.
    #[must_use]
    pub fn report(&self) -> Option<&FinalizeReport> {
        self.report.as_ref()
    }

    /// Every answer recorded so far, in submission order.
    #[must_use]
    pub fn answer_log(&self) -> &[AnswerRecord] {
        match (&self.state, &self.report) {
            (Some(state), _) => &state.answer_log,
            (None, Some(report)) => &report.answer_log,
            (None, None) => &[],
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        let state = self.state.as_ref()?;
        Some(SessionProgress {
            answered: state.answer_log.len(),
            remaining: state.queue.len(),
            hearts: state.lives.hearts(),
            streak: state.score.streak(),
            total_score: state.score.total(),
            max_possible_score: state.max_possible_score,
        })
    }

    /// The question currently shown, if a session is in progress.
    #[must_use]
    pub fn presentation(&self) -> Option<Presentation> {
        if self.phase != SessionPhase::InProgress {
            return None;
        }
        let state = self.state.as_ref()?;
        let instance = state.queue.current()?.clone();
        Some(Presentation {
            session_id: self.session_id,
            token: state.token,
            instance,
            hearts: state.lives.hearts(),
            remaining_secs: state
                .time_limit
                .map(|limit| state.timer.remaining().unwrap_or(limit)),
            position: state.queue.current_index(),
            remaining_questions: state.queue.len(),
        })
    }

    /// Build the question queue and present the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` outside `Setup`, and
    /// `SessionError::Config` for an invalid engine config, an empty unit
    /// list or a zero question count. The controller stays in `Setup` on
    /// error.
    pub fn start(&mut self, request: SessionRequest) -> Result<Presentation, SessionError> {
        if self.phase != SessionPhase::Setup {
            return Err(SessionError::AlreadyStarted);
        }
        self.config.validate()?;
        if request.units.is_empty() {
            return Err(ConfigError::EmptyUnits.into());
        }
        if request.question_count == Some(0) {
            return Err(ConfigError::InvalidQuestionCount.into());
        }

        let SessionRequest {
            unit_set_id,
            units,
            difficulty,
            question_count,
            timed,
            distractor_pool,
        } = request;

        // Units left out by `question_count` still serve as distractors.
        let pool: Vec<String> = units
            .iter()
            .map(|u| u.expected_answer.clone())
            .chain(distractor_pool)
            .collect();
        let units = select_units(units, question_count, &mut self.rng);
        let queue = build_queue(&units, &self.config, &pool, &mut self.rng);
        let max_possible_score = max_possible_score(queue.iter(), self.config.streak);
        let time_limit = timed.then(|| self.config.timer_limits.for_difficulty(difficulty));

        let mut state = SessionState {
            unit_set_id,
            queue,
            lives: LivesTracker::new(self.config.starting_hearts),
            score: ScoreKeeper::new(self.config.streak),
            timer: TimerGate::new(),
            time_limit,
            token: QuestionToken::new(0),
            draft: None,
            answer_log: Vec::new(),
            max_possible_score,
            started_at: self.clock.now(),
        };
        state.present_next();

        info!(
            session_id = %self.session_id,
            %unit_set_id,
            units = units.len(),
            questions = state.queue.len(),
            max_possible_score,
            time_limit = ?time_limit,
            "session started"
        );

        self.state = Some(state);
        self.phase = SessionPhase::InProgress;
        self.presentation().ok_or(SessionError::NotInProgress)
    }

    /// Remember what the learner has entered so far; a timer expiry submits
    /// it. Returns `false` for a stale token.
    pub fn update_draft(&mut self, token: QuestionToken, value: impl Into<String>) -> bool {
        if self.phase != SessionPhase::InProgress {
            return false;
        }
        match self.state.as_mut() {
            Some(state) if state.token == token => {
                state.draft = Some(value.into());
                true
            }
            _ => false,
        }
    }

    /// Submit an answer for the question presented under `token`.
    pub fn submit(&mut self, token: QuestionToken, submission: Submission) -> SubmitOutcome {
        if self.phase != SessionPhase::InProgress {
            debug!(session_id = %self.session_id, ?token, phase = ?self.phase, "submission outside session ignored");
            return SubmitOutcome::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return SubmitOutcome::Ignored;
        };
        if state.token != token {
            debug!(session_id = %self.session_id, ?token, current = ?state.token, "stale submission ignored");
            return SubmitOutcome::Ignored;
        }

        let time_taken = state.time_limit.and_then(|_| state.timer.elapsed());
        state.timer.disarm();

        match self.process_answer(&submission, time_taken) {
            Some(feedback) => SubmitOutcome::Accepted(Box::new(feedback)),
            None => SubmitOutcome::Ignored,
        }
    }

    /// Feed one second of countdown for the question under `token`.
    pub fn tick(&mut self, token: QuestionToken) -> TickOutcome {
        if self.phase != SessionPhase::InProgress {
            return TickOutcome::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return TickOutcome::Ignored;
        };

        match state.timer.tick(token) {
            Tick::Ignored => TickOutcome::Ignored,
            Tick::Running { remaining } => TickOutcome::Running { remaining },
            Tick::Expired { limit } => {
                let submission = state
                    .draft
                    .take()
                    .map_or(Submission::Verdict(AnswerResult::Wrong), Submission::Value);
                debug!(session_id = %self.session_id, ?token, limit, "time expired, auto-submitting");
                match self.process_answer(&submission, Some(limit)) {
                    Some(feedback) => TickOutcome::Expired(Box::new(feedback)),
                    None => TickOutcome::Ignored,
                }
            }
        }
    }

    /// Quit the session. No outcome is computed and nothing is finalized.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` unless a session is running.
    pub fn abandon(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let answered = self.state.take().map_or(0, |mut state| {
            state.timer.disarm();
            state.answer_log.len()
        });
        self.phase = SessionPhase::Abandoned;
        info!(session_id = %self.session_id, answered, "session abandoned");
        self.sink.session_abandoned(self.session_id);
        Ok(())
    }

    fn process_answer(
        &mut self,
        submission: &Submission,
        time_taken: Option<u32>,
    ) -> Option<AnswerFeedback> {
        let now = self.clock.now();
        let state = self.state.as_mut()?;
        let instance = state.queue.current()?.clone();

        let result = submission.judge(&instance.unit.expected_answer);
        let points_earned = state.score.record_answer(result, instance.points_remaining);
        let change = match result {
            AnswerResult::Correct => state.queue.resolve_correct(),
            AnswerResult::Wrong => {
                let penalty = self.config.wrong_penalty.get(instance.kind);
                state.queue.resolve_wrong(penalty, &mut self.rng)
            }
        }?;
        if !result.is_correct() {
            state.lives.lose_heart();
        }

        let record = AnswerRecord {
            symbol: instance.unit.symbol.clone(),
            label: instance.unit.label.clone(),
            kind: instance.kind,
            expected: instance.unit.expected_answer.clone(),
            result,
            points_earned,
            time_taken,
        };
        state.answer_log.push(record.clone());
        let sequence = u32::try_from(state.answer_log.len()).unwrap_or(u32::MAX);

        debug!(
            session_id = %self.session_id,
            sequence,
            symbol = %record.symbol,
            kind = %record.kind,
            result = %result,
            points_earned,
            hearts = state.lives.hearts(),
            remaining = state.queue.len(),
            "answer recorded"
        );
        self.sink.answer_recorded(&AnswerLogEntry {
            session_id: self.session_id,
            unit_set_id: state.unit_set_id,
            sequence,
            record: record.clone(),
            recorded_at: now,
        });

        // Running out of hearts wins over an empty queue.
        let end = if state.lives.is_exhausted() {
            Some(SessionEnd::GameOver)
        } else if state.queue.is_empty() {
            Some(SessionEnd::Completed)
        } else {
            None
        };

        let hearts = state.lives.hearts();
        let streak = state.score.streak();
        let total_score = state.score.total();

        let (outcome, next) = match end {
            Some(end) => {
                let report = self.finish(end, now)?;
                (Some(report.outcome()), None)
            }
            None => {
                state.present_next();
                (None, self.presentation())
            }
        };

        Some(AnswerFeedback {
            record,
            change,
            hearts,
            streak,
            total_score,
            outcome,
            next,
        })
    }

    fn finish(&mut self, end: SessionEnd, now: DateTime<Utc>) -> Option<FinalizeReport> {
        let mut state = self.state.take()?;
        state.timer.disarm();

        let hearts_used = state.lives.hearts_used();
        let total_score = state.score.total();
        let star_rating = star_rating(total_score, state.max_possible_score, self.config.rating);

        let mut badges = BTreeSet::new();
        if end == SessionEnd::Completed && hearts_used == 0 {
            badges.insert(PERFECTIONIST_BADGE.to_owned());
        }

        let report = FinalizeReport {
            session_id: self.session_id,
            unit_set_id: state.unit_set_id,
            total_score,
            max_possible_score: state.max_possible_score,
            star_rating,
            answer_log: state.answer_log,
            hearts_used,
            badges,
            time_spent_secs: self.clock.seconds_since(state.started_at),
            game_over: end == SessionEnd::GameOver,
            started_at: state.started_at,
            completed_at: now,
        };

        self.phase = SessionPhase::Finished(end);
        info!(
            session_id = %self.session_id,
            end = ?end,
            total_score,
            max_possible_score = report.max_possible_score,
            stars = star_rating.stars(),
            hearts_used,
            "session finished"
        );
        self.sink.session_finalized(&report);
        self.report = Some(report.clone());
        Some(report)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SessionController");
        s.field("session_id", &self.session_id)
            .field("phase", &self.phase);
        if let Some(state) = &self.state {
            s.field("queue_len", &state.queue.len())
                .field("hearts", &state.lives.hearts())
                .field("score", &state.score.total())
                .field("answers", &state.answer_log.len())
                .field("token", &state.token);
        }
        s.finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionKind, StarRating, TestableUnit};
    use quiz_core::queue::QueueChange;
    use quiz_core::time::fixed_clock;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Answer(u32),
        Finalized(FinalizeReport),
        Abandoned(SessionId),
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn finalized(&self) -> Vec<FinalizeReport> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::Finalized(r) => Some(r),
                    _ => None,
                })
                .collect()
        }
    }

    impl SessionSink for RecordingSink {
        fn answer_recorded(&self, entry: &AnswerLogEntry) {
            self.events.lock().unwrap().push(Event::Answer(entry.sequence));
        }

        fn session_finalized(&self, report: &FinalizeReport) {
            self.events.lock().unwrap().push(Event::Finalized(report.clone()));
        }

        fn session_abandoned(&self, session_id: SessionId) {
            self.events.lock().unwrap().push(Event::Abandoned(session_id));
        }
    }

    fn units(n: usize) -> Vec<TestableUnit> {
        let runes = [
            ("ᚠ", "f", "fehu"),
            ("ᚢ", "u", "uruz"),
            ("ᚦ", "th", "thurisaz"),
            ("ᚨ", "a", "ansuz"),
            ("ᚱ", "r", "raido"),
            ("ᚲ", "k", "kaunan"),
        ];
        runes
            .iter()
            .take(n)
            .map(|(s, a, l)| TestableUnit::new(*s, *a, *l))
            .collect()
    }

    fn controller(config: EngineConfig) -> (SessionController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let ctrl = SessionController::new(config, fixed_clock(), sink.clone()).with_seed(42);
        (ctrl, sink)
    }

    fn single_pass(kinds: Vec<QuestionKind>) -> EngineConfig {
        EngineConfig::default().with_kinds(kinds).with_repeat_count(1)
    }

    fn answer_right(ctrl: &mut SessionController) -> AnswerFeedback {
        let p = ctrl.presentation().expect("question presented");
        match ctrl.submit(p.token, Submission::value(p.instance.unit.expected_answer.clone())) {
            SubmitOutcome::Accepted(feedback) => *feedback,
            SubmitOutcome::Ignored => panic!("answer ignored"),
        }
    }

    fn answer_wrong(ctrl: &mut SessionController) -> AnswerFeedback {
        let p = ctrl.presentation().expect("question presented");
        match ctrl.submit(p.token, Submission::verdict(AnswerResult::Wrong)) {
            SubmitOutcome::Accepted(feedback) => *feedback,
            SubmitOutcome::Ignored => panic!("answer ignored"),
        }
    }

    fn request(n: usize) -> SessionRequest {
        SessionRequest::new(UnitSetId::new(1), units(n))
    }

    #[test]
    fn empty_unit_list_is_refused() {
        let (mut ctrl, sink) = controller(EngineConfig::default());
        let err = ctrl.start(request(0)).unwrap_err();
        assert!(matches!(err, SessionError::Config(ConfigError::EmptyUnits)));
        assert_eq!(ctrl.phase(), SessionPhase::Setup);
        assert!(sink.events().is_empty());

        let err = ctrl.start(request(3).with_question_count(0)).unwrap_err();
        assert!(matches!(err, SessionError::Config(ConfigError::InvalidQuestionCount)));
    }

    #[test]
    fn invalid_engine_config_is_refused() {
        let (mut ctrl, _) = controller(EngineConfig::default().with_kinds(Vec::new()));
        let err = ctrl.start(request(3)).unwrap_err();
        assert!(matches!(err, SessionError::Config(ConfigError::NoKinds)));
    }

    #[test]
    fn start_twice_is_rejected() {
        let (mut ctrl, _) = controller(EngineConfig::default());
        ctrl.start(request(2)).unwrap();
        assert!(matches!(ctrl.start(request(2)), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn default_config_builds_four_instances_per_unit() {
        let (mut ctrl, _) = controller(EngineConfig::default());
        let first = ctrl.start(request(3)).unwrap();
        assert_eq!(first.remaining_questions, 12);
        assert_eq!(first.hearts, 3);
        assert_eq!(first.remaining_secs, None);
    }

    #[test]
    fn question_count_limits_units() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Mcq]));
        let first = ctrl.start(request(6).with_question_count(2)).unwrap();
        assert_eq!(first.remaining_questions, 2);
    }

    #[test]
    fn unselected_units_still_supply_distractors() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Mcq]));
        let first = ctrl.start(request(6).with_question_count(1)).unwrap();
        assert_eq!(first.remaining_questions, 1);

        let options = first.instance.options.unwrap();
        assert_eq!(options.len(), 4);
        assert!(options.contains(&first.instance.unit.expected_answer));
        let distinct: std::collections::HashSet<_> = options.iter().collect();
        assert_eq!(distinct.len(), 4);
    }

    #[test]
    fn losing_last_heart_on_final_question_is_game_over() {
        let config = single_pass(vec![QuestionKind::Writing]).with_starting_hearts(5);
        let (mut ctrl, sink) = controller(config);
        ctrl.start(request(1)).unwrap();

        let mut last = None;
        for _ in 0..5 {
            last = Some(answer_wrong(&mut ctrl));
        }
        let last = last.unwrap();
        assert!(matches!(last.change, QueueChange::Dropped { .. }));
        assert_eq!(last.hearts, 0);
        assert!(last.outcome.unwrap().game_over);
        assert_eq!(ctrl.phase(), SessionPhase::Finished(SessionEnd::GameOver));
        let finalized = sink.finalized();
        assert_eq!(finalized.len(), 1);
        assert!(finalized[0].game_over);
        assert!(finalized[0].badges.is_empty());
    }

    #[test]
    fn perfect_run_scores_ceiling_and_earns_badge() {
        let (mut ctrl, sink) = controller(single_pass(vec![QuestionKind::Mcq, QuestionKind::Writing]));
        ctrl.start(request(3)).unwrap();
        assert_eq!(ctrl.progress().unwrap().max_possible_score, 95);

        let mut last = None;
        while ctrl.is_in_progress() {
            last = Some(answer_right(&mut ctrl));
        }

        let last = last.unwrap();
        let outcome = last.outcome.expect("final answer carries outcome");
        assert_eq!(outcome.total_score, 95);
        assert_eq!(outcome.star_rating, StarRating::Three);
        assert!(!outcome.game_over);
        assert!(outcome.badges.contains(PERFECTIONIST_BADGE));
        assert!(last.next.is_none());
        assert_eq!(ctrl.phase(), SessionPhase::Finished(SessionEnd::Completed));

        let report = ctrl.report().unwrap();
        assert_eq!(report.answer_log.len(), 6);
        assert_eq!(
            report.answer_log.iter().map(|r| r.points_earned).sum::<u32>(),
            report.total_score
        );
        assert_eq!(report.hearts_used, 0);

        let finalized = sink.finalized();
        assert_eq!(finalized.len(), 1);
        assert_eq!(&finalized[0], report);
        let answers = sink
            .events()
            .iter()
            .filter(|e| matches!(e, Event::Answer(_)))
            .count();
        assert_eq!(answers, 6);
    }

    #[test]
    fn wrong_answer_requeues_and_costs_a_heart() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Writing]));
        let first = ctrl.start(request(4)).unwrap();
        let feedback = answer_wrong(&mut ctrl);

        assert_eq!(feedback.hearts, 2);
        assert_eq!(feedback.record.points_earned, 0);
        assert_eq!(feedback.record.result, AnswerResult::Wrong);
        let QueueChange::Requeued { points_remaining, .. } = feedback.change else {
            panic!("expected requeue");
        };
        assert_eq!(points_remaining, 12);

        let next = feedback.next.unwrap();
        assert_ne!(next.instance.id, first.instance.id);
        assert_eq!(next.remaining_questions, 4);
        assert!(next.token > first.token);
    }

    #[test]
    fn hearts_running_out_beats_remaining_questions() {
        let config = single_pass(vec![QuestionKind::Mcq]).with_starting_hearts(1);
        let (mut ctrl, sink) = controller(config);
        ctrl.start(request(5)).unwrap();

        let feedback = answer_wrong(&mut ctrl);
        assert_eq!(feedback.hearts, 0);
        let outcome = feedback.outcome.unwrap();
        assert!(outcome.game_over);
        assert!(outcome.badges.is_empty());
        assert_eq!(ctrl.phase(), SessionPhase::Finished(SessionEnd::GameOver));
        assert!(ctrl.presentation().is_none());
        assert_eq!(sink.finalized().len(), 1);
        assert!(sink.finalized()[0].game_over);
        assert_eq!(sink.finalized()[0].hearts_used, 1);
    }

    #[test]
    fn streak_bonus_survives_requeues_but_not_wrong_answers() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Mcq]));
        ctrl.start(request(6)).unwrap();
        assert_eq!(answer_right(&mut ctrl).record.points_earned, 10);
        assert_eq!(answer_right(&mut ctrl).record.points_earned, 10);
        assert_eq!(answer_right(&mut ctrl).record.points_earned, 15);
        let wrong = answer_wrong(&mut ctrl);
        assert_eq!(wrong.streak, 0);
        assert_eq!(answer_right(&mut ctrl).record.points_earned, 10);
    }

    #[test]
    fn depleted_question_is_dropped_for_good() {
        let config = single_pass(vec![QuestionKind::Writing]).with_starting_hearts(10);
        let (mut ctrl, _) = controller(config);
        ctrl.start(request(1)).unwrap();

        for _ in 0..4 {
            let feedback = answer_wrong(&mut ctrl);
            assert!(matches!(feedback.change, QueueChange::Requeued { .. }));
        }
        let last = answer_wrong(&mut ctrl);
        assert!(matches!(last.change, QueueChange::Dropped { .. }));

        let outcome = last.outcome.unwrap();
        assert!(!outcome.game_over);
        assert_eq!(outcome.total_score, 0);
        assert_eq!(outcome.star_rating, StarRating::Zero);
        assert!(outcome.badges.is_empty());
        assert_eq!(ctrl.answer_log().len(), 5);
        assert!(ctrl.answer_log().iter().all(|r| r.points_earned == 0));
    }

    #[test]
    fn stale_and_late_submissions_are_ignored() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Mcq]));
        let first = ctrl.start(request(2)).unwrap();
        answer_right(&mut ctrl);

        let replay = ctrl.submit(first.token, Submission::value("f"));
        assert_eq!(replay, SubmitOutcome::Ignored);
        assert_eq!(ctrl.answer_log().len(), 1);

        answer_right(&mut ctrl);
        assert!(!ctrl.is_in_progress());
        let late = ctrl.submit(QuestionToken::new(99), Submission::value("u"));
        assert_eq!(late, SubmitOutcome::Ignored);
        assert_eq!(ctrl.answer_log().len(), 2);
    }

    #[test]
    fn manual_answer_cancels_pending_expiry() {
        let (mut ctrl, _) = controller(single_pass(vec![QuestionKind::Mcq]));
        let first = ctrl.start(request(3).timed(true)).unwrap();
        assert_eq!(first.remaining_secs, Some(30));

        assert_eq!(ctrl.tick(first.token), TickOutcome::Running { remaining: 29 });
        let feedback = answer_right(&mut ctrl);
        assert_eq!(feedback.record.time_taken, Some(1));

        for _ in 0..40 {
            assert_eq!(ctrl.tick(first.token), TickOutcome::Ignored);
        }
        assert_eq!(ctrl.answer_log().len(), 1);
        assert_eq!(ctrl.presentation().unwrap().remaining_secs, Some(30));
    }

    #[test]
    fn expiry_auto_submits_and_blocks_late_manual_answer() {
        let mut config = single_pass(vec![QuestionKind::Mcq]);
        config.timer_limits.easy = 2;
        let (mut ctrl, _) = controller(config);
        let first = ctrl
            .start(request(3).timed(true).with_difficulty(quiz_core::model::Difficulty::Easy))
            .unwrap();

        assert_eq!(ctrl.tick(first.token), TickOutcome::Running { remaining: 1 });
        let TickOutcome::Expired(feedback) = ctrl.tick(first.token) else {
            panic!("expected expiry");
        };
        assert_eq!(feedback.record.result, AnswerResult::Wrong);
        assert_eq!(feedback.record.time_taken, Some(2));
        assert_eq!(feedback.hearts, 2);

        let late = ctrl.submit(first.token, Submission::value(first.instance.unit.expected_answer.clone()));
        assert_eq!(late, SubmitOutcome::Ignored);
        assert_eq!(ctrl.answer_log().len(), 1);
    }

    #[test]
    fn expiry_submits_the_current_draft() {
        let mut config = single_pass(vec![QuestionKind::Writing]);
        config.timer_limits.medium = 1;
        let (mut ctrl, _) = controller(config);
        let first = ctrl.start(request(2).timed(true)).unwrap();

        assert!(ctrl.update_draft(first.token, first.instance.unit.expected_answer.clone()));
        assert!(!ctrl.update_draft(first.token.next().next(), "zzz"));
        let TickOutcome::Expired(feedback) = ctrl.tick(first.token) else {
            panic!("expected expiry");
        };
        assert_eq!(feedback.record.result, AnswerResult::Correct);
        assert_eq!(feedback.record.points_earned, 15);
        assert_eq!(feedback.record.time_taken, Some(1));
    }

    #[test]
    fn abandon_skips_finalize() {
        let (mut ctrl, sink) = controller(EngineConfig::default());
        ctrl.start(request(3)).unwrap();
        answer_right(&mut ctrl);
        ctrl.abandon().unwrap();

        assert_eq!(ctrl.phase(), SessionPhase::Abandoned);
        assert!(ctrl.report().is_none());
        assert!(ctrl.presentation().is_none());
        assert!(sink.finalized().is_empty());
        assert_eq!(
            sink.events().last(),
            Some(&Event::Abandoned(ctrl.session_id()))
        );
        assert!(matches!(ctrl.abandon(), Err(SessionError::NotInProgress)));
    }

    #[test]
    fn finished_session_cannot_be_abandoned() {
        let (mut ctrl, sink) = controller(single_pass(vec![QuestionKind::Mcq]));
        ctrl.start(request(1)).unwrap();
        answer_right(&mut ctrl);
        assert!(matches!(ctrl.abandon(), Err(SessionError::NotInProgress)));
        assert_eq!(sink.finalized().len(), 1);
    }
}

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::{
    CheckInControl, CheckInStatus, LoginCheck, PageToken, ReplyTarget, RunPolicy, RunReport,
    RunResult, StatusCounters,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Start,
    AuthCheck,
    StatusRead,
    ListingTargets,
    AwaitingReply,
    Settling,
    RefreshingStatus,
    Backoff,
    CheckIn,
    Done,
    Finished,
}

/// Run-local state of one orchestrator run. Single writer, owned by the driver.
#[derive(Debug, Clone)]
pub struct RunState {
    policy: RunPolicy,
    phase: Phase,
    rng: StdRng,
    control: CheckInControl,
    token: Option<PageToken>,
    counters: StatusCounters,
    candidates: Vec<ReplyTarget>,
    chosen: Vec<ReplyTarget>,
    attempts: u32,
    successes: u32,
    check_in: CheckInStatus,
    failure: Option<String>,
    result: Option<RunResult>,
}

impl RunState {
    /// `seed` drives every random choice of the run (targets, texts, backoff).
    pub fn new(policy: RunPolicy, seed: u64) -> Self {
        Self {
            policy,
            phase: Phase::Start,
            rng: StdRng::seed_from_u64(seed),
            control: CheckInControl::Absent,
            token: None,
            counters: StatusCounters::default(),
            candidates: Vec::new(),
            chosen: Vec::new(),
            attempts: 0,
            successes: 0,
            check_in: CheckInStatus::NotReached,
            failure: None,
            result: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> &RunPolicy {
        &self.policy
    }

    pub fn counters(&self) -> StatusCounters {
        self.counters
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reply targets not yet tried in this run.
    pub fn candidates(&self) -> &[ReplyTarget] {
        &self.candidates
    }

    /// Reply targets already tried in this run, in the order they were chosen.
    pub fn chosen_targets(&self) -> &[ReplyTarget] {
        &self.chosen
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            result: self.result.unwrap_or(RunResult::CompletedWithoutCheckIn),
            counters: self.counters,
            reply_attempts: self.attempts,
            replies_succeeded: self.successes,
            check_in: self.check_in.clone(),
            failure: self.failure.clone(),
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn control(&self) -> CheckInControl {
        self.control
    }

    pub(crate) fn token(&self) -> Option<&PageToken> {
        self.token.as_ref()
    }

    pub(crate) fn record_login(&mut self, check: LoginCheck) {
        self.control = check.control;
        self.token = check.token;
    }

    pub(crate) fn set_counters(&mut self, counters: StatusCounters) {
        self.counters = counters;
    }

    pub(crate) fn set_check_in(&mut self, status: CheckInStatus) {
        self.check_in = status;
    }

    pub(crate) fn check_in(&self) -> &CheckInStatus {
        &self.check_in
    }

    pub(crate) fn record_reply_success(&mut self) {
        self.successes += 1;
    }

    pub(crate) fn finish(&mut self, result: RunResult) {
        self.result = Some(result);
        self.phase = Phase::Finished;
    }

    pub(crate) fn fail_login(&mut self, reason: String) {
        self.failure = Some(reason);
        self.finish(RunResult::LoginFailed);
    }

    /// Activity below target; unreadable activity counts as zero.
    pub(crate) fn below_activity_target(&self) -> bool {
        match self.policy.activity_target {
            Some(target) => self.counters.activity.unwrap_or(0) < target,
            None => false,
        }
    }

    pub(crate) fn attempts_left(&self) -> bool {
        self.attempts < self.policy.max_attempts
    }

    /// Adds listed ids in display order, skipping any already known this run.
    pub(crate) fn merge_candidates(&mut self, targets: Vec<ReplyTarget>) {
        for target in targets {
            if !self.candidates.contains(&target) && !self.chosen.contains(&target) {
                self.candidates.push(target);
            }
        }
    }

    /// Removes one random candidate for good and pairs it with a random reply
    /// text. Counts as an attempt whatever the outcome turns out to be.
    pub(crate) fn take_attempt(&mut self) -> Option<(ReplyTarget, String)> {
        if self.candidates.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.candidates.len());
        let target = self.candidates.remove(idx);
        self.chosen.push(target);
        self.attempts += 1;
        let text = self
            .policy
            .reply_pool
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default();
        Some((target, text))
    }

    pub(crate) fn next_backoff(&mut self) -> Duration {
        let window = self.policy.backoff;
        if window.max <= window.min {
            return window.min;
        }
        let min = window.min.as_millis() as u64;
        let max = window.max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min..=max))
    }
}

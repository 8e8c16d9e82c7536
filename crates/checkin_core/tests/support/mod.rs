// Shared by the integration tests in this directory.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Once;
use std::time::Duration;

use checkin_core::{
    update, ActionOutcome, AuthState, BackoffWindow, CheckInControl, Effect, LoginCheck, Msg,
    PageToken, RunPolicy, RunReport, RunState, StatusCounters,
};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(checkin_logging::initialize_for_tests);
}

pub fn reply_policy(target: i64, max_attempts: u32) -> RunPolicy {
    RunPolicy {
        title: "Test forum".to_string(),
        activity_target: Some(target),
        max_attempts,
        reply_pool: vec!["daily check".to_string(), "hello again".to_string()],
        listing_pages: 1,
        settle_delay: Duration::from_secs(5),
        backoff: BackoffWindow {
            min: Duration::from_secs(40),
            max: Duration::from_secs(60),
        },
    }
}

pub fn logged_in(control: CheckInControl) -> LoginCheck {
    LoginCheck {
        auth: AuthState::Authenticated,
        control,
        token: Some(PageToken::new("deadbeef")),
    }
}

/// Scripted stand-in for a forum: answers every effect the machine emits.
pub struct FakeSite {
    pub login: LoginCheck,
    pub balance: i64,
    pub activity: i64,
    pub activity_per_success: i64,
    pub pages: Vec<Vec<u64>>,
    pub reply_outcome: ActionOutcome,
    pub check_in_outcome: ActionOutcome,
}

impl FakeSite {
    pub fn new(login: LoginCheck, activity: i64) -> Self {
        Self {
            login,
            balance: 100,
            activity,
            activity_per_success: 0,
            pages: vec![vec![11, 12, 13]],
            reply_outcome: ActionOutcome::Success,
            check_in_outcome: ActionOutcome::Success,
        }
    }

    fn counters(&self) -> StatusCounters {
        StatusCounters {
            balance: Some(self.balance),
            activity: Some(self.activity),
        }
    }

    fn answer(&mut self, effect: &Effect) -> Option<Msg> {
        match effect {
            Effect::CheckLogin => Some(Msg::LoginChecked(self.login.clone())),
            Effect::ReadStatus => Some(Msg::StatusRead(self.counters())),
            Effect::ListTargets { page } => Some(Msg::TargetsListed {
                page: *page,
                targets: self
                    .pages
                    .get(*page as usize - 1)
                    .cloned()
                    .unwrap_or_default(),
            }),
            Effect::SubmitReply { target, .. } => {
                if self.reply_outcome.is_success() {
                    self.activity += self.activity_per_success;
                }
                Some(Msg::ReplySubmitted {
                    target: *target,
                    outcome: self.reply_outcome.clone(),
                })
            }
            Effect::SubmitCheckIn { .. } => {
                Some(Msg::CheckInSubmitted(self.check_in_outcome.clone()))
            }
            Effect::Sleep(_) => Some(Msg::Slept),
            Effect::Notify { .. } | Effect::Finish(_) => None,
        }
    }
}

pub struct Trace {
    pub state: RunState,
    pub effects: Vec<Effect>,
}

impl Trace {
    pub fn count(&self, pred: impl Fn(&Effect) -> bool) -> usize {
        self.effects.iter().filter(|e| pred(e)).count()
    }

    pub fn replies(&self) -> usize {
        self.count(|e| matches!(e, Effect::SubmitReply { .. }))
    }

    pub fn check_ins(&self) -> usize {
        self.count(|e| matches!(e, Effect::SubmitCheckIn { .. }))
    }

    pub fn notifications(&self) -> Vec<String> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Notify { body, .. } => Some(body.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn report(&self) -> RunReport {
        self.effects
            .iter()
            .find_map(|e| match e {
                Effect::Finish(report) => Some(report.clone()),
                _ => None,
            })
            .expect("run finished")
    }
}

/// Drives the machine from `first` until no effect is left to answer.
pub fn drive(policy: RunPolicy, seed: u64, first: Msg, site: &mut FakeSite) -> Trace {
    let state = RunState::new(policy, seed);
    let (mut state, initial) = update(state, first);
    let mut queue: VecDeque<Effect> = initial.into();
    let mut effects = Vec::new();
    let mut guard = 0;
    while let Some(effect) = queue.pop_front() {
        guard += 1;
        assert!(guard < 1_000, "state machine did not terminate");
        let reply = site.answer(&effect);
        effects.push(effect);
        if let Some(msg) = reply {
            let (next, more) = update(state, msg);
            state = next;
            queue.extend(more);
        }
    }
    Trace { state, effects }
}

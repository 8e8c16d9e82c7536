use crate::{
    render_final_message, ActionOutcome, AuthState, CheckInControl, CheckInStatus, Effect, Msg,
    Phase, RunResult, RunState,
};

/// Pure update function: applies a message to the run state and returns the
/// effects to execute next. Messages that do not fit the current phase are
/// ignored.
pub fn update(mut state: RunState, msg: Msg) -> (RunState, Vec<Effect>) {
    let effects = match (state.phase(), msg) {
        (Phase::Start, Msg::SessionOpened) => {
            state.set_phase(Phase::AuthCheck);
            vec![Effect::CheckLogin]
        }
        (Phase::Start, Msg::SessionFailed { reason }) => login_failed(&mut state, reason),
        (Phase::AuthCheck, Msg::LoginChecked(check)) => match check.auth {
            AuthState::Authenticated => {
                state.record_login(check);
                state.set_phase(Phase::StatusRead);
                vec![Effect::ReadStatus]
            }
            AuthState::LoginRequired => {
                login_failed(&mut state, "the site asked for a login".to_string())
            }
            AuthState::Unrecognized => {
                login_failed(&mut state, "the profile page was not recognized".to_string())
            }
        },
        (Phase::StatusRead, Msg::StatusRead(counters)) => {
            state.set_counters(counters);
            after_first_status(&mut state)
        }
        (Phase::ListingTargets, Msg::TargetsListed { page, targets }) => {
            state.merge_candidates(targets);
            if page < state.policy().listing_pages {
                vec![Effect::ListTargets { page: page + 1 }]
            } else {
                next_attempt(&mut state)
            }
        }
        (Phase::AwaitingReply, Msg::ReplySubmitted { target, outcome }) => {
            if outcome.is_success() {
                state.record_reply_success();
                state.set_phase(Phase::Settling);
                vec![Effect::Sleep(state.policy().settle_delay)]
            } else {
                let mut effects = vec![notify(
                    &state,
                    format!(
                        "Reply attempt {} to thread {target} failed: {outcome}",
                        state.attempts()
                    ),
                )];
                effects.extend(between_attempts(&mut state));
                effects
            }
        }
        (Phase::Settling, Msg::Slept) => {
            state.set_phase(Phase::RefreshingStatus);
            vec![Effect::ReadStatus]
        }
        (Phase::RefreshingStatus, Msg::StatusRead(counters)) => {
            state.set_counters(counters);
            if state.below_activity_target() {
                between_attempts(&mut state)
            } else {
                begin_check_in(&mut state)
            }
        }
        (Phase::Backoff, Msg::Slept) => next_attempt(&mut state),
        (Phase::CheckIn, Msg::CheckInSubmitted(outcome)) => {
            state.set_check_in(CheckInStatus::Submitted(outcome));
            enter_done(&mut state)
        }
        (Phase::Done, Msg::StatusRead(counters)) => {
            state.set_counters(counters);
            let result = match state.check_in() {
                CheckInStatus::Submitted(ActionOutcome::Success) => RunResult::CompletedWithCheckIn,
                _ => RunResult::CompletedWithoutCheckIn,
            };
            state.finish(result);
            closing_effects(&state)
        }
        _ => Vec::new(),
    };
    (state, effects)
}

fn after_first_status(state: &mut RunState) -> Vec<Effect> {
    match state.control() {
        CheckInControl::Enabled => {
            if state.below_activity_target() && state.attempts_left() {
                state.set_phase(Phase::ListingTargets);
                vec![Effect::ListTargets { page: 1 }]
            } else {
                begin_check_in(state)
            }
        }
        // A missing control on an authenticated page means today's check-in is done.
        CheckInControl::Disabled | CheckInControl::Absent => {
            state.set_check_in(CheckInStatus::AlreadyDone);
            enter_done(state)
        }
    }
}

fn next_attempt(state: &mut RunState) -> Vec<Effect> {
    if !state.attempts_left() {
        return begin_check_in(state);
    }
    match state.take_attempt() {
        Some((target, text)) => {
            state.set_phase(Phase::AwaitingReply);
            vec![Effect::SubmitReply { target, text }]
        }
        None => {
            let activity = state
                .counters()
                .activity
                .map_or_else(|| "unknown".to_string(), |v| v.to_string());
            let mut effects = vec![notify(
                state,
                format!(
                    "No reply targets left after {} attempts; activity is {activity}.",
                    state.attempts()
                ),
            )];
            effects.extend(begin_check_in(state));
            effects
        }
    }
}

/// Pause before the next attempt unless the loop is about to end anyway.
fn between_attempts(state: &mut RunState) -> Vec<Effect> {
    if state.attempts_left() && !state.candidates().is_empty() {
        state.set_phase(Phase::Backoff);
        vec![Effect::Sleep(state.next_backoff())]
    } else {
        next_attempt(state)
    }
}

fn begin_check_in(state: &mut RunState) -> Vec<Effect> {
    state.set_phase(Phase::CheckIn);
    vec![Effect::SubmitCheckIn {
        token: state.token().cloned(),
    }]
}

fn enter_done(state: &mut RunState) -> Vec<Effect> {
    state.set_phase(Phase::Done);
    vec![Effect::ReadStatus]
}

fn login_failed(state: &mut RunState, reason: String) -> Vec<Effect> {
    state.fail_login(reason);
    closing_effects(state)
}

fn closing_effects(state: &RunState) -> Vec<Effect> {
    let report = state.report();
    let body = render_final_message(&report, state.policy().activity_target);
    vec![notify(state, body), Effect::Finish(report)]
}

fn notify(state: &RunState, body: String) -> Effect {
    Effect::Notify {
        title: state.policy().title.clone(),
        body,
    }
}

use crate::{ActionOutcome, LoginCheck, ReplyTarget, StatusCounters};

/// Results fed back into the state machine by whoever executes its effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The authenticated session was constructed.
    SessionOpened,
    /// The session could not be constructed (missing or empty credentials).
    SessionFailed { reason: String },
    /// Result of `Effect::CheckLogin`.
    LoginChecked(LoginCheck),
    /// Result of `Effect::ReadStatus`.
    StatusRead(StatusCounters),
    /// Result of `Effect::ListTargets`.
    TargetsListed {
        page: u32,
        targets: Vec<ReplyTarget>,
    },
    /// Result of `Effect::SubmitReply`.
    ReplySubmitted {
        target: ReplyTarget,
        outcome: ActionOutcome,
    },
    /// Result of `Effect::SubmitCheckIn`.
    CheckInSubmitted(ActionOutcome),
    /// An `Effect::Sleep` elapsed.
    Slept,
}

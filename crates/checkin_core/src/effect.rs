use std::time::Duration;

use crate::{PageToken, ReplyTarget, RunReport};

/// Work requested by the state machine.
///
/// Every effect except `Notify` and `Finish` must be answered with exactly one
/// [`crate::Msg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckLogin,
    ReadStatus,
    ListTargets { page: u32 },
    SubmitReply { target: ReplyTarget, text: String },
    SubmitCheckIn { token: Option<PageToken> },
    Sleep(Duration),
    Notify { title: String, body: String },
    Finish(RunReport),
}

//! Check-in core: pure run state machine and its value types.
mod effect;
mod msg;
mod outcome;
mod policy;
mod report;
mod state;
mod update;

pub use effect::Effect;
pub use msg::Msg;
pub use outcome::{
    ActionOutcome, AuthState, CheckInControl, FailureReason, LoginCheck, PageToken, ReplyTarget,
    StatusCounters,
};
pub use policy::{BackoffWindow, RunPolicy};
pub use report::{render_final_message, CheckInStatus, RunReport, RunResult};
pub use state::{Phase, RunState};
pub use update::update;

use std::fmt::Write;

use crate::{ActionOutcome, StatusCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    LoginFailed,
    /// The check-in action was submitted and classified as a success.
    CompletedWithCheckIn,
    /// The full policy ran but no successful check-in happened in this run
    /// (already done today, control absent, or the submission failed).
    CompletedWithoutCheckIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInStatus {
    NotReached,
    AlreadyDone,
    Submitted(ActionOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub result: RunResult,
    pub counters: StatusCounters,
    pub reply_attempts: u32,
    pub replies_succeeded: u32,
    pub check_in: CheckInStatus,
    /// Why the run stopped early, for `LoginFailed`.
    pub failure: Option<String>,
}

impl RunReport {
    /// Overall run result: only a login failure counts as failure.
    pub fn is_success(&self) -> bool {
        self.result != RunResult::LoginFailed
    }
}

/// Body of the consolidated end-of-run notification.
pub fn render_final_message(report: &RunReport, activity_target: Option<i64>) -> String {
    let mut out = String::new();
    if report.result == RunResult::LoginFailed {
        let reason = report.failure.as_deref().unwrap_or("unknown reason");
        let _ = writeln!(out, "Login failed: {reason}");
        out.push_str("Check the stored cookies.");
        return out;
    }

    let check_in = match &report.check_in {
        CheckInStatus::NotReached => "not attempted".to_string(),
        CheckInStatus::AlreadyDone => "already done today".to_string(),
        CheckInStatus::Submitted(outcome) => outcome.to_string(),
    };
    let _ = writeln!(out, "Check-in: {check_in}");
    if report.reply_attempts > 0 {
        let _ = writeln!(
            out,
            "Replies: {} succeeded of {} attempted",
            report.replies_succeeded, report.reply_attempts
        );
    }
    let _ = writeln!(out, "Balance: {}", display_counter(report.counters.balance));
    match activity_target {
        Some(target) => {
            let _ = write!(
                out,
                "Activity: {} / {target}",
                display_counter(report.counters.activity)
            );
        }
        None => {
            let _ = write!(out, "Activity: {}", display_counter(report.counters.activity));
        }
    }
    out
}

fn display_counter(value: Option<i64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureReason;

    fn report(result: RunResult, check_in: CheckInStatus) -> RunReport {
        RunReport {
            result,
            counters: StatusCounters {
                balance: Some(120),
                activity: Some(7),
            },
            reply_attempts: 0,
            replies_succeeded: 0,
            check_in,
            failure: None,
        }
    }

    #[test]
    fn final_message_lists_both_counters() {
        let text = render_final_message(
            &report(RunResult::CompletedWithoutCheckIn, CheckInStatus::AlreadyDone),
            Some(10),
        );
        assert!(text.contains("already done today"));
        assert!(text.contains("Balance: 120"));
        assert!(text.contains("Activity: 7 / 10"));
    }

    #[test]
    fn failed_check_in_is_reported_with_reason() {
        let text = render_final_message(
            &report(
                RunResult::CompletedWithoutCheckIn,
                CheckInStatus::Submitted(ActionOutcome::Failure(FailureReason::HttpStatus(502))),
            ),
            None,
        );
        assert!(text.contains("Check-in: failure: http status 502"));
        assert!(text.contains("Activity: 7"));
    }

    #[test]
    fn unknown_counters_are_spelled_out() {
        let mut r = report(RunResult::CompletedWithCheckIn, CheckInStatus::NotReached);
        r.counters = StatusCounters::default();
        let text = render_final_message(&r, None);
        assert!(text.contains("Balance: unknown"));
    }
}

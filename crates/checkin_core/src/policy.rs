use std::time::Duration;

/// Bounds for the jittered pause between reply attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffWindow {
    pub min: Duration,
    pub max: Duration,
}

impl BackoffWindow {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }
}

/// Everything the run state machine needs to know about a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPolicy {
    /// Used as the notification title.
    pub title: String,
    /// `None` disables the reply loop entirely.
    pub activity_target: Option<i64>,
    pub max_attempts: u32,
    pub reply_pool: Vec<String>,
    /// Number of section listing pages scanned for reply targets.
    pub listing_pages: u32,
    pub settle_delay: Duration,
    pub backoff: BackoffWindow,
}

impl RunPolicy {
    /// Policy for a check-in-only site.
    pub fn check_in_only(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            activity_target: None,
            max_attempts: 0,
            reply_pool: Vec::new(),
            listing_pages: 1,
            settle_delay: Duration::ZERO,
            backoff: BackoffWindow::fixed(Duration::ZERO),
        }
    }
}

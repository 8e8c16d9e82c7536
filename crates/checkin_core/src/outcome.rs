use std::fmt;

/// Numeric thread id discovered by listing a forum section.
pub type ReplyTarget = u64;

/// Anti-forgery token scraped from a page. Only valid for the session that
/// fetched the page.
#[derive(Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in log lines through `{:?}`; keep them short.
impl fmt::Debug for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "PageToken({prefix}..)")
    }
}

/// Result of one state-changing HTTP interaction.
///
/// `Indeterminate` is never a success; it carries a truncated copy of the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure(FailureReason),
    Indeterminate(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success)
    }
}

impl fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Success => write!(f, "success"),
            ActionOutcome::Failure(reason) => write!(f, "failure: {reason}"),
            ActionOutcome::Indeterminate(_) => write!(f, "indeterminate response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    HttpStatus(u16),
    Network(String),
    /// The site answered with an explicit negative message.
    Rejected(String),
    /// A page element the action depends on was not found.
    MissingMarker(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::HttpStatus(code) => write!(f, "http status {code}"),
            FailureReason::Network(message) => write!(f, "network error: {message}"),
            FailureReason::Rejected(message) => write!(f, "rejected by site: {message}"),
            FailureReason::MissingMarker(marker) => write!(f, "{marker} not found"),
        }
    }
}

/// Point balance and activity counter as read from the profile page.
/// `None` means the value could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounters {
    pub balance: Option<i64>,
    pub activity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    /// The page explicitly asks the user to log in.
    LoginRequired,
    /// Neither logged-in nor login markers were recognized.
    Unrecognized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInControl {
    Enabled,
    /// Present but disabled, usually because today's check-in is done.
    Disabled,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCheck {
    pub auth: AuthState,
    pub control: CheckInControl,
    pub token: Option<PageToken>,
}

impl LoginCheck {
    /// Fail-closed view of the login state: only an explicit match counts.
    pub fn is_authenticated(&self) -> bool {
        self.auth == AuthState::Authenticated
    }

    pub fn not_authenticated(auth: AuthState) -> Self {
        Self {
            auth,
            control: CheckInControl::Absent,
            token: None,
        }
    }
}

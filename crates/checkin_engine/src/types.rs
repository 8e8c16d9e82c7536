use std::fmt;

use checkin_core::FailureReason;

use crate::credentials::CredentialError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    InvalidUrl,
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestFailure::InvalidUrl => write!(f, "invalid url"),
            RequestFailure::Timeout => write!(f, "timeout"),
            RequestFailure::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            RequestFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            RequestFailure::Network => write!(f, "network error"),
        }
    }
}

/// A request that produced no HTTP response worth classifying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RequestError {
    pub kind: RequestFailure,
    pub message: String,
}

impl RequestError {
    pub(crate) fn new(kind: RequestFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<RequestError> for FailureReason {
    fn from(err: RequestError) -> Self {
        FailureReason::Network(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no cookies supplied for the session")]
    CredentialMissing,
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    #[error("invalid base url {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },
    #[error("failed to build http client: {0}")]
    Client(String),
}

/// Any HTTP response, 2xx or not, with its body decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub requested_url: String,
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Where a followed redirect chain ended, if any redirect happened.
    pub fn redirect_target(&self) -> Option<&str> {
        (self.redirect_count > 0 || self.final_url != self.requested_url)
            .then_some(self.final_url.as_str())
    }
}

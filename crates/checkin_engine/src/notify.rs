use std::time::Duration;

use async_trait::async_trait;
use checkin_logging::{checkin_info, checkin_warn};
use serde::Serialize;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort delivery of run notifications. Implementations swallow their
/// own failures; the caller never waits on a retry.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str);
}

/// Used when no notification channel is configured; only logs.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, title: &str, body: &str) {
        checkin_info!("{title}: {body}");
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to build notifier client: {0}")]
pub struct NotifierError(String);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_notification: bool,
    disable_web_page_preview: bool,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|err| NotifierError(err.to_string()))?;
        Ok(Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }

    /// Reads `TG_BOT_TOKEN` and `TG_USER_ID`; `None` when either is unset or empty.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TG_BOT_TOKEN").ok().filter(|v| !v.trim().is_empty())?;
        let chat_id = std::env::var("TG_USER_ID").ok().filter(|v| !v.trim().is_empty())?;
        match Self::new(token.trim(), chat_id.trim()) {
            Ok(notifier) => Some(notifier),
            Err(err) => {
                checkin_warn!("{err}");
                None
            }
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, title: &str, body: &str) {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let message = SendMessage {
            chat_id: &self.chat_id,
            text: format!("{title}\n\n{body}"),
            disable_notification: false,
            disable_web_page_preview: true,
        };
        match self.client.post(&url).json(&message).send().await {
            Ok(response) if response.status().is_success() => {
                checkin_info!("notification sent: {title}");
            }
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                checkin_warn!("notification rejected with {status}: {text}");
            }
            // reqwest errors embed the URL, which carries the bot token.
            Err(err) => checkin_warn!("notification failed: {}", err.without_url()),
        }
    }
}

/// Telegram when configured, otherwise the logging no-op.
pub fn notifier_from_env() -> Box<dyn Notifier> {
    match TelegramNotifier::from_env() {
        Some(telegram) => Box::new(telegram),
        None => {
            checkin_info!("TG_BOT_TOKEN/TG_USER_ID not set; notifications are only logged");
            Box::new(NoopNotifier)
        }
    }
}

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use checkin_logging::{checkin_debug, checkin_trace, checkin_warn, redact};
use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, REFERER};
use url::Url;

use crate::credentials::CookieSet;
use crate::decode::decode_body;
use crate::{HttpReply, RequestError, RequestFailure, SessionError};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36 Edg/138.0.0.0";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7".to_string(),
        }
    }
}

/// Authenticated HTTP session for one run against one site.
///
/// Owns its cookie jar; two sessions never share cookies. Requests are issued
/// one at a time, which is what keeps the shared redirect counter meaningful.
pub struct Session {
    client: reqwest::Client,
    base_url: Url,
    max_bytes: u64,
    redirect_counter: Arc<AtomicUsize>,
}

impl Session {
    /// Builds the client with the cookies bound to `base_url`.
    /// Fails before any network traffic when `cookies` is empty.
    pub fn open(
        base_url: &str,
        cookies: &CookieSet,
        settings: &SessionSettings,
    ) -> Result<Self, SessionError> {
        if cookies.is_empty() {
            return Err(SessionError::CredentialMissing);
        }
        let base_url = Url::parse(base_url).map_err(|err| SessionError::InvalidBaseUrl {
            url: base_url.to_string(),
            message: err.to_string(),
        })?;

        let jar = Arc::new(Jar::default());
        for (name, value) in cookies.iter() {
            checkin_trace!("cookie {name}={}", redact(value));
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), &base_url);
        }

        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = build_client(settings, &base_url, jar, redirect_counter.clone())?;
        checkin_debug!(
            "session opened for {} with {} cookies",
            base_url,
            cookies.len()
        );

        Ok(Self {
            client,
            base_url,
            max_bytes: settings.max_bytes,
            redirect_counter,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a site-relative path (or absolute URL) against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url, RequestError> {
        self.base_url
            .join(path)
            .map_err(|err| RequestError::new(RequestFailure::InvalidUrl, err.to_string()))
    }

    pub async fn get(&self, url: &Url, headers: HeaderMap) -> Result<HttpReply, RequestError> {
        let request = self.client.get(url.clone()).headers(headers);
        self.send("GET", url, request).await
    }

    pub async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
        headers: HeaderMap,
    ) -> Result<HttpReply, RequestError> {
        let request = self.client.post(url.clone()).headers(headers).form(fields);
        self.send("POST", url, request).await
    }

    async fn send(
        &self,
        method: &str,
        url: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<HttpReply, RequestError> {
        self.redirect_counter.store(0, Ordering::Relaxed);
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        checkin_debug!("{method} {} -> {status}", url.path());

        if let Some(content_len) = response.content_length() {
            if content_len > self.max_bytes {
                return Err(RequestError::new(
                    RequestFailure::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(RequestError::new(
                    RequestFailure::TooLarge {
                        max_bytes: self.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let decoded = decode_body(&bytes, content_type.as_deref());
        Ok(HttpReply {
            status,
            requested_url: url.to_string(),
            final_url,
            redirect_count: self.redirect_counter.load(Ordering::Relaxed),
            content_type,
            body: decoded.text,
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        checkin_debug!("session for {} closed", self.base_url);
    }
}

/// Per-call header override carrying only a referer.
pub fn referer(url: &Url) -> HeaderMap {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(url.as_str()) {
        Ok(value) => {
            headers.insert(REFERER, value);
        }
        Err(err) => checkin_warn!("cannot use {url} as referer: {err}"),
    }
    headers
}

fn build_client(
    settings: &SessionSettings,
    base_url: &Url,
    jar: Arc<Jar>,
    redirect_counter: Arc<AtomicUsize>,
) -> Result<reqwest::Client, SessionError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        let count = attempt.previous().len();
        redirect_counter.store(count, Ordering::Relaxed);
        if count >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .cookie_provider(jar)
        .default_headers(default_headers(settings, base_url)?)
        .build()
        .map_err(|err| SessionError::Client(err.to_string()))
}

fn default_headers(settings: &SessionSettings, base_url: &Url) -> Result<HeaderMap, SessionError> {
    let referer = base_url.join("/").map_or_else(|_| base_url.to_string(), |u| u.to_string());
    let pairs = [
        ("user-agent", settings.user_agent.as_str()),
        ("x-requested-with", "XMLHttpRequest"),
        ("accept", "*/*"),
        ("dnt", "1"),
        ("accept-language", settings.accept_language.as_str()),
        ("referer", referer.as_str()),
    ];
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let value = HeaderValue::from_str(value)
            .map_err(|err| SessionError::Client(format!("invalid {name} header: {err}")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

fn map_reqwest_error(err: reqwest::Error) -> RequestError {
    if err.is_timeout() {
        return RequestError::new(RequestFailure::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return RequestError::new(RequestFailure::RedirectLimitExceeded, err.to_string());
    }
    RequestError::new(RequestFailure::Network, err.to_string())
}

//! Cookie credentials taken from an environment variable.
//!
//! The variable holds either a browser "copy as fetch" snippet or a bare
//! `Cookie` header value such as `sid=abc; uid=42`.
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DOUBLE_QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']cookie["']\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("cookie pattern")
});

static SINGLE_QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']cookie["']\s*:\s*'((?:[^'\\]|\\.)*)'"#).expect("cookie pattern")
});

/// Cookie name to value, as sent to the site.
pub type CookieSet = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("environment variable {0} is not set")]
    Missing(String),
    #[error("no cookie header found in {0}")]
    NoCookieHeader(String),
    #[error("cookie header in {0} holds no name=value pairs")]
    Empty(String),
}

/// Reads and parses the cookie set stored in `env_name`.
pub fn cookies_from_env(env_name: &str) -> Result<CookieSet, CredentialError> {
    let raw = std::env::var(env_name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| CredentialError::Missing(env_name.to_string()))?;
    parse_credentials(&raw, env_name)
}

/// Parses either a fetch snippet or a bare cookie header. `source` only
/// labels errors.
pub fn parse_credentials(raw: &str, source: &str) -> Result<CookieSet, CredentialError> {
    let header = match extract_cookie_header(raw) {
        Some(header) => header,
        None if looks_like_cookie_header(raw) => raw.trim().to_string(),
        None => return Err(CredentialError::NoCookieHeader(source.to_string())),
    };
    let cookies = parse_cookie_header(&header);
    if cookies.is_empty() {
        return Err(CredentialError::Empty(source.to_string()));
    }
    Ok(cookies)
}

/// Finds the `"cookie": "..."` entry of a fetch snippet's headers object.
pub fn extract_cookie_header(fetch_snippet: &str) -> Option<String> {
    DOUBLE_QUOTED_RE
        .captures(fetch_snippet)
        .or_else(|| SINGLE_QUOTED_RE.captures(fetch_snippet))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace("\\\"", "\"").replace("\\'", "'"))
}

/// Splits `a=1; b=2` into pairs. Only the first `=` separates name from value.
pub fn parse_cookie_header(header: &str) -> CookieSet {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
        })
        .collect()
}

fn looks_like_cookie_header(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.contains("fetch(") && trimmed.contains('=')
}

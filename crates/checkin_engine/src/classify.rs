//! Response Classifier: turns an HTTP reply into an `ActionOutcome`.
//!
//! Order of evaluation:
//! 1. non-2xx status is a failure, whatever the body says;
//! 2. a `<ajax><![CDATA[..]]></ajax>` envelope is judged on its payload alone;
//! 3. otherwise explicit negative markers, then body keywords in the raw
//!    body, then a redirect to the acted-upon resource;
//! 4. anything else is `Indeterminate`, carrying a truncated body.
//!
//! Envelope keywords never apply to a raw page: full HTML routinely carries
//! words like `success:` in inline scripts.

use checkin_core::{ActionOutcome, FailureReason};
use checkin_logging::{checkin_debug, checkin_warn};
use regex::Regex;
use std::sync::LazyLock;

use crate::profile::{render_template, ClassifierRules};
use crate::snippet::diagnostic_snippet;
use crate::HttpReply;

static ENVELOPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<ajax><!\[CDATA\[(.*?)\]\]></ajax>").expect("envelope pattern")
});

pub fn classify(reply: &HttpReply, rules: &ClassifierRules, resource_id: Option<u64>) -> ActionOutcome {
    classify_parts(
        reply.status,
        &reply.body,
        reply.redirect_target(),
        rules,
        resource_id,
    )
}

pub fn classify_parts(
    status: u16,
    body: &str,
    redirect_target: Option<&str>,
    rules: &ClassifierRules,
    resource_id: Option<u64>,
) -> ActionOutcome {
    if !(200..300).contains(&status) {
        return ActionOutcome::Failure(FailureReason::HttpStatus(status));
    }

    if let Some(payload) = cdata_payload(body) {
        checkin_debug!("envelope payload: {}", diagnostic_snippet(payload));
        return if contains_any(payload, &rules.envelope_keywords) {
            ActionOutcome::Success
        } else {
            ActionOutcome::Failure(FailureReason::Rejected(payload.to_string()))
        };
    }

    if let Some(message) = negative_message(body, &rules.negative) {
        return ActionOutcome::Failure(FailureReason::Rejected(message));
    }

    if contains_any(body, &rules.body_keywords) {
        return ActionOutcome::Success;
    }

    if let (Some(target), Some(marker), Some(id)) =
        (redirect_target, rules.redirect_marker.as_deref(), resource_id)
    {
        let marker = render_template(marker, &[("id", id)]);
        if contains_marker(target, &marker) {
            checkin_debug!("redirect to {target} counts as success");
            return ActionOutcome::Success;
        }
    }

    let snippet = diagnostic_snippet(body);
    checkin_warn!("unrecognized response: {snippet}");
    ActionOutcome::Indeterminate(snippet)
}

/// Inner text of the first `<ajax><![CDATA[ .. ]]></ajax>` envelope, trimmed.
pub fn cdata_payload(body: &str) -> Option<&str> {
    ENVELOPE_RE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
}

// `tid-7` must not match inside `tid-78`.
fn contains_marker(target: &str, marker: &str) -> bool {
    target.match_indices(marker).any(|(at, _)| {
        !target[at + marker.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

fn negative_message(body: &str, patterns: &[String]) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let re = Regex::new(pattern).ok()?;
        let caps = re.captures(body)?;
        let text = caps.get(1).or_else(|| caps.get(0))?.as_str();
        Some(strip_tags(text).trim().to_string())
    })
}

fn strip_tags(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

//! Token Extractor: structural queries over server-rendered pages, with a
//! regex fallback over inline scripts for the anti-forgery token.
//!
//! Selectors come from the site profile. A selector that fails to parse is
//! treated like one that matches nothing.

use checkin_core::{AuthState, CheckInControl, LoginCheck, PageToken, ReplyTarget, StatusCounters};
use checkin_logging::{checkin_debug, checkin_warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::profile::{
    ControlRule, CounterRule, ProfilePageRules, ReplyFormRules, ThreadListRules, TokenRule,
};
use crate::snippet::diagnostic_snippet;

/// Everything the profile page tells us in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePage {
    pub auth: AuthState,
    pub control: CheckInControl,
    pub token: Option<PageToken>,
    pub counters: StatusCounters,
}

impl ProfilePage {
    pub fn found(&self) -> bool {
        self.auth == AuthState::Authenticated
    }

    pub fn login_check(&self) -> LoginCheck {
        if !self.found() {
            return LoginCheck::not_authenticated(self.auth);
        }
        LoginCheck {
            auth: self.auth,
            control: self.control,
            token: self.token.clone(),
        }
    }
}

pub fn extract_profile_page(html: &str, rules: &ProfilePageRules) -> ProfilePage {
    let doc = Html::parse_document(html);
    let control = control_state(&doc, &rules.control);
    let auth = auth_state(&doc, html, rules, control);
    let token = if auth == AuthState::Authenticated {
        find_token(&doc, &rules.token)
    } else {
        None
    };
    if auth == AuthState::Unrecognized {
        checkin_warn!(
            "profile page not recognized as logged in or logged out: {}",
            diagnostic_snippet(html)
        );
    }
    if auth == AuthState::Authenticated && token.is_none() {
        checkin_debug!("no {} token on profile page", rules.token.script_var);
    }

    ProfilePage {
        auth,
        control,
        token,
        counters: read_counters(&doc, rules),
    }
}

fn auth_state(
    doc: &Html,
    raw: &str,
    rules: &ProfilePageRules,
    control: CheckInControl,
) -> AuthState {
    let login_form = rules
        .login_form
        .as_deref()
        .is_some_and(|sel| first_match(doc, sel).is_some());
    if login_form {
        return AuthState::LoginRequired;
    }

    let markers = !rules.logged_in.is_empty()
        && rules
            .logged_in
            .iter()
            .all(|sel| first_match(doc, sel).is_some_and(marker_is_filled));
    let control_login = rules.control_proves_login && control != CheckInControl::Absent;
    if markers || control_login {
        return AuthState::Authenticated;
    }

    if rules
        .login_phrases
        .iter()
        .any(|phrase| raw.contains(phrase.as_str()))
    {
        AuthState::LoginRequired
    } else {
        AuthState::Unrecognized
    }
}

// A username span must carry text; a logout link must carry a target.
fn marker_is_filled(element: ElementRef<'_>) -> bool {
    element.value().attr("href").is_some_and(|h| !h.is_empty()) || !element_text(element).is_empty()
}

/// First control matching the rule decides; an enabled one wins over a done one.
pub fn control_state(doc: &Html, rule: &ControlRule) -> CheckInControl {
    let Some(selector) = parse_selector(&rule.selector) else {
        return CheckInControl::Absent;
    };
    let mut state = CheckInControl::Absent;
    for element in doc.select(&selector) {
        let text = element_text(element);
        let node = element.value();
        let disabled = rule
            .disabled_class
            .as_deref()
            .is_some_and(|class| node.classes().any(|c| c == class))
            || rule
                .disabled_attr
                .as_deref()
                .is_some_and(|attr| node.attr(attr).is_some());

        if !disabled && text.contains(rule.enabled_text.as_str()) {
            return CheckInControl::Enabled;
        }
        let done_text = rule.done_text.as_deref().unwrap_or(&rule.enabled_text);
        if disabled && text.contains(done_text) {
            state = CheckInControl::Disabled;
        }
    }
    state
}

pub fn read_counters(doc: &Html, rules: &ProfilePageRules) -> StatusCounters {
    StatusCounters {
        balance: rules.balance.as_ref().and_then(|rule| read_counter(doc, rule)),
        activity: rules.activity.as_ref().and_then(|rule| read_counter(doc, rule)),
    }
}

fn read_counter(doc: &Html, rule: &CounterRule) -> Option<i64> {
    let container = parse_selector(&rule.container)?;
    let value = parse_selector(&rule.value);
    for element in doc.select(&container) {
        let text = element_text(element);
        let Some(label_at) = text.find(rule.label.as_str()) else {
            continue;
        };
        let parsed = value
            .as_ref()
            .and_then(|sel| element.select(sel).next())
            .and_then(|v| parse_number(&element_text(v)))
            .or_else(|| parse_number(&text[label_at + rule.label.len()..]));
        if parsed.is_none() {
            checkin_debug!("counter {:?} has no numeric value", rule.label);
        }
        return parsed;
    }
    None
}

/// First integer in `text`, ignoring thousands separators.
pub fn parse_number(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let start = cleaned.find(|c: char| c.is_ascii_digit())?;
    let negative = cleaned[..start].ends_with('-');
    let digits: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Hidden input first, then every inline script in document order.
pub fn find_token(doc: &Html, rule: &TokenRule) -> Option<PageToken> {
    let from_input = rule.input_name.as_deref().and_then(|name| {
        let selector = parse_selector(&format!("input[name=\"{name}\"]"))?;
        doc.select(&selector)
            .filter_map(|input| input.value().attr("value"))
            .map(str::trim)
            .find(|value| !value.is_empty())
            .map(PageToken::new)
    });
    from_input.or_else(|| token_from_scripts(doc, &rule.script_var))
}

pub fn token_from_scripts(doc: &Html, var_name: &str) -> Option<PageToken> {
    let pattern = format!(
        r#"\b{}\s*=\s*['"]([0-9a-fA-F]+)['"]"#,
        regex::escape(var_name)
    );
    let re = Regex::new(&pattern).ok()?;
    let scripts = parse_selector("script")?;
    doc.select(&scripts).find_map(|script| {
        let body: String = script.text().collect();
        re.captures(&body)
            .and_then(|caps| caps.get(1))
            .map(|m| PageToken::new(m.as_str()))
    })
}

/// Ordinary thread ids in display order, taken from rows after the header row.
pub fn thread_ids(html: &str, rules: &ThreadListRules) -> Vec<ReplyTarget> {
    let doc = Html::parse_document(html);
    let (Some(table), Some(rows), Some(id_cell)) = (
        parse_selector(&rules.table),
        parse_selector("tr"),
        parse_selector(&rules.id_cell),
    ) else {
        return Vec::new();
    };
    let Some(table) = doc.select(&table).next() else {
        checkin_warn!("thread table {:?} not found", rules.table);
        return Vec::new();
    };

    let mut ids = Vec::new();
    let mut past_header = false;
    for row in table.select(&rows) {
        let classes: Vec<&str> = row.value().classes().collect();
        if !past_header {
            past_header = classes.contains(&rules.header_class.as_str())
                && element_text(row).contains(rules.header_text.as_str());
            continue;
        }
        if !classes.contains(&rules.row_class.as_str()) {
            continue;
        }
        let id = row
            .select(&id_cell)
            .filter_map(|cell| cell.value().attr("id"))
            .find_map(|id| id.strip_prefix(rules.id_prefix.as_str()))
            .and_then(parse_number)
            .and_then(|n| u64::try_from(n).ok());
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    if !past_header {
        checkin_warn!("header row {:?} not found in thread table", rules.header_text);
    }
    ids
}

/// Hidden fields of the reply form, or `None` when there is no reply form.
pub fn reply_form_fields(html: &str, rules: &ReplyFormRules) -> Option<Vec<(String, String)>> {
    let doc = Html::parse_document(html);
    let form = first_match(&doc, &rules.form)?;
    let hidden = parse_selector("input[type=\"hidden\"]")?;
    Some(
        form.select(&hidden)
            .filter_map(|input| {
                let node = input.value();
                let name = node.attr("name").filter(|n| !n.is_empty())?;
                Some((name.to_string(), node.attr("value").unwrap_or_default().to_string()))
            })
            .collect(),
    )
}

fn first_match<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(selector)?;
    doc.select(&selector).next()
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(err) => {
            checkin_warn!("invalid selector {selector:?}: {err}");
            None
        }
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

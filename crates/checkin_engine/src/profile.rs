use std::time::Duration;

use checkin_core::{BackoffWindow, RunPolicy};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile {profile}: invalid selector {selector:?}")]
    InvalidSelector { profile: String, selector: String },
    #[error("profile {profile}: invalid url {url:?}: {message}")]
    InvalidUrl {
        profile: String,
        url: String,
        message: String,
    },
    #[error("profile {profile}: {message}")]
    Inconsistent { profile: String, message: String },
}

/// Static description of one forum: where things live and how to recognize them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Short identifier used on the command line.
    pub name: String,
    /// Human-readable name used in notification titles.
    pub display_name: String,
    pub base_url: String,
    /// Environment variable holding the cookie credentials.
    pub credential_env: String,
    /// Forum section listed for reply targets.
    #[serde(default)]
    pub section_id: Option<u64>,
    #[serde(default)]
    pub activity_target: Option<i64>,
    #[serde(default)]
    pub max_attempts: u32,
    /// Environment variable that may override `max_attempts`.
    #[serde(default)]
    pub max_attempts_env: Option<String>,
    #[serde(default = "one")]
    pub listing_pages: u32,
    #[serde(default)]
    pub reply_pool: Vec<String>,
    #[serde(default)]
    pub settle_delay_secs: u64,
    #[serde(default)]
    pub backoff_secs: (u64, u64),
    pub urls: UrlTemplates,
    pub profile_page: ProfilePageRules,
    #[serde(default)]
    pub thread_list: Option<ThreadListRules>,
    #[serde(default)]
    pub reply_form: Option<ReplyFormRules>,
    pub check_in: CheckInRequest,
    #[serde(default)]
    pub reply_rules: ClassifierRules,
    pub check_in_rules: ClassifierRules,
}

fn one() -> u32 {
    1
}

/// Paths relative to the base URL. Placeholders: `{fid}`, `{page}`, `{tid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTemplates {
    pub profile: String,
    #[serde(default)]
    pub listing: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub post: Option<String>,
    pub check_in: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePageRules {
    /// Selectors that must all match (with non-empty text or an href) on a
    /// logged-in page, e.g. username element and logout link.
    #[serde(default)]
    pub logged_in: Vec<String>,
    /// When set, a recognized check-in control also proves the login.
    #[serde(default)]
    pub control_proves_login: bool,
    /// Selector of a login form, whose presence means "not logged in".
    #[serde(default)]
    pub login_form: Option<String>,
    /// Phrases consulted only when no structural marker was recognized.
    #[serde(default)]
    pub login_phrases: Vec<String>,
    pub control: ControlRule,
    #[serde(default)]
    pub balance: Option<CounterRule>,
    #[serde(default)]
    pub activity: Option<CounterRule>,
    pub token: TokenRule,
}

/// How to find the check-in control and tell whether it is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRule {
    pub selector: String,
    /// Text of a usable control.
    pub enabled_text: String,
    /// Text of a control once today's check-in is done, if it changes.
    #[serde(default)]
    pub done_text: Option<String>,
    #[serde(default)]
    pub disabled_class: Option<String>,
    #[serde(default)]
    pub disabled_attr: Option<String>,
}

/// A labelled number such as `<p class="mb5">MB：<a>120</a></p>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRule {
    pub container: String,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRule {
    /// Script variable name, e.g. `verifyhash` in `var verifyhash = '...'`.
    pub script_var: String,
    /// Name of a hidden input carrying the same token, checked first.
    #[serde(default)]
    pub input_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadListRules {
    pub table: String,
    /// Row class and text marking the start of ordinary threads.
    pub header_class: String,
    pub header_text: String,
    pub row_class: String,
    /// Cell whose id attribute carries the thread id after `id_prefix`.
    pub id_cell: String,
    pub id_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyFormRules {
    pub form: String,
    pub content_field: String,
    pub section_field: String,
    pub thread_field: String,
    #[serde(default)]
    pub extra_fields: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub token_field: String,
    /// Also append the token to the check-in URL query.
    #[serde(default)]
    pub token_in_query: bool,
    #[serde(default)]
    pub fields: Vec<(String, String)>,
}

/// Keyword sets the response classifier matches against.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Keywords matched against a `<ajax><![CDATA[..]]></ajax>` payload.
    pub envelope_keywords: Vec<String>,
    /// Keywords matched against a raw body that carries no envelope.
    #[serde(default)]
    pub body_keywords: Vec<String>,
    /// Regexes whose first capture group is an explicit rejection message.
    #[serde(default)]
    pub negative: Vec<String>,
    /// Redirect target fragment proving success; `{id}` is the resource id.
    #[serde(default)]
    pub redirect_marker: Option<String>,
}

impl SiteProfile {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn notification_title(&self) -> String {
        format!("{} check-in", self.display_name)
    }

    /// Attempt budget, honouring the override variable when it parses.
    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .unwrap_or(self.max_attempts)
    }

    /// The replying policy only makes sense when the site can be replied to.
    pub fn replies_enabled(&self) -> bool {
        self.activity_target.is_some()
            && self.thread_list.is_some()
            && self.reply_form.is_some()
            && self.urls.listing.is_some()
            && self.urls.read.is_some()
            && self.urls.post.is_some()
    }

    pub fn run_policy(&self) -> RunPolicy {
        if !self.replies_enabled() {
            return RunPolicy::check_in_only(self.notification_title());
        }
        let (min, max) = self.backoff_secs;
        RunPolicy {
            title: self.notification_title(),
            activity_target: self.activity_target,
            max_attempts: self.effective_max_attempts(),
            reply_pool: self.reply_pool.clone(),
            listing_pages: self.listing_pages.max(1),
            settle_delay: Duration::from_secs(self.settle_delay_secs),
            backoff: BackoffWindow {
                min: Duration::from_secs(min),
                max: Duration::from_secs(max.max(min)),
            },
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        let base = Url::parse(&self.base_url).map_err(|err| ProfileError::InvalidUrl {
            profile: self.name.clone(),
            url: self.base_url.clone(),
            message: err.to_string(),
        })?;

        for selector in self.selectors() {
            if Selector::parse(selector).is_err() {
                return Err(ProfileError::InvalidSelector {
                    profile: self.name.clone(),
                    selector: selector.to_string(),
                });
            }
        }

        for template in self.templates() {
            let rendered = render_template(template, &[("fid", 1), ("page", 1), ("tid", 1)]);
            base.join(&rendered).map_err(|err| ProfileError::InvalidUrl {
                profile: self.name.clone(),
                url: template.to_string(),
                message: err.to_string(),
            })?;
        }

        for pattern in self
            .reply_rules
            .negative
            .iter()
            .chain(&self.check_in_rules.negative)
        {
            if regex::Regex::new(pattern).is_err() {
                return Err(self.inconsistent(format!("invalid negative pattern {pattern:?}")));
            }
        }

        if self.activity_target.is_some() {
            if !self.replies_enabled() {
                return Err(self.inconsistent(
                    "activity target set without thread list, reply form and reply urls",
                ));
            }
            if self.section_id.is_none() {
                return Err(self.inconsistent("activity target set without a section id"));
            }
            if self.reply_pool.is_empty() {
                return Err(self.inconsistent("activity target set with an empty reply pool"));
            }
        }
        Ok(())
    }

    fn inconsistent(&self, message: impl Into<String>) -> ProfileError {
        ProfileError::Inconsistent {
            profile: self.name.clone(),
            message: message.into(),
        }
    }

    fn selectors(&self) -> Vec<&str> {
        let page = &self.profile_page;
        let mut out: Vec<&str> = page.logged_in.iter().map(String::as_str).collect();
        out.extend(page.login_form.as_deref());
        out.push(&page.control.selector);
        for counter in [&page.balance, &page.activity].into_iter().flatten() {
            out.push(&counter.container);
            out.push(&counter.value);
        }
        if let Some(list) = &self.thread_list {
            out.push(&list.table);
            out.push(&list.id_cell);
        }
        if let Some(form) = &self.reply_form {
            out.push(&form.form);
        }
        out
    }

    fn templates(&self) -> Vec<&str> {
        let urls = &self.urls;
        let mut out = vec![urls.profile.as_str(), urls.check_in.as_str()];
        out.extend(urls.listing.as_deref());
        out.extend(urls.read.as_deref());
        out.extend(urls.post.as_deref());
        out
    }
}

/// Substitutes `{name}` placeholders with numeric values.
pub fn render_template(template: &str, values: &[(&str, u64)]) -> String {
    values
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("{{{name}}}"), &value.to_string())
        })
}

const MOESHARE_REPLIES: &[&str] = &[
    "每日打卡，补充一些活跃度",
    "每天签到打卡，增加点活跃度。",
    "水来水去终成空  日日水区日日水",
    "每天坚持打卡，争取早日升级",
    "每日打卡+签到，增加论坛活跃度。日常签到打卡 又是新的一天",
    "每日打卡，勤劳致富,快快升级~~~~~",
    "每天逛水區，爲了早日升級，努力！每天逛水區，爲了早日升級，努力！",
    "每天水一个贴来增加活跃度啦",
    "为了升级每天都来水一篇 努力加油 ! ! ! ! ! 努力加油 ! ! ! ! !",
    "今天也要坚持打卡，必须努力",
    "今日上班先摸鱼打一个卡，贵在坚持",
    "每日打卡签到，大家加油加油~~~",
];

impl SiteProfile {
    /// phpwind forum with an activity counter raised by replying in section 36.
    pub fn moeshare() -> Self {
        Self {
            name: "moeshare".to_string(),
            display_name: "萌享社".to_string(),
            base_url: "https://www.moeshare.cc".to_string(),
            credential_env: "MOESHARE_DAYSIGN".to_string(),
            section_id: Some(36),
            activity_target: Some(10),
            max_attempts: 15,
            max_attempts_env: Some("REPLY_TIMES_MOESHARE".to_string()),
            listing_pages: 1,
            reply_pool: MOESHARE_REPLIES.iter().map(|s| s.to_string()).collect(),
            settle_delay_secs: 5,
            backoff_secs: (40, 60),
            urls: UrlTemplates {
                profile: "/u.php".to_string(),
                listing: Some("/thread-htm-fid-{fid}-page-{page}.html".to_string()),
                read: Some("/read-htm-tid-{tid}.html".to_string()),
                post: Some("/post.php".to_string()),
                check_in: "/jobcenter.php?action=punch".to_string(),
            },
            profile_page: ProfilePageRules {
                logged_in: vec![
                    "span.f16.lh_24.b.s5.mr5".to_string(),
                    "a[href*='login.php?action=quit']".to_string(),
                ],
                control_proves_login: false,
                login_form: Some("form[action='member.php?mod=logging&action=login']".to_string()),
                login_phrases: vec!["请登录".to_string(), "您还没有登录".to_string()],
                control: ControlRule {
                    selector: "button[type='button']".to_string(),
                    enabled_text: "每日打卡".to_string(),
                    done_text: None,
                    disabled_class: None,
                    disabled_attr: Some("disabled".to_string()),
                },
                balance: Some(CounterRule {
                    container: "p.mb5".to_string(),
                    label: "MB：".to_string(),
                    value: "a".to_string(),
                }),
                activity: Some(CounterRule {
                    container: "p.mb5".to_string(),
                    label: "活跃度：".to_string(),
                    value: "a".to_string(),
                }),
                token: TokenRule {
                    script_var: "verifyhash".to_string(),
                    input_name: Some("verify".to_string()),
                },
            },
            thread_list: Some(ThreadListRules {
                table: "tbody#threadlist".to_string(),
                header_class: "tr4".to_string(),
                header_text: "普通主题".to_string(),
                row_class: "tr3".to_string(),
                id_cell: "td[id^='td_']".to_string(),
                id_prefix: "td_".to_string(),
            }),
            reply_form: Some(ReplyFormRules {
                form: "form[action*='post.php']".to_string(),
                content_field: "atc_content".to_string(),
                section_field: "fid".to_string(),
                thread_field: "tid".to_string(),
                extra_fields: vec![
                    ("step".to_string(), "2".to_string()),
                    ("action".to_string(), "reply".to_string()),
                ],
            }),
            check_in: CheckInRequest {
                token_field: "verify".to_string(),
                token_in_query: true,
                fields: vec![("step".to_string(), "2".to_string())],
            },
            reply_rules: ClassifierRules {
                envelope_keywords: vec![
                    "发表成功".to_string(),
                    "成功".to_string(),
                    "success".to_string(),
                ],
                body_keywords: vec!["发表成功".to_string(), "成功".to_string()],
                negative: vec![
                    r#"<div class="f_alert_d" id="J_q_message_tip">(.+?)</div>"#.to_string(),
                ],
                redirect_marker: Some("tid-{id}".to_string()),
            },
            check_in_rules: ClassifierRules {
                envelope_keywords: vec![
                    "成功".to_string(),
                    "success".to_string(),
                    "您今天已打卡".to_string(),
                ],
                body_keywords: Vec::new(),
                negative: Vec::new(),
                redirect_marker: None,
            },
        }
    }

    /// Check-in-only forum whose check-in card doubles as the login signal.
    pub fn manhuabudang() -> Self {
        Self {
            name: "manhuabudang".to_string(),
            display_name: "漫画不当BBS".to_string(),
            base_url: "https://www.manhuabudangbbs.com".to_string(),
            credential_env: "MANHUABUDANG_DAYSIGN".to_string(),
            section_id: None,
            activity_target: None,
            max_attempts: 0,
            max_attempts_env: None,
            listing_pages: 1,
            reply_pool: Vec::new(),
            settle_delay_secs: 0,
            backoff_secs: (0, 0),
            urls: UrlTemplates {
                profile: "/u.php".to_string(),
                listing: None,
                read: None,
                post: None,
                check_in: "/jobcenter.php?action=punch".to_string(),
            },
            profile_page: ProfilePageRules {
                logged_in: Vec::new(),
                control_proves_login: true,
                login_form: None,
                login_phrases: ["登录", "注册", "未登录", "请登录", "Login", "Register"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                control: ControlRule {
                    selector: "div.card".to_string(),
                    enabled_text: "每日打卡".to_string(),
                    done_text: Some("天打卡".to_string()),
                    disabled_class: Some("card_old".to_string()),
                    disabled_attr: None,
                },
                balance: None,
                activity: None,
                token: TokenRule {
                    script_var: "verifyhash".to_string(),
                    input_name: None,
                },
            },
            thread_list: None,
            reply_form: None,
            check_in: CheckInRequest {
                token_field: "verify".to_string(),
                token_in_query: false,
                fields: vec![
                    ("step".to_string(), "2".to_string()),
                    ("jobid".to_string(), "14".to_string()),
                ],
            },
            reply_rules: ClassifierRules::default(),
            check_in_rules: ClassifierRules {
                envelope_keywords: vec![
                    "\"flag\":\"1\"".to_string(),
                    "威望".to_string(),
                    "成功".to_string(),
                    "您今天已打卡".to_string(),
                ],
                body_keywords: vec![
                    "成功".to_string(),
                    "您今天已打卡".to_string(),
                    "威望".to_string(),
                ],
                negative: Vec::new(),
                redirect_marker: None,
            },
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::moeshare(), Self::manhuabudang()]
    }
}

//! Check-in engine: session, page extraction, response classification, site
//! actions and the runner that executes core effects against them.
mod actions;
mod classify;
mod credentials;
mod decode;
mod extract;
mod notify;
mod profile;
mod runner;
mod session;
mod snippet;
mod types;

pub use actions::{ForumActions, SiteActions};
pub use classify::{cdata_payload, classify, classify_parts};
pub use credentials::{
    cookies_from_env, extract_cookie_header, parse_cookie_header, parse_credentials, CookieSet,
    CredentialError,
};
pub use decode::{decode_body, DecodedBody};
pub use extract::{
    control_state, extract_profile_page, find_token, parse_number, read_counters,
    reply_form_fields, thread_ids, token_from_scripts, ProfilePage,
};
pub use notify::{
    notifier_from_env, NoopNotifier, Notifier, NotifierError, TelegramNotifier, TELEGRAM_API_BASE,
};
pub use profile::{
    render_template, CheckInRequest, ClassifierRules, ControlRule, CounterRule, ProfileError,
    ProfilePageRules, ReplyFormRules, SiteProfile, ThreadListRules, TokenRule, UrlTemplates,
};
pub use runner::{drive, run_site, run_site_seeded};
pub use session::{referer, Session, SessionSettings, DEFAULT_USER_AGENT};
pub use snippet::{diagnostic_snippet, MAX_SNIPPET_BYTES};
pub use types::{HttpReply, RequestError, RequestFailure, SessionError};

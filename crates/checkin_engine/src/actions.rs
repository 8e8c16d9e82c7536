use async_trait::async_trait;
use checkin_core::{
    ActionOutcome, AuthState, FailureReason, LoginCheck, PageToken, ReplyTarget, StatusCounters,
};
use checkin_logging::{checkin_debug, checkin_info, checkin_warn, redact};
use reqwest::header::HeaderMap;
use url::Url;

use crate::classify::classify;
use crate::extract::{extract_profile_page, reply_form_fields, thread_ids, ProfilePage};
use crate::profile::{render_template, SiteProfile};
use crate::session::{referer, Session};
use crate::{HttpReply, RequestError};

/// The operations the runner may perform against a site.
///
/// None of them fail: network problems and unrecognized pages are folded into
/// the returned value.
#[async_trait]
pub trait SiteActions: Send + Sync {
    async fn check_login_state(&self) -> LoginCheck;
    /// A read; `None` fields when the page or the value is unavailable.
    async fn status_counters(&self) -> StatusCounters;
    async fn list_reply_targets(&self, page: u32) -> Vec<ReplyTarget>;
    async fn submit_reply(&self, target: ReplyTarget, text: &str) -> ActionOutcome;
    async fn submit_check_in(&self, token: Option<&PageToken>) -> ActionOutcome;
}

/// `SiteActions` for a forum described by a `SiteProfile`.
pub struct ForumActions<'a> {
    session: &'a Session,
    profile: &'a SiteProfile,
}

impl<'a> ForumActions<'a> {
    pub fn new(session: &'a Session, profile: &'a SiteProfile) -> Self {
        Self { session, profile }
    }

    async fn fetch_profile_page(&self) -> Result<ProfilePage, String> {
        let url = self
            .session
            .resolve(&self.profile.urls.profile)
            .map_err(|err| err.to_string())?;
        let reply = self
            .session
            .get(&url, HeaderMap::new())
            .await
            .map_err(|err| err.to_string())?;
        if !reply.is_success() {
            return Err(format!("profile page returned http status {}", reply.status));
        }
        Ok(extract_profile_page(&reply.body, &self.profile.profile_page))
    }

    async fn get_page(&self, path: &str) -> Result<(Url, HttpReply), RequestError> {
        let url = self.session.resolve(path)?;
        let reply = self.session.get(&url, HeaderMap::new()).await?;
        Ok((url, reply))
    }
}

#[async_trait]
impl SiteActions for ForumActions<'_> {
    async fn check_login_state(&self) -> LoginCheck {
        match self.fetch_profile_page().await {
            Ok(page) => {
                checkin_info!(
                    "{}: login state {:?}, check-in control {:?}",
                    self.profile.name,
                    page.auth,
                    page.control
                );
                page.login_check()
            }
            Err(err) => {
                checkin_warn!("{}: login check failed: {err}", self.profile.name);
                LoginCheck::not_authenticated(AuthState::Unrecognized)
            }
        }
    }

    async fn status_counters(&self) -> StatusCounters {
        match self.fetch_profile_page().await {
            Ok(page) => {
                checkin_info!(
                    "{}: balance {:?}, activity {:?}",
                    self.profile.name,
                    page.counters.balance,
                    page.counters.activity
                );
                page.counters
            }
            Err(err) => {
                checkin_warn!("{}: status read failed: {err}", self.profile.name);
                StatusCounters::default()
            }
        }
    }

    async fn list_reply_targets(&self, page: u32) -> Vec<ReplyTarget> {
        let (Some(template), Some(rules), Some(fid)) = (
            self.profile.urls.listing.as_deref(),
            self.profile.thread_list.as_ref(),
            self.profile.section_id,
        ) else {
            return Vec::new();
        };
        let path = render_template(template, &[("fid", fid), ("page", u64::from(page))]);
        match self.get_page(&path).await {
            Ok((_, reply)) if reply.is_success() => {
                let ids = thread_ids(&reply.body, rules);
                checkin_info!(
                    "{}: {} reply targets on section {fid} page {page}",
                    self.profile.name,
                    ids.len()
                );
                ids
            }
            Ok((_, reply)) => {
                checkin_warn!("{}: listing returned http status {}", self.profile.name, reply.status);
                Vec::new()
            }
            Err(err) => {
                checkin_warn!("{}: listing failed: {err}", self.profile.name);
                Vec::new()
            }
        }
    }

    async fn submit_reply(&self, target: ReplyTarget, text: &str) -> ActionOutcome {
        let urls = &self.profile.urls;
        let (Some(read), Some(post), Some(form), Some(fid)) = (
            urls.read.as_deref(),
            urls.post.as_deref(),
            self.profile.reply_form.as_ref(),
            self.profile.section_id,
        ) else {
            return ActionOutcome::Failure(FailureReason::MissingMarker(
                "reply configuration".to_string(),
            ));
        };

        let (read_url, page) = match self.get_page(&render_template(read, &[("tid", target)])).await {
            Ok(found) => found,
            Err(err) => return ActionOutcome::Failure(err.into()),
        };
        if !page.is_success() {
            return ActionOutcome::Failure(FailureReason::HttpStatus(page.status));
        }
        let Some(mut fields) = reply_form_fields(&page.body, form) else {
            checkin_warn!("{}: no reply form on thread {target}", self.profile.name);
            return ActionOutcome::Failure(FailureReason::MissingMarker("reply form".to_string()));
        };

        set_field(&mut fields, &form.content_field, text);
        for (name, value) in &form.extra_fields {
            set_field(&mut fields, name, value);
        }
        set_field(&mut fields, &form.section_field, &fid.to_string());
        set_field(&mut fields, &form.thread_field, &target.to_string());

        let post_url = match self.session.resolve(post) {
            Ok(url) => url,
            Err(err) => return ActionOutcome::Failure(err.into()),
        };
        let outcome = match self
            .session
            .post_form(&post_url, &fields, referer(&read_url))
            .await
        {
            Ok(reply) => classify(&reply, &self.profile.reply_rules, Some(target)),
            Err(err) => ActionOutcome::Failure(err.into()),
        };
        checkin_info!("{}: reply to thread {target}: {outcome}", self.profile.name);
        outcome
    }

    async fn submit_check_in(&self, token: Option<&PageToken>) -> ActionOutcome {
        let request = &self.profile.check_in;
        let mut url = match self.session.resolve(&self.profile.urls.check_in) {
            Ok(url) => url,
            Err(err) => return ActionOutcome::Failure(err.into()),
        };
        let mut fields = request.fields.clone();
        match token {
            Some(token) => {
                checkin_debug!(
                    "{}: check-in with {} {}",
                    self.profile.name,
                    request.token_field,
                    redact(token.as_str())
                );
                if request.token_in_query {
                    url.query_pairs_mut()
                        .append_pair(&request.token_field, token.as_str());
                }
                set_field(&mut fields, &request.token_field, token.as_str());
            }
            None => checkin_warn!(
                "{}: submitting check-in without a token",
                self.profile.name
            ),
        }

        let headers = match self.session.resolve(&self.profile.urls.profile) {
            Ok(profile_url) => referer(&profile_url),
            Err(_) => HeaderMap::new(),
        };
        let outcome = match self.session.post_form(&url, &fields, headers).await {
            Ok(reply) => classify(&reply, &self.profile.check_in_rules, None),
            Err(err) => ActionOutcome::Failure(err.into()),
        };
        checkin_info!("{}: check-in: {outcome}", self.profile.name);
        outcome
    }
}

fn set_field(fields: &mut Vec<(String, String)>, name: &str, value: &str) {
    match fields.iter_mut().find(|(existing, _)| existing == name) {
        Some((_, slot)) => *slot = value.to_string(),
        None => fields.push((name.to_string(), value.to_string())),
    }
}

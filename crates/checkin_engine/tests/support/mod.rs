// Fixtures shared by the integration tests in this directory.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use checkin_engine::{CookieSet, Notifier, SiteProfile};
use wiremock::{Request, Respond, ResponseTemplate};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(checkin_logging::initialize_for_tests);
}

/// The moeshare preset pointed at a mock server, without real delays.
pub fn moeshare_at(base_url: &str) -> SiteProfile {
    let mut profile = SiteProfile::moeshare().with_base_url(base_url);
    profile.settle_delay_secs = 0;
    profile.backoff_secs = (0, 0);
    profile.max_attempts_env = None;
    profile
}

pub fn manhuabudang_at(base_url: &str) -> SiteProfile {
    SiteProfile::manhuabudang().with_base_url(base_url)
}

pub fn cookies() -> CookieSet {
    CookieSet::from([
        ("eb9e6_winduser".to_string(), "abc".to_string()),
        ("eb9e6_ck_info".to_string(), "%2F%09".to_string()),
    ])
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

pub fn ajax(payload: &str) -> ResponseTemplate {
    let body = format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><ajax><![CDATA[{payload}]]></ajax>");
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/xml; charset=utf-8")
}

/// Logged-in moeshare profile page.
pub fn moeshare_profile_page(balance: i64, activity: i64, disabled: bool) -> String {
    let disabled = if disabled { " disabled" } else { "" };
    format!(
        r#"<html><head><script>var charset = 'utf-8';</script></head><body>
<div class="user"><span class="f16 lh_24 b s5 mr5">tester</span>
<a href="login.php?action=quit">退出</a></div>
<p class="mb5">MB：<a href="u.php?action=mb">{balance}</a></p>
<p class="mb5">活跃度：<a href="u.php?action=act">{activity}</a></p>
<button type="button"{disabled}>每日打卡</button>
<script>
  var imgpath = 'images';
  var verifyhash = 'deadbeef';
</script>
</body></html>"#
    )
}

pub const MOESHARE_LOGGED_OUT: &str = r#"<html><body>
<form action="member.php?mod=logging&action=login" method="post">
<input type="text" name="username"></form>
<script>var verifyhash = 'cafe0001';</script>
</body></html>"#;

pub fn manhuabudang_profile_page(done: bool) -> String {
    let card = if done {
        r#"<div class="card fr card_old"><span>连续3天打卡</span></div>"#
    } else {
        r#"<div class="card fr"><span>每日打卡</span></div>"#
    };
    format!(
        r#"<html><body><div id="user">{card}</div>
<script type="text/javascript">var verifyhash = '0123abcd';</script>
<a href="register.php">注册</a></body></html>"#
    )
}

pub fn thread_listing(ids: &[u64]) -> String {
    let rows: String = ids
        .iter()
        .map(|id| format!(r#"<tr class="tr3 t_one"><td id="td_{id}"><a href="read-htm-tid-{id}.html">thread {id}</a></td></tr>"#))
        .collect();
    format!(
        r#"<html><body><table><tbody id="threadlist">
<tr class="tr4"><td>置顶主题</td></tr>
<tr class="tr3 t_one"><td id="td_1">announcement</td></tr>
<tr class="tr4"><td>普通主题</td></tr>
{rows}
</tbody></table></body></html>"#
    )
}

pub fn read_page(tid: u64) -> String {
    format!(
        r#"<html><body><h1>thread {tid}</h1>
<form name="FORM" method="post" action="post.php?fid=36&amp;tid={tid}">
<input type="hidden" name="verify" value="deadbeef">
<input type="hidden" name="atc_title" value="Re: thread {tid}">
<input type="hidden" name="step" value="1">
<textarea name="atc_content"></textarea>
<input type="submit" value="post">
</form></body></html>"#
    )
}

/// Profile page whose activity grows with every reply the server accepted.
pub struct GrowingProfile {
    pub replies: Arc<AtomicUsize>,
    pub balance: i64,
    pub activity: i64,
    pub per_reply: i64,
}

impl Respond for GrowingProfile {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let replies = self.replies.load(Ordering::SeqCst) as i64;
        html(&moeshare_profile_page(
            self.balance,
            self.activity + replies * self.per_reply,
            false,
        ))
    }
}

/// Reply endpoint that counts accepted posts.
pub struct CountingReply {
    pub replies: Arc<AtomicUsize>,
}

impl Respond for CountingReply {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.replies.fetch_add(1, Ordering::SeqCst);
        ajax("发表成功")
    }
}

#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
    }
}

pub async fn requests_to(server: &wiremock::MockServer, verb: &str, path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == path)
        .count()
}

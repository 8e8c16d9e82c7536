mod support;

use std::time::Duration;

use checkin_engine::{referer, RequestFailure, Session, SessionError, SessionSettings};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{cookies, html, init_logging};

#[tokio::test]
async fn requests_carry_cookies_and_default_headers() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u.php"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(header("dnt", "1"))
        .respond_with(html("<html>ok</html>"))
        .mount(&server)
        .await;

    let session = Session::open(&server.uri(), &cookies(), &SessionSettings::default()).unwrap();
    let url = session.resolve("/u.php").unwrap();
    let reply = session.get(&url, Default::default()).await.unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "<html>ok</html>");

    let requests = server.received_requests().await.unwrap();
    let sent = &requests[0];
    let cookie = sent.headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("eb9e6_winduser=abc"), "cookie header {cookie}");
    assert!(cookie.contains("eb9e6_ck_info=%2F%09"), "cookie header {cookie}");
    let referer = sent.headers.get("referer").unwrap().to_str().unwrap();
    assert_eq!(referer, format!("{}/", server.uri()));
    assert!(sent.headers.get("user-agent").is_some());
    assert!(sent.headers.get("accept-language").is_some());
}

#[tokio::test]
async fn per_call_referer_overrides_default() {
    init_logging();
    let server = MockServer::start().await;
    let session = Session::open(&server.uri(), &cookies(), &SessionSettings::default()).unwrap();
    let read = session.resolve("/read-htm-tid-9.html").unwrap();
    Mock::given(method("POST"))
        .and(path("/post.php"))
        .and(header("referer", read.as_str()))
        .respond_with(html("posted"))
        .mount(&server)
        .await;

    let post = session.resolve("/post.php").unwrap();
    let fields = vec![("atc_content".to_string(), "你好".to_string())];
    let reply = session.post_form(&post, &fields, referer(&read)).await.unwrap();
    assert_eq!(reply.status, 200);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body).to_string();
    assert_eq!(body, "atc_content=%E4%BD%A0%E5%A5%BD");
}

#[tokio::test]
async fn error_status_is_returned_not_raised() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .mount(&server)
        .await;

    let session = Session::open(&server.uri(), &cookies(), &SessionSettings::default()).unwrap();
    let reply = session
        .get(&session.resolve("/gone").unwrap(), Default::default())
        .await
        .unwrap();
    assert_eq!(reply.status, 404);
    assert!(!reply.is_success());
    assert_eq!(reply.body, "missing");
}

#[tokio::test]
async fn redirects_are_followed_and_reported() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/post.php"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "/read-htm-tid-5.html"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/read-htm-tid-5.html"))
        .respond_with(html("thread"))
        .mount(&server)
        .await;

    let session = Session::open(&server.uri(), &cookies(), &SessionSettings::default()).unwrap();
    let reply = session
        .post_form(&session.resolve("/post.php").unwrap(), &[], Default::default())
        .await
        .unwrap();
    assert_eq!(reply.status, 200);
    assert!(reply.redirect_count >= 1);
    assert_eq!(
        reply.redirect_target(),
        Some(format!("{}/read-htm-tid-5.html", server.uri()).as_str())
    );
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(&"x".repeat(4_096)))
        .mount(&server)
        .await;

    let settings = SessionSettings {
        max_bytes: 1_024,
        ..SessionSettings::default()
    };
    let session = Session::open(&server.uri(), &cookies(), &settings).unwrap();
    let err = session
        .get(&session.resolve("/big").unwrap(), Default::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, RequestFailure::TooLarge { max_bytes: 1_024, .. }));
}

#[tokio::test]
async fn slow_server_times_out() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("late").set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let settings = SessionSettings {
        request_timeout: Duration::from_millis(200),
        ..SessionSettings::default()
    };
    let session = Session::open(&server.uri(), &cookies(), &settings).unwrap();
    let err = session
        .get(&session.resolve("/slow").unwrap(), Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, RequestFailure::Timeout);
}

#[test]
fn empty_cookie_set_opens_no_session() {
    let err = Session::open(
        "https://forum.test",
        &Default::default(),
        &SessionSettings::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, SessionError::CredentialMissing));
}

#[test]
fn bad_base_url_is_reported() {
    let err = Session::open("not a url", &cookies(), &SessionSettings::default())
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::InvalidBaseUrl { .. }));
}

use checkin_core::{ActionOutcome, FailureReason};
use checkin_engine::{cdata_payload, classify, classify_parts, HttpReply, SiteProfile};
use pretty_assertions::assert_eq;

fn reply_rules() -> checkin_engine::ClassifierRules {
    SiteProfile::moeshare().reply_rules
}

fn check_in_rules() -> checkin_engine::ClassifierRules {
    SiteProfile::manhuabudang().check_in_rules
}

fn envelope(payload: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"gbk\"?><ajax><![CDATA[{payload}]]></ajax>")
}

#[test]
fn envelope_with_positive_keyword_is_success() {
    let rules = check_in_rules();
    for payload in [
        r#"{"flag":"1","message":"ok"}"#,
        "您获得了 2 威望",
        "打卡成功",
        "您今天已打卡",
    ] {
        assert_eq!(
            classify_parts(200, &envelope(payload), None, &rules, None),
            ActionOutcome::Success,
            "payload {payload:?}"
        );
    }
}

#[test]
fn envelope_without_keyword_is_failure_with_payload() {
    let outcome = classify_parts(
        200,
        &envelope(r#"{"flag":"0","message":"请稍后再试"}"#),
        None,
        &check_in_rules(),
        None,
    );
    assert_eq!(
        outcome,
        ActionOutcome::Failure(FailureReason::Rejected(
            r#"{"flag":"0","message":"请稍后再试"}"#.to_string()
        ))
    );
}

#[test]
fn non_2xx_is_failure_whatever_the_body() {
    for status in [199, 301, 404, 500, 503] {
        assert_eq!(
            classify_parts(status, &envelope("发表成功"), None, &reply_rules(), Some(1)),
            ActionOutcome::Failure(FailureReason::HttpStatus(status))
        );
    }
}

#[test]
fn raw_body_keyword_is_success_without_envelope() {
    assert_eq!(
        classify_parts(200, "<html>发表成功，正在跳转</html>", None, &reply_rules(), Some(7)),
        ActionOutcome::Success
    );
}

#[test]
fn redirect_to_the_thread_is_success() {
    assert_eq!(
        classify_parts(
            200,
            "<html><body>thread page</body></html>",
            Some("https://forum.test/read-htm-tid-77.html"),
            &reply_rules(),
            Some(77),
        ),
        ActionOutcome::Success
    );
}

#[test]
fn redirect_to_another_thread_is_not_success() {
    let outcome = classify_parts(
        200,
        "<html><body>thread page</body></html>",
        Some("https://forum.test/read-htm-tid-78.html"),
        &reply_rules(),
        Some(7),
    );
    assert!(matches!(outcome, ActionOutcome::Indeterminate(_)));
}

#[test]
fn alert_box_is_an_explicit_rejection() {
    let body = r#"<html><div class="f_alert_d" id="J_q_message_tip"><b>灌水预防机制</b>已经打开</div></html>"#;
    assert_eq!(
        classify_parts(200, body, None, &reply_rules(), Some(1)),
        ActionOutcome::Failure(FailureReason::Rejected("灌水预防机制已经打开".to_string()))
    );
}

#[test]
fn alert_box_wins_over_script_keywords() {
    let body = r#"<html><script>$.ajax({success:function(){}})</script><div class="f_alert_d" id="J_q_message_tip">灌水预防机制已经打开</div></html>"#;
    assert_eq!(
        classify_parts(200, body, None, &reply_rules(), Some(5)),
        ActionOutcome::Failure(FailureReason::Rejected("灌水预防机制已经打开".to_string()))
    );
}

#[test]
fn envelope_only_keyword_in_raw_page_is_not_success() {
    let body = "<html><script>$.ajax({success:function(){}})</script></html>";
    let outcome = classify_parts(200, body, None, &reply_rules(), Some(5));
    assert!(matches!(outcome, ActionOutcome::Indeterminate(_)), "{outcome:?}");
}

#[test]
fn raw_page_keywords_follow_the_site() {
    let page = "<html>打卡成功</html>";
    assert_eq!(
        classify_parts(200, page, None, &check_in_rules(), None),
        ActionOutcome::Success
    );
    let moeshare = SiteProfile::moeshare().check_in_rules;
    assert!(matches!(
        classify_parts(200, page, None, &moeshare, None),
        ActionOutcome::Indeterminate(_)
    ));
}

#[test]
fn silence_is_indeterminate_with_truncated_body() {
    let body = format!("<html>{}</html>", "x".repeat(2_000));
    match classify_parts(200, &body, None, &reply_rules(), Some(1)) {
        ActionOutcome::Indeterminate(snippet) => {
            assert!(snippet.starts_with("<html>xxx"));
            assert!(snippet.len() < 600);
        }
        other => panic!("expected indeterminate, got {other:?}"),
    }
}

#[test]
fn reply_redirect_information_is_used() {
    let reply = HttpReply {
        status: 200,
        requested_url: "https://forum.test/post.php".to_string(),
        final_url: "https://forum.test/read-htm-tid-5-page-e.html".to_string(),
        redirect_count: 1,
        content_type: Some("text/html".to_string()),
        body: "<html></html>".to_string(),
    };
    assert_eq!(classify(&reply, &reply_rules(), Some(5)), ActionOutcome::Success);

    let unredirected = HttpReply {
        redirect_count: 0,
        final_url: reply.requested_url.clone(),
        ..reply
    };
    assert!(!classify(&unredirected, &reply_rules(), Some(5)).is_success());
}

#[test]
fn multiline_envelope_is_found() {
    let body = "<ajax><![CDATA[\n line one\n line two \n]]></ajax>";
    assert_eq!(cdata_payload(body), Some("line one\n line two"));
    assert_eq!(cdata_payload("<ajax>plain</ajax>"), None);
}

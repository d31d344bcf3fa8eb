//! `AuthClient` against a scripted HTTP transport: URL rendering,
//! timeout, retry policy and response classification.

use std::time::Duration;

use authbox::app::ports::{AuthPort, Authorization};
use authbox::error::{AuthError, HttpError};
use authbox::fsm::context::AuthAction;
use authbox::net::auth_client::AuthClient;

use crate::mock_hw::{MockTransport, tool_config};

fn client(transport: MockTransport) -> AuthClient<MockTransport> {
    AuthClient::new(transport, &tool_config()).with_retry_backoff(Duration::ZERO)
}

#[test]
fn start_call_renders_template_and_uses_reader_timeout() {
    let mut auth = client(MockTransport::new().then_status(200, ""));
    let granted = auth.authorize("04A1B2", AuthAction::Start, 10).unwrap();

    assert_eq!(granted, Authorization { duration_minutes: 10 });
    let call = &auth.transport().calls[0];
    assert_eq!(call.method, "POST");
    assert_eq!(
        call.url,
        "http://control.shop:8000/auth?tool=lathe&badge=04A1B2&action=start&minutes=10"
    );
    assert_eq!(call.timeout, Duration::from_millis(200));
}

#[test]
fn stop_call_reports_used_minutes() {
    let mut auth = client(MockTransport::new().then_status(204, ""));
    auth.authorize("04A1B2", AuthAction::Stop, 3).unwrap();
    assert!(auth.transport().calls[0].url.ends_with("action=stop&minutes=3"));
}

#[test]
fn badge_with_reserved_characters_is_encoded() {
    let mut auth = client(MockTransport::new().then_status(200, ""));
    auth.authorize("a&b=c", AuthAction::Start, 10).unwrap();
    assert!(auth.transport().calls[0].url.contains("badge=a%26b%3Dc&"));
}

#[test]
fn timeout_is_retried_once() {
    let transport = MockTransport::new()
        .then(Err(HttpError::Timeout))
        .then_status(200, r#"{"duration_minutes": 30}"#);
    let mut auth = client(transport);

    let granted = auth.authorize("04A1B2", AuthAction::Start, 10).unwrap();
    assert_eq!(granted.duration_minutes, 30);
    assert_eq!(auth.transport().calls.len(), 2);
}

#[test]
fn two_network_failures_are_unavailable() {
    let transport = MockTransport::new()
        .then(Err(HttpError::Transport("refused".into())))
        .then(Err(HttpError::Timeout));
    let mut auth = client(transport);

    assert_eq!(
        auth.authorize("04A1B2", AuthAction::Start, 10),
        Err(AuthError::Unavailable(HttpError::Timeout))
    );
    assert_eq!(auth.transport().calls.len(), 2);
}

#[test]
fn denial_is_never_retried() {
    let mut auth = client(MockTransport::new().then_status(403, "not trained on lathe"));
    assert_eq!(
        auth.authorize("04A1B2", AuthAction::Start, 10),
        Err(AuthError::Denied {
            status: 403,
            reason: "not trained on lathe".into()
        })
    );
    assert_eq!(auth.transport().calls.len(), 1);
}

#[test]
fn explicit_refusal_in_body_is_a_denial() {
    let body = r#"{"authorized": false, "reason": "membership lapsed"}"#;
    let mut auth = client(MockTransport::new().then_status(200, body));
    assert!(matches!(
        auth.authorize("04A1B2", AuthAction::Start, 10),
        Err(AuthError::Denied { reason, .. }) if reason == "membership lapsed"
    ));
}

#[test]
fn server_error_is_rejected_without_retry() {
    let mut auth = client(MockTransport::new().then_status(500, "boom"));
    assert!(matches!(
        auth.authorize("04A1B2", AuthAction::Start, 10),
        Err(AuthError::Rejected { status: 500, .. })
    ));
    assert_eq!(auth.transport().calls.len(), 1);
}

#[test]
fn reconfigure_swaps_template_and_timeout() {
    let mut auth = client(MockTransport::new().then_status(200, ""));
    let mut cfg = tool_config();
    cfg.badge_auth.url_template =
        "http://other:9000/v2/auth/{{.badge}}?s={{.state}}&d={{.duration}}".into();
    cfg.badge_reader.timeout_ms = 1_500;
    auth.reconfigure(&cfg);

    auth.authorize("04A1B2", AuthAction::Start, 10).unwrap();
    let call = &auth.transport().calls[0];
    assert_eq!(call.url, "http://other:9000/v2/auth/04A1B2?s=start&d=10");
    assert_eq!(call.timeout, Duration::from_millis(1_500));
}

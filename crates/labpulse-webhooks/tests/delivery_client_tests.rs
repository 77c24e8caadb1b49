//! Wire-level tests for the delivery client against mock subscriber
//! endpoints: headers, body bytes, signatures, and outcome classification.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use labpulse_webhooks::services::delivery_client::{DeliveryClient, DeliveryOutcome};

use common::{claimed_delivery, verify_captured_signature, CaptureResponder, DelayedResponder, SECRET_1};

fn client() -> DeliveryClient {
    DeliveryClient::new(Duration::from_secs(2)).expect("client")
}

#[tokio::test]
async fn sends_expected_headers_and_body() {
    let server = MockServer::start().await;
    let responder = CaptureResponder::new();
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let body = json!({
        "event_type": "run.completed",
        "project_id": common::PROJECT_A,
        "occurred_at": "2025-06-01T12:00:00Z",
        "payload": {"run_id": 42}
    });
    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, body.clone());

    let outcome = client().send(&delivery).await;
    assert!(matches!(outcome, DeliveryOutcome::Success { status: 200 }));

    let requests = responder.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-webhook-event"), Some("run.completed"));
    assert_eq!(
        request.header("x-webhook-delivery-id"),
        Some(delivery.id.to_string().as_str())
    );
    // No secret, no signature header.
    assert!(request.header("x-webhook-signature").is_none());

    // Body on the wire is the compact serialization of the stored envelope.
    let received: serde_json::Value = request.body_json().expect("json body");
    assert_eq!(received, body);
    assert_eq!(request.body, serde_json::to_vec(&body).expect("bytes"));
}

#[tokio::test]
async fn signs_body_when_secret_present() {
    let server = MockServer::start().await;
    let responder = CaptureResponder::new();
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let delivery = claimed_delivery(
        &format!("{}/hook", server.uri()),
        Some(SECRET_1),
        json!({"event_type": "run.completed", "payload": {}}),
    );

    let outcome = client().send(&delivery).await;
    assert!(outcome.is_success());

    let requests = responder.requests();
    let request = &requests[0];

    let signature = request.header("x-webhook-signature").expect("signed");
    assert!(signature.starts_with("sha256="));
    assert!(verify_captured_signature(request, SECRET_1));
    // A different secret must not verify.
    assert!(!verify_captured_signature(request, "wrong-secret"));
}

#[tokio::test]
async fn any_2xx_counts_as_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, json!({}));
    let outcome = client().send(&delivery).await;

    assert!(matches!(outcome, DeliveryOutcome::Success { status: 204 }));
}

#[tokio::test]
async fn non_2xx_is_failure_with_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .mount(&server)
        .await;

    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, json!({}));
    let outcome = client().send(&delivery).await;

    match outcome {
        DeliveryOutcome::Failure { error } => {
            assert!(error.starts_with("HTTP 503"));
            assert!(error.contains("service unavailable"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn redirect_is_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "https://example.com/"))
        .mount(&server)
        .await;

    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, json!({}));
    let outcome = client().send(&delivery).await;

    match outcome {
        DeliveryOutcome::Failure { error } => assert!(error.starts_with("HTTP 302")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(DelayedResponder::new(2_000))
        .mount(&server)
        .await;

    let client = DeliveryClient::new(Duration::from_millis(200)).expect("client");
    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, json!({}));
    let outcome = client.send(&delivery).await;

    match outcome {
        DeliveryOutcome::Failure { error } => {
            assert!(error.contains("timed out"), "unexpected error: {error}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_connection_failure() {
    // Port 9 (discard) on localhost is closed in the test environment.
    let delivery = claimed_delivery("http://127.0.0.1:9/hook", None, json!({}));
    let outcome = client().send(&delivery).await;

    match outcome {
        DeliveryOutcome::Failure { error } => {
            assert!(
                error.contains("Connection failed") || error.contains("Request failed"),
                "unexpected error: {error}"
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn long_error_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(10_000)))
        .mount(&server)
        .await;

    let delivery = claimed_delivery(&format!("{}/hook", server.uri()), None, json!({}));
    let outcome = client().send(&delivery).await;

    match outcome {
        DeliveryOutcome::Failure { error } => {
            // "HTTP 500: " prefix plus at most 2000 chars of body.
            assert!(error.chars().count() <= 2010);
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

//! HTTP client for delivering webhook requests to subscriber endpoints.

use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::debug;

use labpulse_db::models::WebhookDelivery;

use crate::crypto::sign_body;
use crate::error::WebhookError;

/// User agent sent with every delivery request.
const USER_AGENT: &str = concat!("labpulse-webhooks/", env!("CARGO_PKG_VERSION"));

/// Maximum response body length recorded in error messages, in characters.
const MAX_RESPONSE_BODY_CHARS: usize = 2000;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    /// Endpoint returned a 2xx status.
    Success { status: u16 },
    /// Endpoint returned non-2xx or the request failed on the wire.
    Failure { error: String },
}

impl DeliveryOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }
}

/// Client that performs webhook HTTP requests.
///
/// Redirects are disabled: a redirect response counts as a failed attempt
/// rather than a hop to an unvalidated destination.
#[derive(Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
}

impl DeliveryClient {
    /// Build a client with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .redirect(Policy::none())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WebhookError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// POST a delivery's envelope to its snapshotted target URL.
    ///
    /// The body is the compact JSON serialization of `request_body`. When
    /// the delivery has a secret, the body bytes are signed and the
    /// signature is sent as `X-Webhook-Signature: sha256=<hex>`.
    pub async fn send(&self, delivery: &WebhookDelivery) -> DeliveryOutcome {
        let body = match serde_json::to_vec(&delivery.request_body) {
            Ok(body) => body,
            Err(e) => {
                return DeliveryOutcome::Failure {
                    error: format!("Failed to serialize request body: {e}"),
                };
            }
        };

        let mut request = self
            .client
            .post(&delivery.target_url)
            .header("Content-Type", "application/json")
            .header("X-Webhook-Event", delivery.event_type.as_str())
            .header("X-Webhook-Delivery-Id", delivery.id.to_string());

        if let Some(secret) = &delivery.secret {
            request = request.header("X-Webhook-Signature", sign_body(secret, &body));
        }

        debug!(
            target: "webhook_delivery",
            delivery_id = %delivery.id,
            url = %delivery.target_url,
            attempt = delivery.attempt_count,
            "Sending webhook request"
        );

        match request.body(body).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    DeliveryOutcome::Success {
                        status: status.as_u16(),
                    }
                } else {
                    let text = response.text().await.unwrap_or_default();
                    let truncated: String = text.chars().take(MAX_RESPONSE_BODY_CHARS).collect();
                    DeliveryOutcome::Failure {
                        error: format!("HTTP {}: {truncated}", status.as_u16()),
                    }
                }
            }
            Err(e) if e.is_timeout() => DeliveryOutcome::Failure {
                error: format!("Request timed out: {e}"),
            },
            Err(e) if e.is_connect() => DeliveryOutcome::Failure {
                error: format!("Connection failed: {e}"),
            },
            Err(e) => DeliveryOutcome::Failure {
                error: format!("Request failed: {e}"),
            },
        }
    }
}

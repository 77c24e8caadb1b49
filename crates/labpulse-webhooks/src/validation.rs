//! URL validation, SSRF protection, and event type normalization for
//! webhook subscriptions.

use std::net::IpAddr;

use crate::error::WebhookError;

// ---------------------------------------------------------------------------
// URL validation
// ---------------------------------------------------------------------------

/// Validate a webhook delivery URL.
///
/// Checks:
/// 1. URL is parseable
/// 2. Scheme is HTTPS (or HTTP if `allow_http` is true for dev/test)
/// 3. Host is not a private/internal address (SSRF protection)
pub fn validate_webhook_url(url: &str, allow_http: bool) -> Result<(), WebhookError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| WebhookError::InvalidUrl(format!("Invalid URL format: {e}")))?;

    match parsed.scheme() {
        "https" => {}
        "http" if allow_http => {}
        "http" => {
            return Err(WebhookError::InvalidUrl(
                "Webhook URLs must use HTTPS".to_string(),
            ));
        }
        scheme => {
            return Err(WebhookError::InvalidUrl(format!(
                "Unsupported URL scheme: {scheme}"
            )));
        }
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| WebhookError::InvalidUrl("URL must have a host".to_string()))?;

    validate_host_not_internal(host)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Validate that a host is not a private/internal address.
///
/// Blocks:
/// - Loopback addresses (127.0.0.0/8)
/// - Private networks (10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16)
/// - Link-local (169.254.0.0/16, cloud metadata endpoints)
/// - CGNAT (100.64.0.0/10)
/// - IPv6 loopback and unspecified
/// - Internal hostnames (localhost, *.internal, *.local)
pub fn validate_host_not_internal(host: &str) -> Result<(), WebhookError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_internal_ip(&ip) {
            return Err(WebhookError::SsrfDetected(format!(
                "Destination host {host} is a private/internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower == "metadata.google.internal"
        || lower.ends_with(".internal")
        || lower.ends_with(".local")
    {
        return Err(WebhookError::SsrfDetected(format!(
            "Destination host {host} is a restricted internal hostname"
        )));
    }

    Ok(())
}

/// Check if an IP address belongs to a private/internal range.
fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()                // 127.0.0.0/8
                || v4.is_private()          // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
                || v4.is_link_local()       // 169.254.0.0/16
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64) // 100.64.0.0/10 (CGNAT)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

// ---------------------------------------------------------------------------
// Event type normalization
// ---------------------------------------------------------------------------

/// Normalize a subscription's event type list.
///
/// Trims whitespace, drops empty entries, and deduplicates while keeping
/// first-seen order. Rejects the request if nothing survives.
pub fn normalize_event_types(event_types: &[String]) -> Result<Vec<String>, WebhookError> {
    let mut seen = std::collections::HashSet::new();
    let mut normalized = Vec::new();

    for raw in event_types {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }

    if normalized.is_empty() {
        return Err(WebhookError::Validation(
            "At least one non-empty event type is required".to_string(),
        ));
    }

    Ok(normalized)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- URL validation ---

    #[test]
    fn test_valid_https_url() {
        assert!(validate_webhook_url("https://example.com/webhooks", false).is_ok());
    }

    #[test]
    fn test_valid_https_url_with_port() {
        assert!(validate_webhook_url("https://hooks.example.com:8443/callback", false).is_ok());
    }

    #[test]
    fn test_http_url_rejected_in_production() {
        let result = validate_webhook_url("http://example.com/webhooks", false);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), WebhookError::InvalidUrl(_)));
    }

    #[test]
    fn test_http_url_allowed_in_dev() {
        assert!(validate_webhook_url("http://example.com/webhooks", true).is_ok());
    }

    #[test]
    fn test_invalid_url_format() {
        assert!(validate_webhook_url("not-a-url", false).is_err());
    }

    #[test]
    fn test_unsupported_scheme() {
        assert!(validate_webhook_url("ftp://example.com/webhooks", false).is_err());
    }

    // --- SSRF protection ---

    #[test]
    fn test_ssrf_blocks_loopback() {
        assert!(validate_host_not_internal("127.0.0.1").is_err());
        assert!(validate_host_not_internal("127.0.0.2").is_err());
    }

    #[test]
    fn test_ssrf_blocks_private_ranges() {
        assert!(validate_host_not_internal("10.0.0.1").is_err());
        assert!(validate_host_not_internal("172.16.0.1").is_err());
        assert!(validate_host_not_internal("192.168.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_link_local() {
        // AWS/Azure/GCP metadata endpoint
        assert!(validate_host_not_internal("169.254.169.254").is_err());
        assert!(validate_host_not_internal("169.254.0.1").is_err());
    }

    #[test]
    fn test_ssrf_blocks_cgnat() {
        assert!(validate_host_not_internal("100.64.0.1").is_err());
        assert!(validate_host_not_internal("100.127.255.255").is_err());
    }

    #[test]
    fn test_ssrf_blocks_ipv6_loopback_and_unspecified() {
        assert!(validate_host_not_internal("::1").is_err());
        assert!(validate_host_not_internal("::").is_err());
    }

    #[test]
    fn test_ssrf_blocks_localhost() {
        assert!(validate_host_not_internal("localhost").is_err());
        assert!(validate_host_not_internal("LOCALHOST").is_err());
    }

    #[test]
    fn test_ssrf_blocks_internal_hostnames() {
        assert!(validate_host_not_internal("metadata.google.internal").is_err());
        assert!(validate_host_not_internal("service.internal").is_err());
        assert!(validate_host_not_internal("myhost.local").is_err());
    }

    #[test]
    fn test_ssrf_allows_public_ip() {
        assert!(validate_host_not_internal("8.8.8.8").is_ok());
        assert!(validate_host_not_internal("203.0.113.50").is_ok());
    }

    #[test]
    fn test_ssrf_allows_public_hostname() {
        assert!(validate_host_not_internal("example.com").is_ok());
        assert!(validate_host_not_internal("hooks.myapp.io").is_ok());
    }

    #[test]
    fn test_ssrf_url_integration_private_ip() {
        let result = validate_webhook_url("https://10.0.0.1/webhook", false);
        assert!(matches!(result.unwrap_err(), WebhookError::SsrfDetected(_)));
    }

    // --- Event type normalization ---

    #[test]
    fn test_normalize_trims_and_dedupes() {
        let input = vec![
            "  run.completed ".to_string(),
            "run.completed".to_string(),
            "run.failed".to_string(),
        ];
        let result = normalize_event_types(&input).expect("valid");
        assert_eq!(result, vec!["run.completed", "run.failed"]);
    }

    #[test]
    fn test_normalize_drops_empty_entries() {
        let input = vec!["".to_string(), "   ".to_string(), "run.failed".to_string()];
        let result = normalize_event_types(&input).expect("valid");
        assert_eq!(result, vec!["run.failed"]);
    }

    #[test]
    fn test_normalize_preserves_first_seen_order() {
        let input = vec![
            "b.event".to_string(),
            "a.event".to_string(),
            "b.event".to_string(),
        ];
        let result = normalize_event_types(&input).expect("valid");
        assert_eq!(result, vec!["b.event", "a.event"]);
    }

    #[test]
    fn test_normalize_rejects_empty_result() {
        let result = normalize_event_types(&["  ".to_string()]);
        assert!(matches!(result.unwrap_err(), WebhookError::Validation(_)));

        let result = normalize_event_types(&[]);
        assert!(result.is_err());
    }
}

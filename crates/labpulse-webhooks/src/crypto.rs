//! HMAC-SHA256 payload signing for webhook deliveries.
//!
//! The signature covers the exact request body bytes and is sent as
//! `X-Webhook-Signature: sha256=<hex>`. Subscribers recompute the HMAC over
//! the bytes they received and compare in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix carried in the signature header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a request body.
#[must_use]
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    format!("{SIGNATURE_PREFIX}{}", compute_hmac_hex(secret, body))
}

/// Verify a signature header value against a body, in constant time.
#[must_use]
pub fn verify_signature(header_value: &str, secret: &str, body: &[u8]) -> bool {
    let Some(expected_hex) = header_value.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let computed = compute_hmac_hex(secret, body);
    constant_time_eq(expected_hex.as_bytes(), computed.as_bytes())
}

/// Hex-encoded HMAC-SHA256 of the body keyed by the secret.
fn compute_hmac_hex(secret: &str, body: &[u8]) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

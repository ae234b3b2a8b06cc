//! Processor webhook authentication and payloads.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("missing or malformed signature header")]
    MalformedHeader,

    #[error("webhook timestamp outside tolerance")]
    Expired,

    #[error("signature mismatch")]
    SignatureMismatch,
}

/// Verifies a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against the
/// raw request body. Any `v1` entry matching `HMAC-SHA256(secret, "{t}.{body}")`
/// is accepted.
pub fn verify_stripe_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    tolerance_secs: u64,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    let issued_at: i64 = timestamp
        .parse()
        .map_err(|_| WebhookError::MalformedHeader)?;
    if now.abs_diff(issued_at) > tolerance_secs {
        return Err(WebhookError::Expired);
    }

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::MalformedHeader)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures
        .iter()
        .any(|candidate| constant_time_eq(&expected, candidate))
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Envelope of a processor event
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

/// The subset of a payment intent that enrollment needs
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl WebhookEvent {
    pub const PAYMENT_INTENT_SUCCEEDED: &'static str = "payment_intent.succeeded";

    /// Decodes `data.object` as a payment intent.
    pub fn payment_intent(&self) -> Result<PaymentIntentObject, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

impl PaymentIntentObject {
    pub fn course_id(&self) -> Option<&str> {
        self.metadata.get("courseId").map(String::as_str)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.metadata.get("userId").map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

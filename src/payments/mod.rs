//! Payment processor boundary.
//!
//! Checkout only depends on [`PaymentProvider`]; [`StripePaymentProcessor`] is the
//! production implementation and tests substitute a recording double.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod stripe;
pub mod webhook;

pub use stripe::{StripeConfig, StripePaymentProcessor};
pub use webhook::{verify_stripe_signature, PaymentIntentObject, WebhookError, WebhookEvent};

/// Parameters for a single create-payment-intent call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentParams {
    /// Amount in the currency's minor units (cents for USD)
    pub amount_minor_units: i64,
    /// Lowercase ISO 4217 code
    pub currency: String,
    pub metadata: BTreeMap<String, String>,
}

/// Payment intent as returned by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The processor answered with a non-success status
    #[error("payment processor returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("payment processor unreachable: {0}")]
    Transport(String),

    #[error("unexpected payment processor response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Creates exactly one payment intent. Implementations must not retry.
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError>;
}

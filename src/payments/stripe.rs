use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentProvider};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Stripe configuration
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe payment processor
#[derive(Clone, Debug)]
pub struct StripePaymentProcessor {
    config: StripeConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl StripePaymentProcessor {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn form_params(params: &PaymentIntentParams) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), params.amount_minor_units.to_string()),
            ("currency".to_string(), params.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

#[async_trait]
impl PaymentProvider for StripePaymentProcessor {
    #[instrument(skip(self, params), fields(amount = params.amount_minor_units, currency = %params.currency))]
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        let url = format!(
            "{}/v1/payment_intents",
            self.config.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.secret_key, Some(""))
            .form(&Self::form_params(params))
            .send()
            .await
            .map_err(|e| PaymentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<StripeErrorEnvelope>(&body).ok();
            warn!(status = status.as_u16(), "Stripe rejected payment intent");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                code: parsed.as_ref().and_then(|e| e.error.code.clone()),
                message: parsed.and_then(|e| e.error.message),
            });
        }

        let intent: PaymentIntent = response
            .json()
            .await
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        if intent.client_secret.is_none() {
            return Err(PaymentError::InvalidResponse(
                "payment intent has no client secret".to_string(),
            ));
        }

        info!(payment_intent_id = %intent.id, "PaymentIntent created");
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_params_flatten_metadata() {
        let mut metadata = std::collections::BTreeMap::new();
        metadata.insert("courseId".to_string(), "c-1".to_string());
        metadata.insert("userId".to_string(), "u-1".to_string());
        let params = PaymentIntentParams {
            amount_minor_units: 7000,
            currency: "usd".into(),
            metadata,
        };

        let form = StripePaymentProcessor::form_params(&params);
        assert!(form.contains(&("amount".into(), "7000".into())));
        assert!(form.contains(&("automatic_payment_methods[enabled]".into(), "true".into())));
        assert!(form.contains(&("metadata[courseId]".into(), "c-1".into())));
        assert!(form.contains(&("metadata[userId]".into(), "u-1".into())));
    }

    #[test]
    fn debug_output_omits_secret_key() {
        let config = StripeConfig::new("sk_live_secret");
        assert!(!format!("{config:?}").contains("sk_live_secret"));
    }
}

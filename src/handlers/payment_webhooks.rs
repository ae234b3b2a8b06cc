use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use serde::Serialize;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::payments::{verify_stripe_signature, WebhookEvent};
use crate::AppState;

const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_id: Option<String>,
}

// POST /api/v1/webhooks/payments
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payments",
    request_body = String,
    responses(
        (status = 200, description = "Webhook accepted", body = WebhookAck),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ServiceError> {
    match state.config.webhook_secret() {
        Some(secret) => {
            let header = headers
                .get(SIGNATURE_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| ServiceError::Unauthorized("missing webhook signature".to_string()))?;

            verify_stripe_signature(
                header,
                &body,
                secret,
                state.config.payment_webhook_tolerance_secs,
                chrono::Utc::now().timestamp(),
            )
            .map_err(|e| {
                warn!(error = %e, "Payment webhook signature verification failed");
                ServiceError::Unauthorized("invalid webhook signature".to_string())
            })?;
        }
        None if state.config.is_development() => {
            warn!("Payment webhook secret not configured; accepting unverified event")
        }
        None => {
            error!("Payment webhook secret not configured; refusing unverified event");
            return Err(ServiceError::Unauthorized(
                "webhook verification is not configured".to_string(),
            ));
        }
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid webhook payload: {e}")))?;

    if event.event_type != WebhookEvent::PAYMENT_INTENT_SUCCEEDED {
        info!(event_id = %event.id, event_type = %event.event_type, "Ignoring payment webhook");
        return Ok(Json(WebhookAck {
            received: true,
            enrollment_id: None,
        }));
    }

    let intent = event
        .payment_intent()
        .map_err(|e| ServiceError::BadRequest(format!("invalid payment intent: {e}")))?;
    let enrollment = state.enrollments.handle_payment_succeeded(&intent).await?;

    Ok(Json(WebhookAck {
        received: true,
        enrollment_id: Some(enrollment.id),
    }))
}

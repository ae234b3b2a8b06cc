use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::json_body;
use crate::errors::ServiceError;
use crate::services::{CheckoutOutcome, CreatePaymentIntentRequest};
use crate::AppState;

/// Result of starting checkout
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CreatePaymentIntentResponse {
    /// Confirm the payment on the client with this secret
    PaymentIntentCreated {
        #[serde(rename = "clientSecret")]
        client_secret: String,
    },
    /// The course is free and the user is now enrolled
    FreeEnrollmentCreated {
        enrolled: bool,
        #[serde(rename = "enrollmentId")]
        enrollment_id: String,
    },
}

impl From<CheckoutOutcome> for CreatePaymentIntentResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        match outcome {
            CheckoutOutcome::PaymentRequired { client_secret, .. } => {
                Self::PaymentIntentCreated { client_secret }
            }
            CheckoutOutcome::Enrolled { enrollment } => Self::FreeEnrollmentCreated {
                enrolled: true,
                enrollment_id: enrollment.id,
            },
        }
    }
}

/// Start checkout for a course
///
/// The amount is always computed on the server from the course's stored pricing.
#[utoipa::path(
    post,
    path = "/api/v1/payments/intent",
    request_body = CreatePaymentIntentRequest,
    responses(
        (status = 201, description = "Payment intent created, or free course enrolled", body = CreatePaymentIntentResponse,
            headers(("X-Request-Id" = String, description = "Unique request identifier"))
        ),
        (status = 400, description = "Invalid request, user, discount or unpublished course", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Already enrolled", body = crate::errors::ErrorResponse),
        (status = 500, description = "Payment processor or backend failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    payload: Result<Json<CreatePaymentIntentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatePaymentIntentResponse>), ServiceError> {
    let request = json_body(payload)?;
    let outcome = state.checkout.start_checkout(&request).await?;
    Ok((StatusCode::CREATED, Json(outcome.into())))
}

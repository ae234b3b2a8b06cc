use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    models::{Course, Enrollment, NewEnrollment, UserProfile},
    payments::{PaymentError, PaymentIntentParams, PaymentProvider},
    pricing::PriceQuote,
    repositories::Repositories,
};

/// Body of `POST /api/v1/payments/intent`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
#[schema(example = json!({
    "courseId": "9b2f6c1e-course",
    "userId": "4d8a0e7b-user",
    "courseTitle": "Rust for Beginners"
}))]
pub struct CreatePaymentIntentRequest {
    #[validate(length(min = 1, max = 128, message = "courseId is required"))]
    pub course_id: String,
    #[validate(length(min = 1, max = 128, message = "userId is required"))]
    pub user_id: String,
    /// Shown on the processor dashboard; stored as intent metadata
    #[validate(length(min = 1, max = 500, message = "courseTitle is required"))]
    pub course_title: String,
}

/// Everything needed to create one payment intent for one course purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub course_id: String,
    pub user_id: String,
    pub course_title: String,
    pub quote: PriceQuote,
}

impl ChargeRequest {
    pub fn amount_minor_units(&self) -> i64 {
        self.quote.amount_minor_units
    }

    pub fn currency(&self) -> &str {
        &self.quote.currency
    }

    pub fn final_price(&self) -> Decimal {
        self.quote.final_price
    }

    pub fn intent_params(&self) -> PaymentIntentParams {
        let mut metadata = BTreeMap::new();
        metadata.insert("courseId".to_string(), self.course_id.clone());
        metadata.insert("userId".to_string(), self.user_id.clone());
        metadata.insert("courseTitle".to_string(), self.course_title.clone());
        metadata.insert("amount".to_string(), self.final_price().to_string());

        PaymentIntentParams {
            amount_minor_units: self.amount_minor_units(),
            currency: self.currency().to_string(),
            metadata,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// The client must confirm the payment with `client_secret`
    PaymentRequired {
        client_secret: String,
        payment_intent_id: String,
        charge: ChargeRequest,
    },
    /// Free course; the user was enrolled without contacting the processor
    Enrolled { enrollment: Enrollment },
}

#[derive(Clone)]
pub struct CheckoutService {
    repos: Repositories,
    payments: Arc<dyn PaymentProvider>,
    default_currency: String,
}

impl CheckoutService {
    pub fn new(
        repos: Repositories,
        payments: Arc<dyn PaymentProvider>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            repos,
            payments,
            default_currency: default_currency.into(),
        }
    }

    /// Loads the course and buyer, checks they may transact and prices the course
    /// from its stored fields. Makes no processor call.
    #[instrument(skip(self, request), fields(course_id = %request.course_id, user_id = %request.user_id))]
    pub async fn build_charge_request(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<ChargeRequest, ServiceError> {
        request.validate()?;

        let course = self.load_purchasable_course(&request.course_id).await?;
        self.load_buyer(&request.user_id).await?;

        let quote = PriceQuote::calculate(
            course.price,
            course.discount_percentage,
            course.minimum_gain,
            course.currency_or(&self.default_currency),
        )?;

        Ok(ChargeRequest {
            course_id: course.id,
            user_id: request.user_id.clone(),
            course_title: request.course_title.clone(),
            quote,
        })
    }

    /// Starts checkout: creates exactly one payment intent, or enrolls directly when
    /// the course is free.
    #[instrument(skip(self, request), fields(course_id = %request.course_id, user_id = %request.user_id))]
    pub async fn start_checkout(
        &self,
        request: &CreatePaymentIntentRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let charge = self.build_charge_request(request).await?;

        if self
            .repos
            .enrollments
            .find_enrollment(&charge.course_id, &charge.user_id)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "user {} is already enrolled in course {}",
                charge.user_id, charge.course_id
            )));
        }

        if charge.quote.is_free() {
            let enrollment = self
                .repos
                .enrollments
                .create_enrollment(NewEnrollment::free(&charge.course_id, &charge.user_id))
                .await?;
            info!(enrollment_id = %enrollment.id, "Enrolled in free course");
            return Ok(CheckoutOutcome::Enrolled { enrollment });
        }

        let intent = self
            .payments
            .create_payment_intent(&charge.intent_params())
            .await
            .map_err(|e| {
                warn!(error = %e, "Payment intent creation failed");
                ServiceError::from(e)
            })?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            ServiceError::from(PaymentError::InvalidResponse(
                "payment intent has no client secret".to_string(),
            ))
        })?;

        info!(
            payment_intent_id = %intent.id,
            amount = charge.amount_minor_units(),
            "Checkout started"
        );

        Ok(CheckoutOutcome::PaymentRequired {
            client_secret,
            payment_intent_id: intent.id,
            charge,
        })
    }

    async fn load_purchasable_course(&self, course_id: &str) -> Result<Course, ServiceError> {
        let course = self
            .repos
            .courses
            .find_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("course {course_id} not found")))?;

        if !course.is_published {
            return Err(ServiceError::CourseNotAvailable(format!(
                "course {course_id} is not published"
            )));
        }
        Ok(course)
    }

    async fn load_buyer(&self, user_id: &str) -> Result<UserProfile, ServiceError> {
        let user = self
            .repos
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidUser(format!("user {user_id} not found")))?;

        if !user.can_purchase() {
            return Err(ServiceError::InvalidUser(
                "only client accounts can purchase courses".to_string(),
            ));
        }
        Ok(user)
    }
}

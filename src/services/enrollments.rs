use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    models::{Enrollment, NewEnrollment},
    payments::PaymentIntentObject,
    pricing::PriceQuote,
    repositories::Repositories,
};

/// Grants course access once the processor confirms a payment.
#[derive(Clone)]
pub struct EnrollmentService {
    repos: Repositories,
    default_currency: String,
}

impl EnrollmentService {
    pub fn new(repos: Repositories, default_currency: impl Into<String>) -> Self {
        Self {
            repos,
            default_currency: default_currency.into(),
        }
    }

    /// Enrolls the buyer named in the intent metadata. Repeated deliveries of the
    /// same event return the existing enrollment.
    #[instrument(skip(self, intent), fields(payment_intent_id = %intent.id))]
    pub async fn handle_payment_succeeded(
        &self,
        intent: &PaymentIntentObject,
    ) -> Result<Enrollment, ServiceError> {
        let (course_id, user_id) = match (intent.course_id(), intent.user_id()) {
            (Some(course_id), Some(user_id)) => (course_id, user_id),
            _ => {
                return Err(ServiceError::BadRequest(
                    "payment intent metadata lacks courseId or userId".to_string(),
                ))
            }
        };

        let course = self
            .repos
            .courses
            .find_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("course {course_id} not found")))?;

        // Checkout refuses both cases, so either one means the course or account
        // changed after the intent was created. The payment stands.
        if !course.is_published {
            warn!(course_id, "Paid enrollment for a course that is no longer published");
        }
        match self.repos.users.find_user(user_id).await? {
            Some(user) if user.can_purchase() => {}
            Some(user) => warn!(user_id, role = ?user.role, "Paid enrollment for a non-client account"),
            None => warn!(user_id, "Paid enrollment for an unknown account"),
        }

        // Pricing may have changed since the intent was created.
        match PriceQuote::calculate(
            course.price,
            course.discount_percentage,
            course.minimum_gain,
            course.currency_or(&self.default_currency),
        ) {
            Ok(quote) if quote.amount_minor_units != intent.amount => warn!(
                charged = intent.amount,
                current = quote.amount_minor_units,
                "Paid amount differs from current course price"
            ),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "Could not re-price course for paid intent"),
        }

        let enrollment = self
            .repos
            .enrollments
            .create_enrollment(NewEnrollment::paid(course_id, user_id, &intent.id))
            .await?;

        info!(
            enrollment_id = %enrollment.id,
            course_id,
            user_id,
            "Enrollment confirmed by payment"
        );
        Ok(enrollment)
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    models::{Course, CoursePricing, VideoSource},
    pricing::{validate_pricing, PriceQuote},
    repositories::Repositories,
};

/// Course as presented to buyers
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetails {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_published: bool,
    /// Absent when the stored pricing fields are invalid
    pub quote: Option<PriceQuote>,
    /// Absent when the course has no playable video
    pub video: Option<VideoSource>,
}

/// Body of `PUT /api/v1/courses/:id/pricing`. The caller is identified by the
/// bearer token, never by the body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[schema(example = json!({
    "price": "49.90",
    "discountPercentage": "20",
    "minimumGain": "35"
}))]
pub struct UpdatePricingRequest {
    #[schema(value_type = String)]
    pub price: Decimal,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub minimum_gain: Option<Decimal>,
}

#[derive(Clone)]
pub struct CourseService {
    repos: Repositories,
    default_currency: String,
}

impl CourseService {
    pub fn new(repos: Repositories, default_currency: impl Into<String>) -> Self {
        Self {
            repos,
            default_currency: default_currency.into(),
        }
    }

    async fn load(&self, course_id: &str) -> Result<Course, ServiceError> {
        self.repos
            .courses
            .find_course(course_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("course {course_id} not found")))
    }

    fn quote_for(&self, course: &Course) -> Result<PriceQuote, ServiceError> {
        Ok(PriceQuote::calculate(
            course.price,
            course.discount_percentage,
            course.minimum_gain,
            course.currency_or(&self.default_currency),
        )?)
    }

    /// Price the buyer would be charged right now. Uses the same calculation as
    /// checkout.
    #[instrument(skip(self))]
    pub async fn quote(&self, course_id: &str) -> Result<PriceQuote, ServiceError> {
        let course = self.load(course_id).await?;
        if !course.is_published {
            return Err(ServiceError::CourseNotAvailable(format!(
                "course {course_id} is not published"
            )));
        }
        self.quote_for(&course)
    }

    #[instrument(skip(self))]
    pub async fn get_course(&self, course_id: &str) -> Result<CourseDetails, ServiceError> {
        let course = self.load(course_id).await?;
        Ok(self.details(course))
    }

    /// Replaces a course's pricing fields. The caller must be an admin and, when the
    /// course has an instructor, that instructor.
    #[instrument(skip(self, caller, request), fields(user_id = %caller.user_id))]
    pub async fn update_pricing(
        &self,
        course_id: &str,
        caller: &AuthUser,
        request: UpdatePricingRequest,
    ) -> Result<CourseDetails, ServiceError> {
        let admin = self
            .repos
            .users
            .find_user(&caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("unknown account".to_string()))?;
        if !admin.can_manage_courses() {
            return Err(ServiceError::Forbidden(
                "only admin accounts can change pricing".to_string(),
            ));
        }

        validate_pricing(
            request.price,
            request.discount_percentage,
            request.minimum_gain,
        )?;

        let course = self.load(course_id).await?;
        if let Some(instructor) = course.instructor_id.as_deref() {
            if instructor != admin.id {
                warn!(course_id, instructor, "Pricing change by non-owner refused");
                return Err(ServiceError::Forbidden(
                    "only the course instructor can change its pricing".to_string(),
                ));
            }
        }

        let pricing = CoursePricing {
            price: request.price,
            discount_percentage: request.discount_percentage,
            minimum_gain: request.minimum_gain,
        };
        let course = self
            .repos
            .courses
            .update_pricing(course_id, &pricing)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("course {course_id} not found")))?;

        info!(course_id, price = %pricing.price, "Course pricing updated");
        Ok(self.details(course))
    }

    fn details(&self, course: Course) -> CourseDetails {
        let quote = match self.quote_for(&course) {
            Ok(quote) => Some(quote),
            Err(err) => {
                warn!(course_id = %course.id, error = %err, "Stored course pricing is invalid");
                None
            }
        };
        let video = course.video_url.as_deref().and_then(VideoSource::classify);

        CourseDetails {
            id: course.id,
            title: course.title,
            description: course.description,
            is_published: course.is_published,
            quote,
            video,
        }
    }
}

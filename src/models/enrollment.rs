use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a user came to be enrolled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentSource {
    /// Course was free; no payment intent was created
    Free,
    /// Enrollment followed a confirmed payment
    Payment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: String,
    pub course_id: String,
    pub user_id: String,
    pub source: EnrollmentSource,
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    pub enrolled_at: DateTime<Utc>,
}

/// Insert payload for an enrollment; the backend assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEnrollment {
    pub course_id: String,
    pub user_id: String,
    pub source: EnrollmentSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
}

impl NewEnrollment {
    pub fn free(course_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            user_id: user_id.into(),
            source: EnrollmentSource::Free,
            payment_intent_id: None,
        }
    }

    pub fn paid(
        course_id: impl Into<String>,
        user_id: impl Into<String>,
        payment_intent_id: impl Into<String>,
    ) -> Self {
        Self {
            course_id: course_id.into(),
            user_id: user_id.into(),
            source: EnrollmentSource::Payment,
            payment_intent_id: Some(payment_intent_id.into()),
        }
    }
}

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{CourseRepository, EnrollmentRepository, RepositoryError, UserRepository};
use crate::models::{Course, CoursePricing, Enrollment, NewEnrollment, UserProfile};

const COURSES: &str = "courses";
const PROFILES: &str = "profiles";
const ENROLLMENTS: &str = "enrollments";

/// Client for the hosted backend's REST interface (`/rest/v1/{table}`).
///
/// Requests are authenticated with the service key, which bypasses row-level
/// security; it must never reach a browser.
#[derive(Clone)]
pub struct BaasClient {
    http: Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for BaasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaasClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct PricingPatch<'a> {
    price: &'a rust_decimal::Decimal,
    discount_percentage: &'a Option<rust_decimal::Decimal>,
    minimum_gain: &'a Option<rust_decimal::Decimal>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl BaasClient {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header(header::ACCEPT, "application/json")
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<T>, RepositoryError> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string())];
        query.extend(filters.iter().cloned());

        let response = self
            .authorized(self.http.get(self.table_url(table)))
            .query(&query)
            .send()
            .await
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        let rows: Vec<T> = decode_rows(response).await?;
        Ok(rows.into_iter().next())
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

async fn decode_rows<T: DeserializeOwned>(response: Response) -> Result<Vec<T>, RepositoryError> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        return Err(RepositoryError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<Vec<T>>()
        .await
        .map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait]
impl CourseRepository for BaasClient {
    #[instrument(skip(self))]
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, RepositoryError> {
        self.select_one(COURSES, &[("id", eq(course_id))]).await
    }

    #[instrument(skip(self, pricing))]
    async fn update_pricing(
        &self,
        course_id: &str,
        pricing: &CoursePricing,
    ) -> Result<Option<Course>, RepositoryError> {
        let patch = PricingPatch {
            price: &pricing.price,
            discount_percentage: &pricing.discount_percentage,
            minimum_gain: &pricing.minimum_gain,
            updated_at: chrono::Utc::now(),
        };

        let response = self
            .authorized(self.http.patch(self.table_url(COURSES)))
            .query(&[("id", eq(course_id))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        let rows: Vec<Course> = decode_rows(response).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl UserRepository for BaasClient {
    #[instrument(skip(self))]
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
        self.select_one(PROFILES, &[("id", eq(user_id))]).await
    }
}

#[async_trait]
impl EnrollmentRepository for BaasClient {
    #[instrument(skip(self))]
    async fn find_enrollment(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        self.select_one(
            ENROLLMENTS,
            &[("course_id", eq(course_id)), ("user_id", eq(user_id))],
        )
        .await
    }

    #[instrument(skip(self, enrollment), fields(course_id = %enrollment.course_id, user_id = %enrollment.user_id))]
    async fn create_enrollment(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, RepositoryError> {
        let response = self
            .authorized(self.http.post(self.table_url(ENROLLMENTS)))
            .query(&[("on_conflict", "course_id,user_id")])
            .header(
                "Prefer",
                "resolution=ignore-duplicates,return=representation",
            )
            .json(&enrollment)
            .send()
            .await
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;

        if response.status() == StatusCode::CONFLICT {
            debug!("enrollment already exists");
        } else {
            let rows: Vec<Enrollment> = decode_rows(response).await?;
            if let Some(created) = rows.into_iter().next() {
                return Ok(created);
            }
        }

        // Duplicate inserts come back empty; the existing row is authoritative.
        self.find_enrollment(&enrollment.course_id, &enrollment.user_id)
            .await?
            .ok_or_else(|| {
                RepositoryError::Decode("enrollment insert returned no row".to_string())
            })
    }
}

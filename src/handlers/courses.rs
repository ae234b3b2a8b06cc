use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::common::json_body;
use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::pricing::PriceQuote;
use crate::services::{CourseDetails, UpdatePricingRequest};
use crate::AppState;

/// Get a course with its current price and video source
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course details", body = CourseDetails),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Courses"
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<CourseDetails>, ServiceError> {
    Ok(Json(state.courses.get_course(&course_id).await?))
}

/// Quote the price a buyer would pay right now
#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/quote",
    params(("id" = String, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Price quote", body = PriceQuote),
        (status = 400, description = "Unpublished course or invalid stored pricing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Courses"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> Result<Json<PriceQuote>, ServiceError> {
    Ok(Json(state.courses.quote(&course_id).await?))
}

/// Replace a course's price, discount and minimum gain
#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}/pricing",
    params(("id" = String, Path, description = "Course ID")),
    request_body = UpdatePricingRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pricing updated", body = CourseDetails),
        (status = 400, description = "Invalid pricing", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not an admin or not the course instructor", body = crate::errors::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Courses"
)]
pub async fn update_pricing(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    caller: AuthUser,
    payload: Result<Json<UpdatePricingRequest>, JsonRejection>,
) -> Result<Json<CourseDetails>, ServiceError> {
    let request = json_body(payload)?;
    Ok(Json(
        state
            .courses
            .update_pricing(&course_id, &caller, request)
            .await?,
    ))
}

use axum::{extract::rejection::JsonRejection, Json};

use crate::errors::ServiceError;

/// Unwraps a JSON body, reporting malformed or mistyped payloads as `400` with the
/// standard error body instead of axum's plain-text rejection.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))
}

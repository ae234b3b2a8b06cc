use crate::tracing::{scope_request_id, RequestId};
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Caller-supplied correlation id, if it is short and made of visible ASCII.
/// Anything else is replaced so it cannot forge log fields or break headers.
pub fn incoming_request_id(headers: &HeaderMap) -> Option<RequestId> {
    let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
    let valid = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    valid.then(|| RequestId::new(raw))
}

/// Assigns a request id, exposes it to handlers (extension and task-local) and
/// echoes it on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = incoming_request_id(request.headers()).unwrap_or_default();
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    let value = HeaderValue::from_str(request_id.as_str()).ok();

    if let Some(value) = &value {
        request.headers_mut().insert(header.clone(), value.clone());
    }
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let mut response = scope_request_id(request_id, next.run(request))
        .instrument(span)
        .await;

    if let Some(value) = value {
        response.headers_mut().insert(header, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::current_request_id;
    use axum::{body::Body, extract::Extension, routing::get, Router};
    use rstest::rstest;
    use tower::ServiceExt;

    async fn echo_ids(Extension(from_extension): Extension<RequestId>) -> String {
        let scoped = current_request_id().map(|id| id.0).unwrap_or_default();
        format!("{}|{}", from_extension.as_str(), scoped)
    }

    async fn call(request_id: Option<&str>) -> (Option<String>, String) {
        let app = Router::new()
            .route("/", get(echo_ids))
            .layer(axum::middleware::from_fn(request_id_middleware));
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(id) = request_id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (header, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn caller_id_reaches_handler_and_response() {
        let (header, body) = call(Some("checkout-tap-1")).await;
        assert_eq!(header.as_deref(), Some("checkout-tap-1"));
        assert_eq!(body, "checkout-tap-1|checkout-tap-1");
    }

    #[tokio::test]
    async fn missing_id_is_generated_once() {
        let (header, body) = call(None).await;
        let header = header.expect("generated id is echoed");
        assert!(uuid::Uuid::parse_str(&header).is_ok());
        assert_eq!(body, format!("{header}|{header}"));
    }

    #[rstest]
    #[case::too_long("a".repeat(MAX_REQUEST_ID_LEN + 1))]
    #[case::inner_space("id with spaces".to_string())]
    #[case::empty(String::new())]
    fn unusable_caller_ids_are_ignored(#[case] raw: String) {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&raw).unwrap());
        assert_eq!(incoming_request_id(&headers), None);
    }
}

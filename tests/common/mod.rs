#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use course_checkout_api::{
    build_router,
    config::AppConfig,
    models::{Course, UserProfile, UserRole},
    payments::{PaymentError, PaymentIntent, PaymentIntentParams, PaymentProvider},
    repositories::{InMemoryStore, Repositories},
    AppState,
};
use rust_decimal::Decimal;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const JWT_SECRET: &str = "backend-jwt-integration";
pub const BUYER: &str = "buyer-1";
pub const ADMIN: &str = "admin-1";

/// Payment provider double that records every call and replies with a canned result.
#[derive(Default)]
pub struct RecordingPaymentProvider {
    calls: Mutex<Vec<PaymentIntentParams>>,
    failure: Mutex<Option<PaymentError>>,
}

impl RecordingPaymentProvider {
    pub fn calls(&self) -> Vec<PaymentIntentParams> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_with(&self, error: PaymentError) {
        *self.failure.lock().unwrap() = Some(error);
    }
}

#[async_trait]
impl PaymentProvider for RecordingPaymentProvider {
    async fn create_payment_intent(
        &self,
        params: &PaymentIntentParams,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(params.clone());
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        let n = calls.len();
        Ok(PaymentIntent {
            id: format!("pi_{n}"),
            client_secret: Some(format!("pi_{n}_secret_test")),
            amount: params.amount_minor_units,
            currency: params.currency.clone(),
            status: Some("requires_payment_method".into()),
        })
    }
}

/// Router over an in-memory store and a recording payment provider.
pub struct TestApp {
    router: Router,
    pub store: Arc<InMemoryStore>,
    pub payments: Arc<RecordingPaymentProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Same wiring as [`TestApp::new`], with a chance to adjust the config first.
    pub fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new("sk_test_integration".into(), "test".into());
        cfg.cors_allow_any_origin = true;
        cfg.payment_webhook_secret = Some(WEBHOOK_SECRET.into());
        cfg.auth_jwt_secret = Some(JWT_SECRET.into());
        adjust(&mut cfg);

        let store = Arc::new(InMemoryStore::new());
        store.insert_user(UserProfile {
            id: BUYER.into(),
            email: Some("buyer@example.com".into()),
            role: UserRole::Client,
        });
        store.insert_user(UserProfile {
            id: ADMIN.into(),
            email: Some("admin@example.com".into()),
            role: UserRole::Admin,
        });

        let payments = Arc::new(RecordingPaymentProvider::default());
        let state = AppState::new(
            cfg,
            Repositories::from_store(store.clone()),
            payments.clone(),
        );

        Self {
            router: build_router(state),
            store,
            payments,
        }
    }

    pub fn seed_course(
        &self,
        id: &str,
        price: Decimal,
        discount: Option<Decimal>,
        minimum_gain: Option<Decimal>,
        published: bool,
    ) {
        self.store.insert_course(Course {
            id: id.into(),
            title: format!("Course {id}"),
            description: None,
            price,
            discount_percentage: discount,
            minimum_gain,
            is_published: published,
            currency: None,
            video_url: None,
            instructor_id: None,
            updated_at: None,
        });
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request_with_token(method, uri, None, body).await
    }

    pub async fn request_with_token(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn checkout(&self, course_id: &str, user_id: &str) -> (StatusCode, Value) {
        let response = self
            .request(
                Method::POST,
                "/api/v1/payments/intent",
                Some(serde_json::json!({
                    "courseId": course_id,
                    "userId": user_id,
                    "courseTitle": "Rust for Beginners"
                })),
            )
            .await;
        into_json(response).await
    }
}

/// Access token as the backend would issue it for `user_id`.
pub fn access_token(user_id: &str) -> String {
    signed_token(user_id, JWT_SECRET, chrono::Utc::now().timestamp() + 3600)
}

pub fn signed_token(user_id: &str, secret: &str, expires_at: i64) -> String {
    encode(
        &Header::default(),
        &json!({"sub": user_id, "aud": "authenticated", "exp": expires_at}),
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to sign test token")
}

pub async fn into_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is not JSON")
    };
    (status, value)
}

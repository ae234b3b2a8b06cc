//! Course Checkout API
//!
//! Server-side pricing, payment-intent creation and payment-confirmed enrollment for
//! the course platform.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod models;
pub mod openapi;
pub mod payments;
pub mod pricing;
pub mod repositories;
pub mod services;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::payments::PaymentProvider;
use crate::repositories::Repositories;
use crate::services::{CheckoutService, CourseService, EnrollmentService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Absent when no token secret is configured; privileged routes then answer 401.
    pub auth: Option<Arc<TokenVerifier>>,
    pub checkout: Arc<CheckoutService>,
    pub courses: Arc<CourseService>,
    pub enrollments: Arc<EnrollmentService>,
}

impl AppState {
    /// Wires the services once; handlers only ever clone the `Arc`s.
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        let currency = config.default_currency.to_ascii_lowercase();
        let auth = config
            .auth_secret()
            .map(|secret| Arc::new(TokenVerifier::new(secret, &config.auth_jwt_audience)));
        Self {
            auth,
            checkout: Arc::new(CheckoutService::new(
                repos.clone(),
                payments,
                currency.clone(),
            )),
            courses: Arc::new(CourseService::new(repos.clone(), currency.clone())),
            enrollments: Arc::new(EnrollmentService::new(repos, currency)),
            config: Arc::new(config),
        }
    }
}

/// API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payments/intent",
            post(handlers::checkout::create_payment_intent),
        )
        .route("/courses/:id", get(handlers::courses::get_course))
        .route("/courses/:id/quote", get(handlers::courses::get_quote))
        .route("/courses/:id/pricing", put(handlers::courses::update_pricing))
        .route(
            "/webhooks/payments",
            post(handlers::payment_webhooks::payment_webhook),
        )
}

/// CORS policy from configuration: explicit origins win, then the permissive
/// fallback, otherwise cross-origin requests are refused.
pub fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::permissive()
    } else {
        ::tracing::error!("Missing CORS configuration; cross-origin requests will be refused");
        CorsLayer::new()
    }
}

/// Full application router: health, API v1, Swagger UI and the middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cfg = state.config.clone();

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(cfg.max_body_size))
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer(&cfg))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

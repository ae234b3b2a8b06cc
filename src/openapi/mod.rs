use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Course Checkout API",
        version = "0.1.0",
        description = r#"
# Course Checkout API

Server-side pricing and checkout for the course platform.

- **Quotes**: the price a buyer sees, computed from the course's list price, percentage
  discount and minimum-gain floor.
- **Checkout**: creates one payment intent for exactly the quoted amount, or enrolls
  directly when the course is free.
- **Payment webhooks**: enrollment is granted only after the processor confirms payment.

## Amounts

Decimal amounts are serialized as strings with two decimal places (`"70.00"`).
Amounts sent to the payment processor are integers in minor units (`7000`).

## Error Handling

Every error uses the same body:

```json
{
  "error": "Course not available: course c-42 is not published",
  "request_id": "req-abc123xyz"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Payments", description = "Checkout and payment confirmation"),
        (name = "Courses", description = "Course details, quotes and pricing"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::checkout::create_payment_intent,
        crate::handlers::courses::get_course,
        crate::handlers::courses::get_quote,
        crate::handlers::courses::update_pricing,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::services::CreatePaymentIntentRequest,
            crate::handlers::checkout::CreatePaymentIntentResponse,
            crate::services::CourseDetails,
            crate::services::UpdatePricingRequest,
            crate::pricing::PriceQuote,
            crate::models::VideoSource,
            crate::handlers::payment_webhooks::WebhookAck,
            crate::handlers::health::HealthResponse,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDocV1;

/// Backend access token accepted by the admin routes
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

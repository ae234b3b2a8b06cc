pub mod checkout;
pub mod common;
pub mod courses;
pub mod health;
pub mod payment_webhooks;

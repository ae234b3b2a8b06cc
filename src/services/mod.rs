pub mod checkout;
pub mod courses;
pub mod enrollments;

pub use checkout::{CheckoutOutcome, CheckoutService, ChargeRequest, CreatePaymentIntentRequest};
pub use courses::{CourseDetails, CourseService, UpdatePricingRequest};
pub use enrollments::EnrollmentService;

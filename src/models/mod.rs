//! Records read from and written to the platform backend.

pub mod course;
pub mod enrollment;
pub mod user;
pub mod video;

pub use course::{Course, CoursePricing};
pub use enrollment::{Enrollment, EnrollmentSource, NewEnrollment};
pub use user::{UserProfile, UserRole};
pub use video::VideoSource;

//! Persistence boundary.
//!
//! Courses, profiles and enrollments live in the platform backend. Services only see
//! these traits, so pricing and checkout can be exercised against [`InMemoryStore`]
//! while production talks to the backend through [`BaasClient`].

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Course, CoursePricing, Enrollment, NewEnrollment, UserProfile};

pub mod baas;
pub mod in_memory;

pub use baas::BaasClient;
pub use in_memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("could not decode backend response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, RepositoryError>;

    /// Replaces the pricing columns; `None` when the course does not exist.
    async fn update_pricing(
        &self,
        course_id: &str,
        pricing: &CoursePricing,
    ) -> Result<Option<Course>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_enrollment(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Enrollment>, RepositoryError>;

    /// Creates the enrollment, or returns the existing one for the same course and user.
    async fn create_enrollment(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, RepositoryError>;
}

/// Repository handles shared by the services.
#[derive(Clone)]
pub struct Repositories {
    pub courses: Arc<dyn CourseRepository>,
    pub users: Arc<dyn UserRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Repositories {
    /// Uses one backend for all three record types.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CourseRepository + UserRepository + EnrollmentRepository + 'static,
    {
        Self {
            courses: store.clone(),
            users: store.clone(),
            enrollments: store,
        }
    }
}

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{CourseRepository, EnrollmentRepository, RepositoryError, UserRepository};
use crate::models::{Course, CoursePricing, Enrollment, NewEnrollment, UserProfile};

/// Process-local store used for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    courses: DashMap<String, Course>,
    users: DashMap<String, UserProfile>,
    enrollments: DashMap<(String, String), Enrollment>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_course(&self, course: Course) {
        self.courses.insert(course.id.clone(), course);
    }

    pub fn insert_user(&self, user: UserProfile) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn enrollment_count(&self) -> usize {
        self.enrollments.len()
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.get(course_id).map(|c| c.value().clone()))
    }

    async fn update_pricing(
        &self,
        course_id: &str,
        pricing: &CoursePricing,
    ) -> Result<Option<Course>, RepositoryError> {
        Ok(self.courses.get_mut(course_id).map(|mut course| {
            course.apply_pricing(pricing);
            course.value().clone()
        }))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.users.get(user_id).map(|u| u.value().clone()))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn find_enrollment(
        &self,
        course_id: &str,
        user_id: &str,
    ) -> Result<Option<Enrollment>, RepositoryError> {
        let key = (course_id.to_string(), user_id.to_string());
        Ok(self.enrollments.get(&key).map(|e| e.value().clone()))
    }

    async fn create_enrollment(
        &self,
        enrollment: NewEnrollment,
    ) -> Result<Enrollment, RepositoryError> {
        let key = (enrollment.course_id.clone(), enrollment.user_id.clone());
        let entry = self.enrollments.entry(key).or_insert_with(|| Enrollment {
            id: Uuid::new_v4().to_string(),
            course_id: enrollment.course_id,
            user_id: enrollment.user_id,
            source: enrollment.source,
            payment_intent_id: enrollment.payment_intent_id,
            enrolled_at: Utc::now(),
        });
        Ok(entry.value().clone())
    }
}

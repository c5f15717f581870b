//! crates/course_recommender_core/src/ports.rs
//!
//! Defines the service contracts (traits) the recommender depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the relational store and the vector search engine.

use crate::domain::{
    CandidateCourse, Course, CourseFilter, FeedbackRecord, NewFeedback, UserPreferenceProfile,
};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CatalogStore: Send + Sync {
    // --- Courses ---
    async fn get_course(&self, course_id: &str) -> PortResult<Course>;

    async fn list_courses(&self, filter: &CourseFilter) -> PortResult<Vec<Course>>;

    /// Keyword match over title, description and topics, best rated first.
    async fn search_courses(&self, text: &str, limit: usize) -> PortResult<Vec<Course>>;

    // --- Preferences ---
    /// `None` when the user never saved preferences.
    async fn get_preferences(&self, user_id: Uuid) -> PortResult<Option<UserPreferenceProfile>>;

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        profile: &UserPreferenceProfile,
    ) -> PortResult<()>;

    // --- Feedback ---
    /// Newest first, each record carrying the rated course's topics.
    async fn list_feedback(&self, user_id: Uuid) -> PortResult<Vec<FeedbackRecord>>;

    async fn save_feedback(&self, feedback: NewFeedback) -> PortResult<FeedbackRecord>;

    async fn delete_feedback(&self, user_id: Uuid, feedback_id: Uuid) -> PortResult<()>;
}

#[async_trait]
pub trait VectorSearchService: Send + Sync {
    /// Courses semantically close to `query`, each with a similarity in `[0, 1]`.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f64,
    ) -> PortResult<Vec<CandidateCourse>>;

    async fn is_ready(&self) -> PortResult<bool>;
}

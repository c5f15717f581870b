//! In-memory fakes of the service ports, shared by the service and router tests.

use async_trait::async_trait;
use chrono::Utc;
use course_recommender_core::domain::{
    CandidateCourse, Course, CourseFilter, DeliveryFormat, Difficulty, FeedbackRecord,
    NewFeedback, UserPreferenceProfile,
};
use course_recommender_core::ports::{
    CatalogStore, PortError, PortResult, VectorSearchService,
};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub fn course(id: &str, title: &str, topics: &[&str], difficulty: Difficulty, rating: f64) -> Course {
    Course {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("An introduction to {}", topics.join(" and ")),
        topics: topics.iter().map(|t| t.to_string()).collect(),
        difficulty,
        rating,
        duration: "4 weeks".to_string(),
        format: DeliveryFormat::Video,
    }
}

#[derive(Default)]
struct CatalogState {
    courses: Vec<Course>,
    preferences: HashMap<Uuid, UserPreferenceProfile>,
    feedback: Vec<FeedbackRecord>,
}

#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
}

impl InMemoryCatalog {
    pub fn with_courses(courses: Vec<Course>) -> Self {
        Self {
            state: Mutex::new(CatalogState {
                courses,
                ..CatalogState::default()
            }),
        }
    }

    pub fn put_preferences(&self, user_id: Uuid, profile: UserPreferenceProfile) {
        self.state.lock().unwrap().preferences.insert(user_id, profile);
    }

    /// A stored course as a vector hit with the given similarity.
    pub fn candidate(&self, course_id: &str, similarity: f64) -> CandidateCourse {
        let state = self.state.lock().unwrap();
        let course = state
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .unwrap_or_else(|| panic!("unknown course {course_id}"));
        CandidateCourse::new(course).with_similarity(similarity)
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn get_course(&self, course_id: &str) -> PortResult<Course> {
        let state = self.state.lock().unwrap();
        state
            .courses
            .iter()
            .find(|c| c.id == course_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Course {} not found", course_id)))
    }

    async fn list_courses(&self, filter: &CourseFilter) -> PortResult<Vec<Course>> {
        let state = self.state.lock().unwrap();
        let mut courses: Vec<Course> = state
            .courses
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.id.cmp(&b.id)));
        Ok(courses
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }

    async fn search_courses(&self, text: &str, limit: usize) -> PortResult<Vec<Course>> {
        let needle = text.trim().to_lowercase();
        let state = self.state.lock().unwrap();
        Ok(state
            .courses
            .iter()
            .filter(|c| {
                c.title.to_lowercase().contains(&needle)
                    || c.description.to_lowercase().contains(&needle)
                    || c.topics.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_preferences(&self, user_id: Uuid) -> PortResult<Option<UserPreferenceProfile>> {
        Ok(self.state.lock().unwrap().preferences.get(&user_id).cloned())
    }

    async fn upsert_preferences(
        &self,
        user_id: Uuid,
        profile: &UserPreferenceProfile,
    ) -> PortResult<()> {
        self.put_preferences(user_id, profile.clone());
        Ok(())
    }

    async fn list_feedback(&self, user_id: Uuid) -> PortResult<Vec<FeedbackRecord>> {
        let state = self.state.lock().unwrap();
        // Insertion order is chronological; newest first.
        Ok(state
            .feedback
            .iter()
            .rev()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_feedback(&self, feedback: NewFeedback) -> PortResult<FeedbackRecord> {
        let mut state = self.state.lock().unwrap();
        let course_topics = state
            .courses
            .iter()
            .find(|c| c.id == feedback.course_id)
            .map(|c| c.topics.clone())
            .unwrap_or_default();
        let record = FeedbackRecord {
            id: Uuid::new_v4(),
            user_id: feedback.user_id,
            course_id: feedback.course_id,
            course_topics,
            rating: feedback.rating,
            comment: feedback.comment,
            learning_style: feedback.learning_style,
            difficulty_preference: feedback.difficulty_preference,
            created_at: Utc::now(),
        };
        state.feedback.push(record.clone());
        Ok(record)
    }

    async fn delete_feedback(&self, user_id: Uuid, feedback_id: Uuid) -> PortResult<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.feedback.len();
        state
            .feedback
            .retain(|f| !(f.id == feedback_id && f.user_id == user_id));
        if state.feedback.len() == before {
            return Err(PortError::NotFound(format!("Feedback {} not found", feedback_id)));
        }
        Ok(())
    }
}

/// Returns the same hits for every query and records what was asked.
#[derive(Default)]
pub struct StaticVectorSearch {
    hits: Vec<CandidateCourse>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl StaticVectorSearch {
    pub fn with_hits(hits: Vec<CandidateCourse>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VectorSearchService for StaticVectorSearch {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        _min_similarity: f64,
    ) -> PortResult<Vec<CandidateCourse>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(PortError::Unavailable("vector search is down".to_string()));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn is_ready(&self) -> PortResult<bool> {
        Ok(!self.fail)
    }
}

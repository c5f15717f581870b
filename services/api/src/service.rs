//! services/api/src/service.rs
//!
//! Orchestrates one recommendation request: loads the user's signals, gathers
//! candidates from the vector search and the catalog, then hands everything to
//! the pure ranker from the `core` crate. Every operation the web layer exposes
//! goes through here, so handlers stay thin.

use crate::error::ApiError;
use course_recommender_core::domain::{
    CandidateCourse, Course, CourseFilter, FeedbackRecord, NewFeedback, PreferenceUpdate,
    RankedResult, UserPreferenceProfile,
};
use course_recommender_core::ports::{CatalogStore, PortError, VectorSearchService};
use course_recommender_core::{validate_max_results, QueryIntent, Ranker};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Search text used when neither the query nor the profile yields one.
const DEFAULT_SEARCH_TEXT: &str = "programming software development technology";

/// How many preferred topics go into the "courses about ..." search.
const MAX_TOPICS_IN_SEARCH: usize = 5;

/// Tuning for candidate retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    /// Minimum number of hits requested per vector search.
    pub search_limit: usize,
    pub min_similarity: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            search_limit: 15,
            min_similarity: 0.4,
        }
    }
}

/// A ranked result plus the search text actually used for the query.
#[derive(Debug, Clone)]
pub struct Recommendation {
    pub result: RankedResult,
    pub query_processed: Option<String>,
}

pub struct RecommendationService {
    store: Arc<dyn CatalogStore>,
    vector_search: Arc<dyn VectorSearchService>,
    ranker: Ranker,
    settings: SearchSettings,
}

impl RecommendationService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        vector_search: Arc<dyn VectorSearchService>,
        ranker: Ranker,
        settings: SearchSettings,
    ) -> Self {
        Self {
            store,
            vector_search,
            ranker,
            settings,
        }
    }

    //=====================================================================================
    // Recommendations
    //=====================================================================================

    pub async fn recommend(
        &self,
        user_id: Uuid,
        query: Option<&str>,
        max_results: i64,
    ) -> Result<Recommendation, ApiError> {
        let limit = validate_max_results(max_results)?;

        let (stored_profile, feedback) = futures::try_join!(
            self.store.get_preferences(user_id),
            self.store.list_feedback(user_id)
        )?;
        let mut profile = stored_profile.unwrap_or_default();

        let intent = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(QueryIntent::parse);
        if let Some(intent) = &intent {
            if intent.has_exclusions() {
                debug!(user_id = %user_id, excluded = ?intent.excluded_topics, "Query excludes topics");
                profile = profile.with_extra_avoided(&intent.excluded_topics);
            }
        }

        let search_texts = search_texts(intent.as_ref(), &profile);
        let search_limit = self.settings.search_limit.max(limit * 2);
        let mut candidates = self.vector_candidates(&search_texts, search_limit).await;

        if let Some(intent) = &intent {
            match self
                .store
                .search_courses(&intent.search_text, search_limit)
                .await
            {
                Ok(courses) => candidates.extend(courses.into_iter().map(CandidateCourse::new)),
                Err(e) => warn!(user_id = %user_id, "Keyword search failed: {}", e),
            }
        }

        if candidates.is_empty() {
            info!(user_id = %user_id, "No search candidates; falling back to top-rated courses");
            let filter = CourseFilter {
                limit: search_limit,
                ..CourseFilter::default()
            };
            candidates = self
                .store
                .list_courses(&filter)
                .await?
                .into_iter()
                .map(CandidateCourse::new)
                .collect();
        }

        let excluded_keywords = intent
            .as_ref()
            .map(|i| i.excluded_topics.clone())
            .unwrap_or_default();
        let result = self.ranker.rank_excluding(
            &profile,
            &feedback,
            candidates,
            max_results,
            &excluded_keywords,
        )?;
        info!(
            user_id = %user_id,
            returned = result.len(),
            excluded = result.excluded_count,
            "Recommendations ranked"
        );

        Ok(Recommendation {
            result,
            query_processed: intent.map(|i| i.search_text),
        })
    }

    /// Runs every search concurrently. Failed searches are logged and skipped.
    async fn vector_candidates(&self, texts: &[String], limit: usize) -> Vec<CandidateCourse> {
        let searches = texts.iter().map(|text| {
            self.vector_search
                .search(text, limit, self.settings.min_similarity)
        });

        let mut candidates = Vec::new();
        for (text, outcome) in texts.iter().zip(join_all(searches).await) {
            match outcome {
                Ok(hits) => {
                    debug!(search = %text, hits = hits.len(), "Vector search returned");
                    candidates.extend(hits);
                }
                Err(e) => warn!(search = %text, "Vector search failed: {}", e),
            }
        }
        candidates
    }

    /// Courses semantically close to `course_id`, most similar first.
    pub async fn similar_courses(
        &self,
        course_id: &str,
        max_results: i64,
    ) -> Result<Vec<CandidateCourse>, ApiError> {
        let limit = validate_max_results(max_results)?;
        let course = self.store.get_course(course_id).await?;

        let text = format!(
            "{} {} {}",
            course.title,
            course.description,
            course.topics.join(" ")
        );
        let hits = self
            .vector_search
            .search(
                text.trim(),
                self.settings.search_limit.max(limit + 1),
                self.settings.min_similarity,
            )
            .await?;

        let mut seen = HashSet::new();
        let mut similar: Vec<CandidateCourse> = hits
            .into_iter()
            .filter(|hit| hit.course.id != course.id)
            .filter(|hit| seen.insert(hit.course.id.clone()))
            .collect();
        similar.sort_by(|a, b| {
            let (a, b) = (a.similarity.unwrap_or(0.0), b.similarity.unwrap_or(0.0));
            b.total_cmp(&a)
        });
        similar.truncate(limit);
        Ok(similar)
    }

    pub async fn vector_search_ready(&self) -> bool {
        match self.vector_search.is_ready().await {
            Ok(ready) => ready,
            Err(e) => {
                warn!("Vector search readiness check failed: {}", e);
                false
            }
        }
    }

    //=====================================================================================
    // Catalog
    //=====================================================================================

    pub async fn get_course(&self, course_id: &str) -> Result<Course, ApiError> {
        Ok(self.store.get_course(course_id).await?)
    }

    pub async fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, ApiError> {
        Ok(self.store.list_courses(filter).await?)
    }

    //=====================================================================================
    // Preferences
    //=====================================================================================

    /// The stored profile, or an empty one for users who never saved any.
    pub async fn get_preferences(&self, user_id: Uuid) -> Result<UserPreferenceProfile, ApiError> {
        Ok(self
            .store
            .get_preferences(user_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        update: PreferenceUpdate,
    ) -> Result<UserPreferenceProfile, ApiError> {
        let current = self.get_preferences(user_id).await?;
        let profile = update.apply(&current);
        self.store.upsert_preferences(user_id, &profile).await?;
        info!(user_id = %user_id, "Preferences updated");
        Ok(profile)
    }

    //=====================================================================================
    // Feedback
    //=====================================================================================

    pub async fn submit_feedback(&self, feedback: NewFeedback) -> Result<FeedbackRecord, ApiError> {
        if !(1..=5).contains(&feedback.rating) {
            return Err(PortError::InvalidInput(format!(
                "rating must be between 1 and 5, got {}",
                feedback.rating
            ))
            .into());
        }
        // Unknown courses surface as NotFound before anything is written.
        self.store.get_course(&feedback.course_id).await?;

        let record = self.store.save_feedback(feedback).await?;
        info!(
            user_id = %record.user_id,
            course_id = %record.course_id,
            rating = record.rating,
            "Feedback stored"
        );
        Ok(record)
    }

    pub async fn list_feedback(&self, user_id: Uuid) -> Result<Vec<FeedbackRecord>, ApiError> {
        Ok(self.store.list_feedback(user_id).await?)
    }

    pub async fn delete_feedback(&self, user_id: Uuid, feedback_id: Uuid) -> Result<(), ApiError> {
        self.store.delete_feedback(user_id, feedback_id).await?;
        info!(user_id = %user_id, feedback_id = %feedback_id, "Feedback deleted");
        Ok(())
    }
}

/// The cleaned query, the preferred topics, and the style/level combination,
/// in that order. Falls back to a generic search when all three are absent.
fn search_texts(intent: Option<&QueryIntent>, profile: &UserPreferenceProfile) -> Vec<String> {
    let mut texts = Vec::new();

    if let Some(intent) = intent {
        texts.push(intent.search_text.clone());
    }

    if !profile.preferred_topics.is_empty() {
        let topics: Vec<&str> = profile
            .preferred_topics
            .iter()
            .take(MAX_TOPICS_IN_SEARCH)
            .map(String::as_str)
            .collect();
        texts.push(format!("courses about {}", topics.join(" ")));
    }

    if let (Some(style), Some(level)) = (profile.learning_style, profile.difficulty_level) {
        texts.push(format!(
            "{} learning {} level",
            style.as_str().replace('-', " "),
            level
        ));
    }

    if texts.is_empty() {
        texts.push(DEFAULT_SEARCH_TEXT.to_string());
    }
    texts
}

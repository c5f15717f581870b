//! services/api/src/adapters/vector_search.rs
//!
//! Adapter for the external vector database (Weaviate GraphQL API).
//! It implements the `VectorSearchService` port from the `core` crate.
//! Embedding and indexing happen inside the vector database; this adapter
//! only issues `nearText` queries and maps the hits back to candidates.

use async_trait::async_trait;
use course_recommender_core::domain::{CandidateCourse, Course, DeliveryFormat, Difficulty};
use course_recommender_core::ports::{PortError, PortResult, VectorSearchService};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub struct WeaviateSearchAdapter {
    client: Client,
    base_url: String,
    class_name: String,
    api_key: Option<String>,
}

impl WeaviateSearchAdapter {
    pub fn new(
        base_url: impl Into<String>,
        class_name: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            class_name: class_name.into(),
            api_key,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

/// A course object as stored in the vector database.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseHit {
    course_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    topics: Option<Vec<String>>,
    difficulty: Option<String>,
    duration: Option<String>,
    format: Option<String>,
    rating: Option<f64>,
    #[serde(rename = "_additional")]
    additional: Option<Additional>,
}

#[derive(Debug, Deserialize)]
struct Additional {
    certainty: Option<f64>,
}

impl CourseHit {
    /// `None` when the object lacks an id, a title or a known difficulty.
    fn into_candidate(self) -> Option<CandidateCourse> {
        let id = self.course_id?;
        let difficulty = match self.difficulty.as_deref().map(str::parse::<Difficulty>) {
            Some(Ok(d)) => d,
            _ => {
                warn!(course_id = %id, "Skipping vector hit without a valid difficulty");
                return None;
            }
        };
        let course = Course {
            title: self.title?,
            description: self.description.unwrap_or_default(),
            topics: self.topics.unwrap_or_default(),
            difficulty,
            rating: self.rating.unwrap_or(0.0),
            duration: self.duration.unwrap_or_default(),
            format: DeliveryFormat::parse(self.format.as_deref().unwrap_or_default()),
            id,
        };
        Some(CandidateCourse {
            course,
            similarity: self.additional.and_then(|a| a.certainty),
        })
    }
}

/// GraphQL `Get` query for `limit` objects of `class_name` near `text`.
fn build_query(class_name: &str, text: &str, limit: usize, min_similarity: f64) -> String {
    // A JSON string literal is also a valid GraphQL string literal.
    let concept = Value::String(text.to_string()).to_string();
    format!(
        "{{ Get {{ {class_name}(nearText: {{ concepts: [{concept}], certainty: {min_similarity} }}, limit: {limit}) \
         {{ courseId title description topics difficulty duration format rating _additional {{ certainty }} }} }} }}"
    )
}

fn parse_search_response(class_name: &str, body: Value) -> PortResult<Vec<CandidateCourse>> {
    if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
        return Err(PortError::Unexpected(format!("vector search errors: {errors}")));
    }
    let hits = body
        .pointer(&format!("/data/Get/{class_name}"))
        .cloned()
        .unwrap_or(Value::Array(Vec::new()));
    let hits: Vec<CourseHit> = serde_json::from_value(hits)
        .map_err(|e| PortError::Unexpected(format!("malformed vector search response: {e}")))?;

    Ok(hits.into_iter().filter_map(CourseHit::into_candidate).collect())
}

#[async_trait]
impl VectorSearchService for WeaviateSearchAdapter {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        min_similarity: f64,
    ) -> PortResult<Vec<CandidateCourse>> {
        let graphql = build_query(&self.class_name, query, limit, min_similarity);
        let response = self
            .request(self.client.post(format!("{}/v1/graphql", self.base_url)))
            .json(&json!({ "query": graphql }))
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Unavailable(format!(
                "vector search returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let candidates = parse_search_response(&self.class_name, body)?;
        debug!(hits = candidates.len(), "Vector search complete");
        Ok(candidates)
    }

    async fn is_ready(&self) -> PortResult<bool> {
        let response = self
            .request(
                self.client
                    .get(format!("{}/v1/.well-known/ready", self.base_url)),
            )
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;
        Ok(response.status().is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_escapes_the_search_text() {
        let query = build_query("Course", "say \"hi\"", 5, 0.4);
        assert!(query.contains(r#"concepts: ["say \"hi\""]"#));
        assert!(query.contains("limit: 5"));
        assert!(query.contains("certainty: 0.4"));
        assert!(query.starts_with("{ Get { Course("));
    }

    #[test]
    fn parses_hits_into_candidates() {
        let body = json!({
            "data": { "Get": { "Course": [
                {
                    "courseId": "py-101",
                    "title": "Python Basics",
                    "description": "Start here",
                    "topics": ["python", "programming"],
                    "difficulty": "Beginner",
                    "duration": "4 weeks",
                    "format": "hands-on",
                    "rating": 4.6,
                    "_additional": { "certainty": 0.83 }
                },
                {
                    "courseId": "bad",
                    "title": "Broken",
                    "difficulty": "impossible",
                    "_additional": { "certainty": 0.99 }
                }
            ]}}
        });

        let candidates = parse_search_response("Course", body).unwrap();
        assert_eq!(candidates.len(), 1);
        let first = &candidates[0];
        assert_eq!(first.course.id, "py-101");
        assert_eq!(first.course.difficulty, Difficulty::Beginner);
        assert_eq!(first.course.format, DeliveryFormat::HandsOn);
        assert_eq!(first.similarity, Some(0.83));
    }

    #[test]
    fn graphql_errors_are_reported() {
        let body = json!({ "errors": [{ "message": "no such class" }] });
        assert!(matches!(
            parse_search_response("Course", body),
            Err(PortError::Unexpected(_))
        ));
    }

    #[test]
    fn missing_class_yields_no_hits() {
        let body = json!({ "data": { "Get": {} } });
        assert!(parse_search_response("Course", body).unwrap().is_empty());
    }
}

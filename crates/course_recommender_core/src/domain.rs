//! crates/course_recommender_core/src/domain.rs
//!
//! Defines the pure, core data structures for the recommender.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Ratings at or below this value mark a course (and its topics) as disliked.
pub const NEGATIVE_RATING_MAX: u8 = 2;
/// Ratings at or above this value mark a course's topics as liked.
pub const POSITIVE_RATING_MIN: u8 = 4;
/// Upper bound of a course's base rating.
pub const MAX_COURSE_RATING: f64 = 5.0;

//=========================================================================================
// Closed Vocabularies
//=========================================================================================

/// Returned when a free-form string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lowercases and unifies separators so "Hands On", "hands_on" and "hands-on" compare equal.
fn canonical(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            _ => Err(ParseEnumError::new("difficulty", s)),
        }
    }
}

/// How a learner prefers to consume material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearningStyle {
    HandsOn,
    Visual,
    Reading,
    Interactive,
    Collaborative,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::HandsOn => "hands-on",
            LearningStyle::Visual => "visual",
            LearningStyle::Reading => "reading",
            LearningStyle::Interactive => "interactive",
            LearningStyle::Collaborative => "collaborative",
        }
    }
}

impl fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LearningStyle {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "hands-on" | "handson" | "practical" => Ok(LearningStyle::HandsOn),
            "visual" => Ok(LearningStyle::Visual),
            "reading" => Ok(LearningStyle::Reading),
            "interactive" => Ok(LearningStyle::Interactive),
            "collaborative" | "social" => Ok(LearningStyle::Collaborative),
            _ => Err(ParseEnumError::new("learning style", s)),
        }
    }
}

/// How a course is delivered. The catalog is maintained elsewhere, so
/// unrecognised formats map to `Other` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryFormat {
    HandsOn,
    Video,
    Interactive,
    Text,
    Live,
    ProjectBased,
    Other,
}

impl DeliveryFormat {
    pub fn parse(value: &str) -> Self {
        match canonical(value).as_str() {
            "hands-on" | "handson" => DeliveryFormat::HandsOn,
            "video" => DeliveryFormat::Video,
            "interactive" => DeliveryFormat::Interactive,
            "text" | "reading" => DeliveryFormat::Text,
            "live" => DeliveryFormat::Live,
            "project-based" | "project" => DeliveryFormat::ProjectBased,
            _ => DeliveryFormat::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryFormat::HandsOn => "hands-on",
            DeliveryFormat::Video => "video",
            DeliveryFormat::Interactive => "interactive",
            DeliveryFormat::Text => "text",
            DeliveryFormat::Live => "live",
            DeliveryFormat::ProjectBased => "project-based",
            DeliveryFormat::Other => "other",
        }
    }
}

impl fmt::Display for DeliveryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeCommitment {
    Light,
    Moderate,
    Intensive,
}

impl TimeCommitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeCommitment::Light => "light",
            TimeCommitment::Moderate => "moderate",
            TimeCommitment::Intensive => "intensive",
        }
    }
}

impl fmt::Display for TimeCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeCommitment {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match canonical(s).as_str() {
            "light" | "low" => Ok(TimeCommitment::Light),
            "moderate" | "medium" => Ok(TimeCommitment::Moderate),
            "intensive" | "high" => Ok(TimeCommitment::Intensive),
            _ => Err(ParseEnumError::new("time commitment", s)),
        }
    }
}

//=========================================================================================
// Topics
//=========================================================================================

/// Trims and lowercases a topic tag. Blank tags yield `None`.
pub fn normalize_topic(topic: &str) -> Option<String> {
    let normalized = topic.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

pub fn normalize_topics<I, S>(topics: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    topics
        .into_iter()
        .filter_map(|topic| normalize_topic(topic.as_ref()))
        .collect()
}

//=========================================================================================
// Catalog
//=========================================================================================

/// A catalog course. Reference data owned by an external catalog process.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
    /// Base rating in `0..=5`.
    pub rating: f64,
    pub duration: String,
    pub format: DeliveryFormat,
}

impl Course {
    /// The course's topics, normalized and deduplicated.
    pub fn topic_set(&self) -> BTreeSet<String> {
        normalize_topics(&self.topics)
    }
}

/// Criteria for browsing the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseFilter {
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub min_rating: Option<f64>,
    pub limit: usize,
    pub offset: usize,
}

impl Default for CourseFilter {
    fn default() -> Self {
        Self {
            topic: None,
            difficulty: None,
            min_rating: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl CourseFilter {
    /// Whether `course` satisfies every criterion (paging is not applied here).
    pub fn matches(&self, course: &Course) -> bool {
        let topic_ok = match self.topic.as_deref().and_then(normalize_topic) {
            Some(topic) => course.topic_set().contains(&topic),
            None => true,
        };
        let difficulty_ok = self.difficulty.map_or(true, |d| d == course.difficulty);
        let rating_ok = self.min_rating.map_or(true, |min| course.rating >= min);
        topic_ok && difficulty_ok && rating_ok
    }
}

//=========================================================================================
// User Signals
//=========================================================================================

/// Explicit preferences for one user, as an immutable snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPreferenceProfile {
    pub preferred_topics: BTreeSet<String>,
    /// Negative preferences. These win over `preferred_topics` on overlap.
    pub avoided_topics: BTreeSet<String>,
    pub difficulty_level: Option<Difficulty>,
    pub learning_style: Option<LearningStyle>,
    pub time_commitment: Option<TimeCommitment>,
}

impl UserPreferenceProfile {
    pub fn with_preferred_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.preferred_topics = normalize_topics(topics);
        self
    }

    pub fn with_avoided_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.avoided_topics = normalize_topics(topics);
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty_level = Some(difficulty);
        self
    }

    pub fn with_learning_style(mut self, style: LearningStyle) -> Self {
        self.learning_style = Some(style);
        self
    }

    /// Returns a copy with `topics` added to the avoided set.
    pub fn with_extra_avoided<I, S>(&self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut profile = self.clone();
        profile.avoided_topics.extend(normalize_topics(topics));
        profile
    }

    /// No explicit signal at all.
    pub fn is_cold_start(&self) -> bool {
        self.preferred_topics.is_empty()
            && self.avoided_topics.is_empty()
            && self.difficulty_level.is_none()
            && self.learning_style.is_none()
    }
}

/// A partial edit of a preference profile. `None` keeps the current value;
/// `Some(None)` clears an optional setting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceUpdate {
    pub preferred_topics: Option<Vec<String>>,
    pub avoided_topics: Option<Vec<String>>,
    pub difficulty_level: Option<Option<Difficulty>>,
    pub learning_style: Option<Option<LearningStyle>>,
    pub time_commitment: Option<Option<TimeCommitment>>,
}

impl PreferenceUpdate {
    pub fn apply(self, current: &UserPreferenceProfile) -> UserPreferenceProfile {
        UserPreferenceProfile {
            preferred_topics: self
                .preferred_topics
                .map(normalize_topics)
                .unwrap_or_else(|| current.preferred_topics.clone()),
            avoided_topics: self
                .avoided_topics
                .map(normalize_topics)
                .unwrap_or_else(|| current.avoided_topics.clone()),
            difficulty_level: self.difficulty_level.unwrap_or(current.difficulty_level),
            learning_style: self.learning_style.unwrap_or(current.learning_style),
            time_commitment: self.time_commitment.unwrap_or(current.time_commitment),
        }
    }
}

/// A stored rating of one course by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: String,
    /// Topics of the rated course at read time, joined in by the store.
    pub course_topics: Vec<String>,
    /// `1..=5`.
    pub rating: u8,
    pub comment: Option<String>,
    pub learning_style: Option<LearningStyle>,
    pub difficulty_preference: Option<Difficulty>,
    pub created_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn is_negative(&self) -> bool {
        self.rating <= NEGATIVE_RATING_MAX
    }

    pub fn is_positive(&self) -> bool {
        self.rating >= POSITIVE_RATING_MIN
    }
}

/// Feedback as submitted, before the store assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub user_id: Uuid,
    pub course_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub learning_style: Option<LearningStyle>,
    pub difficulty_preference: Option<Difficulty>,
}

//=========================================================================================
// Ranking Inputs and Outputs
//=========================================================================================

/// A course paired with the similarity score of one search, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateCourse {
    pub course: Course,
    /// In `[0, 1]` when present.
    pub similarity: Option<f64>,
}

impl CandidateCourse {
    pub fn new(course: Course) -> Self {
        Self {
            course,
            similarity: None,
        }
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = Some(similarity);
        self
    }
}

/// One entry of a ranking, with the composite score that placed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCourse {
    pub candidate: CandidateCourse,
    pub score: f64,
    /// Preferred topics (explicit or inferred) this course covers, sorted.
    pub matched_topics: Vec<String>,
}

impl RankedCourse {
    pub fn course(&self) -> &Course {
        &self.candidate.course
    }
}

/// Output of a ranking call. Order is rank, best first; ids are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub courses: Vec<RankedCourse>,
    pub rationale: String,
    /// The preference snapshot the ranking was computed against.
    pub preferences: UserPreferenceProfile,
    /// Unique candidates dropped by avoided topics or poorly rated courses.
    pub excluded_count: usize,
}

impl RankedResult {
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn course_ids(&self) -> Vec<&str> {
        self.courses.iter().map(|c| c.course().id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, topics: &[&str], difficulty: Difficulty, rating: f64) -> Course {
        Course {
            id: id.to_string(),
            title: format!("Course {id}"),
            description: String::new(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            difficulty,
            rating,
            duration: "4 weeks".to_string(),
            format: DeliveryFormat::Video,
        }
    }

    #[test]
    fn difficulty_parsing_ignores_case_and_whitespace() {
        assert_eq!("Beginner".parse::<Difficulty>(), Ok(Difficulty::Beginner));
        assert_eq!(" ADVANCED ".parse::<Difficulty>(), Ok(Difficulty::Advanced));
        let err = "expert".parse::<Difficulty>().unwrap_err();
        assert_eq!(err.kind, "difficulty");
        assert_eq!(err.to_string(), "'expert' is not a valid difficulty");
    }

    #[test]
    fn learning_style_accepts_separator_variants() {
        for raw in ["hands-on", "Hands On", "hands_on"] {
            assert_eq!(raw.parse::<LearningStyle>(), Ok(LearningStyle::HandsOn));
        }
        assert!("telepathic".parse::<LearningStyle>().is_err());
    }

    #[test]
    fn unknown_delivery_format_is_other() {
        assert_eq!(DeliveryFormat::parse("Project Based"), DeliveryFormat::ProjectBased);
        assert_eq!(DeliveryFormat::parse("podcast"), DeliveryFormat::Other);
    }

    #[test]
    fn topics_are_normalized_and_blank_tags_dropped() {
        let topics = normalize_topics(["  Python", "python", "", "  ", "Web Dev"]);
        assert_eq!(
            topics.into_iter().collect::<Vec<_>>(),
            vec!["python".to_string(), "web dev".to_string()]
        );
    }

    #[test]
    fn extra_avoided_topics_do_not_touch_the_original_profile() {
        let profile = UserPreferenceProfile::default().with_avoided_topics(["theory"]);
        let widened = profile.with_extra_avoided(["Math"]);
        assert_eq!(profile.avoided_topics.len(), 1);
        assert!(widened.avoided_topics.contains("math"));
        assert!(widened.avoided_topics.contains("theory"));
    }

    #[test]
    fn preference_update_keeps_unset_fields() {
        let current = UserPreferenceProfile::default()
            .with_preferred_topics(["python"])
            .with_difficulty(Difficulty::Beginner);
        let update = PreferenceUpdate {
            avoided_topics: Some(vec!["Theory".to_string()]),
            learning_style: Some(Some(LearningStyle::Visual)),
            ..Default::default()
        };

        let next = update.apply(&current);
        assert!(next.preferred_topics.contains("python"));
        assert!(next.avoided_topics.contains("theory"));
        assert_eq!(next.difficulty_level, Some(Difficulty::Beginner));
        assert_eq!(next.learning_style, Some(LearningStyle::Visual));
    }

    #[test]
    fn preference_update_can_clear_optional_settings() {
        let current = UserPreferenceProfile::default()
            .with_difficulty(Difficulty::Advanced)
            .with_learning_style(LearningStyle::Reading);
        let update = PreferenceUpdate {
            difficulty_level: Some(None),
            ..Default::default()
        };

        let next = update.apply(&current);
        assert_eq!(next.difficulty_level, None);
        assert_eq!(next.learning_style, Some(LearningStyle::Reading));
    }

    #[test]
    fn course_filter_matches_on_all_criteria() {
        let c = course("c1", &["Python", "data"], Difficulty::Intermediate, 4.2);
        assert!(CourseFilter::default().matches(&c));

        let by_topic = CourseFilter {
            topic: Some("PYTHON".to_string()),
            ..Default::default()
        };
        assert!(by_topic.matches(&c));

        let too_strict = CourseFilter {
            topic: Some("python".to_string()),
            min_rating: Some(4.5),
            ..Default::default()
        };
        assert!(!too_strict.matches(&c));

        let wrong_level = CourseFilter {
            difficulty: Some(Difficulty::Beginner),
            ..Default::default()
        };
        assert!(!wrong_level.matches(&c));
    }

    #[test]
    fn cold_start_profile_has_no_signal() {
        assert!(UserPreferenceProfile::default().is_cold_start());
        assert!(!UserPreferenceProfile::default()
            .with_difficulty(Difficulty::Advanced)
            .is_cold_start());
    }
}

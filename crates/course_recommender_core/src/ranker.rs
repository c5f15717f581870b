//! crates/course_recommender_core/src/ranker.rs
//!
//! Hybrid course ranking. Merges vector-search candidates with explicit
//! preferences and feedback history into one deduplicated, ordered list.
//!
//! The ranker is a pure function of its inputs: it performs no I/O, holds
//! no shared state and can be called concurrently without coordination.

use crate::domain::{
    normalize_topics, CandidateCourse, DeliveryFormat, FeedbackRecord, LearningStyle,
    RankedCourse, RankedResult, UserPreferenceProfile, MAX_COURSE_RATING,
};
use crate::query::course_mentions_any;
use crate::rationale::build_rationale;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Checks a requested result count and converts it to a length bound.
pub fn validate_max_results(max_results: i64) -> Result<usize, RankError> {
    if max_results <= 0 {
        return Err(RankError::InvalidArgument(format!(
            "max_results must be positive, got {max_results}"
        )));
    }
    Ok(usize::try_from(max_results).unwrap_or(usize::MAX))
}

//=========================================================================================
// Weights
//=========================================================================================

/// Weights of the composite score terms. Each term lies in `[0, 1]`, so a
/// candidate's score lies in `[0, sum of weights]`. Weights are not normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Vector-search similarity. Default `0.5`.
    pub similarity: f64,
    /// Share of the course's topics that the user prefers. Default `0.3`.
    pub preference_overlap: f64,
    /// Base rating scaled to `[0, 1]`. Default `0.15`.
    pub rating: f64,
    /// Bonus when the course difficulty equals the profile's. Default `0.05`.
    pub difficulty_match: f64,
    /// Fit between learning style and delivery format. Default `0.0` (off).
    pub learning_style: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            similarity: 0.5,
            preference_overlap: 0.3,
            rating: 0.15,
            difficulty_match: 0.05,
            learning_style: 0.0,
        }
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<(), RankError> {
        let named = [
            ("similarity", self.similarity),
            ("preference_overlap", self.preference_overlap),
            ("rating", self.rating),
            ("difficulty_match", self.difficulty_match),
            ("learning_style", self.learning_style),
        ];
        for (name, weight) in named {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RankError::InvalidArgument(format!(
                    "weight '{name}' must be a finite, non-negative number, got {weight}"
                )));
            }
        }
        if named.iter().all(|(_, weight)| *weight == 0.0) {
            return Err(RankError::InvalidArgument(
                "at least one ranking weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//=========================================================================================
// Implicit Signals
//=========================================================================================

/// Preferences inferred from feedback rather than set by the user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImplicitSignals {
    pub avoided_topics: BTreeSet<String>,
    pub preferred_topics: BTreeSet<String>,
    /// Courses whose latest rating was negative.
    pub avoided_courses: BTreeSet<String>,
}

impl ImplicitSignals {
    /// Only the latest record per course counts; a re-rating supersedes older ones.
    pub fn from_feedback(feedback: &[FeedbackRecord]) -> Self {
        let mut latest: HashMap<&str, &FeedbackRecord> = HashMap::new();
        for record in feedback {
            let newer = latest
                .get(record.course_id.as_str())
                .map_or(true, |seen| record.created_at >= seen.created_at);
            if newer {
                latest.insert(record.course_id.as_str(), record);
            }
        }

        let mut signals = Self::default();
        for record in latest.into_values() {
            if record.is_negative() {
                signals
                    .avoided_topics
                    .extend(normalize_topics(&record.course_topics));
                signals.avoided_courses.insert(record.course_id.clone());
            } else if record.is_positive() {
                signals
                    .preferred_topics
                    .extend(normalize_topics(&record.course_topics));
            }
        }
        signals
    }
}

//=========================================================================================
// Ranker
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct Ranker {
    weights: RankingWeights,
}

/// Ranks with [`RankingWeights::default`].
pub fn rank(
    profile: &UserPreferenceProfile,
    feedback: &[FeedbackRecord],
    candidates: Vec<CandidateCourse>,
    max_results: i64,
) -> Result<RankedResult, RankError> {
    Ranker::default().rank(profile, feedback, candidates, max_results)
}

impl Ranker {
    pub fn new(weights: RankingWeights) -> Result<Self, RankError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &RankingWeights {
        &self.weights
    }

    /// Produces at most `max_results` courses, best first.
    ///
    /// Candidates are deduplicated by id (keeping the highest similarity),
    /// anything touching an avoided topic is dropped outright, and the rest
    /// are ordered by composite score, then base rating, then id.
    pub fn rank(
        &self,
        profile: &UserPreferenceProfile,
        feedback: &[FeedbackRecord],
        candidates: Vec<CandidateCourse>,
        max_results: i64,
    ) -> Result<RankedResult, RankError> {
        self.rank_excluding(profile, feedback, candidates, max_results, &BTreeSet::new())
    }

    /// Like [`Ranker::rank`], but also drops every course whose title or
    /// topic tags contain one of `excluded_keywords` as a word.
    pub fn rank_excluding(
        &self,
        profile: &UserPreferenceProfile,
        feedback: &[FeedbackRecord],
        candidates: Vec<CandidateCourse>,
        max_results: i64,
        excluded_keywords: &BTreeSet<String>,
    ) -> Result<RankedResult, RankError> {
        let limit = validate_max_results(max_results)?;
        let implicit = ImplicitSignals::from_feedback(feedback);

        let mut avoided = normalize_topics(&profile.avoided_topics);
        avoided.extend(implicit.avoided_topics.iter().cloned());

        let preferred: BTreeSet<String> = normalize_topics(&profile.preferred_topics)
            .into_iter()
            .chain(implicit.preferred_topics.iter().cloned())
            .filter(|topic| !avoided.contains(topic))
            .collect();

        let unique = dedup_candidates(candidates);
        let unique_count = unique.len();

        let mut ranked: Vec<RankedCourse> = unique
            .into_iter()
            .filter(|c| !c.course.topic_set().iter().any(|t| avoided.contains(t)))
            .filter(|c| !implicit.avoided_courses.contains(&c.course.id))
            .filter(|c| !course_mentions_any(&c.course, excluded_keywords))
            .map(|c| self.score(c, &preferred, profile))
            .collect();
        let excluded_count = unique_count - ranked.len();

        ranked.sort_by(compare_ranked);
        ranked.truncate(limit);

        let rationale = build_rationale(&ranked, profile, excluded_count);
        Ok(RankedResult {
            courses: ranked,
            rationale,
            preferences: profile.clone(),
            excluded_count,
        })
    }

    fn score(
        &self,
        candidate: CandidateCourse,
        preferred: &BTreeSet<String>,
        profile: &UserPreferenceProfile,
    ) -> RankedCourse {
        let course = &candidate.course;
        let topics = course.topic_set();
        let matched_topics: Vec<String> = topics.intersection(preferred).cloned().collect();

        let similarity = candidate.similarity.unwrap_or(0.0);
        let overlap = if topics.is_empty() {
            0.0
        } else {
            matched_topics.len() as f64 / topics.len() as f64
        };
        let rating = normalized_rating(course.rating);
        let difficulty = match profile.difficulty_level {
            Some(level) if level == course.difficulty => 1.0,
            _ => 0.0,
        };
        let style = learning_style_fit(profile.learning_style, course.format);

        let w = &self.weights;
        let score = w.similarity * similarity
            + w.preference_overlap * overlap
            + w.rating * rating
            + w.difficulty_match * difficulty
            + w.learning_style * style;

        RankedCourse {
            candidate,
            score,
            matched_topics,
        }
    }
}

/// Keeps the first occurrence of each id, carrying the best similarity seen.
fn dedup_candidates(candidates: Vec<CandidateCourse>) -> Vec<CandidateCourse> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<CandidateCourse> = Vec::with_capacity(candidates.len());

    for mut candidate in candidates {
        candidate.similarity = sanitize_similarity(candidate.similarity);
        match index.get(&candidate.course.id) {
            Some(&slot) => {
                let kept = &mut unique[slot];
                kept.similarity = match (kept.similarity, candidate.similarity) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
            None => {
                index.insert(candidate.course.id.clone(), unique.len());
                unique.push(candidate);
            }
        }
    }
    unique
}

fn sanitize_similarity(similarity: Option<f64>) -> Option<f64> {
    similarity
        .filter(|s| s.is_finite())
        .map(|s| s.clamp(0.0, 1.0))
}

fn normalized_rating(rating: f64) -> f64 {
    if rating.is_finite() {
        (rating / MAX_COURSE_RATING).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// 1.0 for a direct fit, 0.8 for a compatible format, 0.4 otherwise and
/// 0.5 when either side is unknown.
fn learning_style_fit(style: Option<LearningStyle>, format: DeliveryFormat) -> f64 {
    use DeliveryFormat as F;
    use LearningStyle as S;

    let Some(style) = style else {
        return 0.5;
    };
    match (style, format) {
        (_, F::Other) => 0.5,
        (S::HandsOn, F::HandsOn)
        | (S::Visual, F::Video)
        | (S::Reading, F::Text)
        | (S::Interactive, F::Interactive)
        | (S::Collaborative, F::Live) => 1.0,
        (S::HandsOn, F::ProjectBased | F::Interactive)
        | (S::Interactive, F::HandsOn | F::Live)
        | (S::Visual, F::Interactive) => 0.8,
        _ => 0.4,
    }
}

fn compare_ranked(a: &RankedCourse, b: &RankedCourse) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.course().rating.total_cmp(&a.course().rating))
        .then_with(|| a.course().id.cmp(&b.course().id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Course, Difficulty};
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn course(id: &str, topics: &[&str], rating: f64) -> Course {
        Course {
            id: id.to_string(),
            title: format!("Course {id}"),
            description: String::new(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
            difficulty: Difficulty::Intermediate,
            rating,
            duration: "6 weeks".to_string(),
            format: DeliveryFormat::Video,
        }
    }

    fn candidate(id: &str, topics: &[&str], rating: f64, similarity: Option<f64>) -> CandidateCourse {
        CandidateCourse {
            course: course(id, topics, rating),
            similarity,
        }
    }

    fn feedback(course_id: &str, topics: &[&str], rating: u8, minutes: i64) -> FeedbackRecord {
        FeedbackRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            course_id: course_id.to_string(),
            course_topics: topics.iter().map(|t| t.to_string()).collect(),
            rating,
            comment: None,
            learning_style: None,
            difficulty_preference: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[test]
    fn avoided_topic_is_excluded_regardless_of_similarity() {
        let profile = UserPreferenceProfile::default().with_avoided_topics(["theory"]);
        let candidates = vec![
            candidate("1", &["theory"], 3.0, Some(0.9)),
            candidate("2", &["python"], 4.5, Some(0.4)),
        ];

        let result = rank(&profile, &[], candidates, 5).unwrap();
        assert_eq!(result.course_ids(), vec!["2"]);
        assert_eq!(result.excluded_count, 1);
    }

    #[test]
    fn query_keywords_exclude_multi_word_topics() {
        let intent = crate::QueryIntent::parse("python but not interested in machine learning");
        let profile = UserPreferenceProfile::default().with_extra_avoided(&intent.excluded_topics);
        let candidates = vec![
            candidate("ml", &["machine learning", "python"], 4.8, Some(0.9)),
            candidate("py", &["python"], 4.0, Some(0.5)),
        ];

        let result = Ranker::default()
            .rank_excluding(&profile, &[], candidates, 5, &intent.excluded_topics)
            .unwrap();
        assert_eq!(result.course_ids(), vec!["py"]);
        assert_eq!(result.excluded_count, 1);
    }

    #[test]
    fn low_rating_feedback_excludes_matching_topics() {
        let history = vec![feedback("old-math", &["math"], 1, 0)];
        let candidates = vec![
            candidate("new-math", &["Math", "statistics"], 4.9, Some(0.95)),
            candidate("art", &["drawing"], 3.0, Some(0.2)),
        ];

        let result = rank(&UserPreferenceProfile::default(), &history, candidates, 10).unwrap();
        assert_eq!(result.course_ids(), vec!["art"]);
    }

    #[test]
    fn low_rated_course_without_topics_is_still_excluded() {
        let history = vec![feedback("bare", &[], 2, 0)];
        let candidates = vec![candidate("bare", &[], 5.0, Some(1.0))];

        let result = rank(&UserPreferenceProfile::default(), &history, candidates, 3).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn latest_rating_of_a_course_supersedes_earlier_ones() {
        let history = vec![
            feedback("rust-101", &["rust"], 1, 0),
            feedback("rust-101", &["rust"], 5, 10),
        ];
        let signals = ImplicitSignals::from_feedback(&history);
        assert!(signals.avoided_topics.is_empty());
        assert!(signals.preferred_topics.contains("rust"));

        let reversed: Vec<_> = history.into_iter().rev().collect();
        let signals = ImplicitSignals::from_feedback(&reversed);
        assert!(signals.preferred_topics.contains("rust"));
    }

    #[test]
    fn neutral_ratings_carry_no_signal() {
        let signals = ImplicitSignals::from_feedback(&[feedback("c", &["go"], 3, 0)]);
        assert_eq!(signals, ImplicitSignals::default());
    }

    #[test]
    fn duplicates_keep_the_highest_similarity() {
        let candidates = vec![
            candidate("a", &["python"], 4.0, Some(0.3)),
            candidate("b", &["python"], 4.0, Some(0.5)),
            candidate("a", &["python"], 4.0, Some(0.8)),
            candidate("a", &["python"], 4.0, None),
        ];

        let result = rank(&UserPreferenceProfile::default(), &[], candidates, 10).unwrap();
        assert_eq!(result.course_ids(), vec!["a", "b"]);
        assert_eq!(result.courses[0].candidate.similarity, Some(0.8));
    }

    #[test]
    fn output_is_truncated_to_max_results() {
        let candidates: Vec<_> = (0..8)
            .map(|i| candidate(&format!("c{i}"), &["python"], 3.0, Some(i as f64 / 10.0)))
            .collect();

        let result = rank(&UserPreferenceProfile::default(), &[], candidates, 3).unwrap();
        assert_eq!(result.course_ids(), vec!["c7", "c6", "c5"]);
    }

    #[test]
    fn non_positive_max_results_is_invalid() {
        for bad in [0, -1, i64::MIN] {
            let err = rank(&UserPreferenceProfile::default(), &[], vec![], bad).unwrap_err();
            assert!(matches!(err, RankError::InvalidArgument(_)));
        }
    }

    #[test]
    fn empty_candidates_yield_an_empty_result() {
        let result = rank(&UserPreferenceProfile::default(), &[], vec![], 5).unwrap();
        assert!(result.is_empty());
        assert!(result.rationale.contains("No courses matched"));
    }

    #[test]
    fn ties_break_on_rating_then_id() {
        let weights = RankingWeights {
            similarity: 1.0,
            preference_overlap: 0.0,
            rating: 0.0,
            difficulty_match: 0.0,
            learning_style: 0.0,
        };
        let ranker = Ranker::new(weights).unwrap();
        let candidates = vec![
            candidate("b", &[], 3.0, Some(0.5)),
            candidate("a", &[], 3.0, Some(0.5)),
            candidate("c", &[], 4.0, Some(0.5)),
        ];

        let result = ranker
            .rank(&UserPreferenceProfile::default(), &[], candidates, 10)
            .unwrap();
        assert_eq!(result.course_ids(), vec!["c", "a", "b"]);
    }

    #[test]
    fn ranking_is_deterministic_and_idempotent() {
        let profile = UserPreferenceProfile::default()
            .with_preferred_topics(["python", "data"])
            .with_difficulty(Difficulty::Intermediate);
        let history = vec![feedback("seen", &["data"], 5, 0)];
        let candidates = vec![
            candidate("x", &["python"], 4.0, Some(0.7)),
            candidate("y", &["data", "sql"], 4.5, None),
            candidate("z", &["java"], 2.0, Some(0.9)),
            candidate("x", &["python"], 4.0, Some(0.2)),
        ];

        let first = rank(&profile, &history, candidates.clone(), 10).unwrap();
        let second = rank(&profile, &history, candidates, 10).unwrap();
        assert_eq!(first, second);

        let deduped: Vec<_> = first.courses.iter().map(|c| c.candidate.clone()).collect();
        let again = rank(&profile, &history, deduped, 10).unwrap();
        assert_eq!(again.course_ids(), first.course_ids());
        assert_eq!(again.rationale, first.rationale);
    }

    #[test]
    fn composite_score_uses_the_documented_default_blend() {
        let profile = UserPreferenceProfile::default()
            .with_preferred_topics(["python"])
            .with_difficulty(Difficulty::Intermediate);
        let candidates = vec![candidate("1", &["python", "web"], 4.0, Some(0.6))];

        let result = rank(&profile, &[], candidates, 1).unwrap();
        let expected = 0.5 * 0.6 + 0.3 * 0.5 + 0.15 * (4.0 / 5.0) + 0.05 * 1.0;
        assert!((result.courses[0].score - expected).abs() < 1e-9);
        assert_eq!(result.courses[0].matched_topics, vec!["python".to_string()]);
    }

    #[test]
    fn avoid_wins_over_prefer_for_the_same_topic() {
        let profile = UserPreferenceProfile::default()
            .with_preferred_topics(["python", "theory"])
            .with_avoided_topics(["theory"]);
        let candidates = vec![
            candidate("t", &["theory"], 5.0, Some(1.0)),
            candidate("p", &["python"], 3.0, Some(0.1)),
        ];

        let result = rank(&profile, &[], candidates, 5).unwrap();
        assert_eq!(result.course_ids(), vec!["p"]);
    }

    #[test]
    fn implicit_preferences_boost_overlap() {
        let history = vec![feedback("liked", &["rust"], 5, 0)];
        let candidates = vec![
            candidate("go", &["go"], 4.0, Some(0.5)),
            candidate("rust", &["rust"], 4.0, Some(0.5)),
        ];

        let result = rank(&UserPreferenceProfile::default(), &history, candidates, 5).unwrap();
        assert_eq!(result.course_ids(), vec!["rust", "go"]);
    }

    #[test]
    fn out_of_range_similarity_is_clamped_and_nan_ignored() {
        let weights = RankingWeights {
            similarity: 1.0,
            preference_overlap: 0.0,
            rating: 0.0,
            difficulty_match: 0.0,
            learning_style: 0.0,
        };
        let ranker = Ranker::new(weights).unwrap();
        let candidates = vec![
            candidate("big", &[], 3.0, Some(7.0)),
            candidate("nan", &[], 3.0, Some(f64::NAN)),
        ];

        let result = ranker
            .rank(&UserPreferenceProfile::default(), &[], candidates, 5)
            .unwrap();
        assert_eq!(result.courses[0].score, 1.0);
        assert_eq!(result.courses[1].candidate.similarity, None);
        assert_eq!(result.courses[1].score, 0.0);
    }

    #[test]
    fn learning_style_weight_prefers_matching_formats() {
        let weights = RankingWeights {
            learning_style: 0.2,
            ..RankingWeights::default()
        };
        let ranker = Ranker::new(weights).unwrap();
        let profile = UserPreferenceProfile::default().with_learning_style(LearningStyle::Reading);
        let mut text = candidate("text", &[], 4.0, Some(0.5));
        text.course.format = DeliveryFormat::Text;
        let video = candidate("video", &[], 4.0, Some(0.5));

        let result = ranker.rank(&profile, &[], vec![video, text], 5).unwrap();
        assert_eq!(result.course_ids(), vec!["text", "video"]);
    }

    #[test]
    fn invalid_weights_are_rejected() {
        let negative = RankingWeights {
            rating: -0.1,
            ..RankingWeights::default()
        };
        assert!(Ranker::new(negative).is_err());

        let zero = RankingWeights {
            similarity: 0.0,
            preference_overlap: 0.0,
            rating: 0.0,
            difficulty_match: 0.0,
            learning_style: 0.0,
        };
        assert!(zero.validate().is_err());

        let nan = RankingWeights {
            similarity: f64::NAN,
            ..RankingWeights::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn output_length_is_min_of_limit_and_surviving_candidates() {
        let profile = UserPreferenceProfile::default().with_avoided_topics(["java"]);
        let candidates = vec![
            candidate("a", &["python"], 4.0, None),
            candidate("b", &["java"], 4.0, None),
            candidate("c", &["go"], 4.0, None),
            candidate("a", &["python"], 4.0, None),
        ];

        assert_eq!(rank(&profile, &[], candidates.clone(), 10).unwrap().len(), 2);
        assert_eq!(rank(&profile, &[], candidates, 1).unwrap().len(), 1);
    }
}

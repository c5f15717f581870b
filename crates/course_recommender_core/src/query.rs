//! crates/course_recommender_core/src/query.rs
//!
//! Free-text query analysis: separates what the user asks for from what they
//! explicitly do not want ("python but not django").

use crate::domain::Course;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Used as search text when nothing meaningful is left after cleaning.
pub const FALLBACK_SEARCH_TEXT: &str = "programming software development";

/// Negated keywords shorter than this are ignored.
const MIN_KEYWORD_LEN: usize = 3;

/// Phrases introducing something the user wants to avoid. The capture runs
/// until the next clause punctuation.
const NEGATIVE_PHRASES: &[&str] = &[
    r"(?i)\bdon['’]?t want to learn\s+([^,.!?]+)",
    r"(?i)\bnot interested in\s+([^,.!?]+)",
    r"(?i)\bavoid\s+([^,.!?]+)",
    r"(?i)\bbut not\s+([^,.!?]+)",
    r"(?i)\bexcept\s+([^,.!?]+)",
    r"(?i)\bwithout\s+([^,.!?]+)",
    r"(?i)\bno\s+([^,.!?]+)",
    r"(?i)\bi don['’]?t like\s+([^,.!?]+)",
    r"(?i)\bnot\s+(\w+)",
];

/// Connective words that can appear inside a negated phrase but never name a topic.
const STOP_WORDS: &[&str] = &[
    "and", "any", "the", "for", "about", "with", "more", "courses", "course", "learn",
    "interested", "want", "like", "stuff", "things",
];

fn negative_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        NEGATIVE_PHRASES
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// The parts of a free-text query that matter for ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    pub original: String,
    /// The query with negative phrases removed, for similarity search.
    pub search_text: String,
    /// Lowercased keywords the user asked to avoid.
    pub excluded_topics: BTreeSet<String>,
}

impl QueryIntent {
    pub fn parse(query: &str) -> Self {
        let mut excluded_topics = BTreeSet::new();
        let mut cleaned = query.to_string();

        for pattern in negative_patterns() {
            for captures in pattern.captures_iter(query) {
                if let Some(phrase) = captures.get(1) {
                    excluded_topics.extend(keywords(phrase.as_str()));
                }
            }
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }

        Self {
            original: query.to_string(),
            search_text: tidy(&cleaned),
            excluded_topics,
        }
    }

    pub fn has_exclusions(&self) -> bool {
        !self.excluded_topics.is_empty()
    }

    pub fn excludes(&self, course: &Course) -> bool {
        course_mentions_any(course, &self.excluded_topics)
    }
}

/// Whether any keyword equals a topic tag, a word of a topic tag, or a word
/// of the title. Descriptions are not searched.
pub fn course_mentions_any(course: &Course, keywords: &BTreeSet<String>) -> bool {
    if keywords.is_empty() {
        return false;
    }
    course.topic_set().iter().any(|topic| {
        keywords.contains(topic) || words_of(topic).any(|word| keywords.contains(&word))
    }) || words_of(&course.title).any(|word| keywords.contains(&word))
}

fn words_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

fn keywords(phrase: &str) -> impl Iterator<Item = String> + '_ {
    phrase
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
                .to_lowercase()
        })
        .filter(|word| word.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
}

fn tidy(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed
        .trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
        .to_string();

    if trimmed.chars().count() < MIN_KEYWORD_LEN {
        FALLBACK_SEARCH_TEXT.to_string()
    } else {
        trimmed
    }
}

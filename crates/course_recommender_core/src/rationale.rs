//! crates/course_recommender_core/src/rationale.rs
//!
//! Plain-text explanation of a ranking, assembled deterministically.

use crate::domain::{RankedCourse, UserPreferenceProfile};
use std::collections::BTreeSet;

/// Number of courses named in the explanation.
const NAMED_COURSES: usize = 3;

pub fn build_rationale(
    courses: &[RankedCourse],
    profile: &UserPreferenceProfile,
    excluded_count: usize,
) -> String {
    if courses.is_empty() {
        return empty_rationale(excluded_count);
    }

    let top = &courses[..courses.len().min(NAMED_COURSES)];
    let titles: Vec<&str> = top.iter().map(|c| c.course().title.as_str()).collect();
    let mut text = if titles.len() == 1 {
        format!("Top pick: {}.", titles[0])
    } else {
        format!("Top picks: {}.", join_list(&titles))
    };

    let matched: BTreeSet<&str> = top
        .iter()
        .flat_map(|c| c.matched_topics.iter().map(String::as_str))
        .collect();
    if !matched.is_empty() {
        let matched: Vec<&str> = matched.into_iter().collect();
        text.push_str(&format!(" Matches your interest in {}.", join_list(&matched)));
    }

    if let Some(level) = profile.difficulty_level {
        let aligned = top
            .iter()
            .filter(|c| c.course().difficulty == level)
            .count();
        text.push_str(&format!(
            " {aligned} of {} match your {level} level.",
            top.len()
        ));
    }

    let average = courses.iter().map(|c| c.course().rating).sum::<f64>() / courses.len() as f64;
    text.push_str(&format!(" Average rating: {average:.1}/5."));
    text
}

fn empty_rationale(excluded_count: usize) -> String {
    let mut text = String::from("No courses matched your preferences.");
    match excluded_count {
        0 => {}
        1 => text.push_str(
            " 1 candidate was left out because of topics you avoid or courses you rated poorly.",
        ),
        n => text.push_str(&format!(
            " {n} candidates were left out because of topics you avoid or courses you rated poorly."
        )),
    }
    text
}

/// "a", "a and b", "a, b and c".
fn join_list(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

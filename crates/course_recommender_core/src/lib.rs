pub mod domain;
pub mod ports;
pub mod query;
pub mod rationale;
pub mod ranker;

pub use domain::{
    CandidateCourse, Course, CourseFilter, DeliveryFormat, Difficulty, FeedbackRecord,
    LearningStyle, NewFeedback, ParseEnumError, PreferenceUpdate, RankedCourse, RankedResult,
    TimeCommitment, UserPreferenceProfile,
};
pub use ports::{CatalogStore, PortError, PortResult, VectorSearchService};
pub use query::QueryIntent;
pub use ranker::{rank, validate_max_results, RankError, Ranker, RankingWeights};

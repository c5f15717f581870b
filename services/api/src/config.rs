//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use course_recommender_core::RankingWeights;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub vector_search_url: String,
    pub vector_search_api_key: Option<String>,
    pub vector_search_class: String,
    pub vector_search_timeout: Duration,
    /// Minimum number of hits requested from each vector search.
    pub search_limit: usize,
    /// Similarity floor passed to the vector search, in `[0, 1]`.
    pub min_similarity: f64,
    pub default_max_results: i64,
    pub ranking_weights: RankingWeights,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address: SocketAddr = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Vector Search Settings ---
        let vector_search_url = lookup("VECTOR_SEARCH_URL")
            .unwrap_or_else(|| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();
        let vector_search_api_key = lookup("VECTOR_SEARCH_API_KEY").filter(|k| !k.is_empty());
        let vector_search_class =
            lookup("VECTOR_SEARCH_CLASS").unwrap_or_else(|| "Course".to_string());
        let timeout_ms: u64 = parse_or(&lookup, "VECTOR_SEARCH_TIMEOUT_MS", "5000")?;

        // --- Recommendation Settings ---
        let search_limit: usize = parse_or(&lookup, "SEARCH_LIMIT", "15")?;
        let min_similarity: f64 = parse_or(&lookup, "MIN_SIMILARITY", "0.4")?;
        if !(0.0..=1.0).contains(&min_similarity) {
            return Err(ConfigError::InvalidValue(
                "MIN_SIMILARITY".to_string(),
                format!("{min_similarity} is outside [0, 1]"),
            ));
        }
        let default_max_results: i64 = parse_or(&lookup, "DEFAULT_MAX_RESULTS", "10")?;
        if default_max_results <= 0 {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_MAX_RESULTS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let defaults = RankingWeights::default();
        let ranking_weights = RankingWeights {
            similarity: parse_or(&lookup, "RANK_WEIGHT_SIMILARITY", defaults.similarity)?,
            preference_overlap: parse_or(
                &lookup,
                "RANK_WEIGHT_PREFERENCE",
                defaults.preference_overlap,
            )?,
            rating: parse_or(&lookup, "RANK_WEIGHT_RATING", defaults.rating)?,
            difficulty_match: parse_or(
                &lookup,
                "RANK_WEIGHT_DIFFICULTY",
                defaults.difficulty_match,
            )?,
            learning_style: parse_or(
                &lookup,
                "RANK_WEIGHT_LEARNING_STYLE",
                defaults.learning_style,
            )?,
        };
        ranking_weights
            .validate()
            .map_err(|e| ConfigError::InvalidValue("RANK_WEIGHT_*".to_string(), e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            vector_search_url,
            vector_search_api_key,
            vector_search_class,
            vector_search_timeout: Duration::from_millis(timeout_ms),
            search_limit,
            min_similarity,
            default_max_results,
            ranking_weights,
        })
    }
}

/// Parses `key` when set, otherwise falls back to `default`.
fn parse_or<F, T, D>(lookup: &F, key: &str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
    D: ToString,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, WeaviateSearchAdapter},
    config::Config,
    error::ApiError,
    service::{RecommendationService, SearchSettings},
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::Router;
use course_recommender_core::Ranker;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let vector_search = Arc::new(WeaviateSearchAdapter::new(
        config.vector_search_url.clone(),
        config.vector_search_class.clone(),
        config.vector_search_api_key.clone(),
        config.vector_search_timeout,
    )?);

    let ranker = Ranker::new(config.ranking_weights)?;
    let service = RecommendationService::new(
        db_adapter,
        vector_search,
        ranker,
        SearchSettings {
            search_limit: config.search_limit,
            min_similarity: config.min_similarity,
        },
    );
    if !service.vector_search_ready().await {
        warn!(
            "Vector search at {} is not ready; recommendations fall back to the catalog",
            config.vector_search_url
        );
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        service: Arc::new(service),
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .merge(router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

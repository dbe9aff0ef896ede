pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod routes;
pub mod services;
pub mod sources;

use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sources::ExternalSources;

/// Shared application state passed to all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: config::AppConfig,
    pub sources: ExternalSources,
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/match", post(routes::matching::match_items))
        .route("/catalog/products", post(routes::catalog::save_products))
        .route("/prices/aggregate", post(routes::prices::aggregate))
        .route("/lists/{id}/compare", get(routes::lists::compare))
        .route("/products/{id}/enrich", post(routes::products::enrich))
        .route("/products/{id}/trends", get(routes::products::price_trends));

    Router::new()
        .route("/health/live", get(routes::health::live))
        .nest("/api/v1", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

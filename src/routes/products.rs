//! Product routes: enrichment and price trends.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::services::enrichment;
use crate::services::trends::{self, PriceTrendPoint, DEFAULT_TREND_DAYS};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct EnrichOutcome {
    pub enriched: bool,
}

/// POST /api/v1/products/{id}/enrich — pull attributes from the open
/// product database. `enriched: false` covers missing UPC and lookup misses.
pub async fn enrich(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ApiResponse<EnrichOutcome>>, AppError> {
    let enriched =
        enrichment::enrich_product_data(&state.db, state.sources.product_data.as_ref(), product_id)
            .await?;
    Ok(ApiResponse::success(EnrichOutcome { enriched }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrendParams {
    #[validate(range(min = 1, max = 365, message = "days must be between 1 and 365"))]
    pub days: Option<i64>,
}

/// GET /api/v1/products/{id}/trends?days=30 — per-day price statistics.
pub async fn price_trends(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(params): Query<TrendParams>,
) -> Result<Json<ApiResponse<Vec<PriceTrendPoint>>>, AppError> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let days = params.days.unwrap_or(DEFAULT_TREND_DAYS);
    let points = trends::get_price_trends(&state.db, product_id, days).await?;
    Ok(ApiResponse::success(points))
}

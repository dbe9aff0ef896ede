//! Matching routes: resolve free-text items against the local catalog.

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::services::matcher::{self, MatchOptions, MatchOutcome};
use crate::AppState;

/// Request body for a match run.
#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    #[validate(length(min = 1, message = "items must not be empty"))]
    pub items: Vec<String>,
    pub min_confidence: Option<f32>,
    pub store_id: Option<Uuid>,
}

/// POST /api/v1/match — resolve free-text items to catalog products.
pub async fn match_items(
    State(state): State<AppState>,
    Json(body): Json<MatchRequest>,
) -> Result<Json<ApiResponse<MatchOutcome>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let options = MatchOptions {
        min_confidence: body.min_confidence,
        store_id: body.store_id,
    };
    let outcome = matcher::find_local_product_matches(&state.db, &body.items, &options).await;
    Ok(ApiResponse::success(outcome))
}

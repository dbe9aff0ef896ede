//! Shopping-list routes: store-by-store cost comparison.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::{ApiResponse, AppError};
use crate::services::aggregator::{self, ListComparison};
use crate::AppState;

/// GET /api/v1/lists/{id}/compare — cheapest-store recommendation.
pub async fn compare(
    State(state): State<AppState>,
    Path(list_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ListComparison>>, AppError> {
    let comparison =
        aggregator::compare_shopping_list(&state.db, &state.sources, list_id).await?;
    Ok(ApiResponse::success(comparison))
}

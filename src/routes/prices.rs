//! Price routes: multi-source aggregation for a batch of products.

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::services::aggregator::{self, PriceReport};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AggregateRequest {
    #[validate(length(min = 1, message = "product_ids must not be empty"))]
    pub product_ids: Vec<Uuid>,
}

/// POST /api/v1/prices/aggregate — aggregated prices per product.
pub async fn aggregate(
    State(state): State<AppState>,
    Json(body): Json<AggregateRequest>,
) -> Result<Json<ApiResponse<PriceReport>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let report =
        aggregator::get_aggregated_prices(&state.db, &state.sources, &body.product_ids).await;
    Ok(ApiResponse::success(report))
}

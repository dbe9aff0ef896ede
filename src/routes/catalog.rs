//! Catalog routes: bulk save of normalized products from external sources.

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::errors::{ApiResponse, AppError};
use crate::services::matcher::{self, CatalogSaveResult, NormalizedProduct};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CatalogSaveRequest {
    #[validate(length(min = 1, message = "products must not be empty"))]
    pub products: Vec<NormalizedProduct>,
}

/// POST /api/v1/catalog/products — save normalized products to the catalog.
pub async fn save_products(
    State(state): State<AppState>,
    Json(body): Json<CatalogSaveRequest>,
) -> Result<Json<ApiResponse<CatalogSaveResult>>, AppError> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let result = matcher::save_products_to_catalog(&state.db, &body.products).await;
    Ok(ApiResponse::success(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::price::PriceSourceTag;

    #[test]
    fn empty_products_fail_validation() {
        let body: CatalogSaveRequest = serde_json::from_str(r#"{ "products": [] }"#).unwrap();
        let err = body.validate().unwrap_err();
        assert!(err.to_string().contains("products must not be empty"));
    }

    #[test]
    fn minimal_record_deserializes_with_default_source() {
        let body: CatalogSaveRequest =
            serde_json::from_str(r#"{ "products": [{ "name": "Bananas" }] }"#).unwrap();
        assert!(body.validate().is_ok());

        let record = &body.products[0];
        assert_eq!(record.name, "Bananas");
        assert_eq!(record.source, PriceSourceTag::Crowdsourced);
        // Records echo back into error reports, so they must serialize.
        let json = serde_json::to_value(record).unwrap();
        assert_eq!(json["source"], "crowdsourced");
    }
}

//! Catalog product model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog product. Name is always present; UPC and brand may be null.
///
/// Created by seeding or by catalog saves when a new item is discovered
/// from an external source. Never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub upc: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub nutrition: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product attributes carried into derived match/aggregation results.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub upc: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
}

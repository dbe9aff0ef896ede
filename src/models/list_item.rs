//! Shopping list item model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One line of a shopping list: the user's raw text plus an optional
/// resolved catalog product. Quantity defaults to 1 when absent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub raw_text: String,
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl ListItem {
    /// Effective quantity for cost math.
    pub fn effective_quantity(&self) -> i32 {
        self.quantity.unwrap_or(1).max(1)
    }
}

//! Price observation source tagging.

use serde::{Deserialize, Serialize};

/// Origin of a price observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "price_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceTag {
    Crowdsourced,
    GrocerApi,
    ShelfScan,
}

//! External catalog source adapters.
//!
//! Each provider's raw JSON is mapped into the normalized [`ExternalPrice`]
//! shape at the boundary, so schema drift in any one provider stays inside
//! its adapter.

pub mod grocer_api;
pub mod open_product;
pub mod shelfscan;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::models::price::PriceSourceTag;

/// A normalized price observation from an external catalog source.
#[derive(Debug, Clone)]
pub struct ExternalPrice {
    /// Synthetic store key, namespaced per provider (e.g. `grocer-api:42`).
    pub store_key: String,
    pub store_name: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

/// Capability boundary for an external price provider.
#[async_trait]
pub trait ExternalPriceSource: Send + Sync {
    /// Whether credentials for this source are present.
    fn is_configured(&self) -> bool;

    /// Source tag recorded on merged observations.
    fn source_tag(&self) -> PriceSourceTag;

    /// Trust assigned to this source's observations.
    fn confidence(&self) -> f32;

    /// Look up prices by UPC.
    async fn fetch_by_upc(&self, upc: &str) -> anyhow::Result<Vec<ExternalPrice>>;

    /// Search prices by product name, capped at `limit` results.
    async fn search_by_name(&self, query: &str, limit: usize)
        -> anyhow::Result<Vec<ExternalPrice>>;
}

/// Normalized product attributes from the open product database.
#[derive(Debug, Clone, Default)]
pub struct ProductFacts {
    pub brand: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub nutrition: Option<serde_json::Value>,
}

/// UPC-keyed product attribute lookup, used only by enrichment.
#[async_trait]
pub trait ProductDataSource: Send + Sync {
    fn is_configured(&self) -> bool;

    /// Fetch attributes for a UPC. `Ok(None)` means the UPC is unknown.
    async fn fetch_facts(&self, upc: &str) -> anyhow::Result<Option<ProductFacts>>;
}

/// Handles to all external sources, shared across requests.
#[derive(Clone)]
pub struct ExternalSources {
    pub grocer: Arc<dyn ExternalPriceSource>,
    pub shelfscan: Arc<dyn ExternalPriceSource>,
    pub product_data: Arc<dyn ProductDataSource>,
}

impl ExternalSources {
    /// Build adapters from config. Missing credentials leave a source
    /// constructed but unconfigured.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = reqwest::Client::new();
        Self {
            grocer: Arc::new(grocer_api::GrocerApi::new(
                client.clone(),
                config.grocer_api_url.clone(),
                config.grocer_api_key.clone(),
            )),
            shelfscan: Arc::new(shelfscan::ShelfScanApi::new(
                client.clone(),
                config.shelfscan_api_url.clone(),
                config.shelfscan_api_key.clone(),
            )),
            product_data: Arc::new(open_product::OpenProductData::new(
                client,
                config.open_product_api_url.clone(),
            )),
        }
    }
}

//! Adapter for the open product database (UPC-keyed enrichment).

use async_trait::async_trait;
use serde_json::Value;

use super::{ProductDataSource, ProductFacts};

const DEFAULT_BASE_URL: &str = "https://world.openfoodfacts.org";

pub struct OpenProductData {
    client: reqwest::Client,
    base_url: String,
}

impl OpenProductData {
    pub fn new(client: reqwest::Client, base_url: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl ProductDataSource for OpenProductData {
    fn is_configured(&self) -> bool {
        // Public database, no credentials required.
        true
    }

    async fn fetch_facts(&self, upc: &str) -> anyhow::Result<Option<ProductFacts>> {
        let url = format!("{}/api/v2/product/{upc}.json", self.base_url);
        let raw: Value = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(map_payload(&raw))
    }
}

/// Map a raw open-product-database payload into normalized facts.
///
/// `status != 1` means the UPC is unknown to the database.
fn map_payload(raw: &Value) -> Option<ProductFacts> {
    if raw.get("status").and_then(Value::as_i64) != Some(1) {
        return None;
    }
    let product = raw.get("product")?;

    let text = |key: &str| {
        product
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Some(ProductFacts {
        brand: text("brands"),
        category: text("categories"),
        size: text("quantity"),
        image_url: text("image_url"),
        nutrition: product.get("nutriments").cloned(),
    })
}

//! Adapter for the GrocerAPI catalog (UPC-keyed lookup).
//!
//! Raw responses use a `price.regular` / `price.sale` shape; they are
//! mapped into [`ExternalPrice`] here and nowhere else.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{ExternalPrice, ExternalPriceSource};
use crate::models::price::PriceSourceTag;

pub struct GrocerApi {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl GrocerApi {
    pub fn new(client: reqwest::Client, base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GrocerAPI is not configured"))?;
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GrocerAPI is not configured"))?;

        let response = self
            .client
            .get(format!("{base}{path}"))
            .header("X-Api-Key", key)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExternalPriceSource for GrocerApi {
    fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    fn source_tag(&self) -> PriceSourceTag {
        PriceSourceTag::GrocerApi
    }

    fn confidence(&self) -> f32 {
        1.0
    }

    async fn fetch_by_upc(&self, upc: &str) -> anyhow::Result<Vec<ExternalPrice>> {
        let raw = self.get("/v1/products", &[("upc", upc)]).await?;
        Ok(map_payload(&raw, usize::MAX))
    }

    async fn search_by_name(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ExternalPrice>> {
        let raw = self.get("/v1/products/search", &[("q", query)]).await?;
        Ok(map_payload(&raw, limit))
    }
}

/// Map a raw GrocerAPI payload into normalized prices.
///
/// Entries without a usable regular price are skipped.
fn map_payload(raw: &Value, limit: usize) -> Vec<ExternalPrice> {
    let Some(items) = raw.get("products").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(map_entry)
        .take(limit)
        .collect()
}

fn map_entry(entry: &Value) -> Option<ExternalPrice> {
    let price = entry.pointer("/price/regular")?.as_f64()?;
    let sale_price = entry.pointer("/price/sale").and_then(Value::as_f64);

    let store_id = entry
        .pointer("/store/id")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let store_name = entry
        .pointer("/store/name")
        .and_then(Value::as_str)
        .unwrap_or("GrocerAPI")
        .to_string();

    Some(ExternalPrice {
        store_key: format!("grocer-api:{store_id}"),
        store_name,
        price,
        sale_price,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_regular_and_sale_price() {
        let raw = json!({
            "products": [
                {
                    "upc": "0001111041700",
                    "store": { "id": "42", "name": "Midtown Market" },
                    "price": { "regular": 3.99, "sale": 3.49 }
                }
            ]
        });

        let prices = map_payload(&raw, usize::MAX);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].store_key, "grocer-api:42");
        assert_eq!(prices[0].store_name, "Midtown Market");
        assert_eq!(prices[0].price, 3.99);
        assert_eq!(prices[0].sale_price, Some(3.49));
    }

    #[test]
    fn skips_entries_without_regular_price() {
        let raw = json!({
            "products": [
                { "store": { "id": "1", "name": "A" }, "price": { "sale": 1.99 } },
                { "store": { "id": "2", "name": "B" }, "price": { "regular": 2.50 } }
            ]
        });

        let prices = map_payload(&raw, usize::MAX);
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].store_key, "grocer-api:2");
        assert_eq!(prices[0].sale_price, None);
    }

    #[test]
    fn empty_payload_maps_to_nothing() {
        assert!(map_payload(&json!({}), usize::MAX).is_empty());
        assert!(map_payload(&json!({ "products": [] }), usize::MAX).is_empty());
    }

    #[test]
    fn unconfigured_without_credentials() {
        let api = GrocerApi::new(reqwest::Client::new(), None, None);
        assert!(!api.is_configured());

        let api = GrocerApi::new(
            reqwest::Client::new(),
            Some("https://api.example.com".into()),
            Some("key".into()),
        );
        assert!(api.is_configured());
        assert_eq!(api.confidence(), 1.0);
    }
}

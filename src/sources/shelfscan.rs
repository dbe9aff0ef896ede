//! Adapter for the ShelfScan catalog (name-search lookup).
//!
//! Same `price.regular` / `price.sale` shape as GrocerAPI, different
//! envelope. Search results are capped by the caller to conserve quota.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{ExternalPrice, ExternalPriceSource};
use crate::models::price::PriceSourceTag;

pub struct ShelfScanApi {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl ShelfScanApi {
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
            .ok_or_else(|| anyhow::anyhow!("ShelfScan is not configured"))?;
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("ShelfScan is not configured"))?;

        let response = self
            .client
            .get(format!("{base}{path}"))
            .bearer_auth(key)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExternalPriceSource for ShelfScanApi {
    fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    fn source_tag(&self) -> PriceSourceTag {
        PriceSourceTag::ShelfScan
    }

    fn confidence(&self) -> f32 {
        0.9
    }

    async fn fetch_by_upc(&self, upc: &str) -> anyhow::Result<Vec<ExternalPrice>> {
        let raw = self.get("/lookup", &[("upc", upc)]).await?;
        Ok(map_payload(&raw, usize::MAX))
    }

    async fn search_by_name(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ExternalPrice>> {
        let limit_param = limit.to_string();
        let raw = self
            .get("/search", &[("q", query), ("limit", &limit_param)])
            .await?;
        Ok(map_payload(&raw, limit))
    }
}

/// Map a raw ShelfScan payload into normalized prices, capped at `limit`.
fn map_payload(raw: &Value, limit: usize) -> Vec<ExternalPrice> {
    let Some(items) = raw.get("results").and_then(Value::as_array) else {
        return Vec::new();
    };

    items.iter().filter_map(map_entry).take(limit).collect()
}

fn map_entry(entry: &Value) -> Option<ExternalPrice> {
    let price = entry.pointer("/price/regular")?.as_f64()?;
    let sale_price = entry.pointer("/price/sale").and_then(Value::as_f64);

    let store_id = entry
        .pointer("/retailer/id")
        .and_then(Value::as_str)
        .unwrap_or("default");
    let store_name = entry
        .pointer("/retailer/name")
        .and_then(Value::as_str)
        .unwrap_or("ShelfScan")
        .to_string();

    Some(ExternalPrice {
        store_key: format!("shelfscan:{store_id}"),
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

    fn result_entry(id: &str, price: f64) -> Value {
        json!({
            "retailer": { "id": id, "name": format!("Store {id}") },
            "price": { "regular": price }
        })
    }

    #[test]
    fn caps_results_at_limit() {
        let raw = json!({
            "results": [
                result_entry("1", 1.0),
                result_entry("2", 2.0),
                result_entry("3", 3.0),
                result_entry("4", 4.0),
                result_entry("5", 5.0)
            ]
        });

        let prices = map_payload(&raw, 3);
        assert_eq!(prices.len(), 3);
        assert_eq!(prices[0].store_key, "shelfscan:1");
        assert_eq!(prices[2].store_key, "shelfscan:3");
    }

    #[test]
    fn maps_sale_price_when_present() {
        let raw = json!({
            "results": [{
                "retailer": { "id": "9", "name": "Corner Bodega" },
                "price": { "regular": 4.29, "sale": 3.99 }
            }]
        });

        let prices = map_payload(&raw, usize::MAX);
        assert_eq!(prices[0].sale_price, Some(3.99));
        assert_eq!(prices[0].store_name, "Corner Bodega");
    }

    #[test]
    fn source_trust_is_search_grade() {
        let api = ShelfScanApi::new(reqwest::Client::new(), None, None);
        assert!(!api.is_configured());
        assert_eq!(api.confidence(), 0.9);
        assert_eq!(api.source_tag(), PriceSourceTag::ShelfScan);
    }
}

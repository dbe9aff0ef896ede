//! Multi-source price aggregation and shopping-list comparison.
//!
//! Products are processed sequentially; one product's failure never fails
//! the others. External sources degrade gracefully to local-only data.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::list_item::ListItem;
use crate::models::price::PriceSourceTag;
use crate::models::product::ProductSummary;
use crate::sources::{ExternalPrice, ExternalSources};

/// Name-search results taken per product, to conserve provider quota.
const SEARCH_RESULT_CAP: usize = 3;

/// Ranked stores returned alongside the recommendation.
const ALTERNATIVE_STORE_COUNT: usize = 4;

/// Coarse classification of an aggregated price by independent store sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

impl DataQuality {
    /// `high` at 5+ store sources, `medium` at 2-4, `low` below 2.
    pub fn from_source_count(count: usize) -> Self {
        if count >= 5 {
            Self::High
        } else if count >= 2 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// One store's current price for a product, local or external.
#[derive(Debug, Clone, Serialize)]
pub struct StorePrice {
    /// Local store UUID as a string, or a provider-namespaced synthetic key.
    pub store_key: String,
    pub store_name: String,
    pub price: f64,
    pub sale_price: Option<f64>,
    pub on_sale: bool,
    pub source: PriceSourceTag,
    pub confidence: f32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// A product with all current per-store observations and comparison stats.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedPrice {
    pub product: ProductSummary,
    pub store_prices: Vec<StorePrice>,
    pub lowest_price: f64,
    pub average_price: f64,
    pub price_range: PriceRange,
    pub data_quality: DataQuality,
    pub last_updated: DateTime<Utc>,
}

/// Aggregation result distinguishing found products from unknown ids, so
/// callers can reconcile input and output lengths.
#[derive(Debug, Serialize)]
pub struct PriceReport {
    pub prices: Vec<AggregatedPrice>,
    pub not_found: Vec<Uuid>,
}

/// Aggregate prices for a batch of product ids.
///
/// Each product is processed independently; lookup failures land in
/// `not_found` and are logged, never raised.
pub async fn get_aggregated_prices(
    pool: &PgPool,
    sources: &ExternalSources,
    product_ids: &[Uuid],
) -> PriceReport {
    let mut prices = Vec::new();
    let mut not_found = Vec::new();

    for &product_id in product_ids {
        match aggregate_product(pool, sources, product_id).await {
            Ok(Some(aggregated)) => prices.push(aggregated),
            Ok(None) => {
                tracing::warn!(%product_id, "Product not found, skipping aggregation");
                not_found.push(product_id);
            }
            Err(e) => {
                tracing::error!(%product_id, error = %e, "Price aggregation failed for product");
                not_found.push(product_id);
            }
        }
    }

    PriceReport { prices, not_found }
}

/// Run the per-product pipeline: local prices, then configured external
/// sources, then summary stats.
async fn aggregate_product(
    pool: &PgPool,
    sources: &ExternalSources,
    product_id: Uuid,
) -> Result<Option<AggregatedPrice>, AppError> {
    let Some(product) = fetch_product(pool, product_id).await? else {
        return Ok(None);
    };

    let mut entries = fetch_local_prices(pool, product_id).await?;
    merge_from_sources(&mut entries, &product, sources).await;

    Ok(Some(summarize(product, entries, Utc::now())))
}

/// Merge observations from configured external sources into the entries.
///
/// A provider failure is logged and leaves the existing entries intact, so
/// aggregation degrades to local-only data.
async fn merge_from_sources(
    entries: &mut Vec<StorePrice>,
    product: &ProductSummary,
    sources: &ExternalSources,
) {
    if sources.grocer.is_configured() {
        if let Some(upc) = &product.upc {
            match sources.grocer.fetch_by_upc(upc).await {
                Ok(external) => merge_external(
                    entries,
                    external,
                    sources.grocer.source_tag(),
                    sources.grocer.confidence(),
                ),
                Err(e) => {
                    tracing::warn!(product_id = %product.id, error = %e, "GrocerAPI lookup failed, keeping local prices only");
                }
            }
        }
    }

    if sources.shelfscan.is_configured() {
        match sources
            .shelfscan
            .search_by_name(&product.name, SEARCH_RESULT_CAP)
            .await
        {
            Ok(external) => merge_external(
                entries,
                external,
                sources.shelfscan.source_tag(),
                sources.shelfscan.confidence(),
            ),
            Err(e) => {
                tracing::warn!(product_id = %product.id, error = %e, "ShelfScan search failed, keeping local prices only");
            }
        }
    }
}

async fn fetch_product(pool: &PgPool, product_id: Uuid) -> Result<Option<ProductSummary>, AppError> {
    let product = sqlx::query_as::<_, ProductSummary>(
        "SELECT id, name, brand, upc, size, image_url FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await?;
    Ok(product)
}

#[derive(Debug, FromRow)]
struct LocalPriceRow {
    store_id: Uuid,
    store_name: String,
    price: f64,
    sale_price: Option<f64>,
    source: PriceSourceTag,
    confidence: f32,
    observed_at: DateTime<Utc>,
}

/// Fetch non-expired local prices newest-first and keep one entry per store
/// (the newest wins).
async fn fetch_local_prices(pool: &PgPool, product_id: Uuid) -> Result<Vec<StorePrice>, AppError> {
    let rows = sqlx::query_as::<_, LocalPriceRow>(
        r#"
        SELECT pr.store_id, s.name AS store_name, pr.price, pr.sale_price,
               pr.source, pr.confidence, pr.observed_at
        FROM prices pr
        JOIN stores s ON s.id = pr.store_id
        WHERE pr.product_id = $1
          AND (pr.expires_at IS NULL OR pr.expires_at > NOW())
        ORDER BY pr.observed_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for row in rows {
        if !seen.insert(row.store_id) {
            continue;
        }
        entries.push(StorePrice {
            store_key: row.store_id.to_string(),
            store_name: row.store_name,
            price: row.price,
            sale_price: row.sale_price,
            on_sale: row.sale_price.is_some(),
            source: row.source,
            confidence: row.confidence,
            last_updated: row.observed_at,
        });
    }
    Ok(entries)
}

/// Merge external observations into the per-store entries, skipping store
/// keys that already have a price.
pub fn merge_external(
    entries: &mut Vec<StorePrice>,
    external: Vec<ExternalPrice>,
    source: PriceSourceTag,
    confidence: f32,
) {
    let mut seen: HashSet<String> = entries.iter().map(|e| e.store_key.clone()).collect();

    for price in external {
        if !seen.insert(price.store_key.clone()) {
            continue;
        }
        entries.push(StorePrice {
            store_key: price.store_key,
            store_name: price.store_name,
            price: price.price,
            sale_price: price.sale_price,
            on_sale: price.sale_price.is_some(),
            source,
            confidence,
            last_updated: price.fetched_at,
        });
    }
}

/// Compute comparison statistics over the merged per-store entries.
///
/// The lowest price keeps the first minimum in encounter order;
/// `last_updated` falls back to `now` when there are no sources.
pub fn summarize(
    product: ProductSummary,
    store_prices: Vec<StorePrice>,
    now: DateTime<Utc>,
) -> AggregatedPrice {
    let data_quality = DataQuality::from_source_count(store_prices.len());

    if store_prices.is_empty() {
        return AggregatedPrice {
            product,
            store_prices,
            lowest_price: 0.0,
            average_price: 0.0,
            price_range: PriceRange { min: 0.0, max: 0.0 },
            data_quality,
            last_updated: now,
        };
    }

    let mut lowest = store_prices[0].price;
    let mut min = store_prices[0].price;
    let mut max = store_prices[0].price;
    let mut sum = 0.0;
    let mut last_updated = store_prices[0].last_updated;

    for entry in &store_prices {
        // Strict comparison keeps the first minimum on ties.
        if entry.price < lowest {
            lowest = entry.price;
        }
        min = min.min(entry.price);
        max = max.max(entry.price);
        sum += entry.price;
        if entry.last_updated > last_updated {
            last_updated = entry.last_updated;
        }
    }

    let average = sum / store_prices.len() as f64;

    AggregatedPrice {
        product,
        lowest_price: lowest,
        average_price: average,
        price_range: PriceRange { min, max },
        data_quality,
        last_updated,
        store_prices,
    }
}

// -- Shopping-list comparison --

/// A store's accumulated basket cost over a shopping list.
#[derive(Debug, Clone, Serialize)]
pub struct StoreTotal {
    pub store_key: String,
    pub store_name: String,
    pub total: f64,
    pub items_found: usize,
    pub missing_items: usize,
}

/// Store-by-store cost comparison for a shopping list.
#[derive(Debug, Serialize)]
pub struct ListComparison {
    pub list_id: Uuid,
    pub total_items: usize,
    pub recommended_store: Option<StoreTotal>,
    pub alternative_stores: Vec<StoreTotal>,
    pub store_rankings: Vec<StoreTotal>,
    pub total_potential_savings: f64,
}

/// Compare the total cost of a shopping list across all observed stores.
///
/// The initial list fetch is the one propagated error; downstream
/// per-product issues degrade silently.
pub async fn compare_shopping_list(
    pool: &PgPool,
    sources: &ExternalSources,
    list_id: Uuid,
) -> Result<ListComparison, AppError> {
    let items = fetch_list_items(pool, list_id).await?;
    let total_items = items.len();

    let mut accum: HashMap<String, StoreTotal> = HashMap::new();

    for item in &items {
        let Some(product_id) = item.product_id else {
            // Unresolved items still count toward missing-item math.
            continue;
        };
        let quantity = item.effective_quantity() as f64;

        let aggregated = match aggregate_product(pool, sources, product_id).await {
            Ok(Some(aggregated)) => aggregated,
            Ok(None) => {
                tracing::warn!(%list_id, %product_id, "List item product missing, skipping");
                continue;
            }
            Err(e) => {
                tracing::error!(%list_id, %product_id, error = %e, "List item aggregation failed, skipping");
                continue;
            }
        };

        for store_price in &aggregated.store_prices {
            let entry = accum
                .entry(store_price.store_key.clone())
                .or_insert_with(|| StoreTotal {
                    store_key: store_price.store_key.clone(),
                    store_name: store_price.store_name.clone(),
                    total: 0.0,
                    items_found: 0,
                    missing_items: 0,
                });
            entry.total += store_price.price * quantity;
            entry.items_found += 1;
        }
    }

    Ok(build_comparison(
        list_id,
        total_items,
        accum.into_values().collect(),
    ))
}

async fn fetch_list_items(pool: &PgPool, list_id: Uuid) -> Result<Vec<ListItem>, AppError> {
    let items = sqlx::query_as::<_, ListItem>(
        "SELECT * FROM list_items WHERE list_id = $1 ORDER BY created_at",
    )
    .bind(list_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// Rank stores and pick the recommendation.
///
/// Coverage comes first: a store never ranks ahead of one with strictly
/// fewer missing items, regardless of cost. Within equal coverage, cheaper
/// wins. Savings are clamped at zero.
pub fn build_comparison(
    list_id: Uuid,
    total_items: usize,
    mut stores: Vec<StoreTotal>,
) -> ListComparison {
    for store in &mut stores {
        store.missing_items = total_items.saturating_sub(store.items_found);
    }

    stores.sort_by(|a, b| {
        a.missing_items
            .cmp(&b.missing_items)
            .then(a.total.total_cmp(&b.total))
    });

    let recommended_store = stores
        .iter()
        .find(|s| s.missing_items == 0)
        .or_else(|| {
            stores
                .iter()
                .min_by(|a, b| a.total.total_cmp(&b.total))
        })
        .cloned();

    let alternative_stores: Vec<StoreTotal> = stores
        .iter()
        .filter(|s| {
            recommended_store
                .as_ref()
                .map_or(true, |r| r.store_key != s.store_key)
        })
        .take(ALTERNATIVE_STORE_COUNT)
        .cloned()
        .collect();

    let total_potential_savings = match (stores.first(), stores.last()) {
        (Some(first), Some(last)) => (last.total - first.total).max(0.0),
        _ => 0.0,
    };

    ListComparison {
        list_id,
        total_items,
        recommended_store,
        alternative_stores,
        store_rankings: stores,
        total_potential_savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ProductSummary {
        ProductSummary {
            id: Uuid::from_u128(1),
            name: "2% Milk".to_string(),
            brand: Some("Great Value".to_string()),
            upc: Some("0001111041700".to_string()),
            size: None,
            image_url: None,
        }
    }

    fn store_price(key: &str, price: f64) -> StorePrice {
        StorePrice {
            store_key: key.to_string(),
            store_name: format!("Store {key}"),
            price,
            sale_price: None,
            on_sale: false,
            source: PriceSourceTag::Crowdsourced,
            confidence: 0.8,
            last_updated: Utc::now(),
        }
    }

    fn store_total(key: &str, total: f64, items_found: usize) -> StoreTotal {
        StoreTotal {
            store_key: key.to_string(),
            store_name: format!("Store {key}"),
            total,
            items_found,
            missing_items: 0,
        }
    }

    #[test]
    fn data_quality_tiers() {
        assert_eq!(DataQuality::from_source_count(0), DataQuality::Low);
        assert_eq!(DataQuality::from_source_count(1), DataQuality::Low);
        assert_eq!(DataQuality::from_source_count(2), DataQuality::Medium);
        assert_eq!(DataQuality::from_source_count(4), DataQuality::Medium);
        assert_eq!(DataQuality::from_source_count(5), DataQuality::High);
    }

    #[test]
    fn summarize_computes_stats() {
        let prices = vec![
            store_price("a", 3.99),
            store_price("b", 2.49),
            store_price("c", 4.50),
        ];
        let aggregated = summarize(product(), prices, Utc::now());

        assert_eq!(aggregated.lowest_price, 2.49);
        assert_eq!(aggregated.price_range.min, 2.49);
        assert_eq!(aggregated.price_range.max, 4.50);
        assert!((aggregated.average_price - 3.6600000000000001).abs() < 1e-9);
        assert_eq!(aggregated.data_quality, DataQuality::Medium);
    }

    #[test]
    fn summarize_empty_sources_fall_back_to_now() {
        let now = Utc::now();
        let aggregated = summarize(product(), Vec::new(), now);

        assert_eq!(aggregated.lowest_price, 0.0);
        assert_eq!(aggregated.average_price, 0.0);
        assert_eq!(aggregated.data_quality, DataQuality::Low);
        assert_eq!(aggregated.last_updated, now);
    }

    #[test]
    fn summarize_last_updated_is_newest_source() {
        let old = Utc::now() - chrono::Duration::days(3);
        let new = Utc::now();

        let mut a = store_price("a", 1.0);
        a.last_updated = old;
        let mut b = store_price("b", 2.0);
        b.last_updated = new;

        let aggregated = summarize(product(), vec![a, b], Utc::now());
        assert_eq!(aggregated.last_updated, new);
    }

    #[test]
    fn merge_external_skips_existing_store_keys() {
        let mut entries = vec![store_price("grocer-api:42", 3.99)];
        let external = vec![
            ExternalPrice {
                store_key: "grocer-api:42".to_string(),
                store_name: "Midtown Market".to_string(),
                price: 2.99,
                sale_price: None,
                fetched_at: Utc::now(),
            },
            ExternalPrice {
                store_key: "grocer-api:7".to_string(),
                store_name: "Uptown Market".to_string(),
                price: 3.49,
                sale_price: Some(2.99),
                fetched_at: Utc::now(),
            },
        ];

        merge_external(&mut entries, external, PriceSourceTag::GrocerApi, 1.0);

        assert_eq!(entries.len(), 2);
        // Existing key kept its original price.
        assert_eq!(entries[0].price, 3.99);
        assert_eq!(entries[1].store_key, "grocer-api:7");
        assert!(entries[1].on_sale);
        assert_eq!(entries[1].confidence, 1.0);
    }

    #[test]
    fn full_coverage_store_is_recommended() {
        // 2 items: P1 at A ($3) and B ($4), P2 only at A ($2).
        let stores = vec![store_total("b", 4.0, 1), store_total("a", 5.0, 2)];
        let comparison = build_comparison(Uuid::nil(), 2, stores);

        let recommended = comparison.recommended_store.unwrap();
        assert_eq!(recommended.store_key, "a");
        assert_eq!(recommended.total, 5.0);
        assert_eq!(recommended.missing_items, 0);

        assert_eq!(comparison.alternative_stores.len(), 1);
        assert_eq!(comparison.alternative_stores[0].store_key, "b");
        assert_eq!(comparison.alternative_stores[0].missing_items, 1);
    }

    #[test]
    fn coverage_ranks_before_cost() {
        let stores = vec![
            store_total("cheap-partial", 1.0, 1),
            store_total("pricey-full", 10.0, 3),
        ];
        let comparison = build_comparison(Uuid::nil(), 3, stores);

        assert_eq!(comparison.store_rankings[0].store_key, "pricey-full");
        assert_eq!(comparison.store_rankings[1].store_key, "cheap-partial");

        // Ordering is non-decreasing in missing items.
        let missing: Vec<usize> = comparison
            .store_rankings
            .iter()
            .map(|s| s.missing_items)
            .collect();
        assert!(missing.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn cheapest_wins_within_equal_coverage() {
        let stores = vec![
            store_total("a", 9.0, 2),
            store_total("b", 7.5, 2),
            store_total("c", 8.0, 2),
        ];
        let comparison = build_comparison(Uuid::nil(), 2, stores);

        let keys: Vec<&str> = comparison
            .store_rankings
            .iter()
            .map(|s| s.store_key.as_str())
            .collect();
        assert_eq!(keys, ["b", "c", "a"]);
    }

    #[test]
    fn no_full_coverage_recommends_cheapest_overall() {
        let stores = vec![store_total("a", 6.0, 2), store_total("b", 3.0, 1)];
        let comparison = build_comparison(Uuid::nil(), 3, stores);

        let recommended = comparison.recommended_store.unwrap();
        assert_eq!(recommended.store_key, "b");
    }

    #[test]
    fn alternatives_exclude_recommended_and_cap_at_four() {
        let stores = vec![
            store_total("a", 1.0, 1),
            store_total("b", 2.0, 1),
            store_total("c", 3.0, 1),
            store_total("d", 4.0, 1),
            store_total("e", 5.0, 1),
            store_total("f", 6.0, 1),
        ];
        let comparison = build_comparison(Uuid::nil(), 1, stores);

        let recommended = comparison.recommended_store.unwrap();
        assert_eq!(recommended.store_key, "a");
        assert_eq!(comparison.alternative_stores.len(), 4);
        assert!(comparison
            .alternative_stores
            .iter()
            .all(|s| s.store_key != "a"));
    }

    #[test]
    fn savings_never_negative() {
        // Full-coverage store is pricier than the partial one it outranks.
        let stores = vec![store_total("full", 10.0, 2), store_total("partial", 4.0, 1)];
        let comparison = build_comparison(Uuid::nil(), 2, stores);
        assert!(comparison.total_potential_savings >= 0.0);

        let stores = vec![store_total("a", 5.0, 1), store_total("b", 8.0, 1)];
        let comparison = build_comparison(Uuid::nil(), 1, stores);
        assert_eq!(comparison.total_potential_savings, 3.0);
    }

    #[test]
    fn empty_store_set_yields_no_recommendation() {
        let comparison = build_comparison(Uuid::nil(), 2, Vec::new());
        assert!(comparison.recommended_store.is_none());
        assert!(comparison.alternative_stores.is_empty());
        assert_eq!(comparison.total_potential_savings, 0.0);
    }

    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::sources::{ExternalPriceSource, ProductDataSource, ProductFacts};

    /// Canned external source. `prices: None` simulates a provider failure.
    struct StubSource {
        configured: bool,
        tag: PriceSourceTag,
        confidence: f32,
        prices: Option<Vec<ExternalPrice>>,
    }

    #[async_trait]
    impl ExternalPriceSource for StubSource {
        fn is_configured(&self) -> bool {
            self.configured
        }

        fn source_tag(&self) -> PriceSourceTag {
            self.tag
        }

        fn confidence(&self) -> f32 {
            self.confidence
        }

        async fn fetch_by_upc(&self, _upc: &str) -> anyhow::Result<Vec<ExternalPrice>> {
            self.prices
                .clone()
                .ok_or_else(|| anyhow::anyhow!("provider unavailable"))
        }

        async fn search_by_name(
            &self,
            _query: &str,
            limit: usize,
        ) -> anyhow::Result<Vec<ExternalPrice>> {
            let prices = self
                .prices
                .clone()
                .ok_or_else(|| anyhow::anyhow!("provider unavailable"))?;
            Ok(prices.into_iter().take(limit).collect())
        }
    }

    struct NoFacts;

    #[async_trait]
    impl ProductDataSource for NoFacts {
        fn is_configured(&self) -> bool {
            false
        }

        async fn fetch_facts(&self, _upc: &str) -> anyhow::Result<Option<ProductFacts>> {
            Ok(None)
        }
    }

    fn stub_sources(
        grocer_prices: Option<Vec<ExternalPrice>>,
        shelfscan_prices: Option<Vec<ExternalPrice>>,
    ) -> ExternalSources {
        ExternalSources {
            grocer: Arc::new(StubSource {
                configured: true,
                tag: PriceSourceTag::GrocerApi,
                confidence: 1.0,
                prices: grocer_prices,
            }),
            shelfscan: Arc::new(StubSource {
                configured: true,
                tag: PriceSourceTag::ShelfScan,
                confidence: 0.9,
                prices: shelfscan_prices,
            }),
            product_data: Arc::new(NoFacts),
        }
    }

    fn external(key: &str, price: f64) -> ExternalPrice {
        ExternalPrice {
            store_key: key.to_string(),
            store_name: format!("Store {key}"),
            price,
            sale_price: None,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn failing_providers_keep_local_prices() {
        let sources = stub_sources(None, None);
        let mut entries = vec![store_price("local", 3.49)];

        merge_from_sources(&mut entries, &product(), &sources).await;

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].store_key, "local");
    }

    #[tokio::test]
    async fn one_failing_provider_does_not_block_the_other() {
        let sources = stub_sources(None, Some(vec![external("shelfscan:9", 2.99)]));
        let mut entries = vec![store_price("local", 3.49)];

        merge_from_sources(&mut entries, &product(), &sources).await;

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].store_key, "shelfscan:9");
        assert_eq!(entries[1].source, PriceSourceTag::ShelfScan);
        assert_eq!(entries[1].confidence, 0.9);
    }

    #[tokio::test]
    async fn products_without_upc_skip_upc_lookup() {
        let sources = stub_sources(Some(vec![external("grocer-api:1", 1.99)]), Some(Vec::new()));
        let mut no_upc = product();
        no_upc.upc = None;
        let mut entries = Vec::new();

        merge_from_sources(&mut entries, &no_upc, &sources).await;

        assert!(entries.is_empty());
    }
}

//! Product matching: resolves free-text grocery items to catalog products
//! via tiered string-similarity scoring, avoiding external API calls when a
//! confident local match exists.
//!
//! The scoring functions are pure; database access lives in thin wrappers so
//! the match logic is testable without a live catalog.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::price::PriceSourceTag;

/// Minimum score for an input to count as matched.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.70;

/// Catalog rows loaded per match request.
const CATALOG_FETCH_LIMIT: i64 = 1000;

/// A catalog product with its most recent non-expired price snapshot.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CatalogEntry {
    pub id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub upc: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub store_id: Option<Uuid>,
    pub store_name: Option<String>,
}

/// Per-request matching options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchOptions {
    /// Threshold override; falls back to [`DEFAULT_MATCH_THRESHOLD`].
    pub min_confidence: Option<f32>,
    /// Declared but not enforced on catalog scope.
    pub store_id: Option<Uuid>,
}

/// A resolved input with the winning product and its price snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ProductMatch {
    pub input: String,
    pub product_id: Uuid,
    pub name: String,
    pub brand: Option<String>,
    pub upc: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub store_id: Option<Uuid>,
    pub store_name: Option<String>,
    pub confidence: f32,
}

/// Summary statistics for a match request.
#[derive(Debug, Clone, Serialize)]
pub struct MatchStats {
    pub total: usize,
    pub matched_count: usize,
    pub unmatched_count: usize,
    pub average_confidence: f32,
}

/// Result of matching a batch of free-text items against the catalog.
#[derive(Debug, Serialize)]
pub struct MatchOutcome {
    pub matched: Vec<ProductMatch>,
    pub unmatched: Vec<String>,
    pub stats: MatchStats,
}

/// Match free-text items against the local catalog.
///
/// Never fails to the caller: a catalog fetch error or an empty catalog
/// returns every input as unmatched with zero stats.
pub async fn find_local_product_matches(
    pool: &PgPool,
    items: &[String],
    options: &MatchOptions,
) -> MatchOutcome {
    let threshold = options.min_confidence.unwrap_or(DEFAULT_MATCH_THRESHOLD);

    let catalog = match fetch_catalog(pool).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::warn!(error = %e, "Catalog fetch failed, returning all items unmatched");
            return all_unmatched(items);
        }
    };

    if catalog.is_empty() {
        tracing::info!("Catalog is empty, returning all items unmatched");
        return all_unmatched(items);
    }

    match_against_catalog(items, &catalog, threshold)
}

/// Load catalog products with their newest non-expired price per product.
async fn fetch_catalog(pool: &PgPool) -> Result<Vec<CatalogEntry>, AppError> {
    let rows = sqlx::query_as::<_, CatalogEntry>(
        r#"
        SELECT p.id, p.name, p.brand, p.upc, p.size, p.image_url,
               pr.price, pr.sale_price, pr.store_id, s.name AS store_name
        FROM products p
        LEFT JOIN LATERAL (
            SELECT price, sale_price, store_id
            FROM prices
            WHERE product_id = p.id
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY observed_at DESC
            LIMIT 1
        ) pr ON true
        LEFT JOIN stores s ON s.id = pr.store_id
        LIMIT $1
        "#,
    )
    .bind(CATALOG_FETCH_LIMIT)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Score every input against every catalog entry, keeping the best product
/// per input when its score clears the threshold.
pub fn match_against_catalog(
    items: &[String],
    catalog: &[CatalogEntry],
    threshold: f32,
) -> MatchOutcome {
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for item in items {
        let mut best: Option<(&CatalogEntry, f32)> = None;
        for entry in catalog {
            let score = calculate_match_score(item, &entry.name, entry.brand.as_deref());
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }

        match best {
            Some((entry, score)) if score >= threshold => {
                tracing::debug!(input = %item, product = %entry.name, score, "Matched item locally");
                matched.push(ProductMatch {
                    input: item.clone(),
                    product_id: entry.id,
                    name: entry.name.clone(),
                    brand: entry.brand.clone(),
                    upc: entry.upc.clone(),
                    size: entry.size.clone(),
                    image_url: entry.image_url.clone(),
                    price: entry.price,
                    sale_price: entry.sale_price,
                    store_id: entry.store_id,
                    store_name: entry.store_name.clone(),
                    confidence: score,
                });
            }
            _ => {
                tracing::debug!(input = %item, "No local match above threshold");
                unmatched.push(item.clone());
            }
        }
    }

    let average_confidence = if matched.is_empty() {
        0.0
    } else {
        matched.iter().map(|m| m.confidence).sum::<f32>() / matched.len() as f32
    };

    MatchOutcome {
        stats: MatchStats {
            total: items.len(),
            matched_count: matched.len(),
            unmatched_count: unmatched.len(),
            average_confidence,
        },
        matched,
        unmatched,
    }
}

fn all_unmatched(items: &[String]) -> MatchOutcome {
    MatchOutcome {
        matched: Vec::new(),
        unmatched: items.to_vec(),
        stats: MatchStats {
            total: items.len(),
            matched_count: 0,
            unmatched_count: items.len(),
            average_confidence: 0.0,
        },
    }
}

/// Score an input string against a product name and optional brand.
///
/// Tiers, first applicable wins:
/// 1. 0.95 — substring containment either direction against the name.
/// 2. 0.85 — every input token found among the "brand + name" tokens.
/// 3. 0.75 × ratio — at least 70% of input tokens found.
/// 4. Normalized Levenshtein similarity against name and "brand + name",
///    whichever is greater.
pub fn calculate_match_score(input: &str, name: &str, brand: Option<&str>) -> f32 {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return 0.0;
    }

    let name = name.to_lowercase();
    let combined = match brand {
        Some(brand) => format!("{} {}", brand.to_lowercase(), name),
        None => name.clone(),
    };

    if name.contains(&input) || input.contains(&name) {
        return 0.95;
    }

    let input_tokens: Vec<&str> = input.split_whitespace().collect();
    let combined_tokens: Vec<&str> = combined.split_whitespace().collect();
    let matched_tokens = input_tokens
        .iter()
        .filter(|token| {
            combined_tokens
                .iter()
                .any(|word| word.contains(*token) || token.contains(word))
        })
        .count();

    if !input_tokens.is_empty() {
        if matched_tokens == input_tokens.len() {
            return 0.85;
        }
        let ratio = matched_tokens as f32 / input_tokens.len() as f32;
        if ratio >= 0.7 {
            return 0.75 * ratio;
        }
    }

    calculate_similarity(&input, &name).max(calculate_similarity(&input, &combined))
}

/// Normalized Levenshtein similarity: 1 − distance / max length.
pub fn calculate_similarity(a: &str, b: &str) -> f32 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f32 / max_len as f32
}

/// Character-level Levenshtein edit distance, two-row dynamic programming.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

// -- Catalog persistence --

/// A normalized product record from an external source, ready to save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub name: String,
    pub brand: Option<String>,
    pub upc: Option<String>,
    pub size: Option<String>,
    pub image_url: Option<String>,
    pub price: Option<f64>,
    pub sale_price: Option<f64>,
    pub store_id: Option<Uuid>,
    pub confidence: Option<f32>,
    #[serde(default = "default_source")]
    pub source: PriceSourceTag,
}

fn default_source() -> PriceSourceTag {
    PriceSourceTag::Crowdsourced
}

/// Error while saving a single catalog record.
#[derive(Debug, Serialize)]
pub struct CatalogSaveError {
    pub index: usize,
    pub name: String,
    pub message: String,
}

/// Summary of a catalog save run. `created` counts new products only;
/// price updates on existing products are not counted.
#[derive(Debug, Serialize)]
pub struct CatalogSaveResult {
    pub processed: usize,
    pub created: usize,
    pub errors: Vec<CatalogSaveError>,
}

/// Save normalized product records into the catalog.
///
/// A single record's failure is logged and skipped; the loop continues
/// (partial success, no rollback).
pub async fn save_products_to_catalog(
    pool: &PgPool,
    records: &[NormalizedProduct],
) -> CatalogSaveResult {
    let mut created = 0usize;
    let mut errors = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match save_one(pool, record).await {
            Ok(true) => created += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(index, name = %record.name, error = %e, "Catalog save failed for record");
                errors.push(CatalogSaveError {
                    index,
                    name: record.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    CatalogSaveResult {
        processed: records.len(),
        created,
        errors,
    }
}

/// Save one record. Returns true when a new product was created.
///
/// Dedup is enforced by the storage layer: the prior SELECT is an
/// optimization, the unique-index conflict is the correctness signal.
async fn save_one(pool: &PgPool, record: &NormalizedProduct) -> Result<bool, AppError> {
    let (product_id, created) = match find_existing(pool, record).await? {
        Some(id) => (id, false),
        None => match insert_product(pool, record).await? {
            Some(id) => (id, true),
            // Lost an insert race; the conflicting row must exist now.
            None => match find_existing(pool, record).await? {
                Some(id) => (id, false),
                None => {
                    return Err(AppError::Internal(format!(
                        "Insert conflict without existing product for '{}'",
                        record.name
                    )))
                }
            },
        },
    };

    if let (Some(price), Some(store_id)) = (record.price, record.store_id) {
        upsert_price(pool, product_id, store_id, price, record).await?;
    }

    Ok(created)
}

/// Look up an existing product by UPC first, then case-insensitive name.
async fn find_existing(pool: &PgPool, record: &NormalizedProduct) -> Result<Option<Uuid>, AppError> {
    if let Some(upc) = &record.upc {
        let id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM products WHERE upc = $1")
            .bind(upc)
            .fetch_optional(pool)
            .await?;
        if id.is_some() {
            return Ok(id);
        }
    }

    let id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM products WHERE lower(name) = lower($1) LIMIT 1",
    )
    .bind(&record.name)
    .fetch_optional(pool)
    .await?;
    Ok(id)
}

/// Insert a product, treating a unique-index conflict as "already exists".
async fn insert_product(pool: &PgPool, record: &NormalizedProduct) -> Result<Option<Uuid>, AppError> {
    let query = if record.upc.is_some() {
        r#"
        INSERT INTO products (name, brand, upc, size, image_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (upc) WHERE upc IS NOT NULL DO NOTHING
        RETURNING id
        "#
    } else {
        r#"
        INSERT INTO products (name, brand, upc, size, image_url)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT ((lower(name))) WHERE upc IS NULL DO NOTHING
        RETURNING id
        "#
    };

    let id = sqlx::query_scalar::<_, Uuid>(query)
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&record.upc)
        .bind(&record.size)
        .bind(&record.image_url)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Point-update the price for (product, store): stale rows for that store
/// are overwritten, not historized, by this path.
async fn upsert_price(
    pool: &PgPool,
    product_id: Uuid,
    store_id: Uuid,
    price: f64,
    record: &NormalizedProduct,
) -> Result<(), AppError> {
    let confidence = record.confidence.unwrap_or(0.5);

    let updated = sqlx::query(
        r#"
        UPDATE prices
        SET price = $3, sale_price = $4, source = $5, confidence = $6,
            observed_at = NOW(), expires_at = NULL
        WHERE product_id = $1 AND store_id = $2
        "#,
    )
    .bind(product_id)
    .bind(store_id)
    .bind(price)
    .bind(record.sale_price)
    .bind(record.source)
    .bind(confidence)
    .execute(pool)
    .await?;

    if updated.rows_affected() == 0 {
        sqlx::query(
            r#"
            INSERT INTO prices (product_id, store_id, price, sale_price, source, confidence)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(product_id)
        .bind(store_id)
        .bind(price)
        .bind(record.sale_price)
        .bind(record.source)
        .bind(confidence)
        .execute(pool)
        .await?;
    }

    Ok(())
}

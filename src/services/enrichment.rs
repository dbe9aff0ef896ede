//! Product attribute enrichment from the open product database.

use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::product::Product;
use crate::sources::ProductDataSource;

/// Enrich a product's attributes by UPC lookup.
///
/// Returns `false` (not an error) when the product or its UPC is missing,
/// the source is unconfigured, or the lookup fails. Existing attributes are
/// only filled in, never cleared.
pub async fn enrich_product_data(
    pool: &PgPool,
    source: &dyn ProductDataSource,
    product_id: Uuid,
) -> Result<bool, AppError> {
    let Some(product) =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(pool)
            .await?
    else {
        tracing::debug!(%product_id, "Enrichment skipped: product not found");
        return Ok(false);
    };

    let Some(upc) = product.upc else {
        tracing::debug!(%product_id, product = %product.name, "Enrichment skipped: product has no UPC");
        return Ok(false);
    };

    if !source.is_configured() {
        return Ok(false);
    }

    let facts = match source.fetch_facts(&upc).await {
        Ok(Some(facts)) => facts,
        Ok(None) => {
            tracing::debug!(%product_id, upc, "Enrichment skipped: UPC unknown to source");
            return Ok(false);
        }
        Err(e) => {
            tracing::warn!(%product_id, upc, error = %e, "Enrichment lookup failed");
            return Ok(false);
        }
    };

    sqlx::query(
        r#"
        UPDATE products
        SET brand = COALESCE($2, brand),
            category = COALESCE($3, category),
            size = COALESCE($4, size),
            image_url = COALESCE($5, image_url),
            nutrition = COALESCE($6, nutrition),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .bind(&facts.brand)
    .bind(&facts.category)
    .bind(&facts.size)
    .bind(&facts.image_url)
    .bind(&facts.nutrition)
    .execute(pool)
    .await?;

    tracing::info!(%product_id, upc, "Product enriched from open product data");
    Ok(true)
}

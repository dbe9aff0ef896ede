//! Historical price trend aggregation.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;

/// Default trend window in days.
pub const DEFAULT_TREND_DAYS: i64 = 30;

/// Per-day price statistics for one product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PriceTrendPoint {
    pub day: NaiveDate,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

/// Read price observations within the window, grouped by calendar date.
/// Pure read, no side effects.
pub async fn get_price_trends(
    pool: &PgPool,
    product_id: Uuid,
    days: i64,
) -> Result<Vec<PriceTrendPoint>, AppError> {
    let since = Utc::now() - Duration::days(days);

    let points = sqlx::query_as::<_, PriceTrendPoint>(
        r#"
        SELECT observed_at::date AS day,
               AVG(price) AS average,
               MIN(price) AS min,
               MAX(price) AS max
        FROM prices
        WHERE product_id = $1 AND observed_at >= $2
        GROUP BY observed_at::date
        ORDER BY day
        "#,
    )
    .bind(product_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(points)
}

//! PostgreSQL connection pool.
//!
//! Schema migrations live in `migrations/` and are applied at startup by
//! the server and seed binaries via `sqlx::migrate!`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create the connection pool backing catalog, price, and list storage.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

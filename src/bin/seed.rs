//! Seed script for development — populates a fresh database with sample data.
//!
//! Usage: `cargo run --bin seed`
//!
//! Requires `DATABASE_URL` (reads .env).

use sqlx::PgPool;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let db_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Run migrations first
    sqlx::migrate!("./migrations").run(&pool).await?;

    println!("=== PriceCart Seed Script ===");

    let stores = seed_stores(&pool).await?;
    let products = seed_products(&pool).await?;
    seed_prices(&pool, &stores, &products).await?;
    seed_sample_list(&pool, &products).await?;

    println!("\n=== Seed complete! ===");

    Ok(())
}

async fn seed_stores(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Stores already seeded");
        let ids = sqlx::query_scalar("SELECT id FROM stores ORDER BY created_at")
            .fetch_all(pool)
            .await?;
        return Ok(ids);
    }

    let mut ids = Vec::new();
    for (name, chain) in [
        ("Midtown Market", Some("FreshMart")),
        ("Corner Bodega", None),
        ("Valu-Save #12", Some("Valu-Save")),
    ] {
        let id: Uuid =
            sqlx::query_scalar("INSERT INTO stores (name, chain) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(chain)
                .fetch_one(pool)
                .await?;
        ids.push(id);
    }

    println!("[done] Created {} stores", ids.len());
    Ok(ids)
}

async fn seed_products(pool: &PgPool) -> anyhow::Result<Vec<Uuid>> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Products already seeded");
        let ids = sqlx::query_scalar("SELECT id FROM products ORDER BY created_at")
            .fetch_all(pool)
            .await?;
        return Ok(ids);
    }

    let mut ids = Vec::new();
    for (name, brand, upc, size) in [
        ("2% Milk", Some("Great Value"), Some("0007874237060"), Some("1 gal")),
        ("Large Brown Eggs", Some("Happy Hen"), Some("0001111041700"), Some("12 ct")),
        ("Whole Wheat Bread", Some("Oven Fresh"), None, Some("20 oz")),
        ("Creamy Peanut Butter", Some("NuttyCo"), Some("0005150024128"), Some("16 oz")),
        ("Bananas", None, None, Some("per lb")),
    ] {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO products (name, brand, upc, size) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(name)
        .bind(brand)
        .bind(upc)
        .bind(size)
        .fetch_one(pool)
        .await?;
        ids.push(id);
    }

    println!("[done] Created {} products", ids.len());
    Ok(ids)
}

async fn seed_prices(pool: &PgPool, stores: &[Uuid], products: &[Uuid]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prices")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Prices already seeded");
        return Ok(());
    }

    // Every product priced at the first store, a subset elsewhere.
    let mut inserted = 0;
    for (i, &product_id) in products.iter().enumerate() {
        for (j, &store_id) in stores.iter().enumerate() {
            if j > 0 && (i + j) % 2 == 0 {
                continue;
            }
            let price = 1.50 + i as f64 * 0.75 + j as f64 * 0.30;
            sqlx::query(
                "INSERT INTO prices (product_id, store_id, price, confidence)
                 VALUES ($1, $2, $3, 0.8)",
            )
            .bind(product_id)
            .bind(store_id)
            .bind(price)
            .execute(pool)
            .await?;
            inserted += 1;
        }
    }

    println!("[done] Created {inserted} prices");
    Ok(())
}

async fn seed_sample_list(pool: &PgPool, products: &[Uuid]) -> anyhow::Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shopping_lists")
        .fetch_one(pool)
        .await?;
    if count > 0 {
        println!("[skip] Shopping list already seeded");
        return Ok(());
    }

    let list_id: Uuid = sqlx::query_scalar(
        "INSERT INTO shopping_lists (name) VALUES ('Weekly groceries') RETURNING id",
    )
    .fetch_one(pool)
    .await?;

    for (raw_text, product_id, quantity) in [
        ("milk 2%", products.first().copied(), Some(1)),
        ("eggs large", products.get(1).copied(), Some(2)),
        ("something obscure", None, None),
    ] {
        sqlx::query(
            "INSERT INTO list_items (list_id, raw_text, product_id, quantity)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(list_id)
        .bind(raw_text)
        .bind(product_id)
        .bind(quantity)
        .execute(pool)
        .await?;
    }

    println!("[done] Created sample shopping list {list_id}");
    Ok(())
}

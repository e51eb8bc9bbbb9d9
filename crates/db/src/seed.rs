use sqlx::pool::PoolConnection;
use sqlx::{QueryBuilder, Sqlite};

use trolley_core::domain::product::Product;

use crate::DbPool;

/// Rows per INSERT statement. Ten binds per product keeps a full batch well
/// under SQLite's bind-variable ceiling.
const SEED_BATCH_SIZE: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded { inserted: u64 },
    Skipped { existing: u64 },
}

/// Populates the `products` table once. The whole pass runs inside an
/// exclusive write transaction, which is the SQLite rendition of the named
/// seed lock: a second instance blocks on the transaction, then finds the
/// rows already present and skips.
pub async fn seed_products(pool: &DbPool, products: &[Product]) -> Result<SeedOutcome, sqlx::Error> {
    let mut conn = pool.acquire().await?;

    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    match seed_locked(&mut conn, products).await {
        Ok(outcome) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(outcome)
        }
        Err(error) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(error)
        }
    }
}

async fn seed_locked(
    conn: &mut PoolConnection<Sqlite>,
    products: &[Product],
) -> Result<SeedOutcome, sqlx::Error> {
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&mut **conn).await?;
    if existing > 0 {
        return Ok(SeedOutcome::Skipped { existing: existing as u64 });
    }

    let mut inserted = 0u64;
    for chunk in products.chunks(SEED_BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO products
                 (id, sku, manufacturer, category_id, weight, some_other_id,
                  name, category, description, brand) ",
        );
        builder.push_values(chunk, |mut row, product| {
            row.push_bind(product.id.0)
                .push_bind(&product.sku)
                .push_bind(&product.manufacturer)
                .push_bind(product.category_id)
                .push_bind(product.weight)
                .push_bind(product.some_other_id)
                .push_bind(&product.name)
                .push_bind(&product.category)
                .push_bind(&product.description)
                .push_bind(&product.brand);
        });
        builder.push(" ON CONFLICT (id) DO NOTHING");

        let result = builder.build().execute(&mut **conn).await?;
        inserted += result.rows_affected();
    }

    Ok(SeedOutcome::Seeded { inserted })
}

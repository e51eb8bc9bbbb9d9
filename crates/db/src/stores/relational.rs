use chrono::{DateTime, Utc};
use sqlx::Row;

use trolley_core::domain::cart::{Cart, CartId, CartItem, CustomerId};
use trolley_core::domain::product::{Product, ProductId};
use trolley_core::store::{CartCreated, CartStore, ItemUpsert, StoreError};

use super::{decode_ts, encode_ts, unavailable};
use crate::DbPool;

/// Normalized backend: a carts table plus a cart-items table joined against
/// `products` on read. Item upserts are a single atomic statement, so
/// concurrent writers to one cart serialize in the database.
pub struct RelationalCartStore {
    pool: DbPool,
}

impl RelationalCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn cart_row(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<(i64, DateTime<Utc>, DateTime<Utc>)>, StoreError> {
        let row = sqlx::query(
            "SELECT id, created_at, updated_at FROM shopping_carts WHERE customer_id = ?",
        )
        .bind(customer_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        let Some(row) = row else { return Ok(None) };

        let id: i64 = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
        let created_at: String =
            row.try_get("created_at").map_err(|e| StoreError::Decode(e.to_string()))?;
        let updated_at: String =
            row.try_get("updated_at").map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Some((id, decode_ts(&created_at)?, decode_ts(&updated_at)?)))
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<CartItem, StoreError> {
    let id: i64 = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let product_id: i64 =
        row.try_get("product_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let manufacturer: String =
        row.try_get("manufacturer").map_err(|e| StoreError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| StoreError::Decode(e.to_string()))?;
    let quantity: i64 = row.try_get("quantity").map_err(|e| StoreError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| StoreError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(CartItem {
        id,
        product_id: ProductId(product_id),
        manufacturer,
        category,
        quantity,
        created_at: decode_ts(&created_at)?,
        updated_at: decode_ts(&updated_at)?,
    })
}

#[async_trait::async_trait]
impl CartStore for RelationalCartStore {
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartCreated, StoreError> {
        if let Some((id, created_at, _)) = self.cart_row(customer_id).await? {
            return Ok(CartCreated {
                cart_id: CartId(id),
                customer_id,
                created: false,
                created_at,
            });
        }

        let now = Utc::now();
        let now_raw = encode_ts(&now);
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO shopping_carts (customer_id, created_at, updated_at)
             VALUES (?, ?, ?)
             ON CONFLICT (customer_id) DO NOTHING
             RETURNING id",
        )
        .bind(customer_id.0)
        .bind(&now_raw)
        .bind(&now_raw)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        match inserted {
            Some(id) => {
                Ok(CartCreated { cart_id: CartId(id), customer_id, created: true, created_at: now })
            }
            None => {
                // Lost the check-then-insert race; the winner's row is visible now.
                let (id, created_at, _) = self.cart_row(customer_id).await?.ok_or_else(|| {
                    StoreError::Unavailable("cart row missing after insert conflict".to_string())
                })?;
                Ok(CartCreated {
                    cart_id: CartId(id),
                    customer_id,
                    created: false,
                    created_at,
                })
            }
        }
    }

    async fn find_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, StoreError> {
        let Some((cart_id, created_at, updated_at)) = self.cart_row(customer_id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT sci.id, sci.product_id, p.manufacturer, p.category,
                    sci.quantity, sci.created_at, sci.updated_at
             FROM shopping_cart_items sci
             INNER JOIN products p ON p.id = sci.product_id
             WHERE sci.shopping_cart_id = ?
             ORDER BY sci.updated_at DESC, sci.id DESC",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        let items = rows.iter().map(row_to_item).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart { id: CartId(cart_id), customer_id, items, created_at, updated_at }))
    }

    async fn upsert_item(
        &self,
        customer_id: CustomerId,
        product: &Product,
        quantity: i64,
    ) -> Result<ItemUpsert, StoreError> {
        let cart_id: i64 =
            sqlx::query_scalar("SELECT id FROM shopping_carts WHERE customer_id = ?")
                .bind(customer_id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?
                .ok_or(StoreError::CartNotFound(customer_id))?;

        let now = Utc::now();
        let now_raw = encode_ts(&now);
        let row = sqlx::query(
            "INSERT INTO shopping_cart_items
                 (shopping_cart_id, product_id, quantity, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (shopping_cart_id, product_id) DO UPDATE SET
                 quantity = excluded.quantity,
                 updated_at = excluded.updated_at
             RETURNING id, created_at, updated_at",
        )
        .bind(cart_id)
        .bind(product.id.0)
        .bind(quantity)
        .bind(&now_raw)
        .bind(&now_raw)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)?;

        let item_id: i64 = row.try_get("id").map_err(|e| StoreError::Decode(e.to_string()))?;
        let created_raw: String =
            row.try_get("created_at").map_err(|e| StoreError::Decode(e.to_string()))?;
        let updated_raw: String =
            row.try_get("updated_at").map_err(|e| StoreError::Decode(e.to_string()))?;
        let created_at = decode_ts(&created_raw)?;
        let updated_at = decode_ts(&updated_raw)?;

        sqlx::query("UPDATE shopping_carts SET updated_at = ? WHERE id = ?")
            .bind(&now_raw)
            .bind(cart_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(ItemUpsert {
            item: CartItem {
                id: item_id,
                product_id: product.id,
                manufacturer: product.manufacturer.clone(),
                category: product.category.clone(),
                quantity,
                created_at,
                updated_at,
            },
            // A fresh insert carries the timestamp we just bound for both
            // columns; an update keeps the original created_at.
            created: created_at == updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use trolley_core::catalog;
    use trolley_core::domain::cart::CustomerId;
    use trolley_core::domain::product::Product;
    use trolley_core::store::{CartStore, StoreError};

    use crate::stores::RelationalCartStore;
    use crate::{connect_with_settings, migrations, seed};

    async fn setup() -> (sqlx::SqlitePool, Vec<Product>) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let products = catalog::generate(10);
        seed::seed_products(&pool, &products).await.expect("seed products");
        (pool, products)
    }

    #[tokio::test]
    async fn create_cart_is_idempotent_and_keeps_one_row() {
        let (pool, _) = setup().await;
        let store = RelationalCartStore::new(pool.clone());

        let first = store.create_cart(CustomerId(42)).await.expect("first create");
        let second = store.create_cart(CustomerId(42)).await.expect("second create");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.cart_id, second.cart_id);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shopping_carts")
            .fetch_one(&pool)
            .await
            .expect("count carts");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn upsert_without_cart_is_cart_not_found() {
        let (pool, products) = setup().await;
        let store = RelationalCartStore::new(pool);

        let result = store.upsert_item(CustomerId(5), &products[0], 1).await;

        assert_eq!(result, Err(StoreError::CartNotFound(CustomerId(5))));
    }

    #[tokio::test]
    async fn upsert_overwrites_quantity_and_advances_updated_at() {
        let (pool, products) = setup().await;
        let store = RelationalCartStore::new(pool.clone());
        store.create_cart(CustomerId(42)).await.expect("create");

        let created = store.upsert_item(CustomerId(42), &products[6], 3).await.expect("insert");
        let updated = store.upsert_item(CustomerId(42), &products[6], 5).await.expect("update");

        assert!(created.created);
        assert!(!updated.created);
        assert_eq!(updated.item.id, created.item.id);
        assert_eq!(updated.item.quantity, 5);
        assert_eq!(updated.item.created_at, created.item.created_at);
        assert!(updated.item.updated_at > created.item.updated_at);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shopping_cart_items")
            .fetch_one(&pool)
            .await
            .expect("count items");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn find_cart_orders_items_by_most_recent_mutation() {
        let (pool, products) = setup().await;
        let store = RelationalCartStore::new(pool);
        store.create_cart(CustomerId(42)).await.expect("create");

        let product_a = &products[0];
        let product_b = &products[1];
        store.upsert_item(CustomerId(42), product_a, 1).await.expect("add a");
        store.upsert_item(CustomerId(42), product_b, 1).await.expect("add b");
        store.upsert_item(CustomerId(42), product_a, 2).await.expect("update a");

        let cart = store.find_cart(CustomerId(42)).await.expect("find").expect("cart");

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].product_id, product_a.id);
        assert_eq!(cart.items[1].product_id, product_b.id);
    }

    #[tokio::test]
    async fn find_cart_returns_empty_item_list_for_fresh_cart() {
        let (pool, _) = setup().await;
        let store = RelationalCartStore::new(pool);

        assert!(store.find_cart(CustomerId(42)).await.expect("find").is_none());

        store.create_cart(CustomerId(42)).await.expect("create");
        let cart = store.find_cart(CustomerId(42)).await.expect("find").expect("cart");

        assert!(cart.items.is_empty());
        assert_eq!(cart.customer_id, CustomerId(42));
    }

    #[tokio::test]
    async fn denormalized_fields_come_from_the_product_record() {
        let (pool, products) = setup().await;
        let store = RelationalCartStore::new(pool);
        store.create_cart(CustomerId(1)).await.expect("create");

        let product = &products[3];
        store.upsert_item(CustomerId(1), product, 4).await.expect("add");

        let cart = store.find_cart(CustomerId(1)).await.expect("find").expect("cart");
        assert_eq!(cart.items[0].manufacturer, product.manufacturer);
        assert_eq!(cart.items[0].category, product.category);
    }

    #[tokio::test]
    async fn customer_42_scenario_round_trip() {
        let (pool, products) = setup().await;
        let store = RelationalCartStore::new(pool);

        let created = store.create_cart(CustomerId(42)).await.expect("create");
        assert!(created.created);

        let product = &products[6];
        let first = store.upsert_item(CustomerId(42), product, 2).await.expect("qty 2");
        assert!(first.created);
        assert_eq!(first.item.quantity, 2);

        let second = store.upsert_item(CustomerId(42), product, 9).await.expect("qty 9");
        assert!(!second.created);
        assert_eq!(second.item.quantity, 9);

        let cart = store.find_cart(CustomerId(42)).await.expect("find").expect("cart");
        assert_eq!(cart.id, created.cart_id);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id, product.id);
        assert_eq!(cart.items[0].quantity, 9);
    }
}

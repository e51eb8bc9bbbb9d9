use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use trolley_core::domain::cart::{Cart, CartId, CartItem, CustomerId};
use trolley_core::domain::product::{Product, ProductId};
use trolley_core::store::{CartCreated, CartStore, ItemUpsert, StoreError};

use super::{decode_ts, encode_ts, unavailable};
use crate::DbPool;

/// How many times an item upsert re-reads and re-applies after losing the
/// version race before giving up with `StoreError::Conflict`.
const CAS_MAX_ATTEMPTS: u32 = 16;

/// Denormalized backend: one document per cart under an opaque UUID key,
/// the whole item list embedded as JSON, and a secondary index for
/// customer lookups. Writes replace the entire list, guarded by a
/// version-checked conditional update so concurrent writers cannot
/// silently drop each other's entries.
pub struct DocumentCartStore {
    pool: DbPool,
}

impl DocumentCartStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Option<CartDocument>, StoreError> {
        let row = sqlx::query(
            "SELECT cart_key, numeric_id, version, document, created_at, updated_at
             FROM cart_documents WHERE customer_id = ?",
        )
        .bind(customer_id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(row_to_document).transpose()
    }
}

/// One embedded line entry, stored verbatim inside the document's JSON
/// list. Timestamps stay strings here; they only become `DateTime` at the
/// store boundary.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct DocumentItem {
    id: i64,
    product_id: i64,
    manufacturer: String,
    category: String,
    quantity: i64,
    created_at: String,
    updated_at: String,
}

impl DocumentItem {
    fn into_cart_item(self) -> Result<CartItem, StoreError> {
        Ok(CartItem {
            id: self.id,
            product_id: ProductId(self.product_id),
            manufacturer: self.manufacturer,
            category: self.category,
            quantity: self.quantity,
            created_at: decode_ts(&self.created_at)?,
            updated_at: decode_ts(&self.updated_at)?,
        })
    }
}

struct CartDocument {
    cart_key: String,
    numeric_id: i64,
    version: i64,
    document: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartDocument {
    fn items(&self) -> Result<Vec<DocumentItem>, StoreError> {
        serde_json::from_str(&self.document)
            .map_err(|error| StoreError::Decode(format!("bad cart document: {error}")))
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<CartDocument, StoreError> {
    let cart_key: String =
        row.try_get("cart_key").map_err(|e| StoreError::Decode(e.to_string()))?;
    let numeric_id: i64 =
        row.try_get("numeric_id").map_err(|e| StoreError::Decode(e.to_string()))?;
    let version: i64 = row.try_get("version").map_err(|e| StoreError::Decode(e.to_string()))?;
    let document: String =
        row.try_get("document").map_err(|e| StoreError::Decode(e.to_string()))?;
    let created_at: String =
        row.try_get("created_at").map_err(|e| StoreError::Decode(e.to_string()))?;
    let updated_at: String =
        row.try_get("updated_at").map_err(|e| StoreError::Decode(e.to_string()))?;

    Ok(CartDocument {
        cart_key,
        numeric_id,
        version,
        document,
        created_at: decode_ts(&created_at)?,
        updated_at: decode_ts(&updated_at)?,
    })
}

/// Synthetic numeric cart id for API compatibility with the relational
/// store's integer ids, derived from the creation instant.
fn synthetic_cart_id(now: &DateTime<Utc>) -> i64 {
    let nanos =
        now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000));
    nanos % 100_000_000
}

#[async_trait::async_trait]
impl CartStore for DocumentCartStore {
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartCreated, StoreError> {
        if let Some(existing) = self.fetch_by_customer(customer_id).await? {
            return Ok(CartCreated {
                cart_id: CartId(existing.numeric_id),
                customer_id,
                created: false,
                created_at: existing.created_at,
            });
        }

        let now = Utc::now();
        let now_raw = encode_ts(&now);
        let cart_key = Uuid::new_v4().to_string();
        let numeric_id = synthetic_cart_id(&now);

        let result = sqlx::query(
            "INSERT INTO cart_documents
                 (cart_key, customer_id, numeric_id, version, document, created_at, updated_at)
             VALUES (?, ?, ?, 1, '[]', ?, ?)
             ON CONFLICT (customer_id) DO NOTHING",
        )
        .bind(&cart_key)
        .bind(customer_id.0)
        .bind(numeric_id)
        .bind(&now_raw)
        .bind(&now_raw)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        if result.rows_affected() == 1 {
            return Ok(CartCreated {
                cart_id: CartId(numeric_id),
                customer_id,
                created: true,
                created_at: now,
            });
        }

        // A concurrent create won on the customer index; return its document.
        let winner = self.fetch_by_customer(customer_id).await?.ok_or_else(|| {
            StoreError::Unavailable("cart document missing after insert conflict".to_string())
        })?;
        Ok(CartCreated {
            cart_id: CartId(winner.numeric_id),
            customer_id,
            created: false,
            created_at: winner.created_at,
        })
    }

    async fn find_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, StoreError> {
        let Some(document) = self.fetch_by_customer(customer_id).await? else {
            return Ok(None);
        };

        let mut items = document
            .items()?
            .into_iter()
            .map(DocumentItem::into_cart_item)
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));

        Ok(Some(Cart {
            id: CartId(document.numeric_id),
            customer_id,
            items,
            created_at: document.created_at,
            updated_at: document.updated_at,
        }))
    }

    async fn upsert_item(
        &self,
        customer_id: CustomerId,
        product: &Product,
        quantity: i64,
    ) -> Result<ItemUpsert, StoreError> {
        for _attempt in 0..CAS_MAX_ATTEMPTS {
            let document = self
                .fetch_by_customer(customer_id)
                .await?
                .ok_or(StoreError::CartNotFound(customer_id))?;
            let mut items = document.items()?;

            let now = Utc::now();
            let now_raw = encode_ts(&now);

            let (entry, created) =
                match items.iter_mut().find(|item| item.product_id == product.id.0) {
                    Some(existing) => {
                        // Overwrite in place, preserving the entry's identity
                        // and original creation timestamp.
                        existing.quantity = quantity;
                        existing.manufacturer = product.manufacturer.clone();
                        existing.category = product.category.clone();
                        existing.updated_at = now_raw.clone();
                        (existing.clone(), false)
                    }
                    None => {
                        let entry = DocumentItem {
                            id: items.len() as i64 + 1,
                            product_id: product.id.0,
                            manufacturer: product.manufacturer.clone(),
                            category: product.category.clone(),
                            quantity,
                            created_at: now_raw.clone(),
                            updated_at: now_raw.clone(),
                        };
                        items.push(entry.clone());
                        (entry, true)
                    }
                };

            let payload = serde_json::to_string(&items)
                .map_err(|error| StoreError::Decode(format!("bad cart document: {error}")))?;

            // Whole-document write, conditional on the version we read. A
            // mismatch means another writer landed in between; re-read and
            // re-apply rather than clobbering their update.
            let result = sqlx::query(
                "UPDATE cart_documents
                 SET document = ?, version = version + 1, updated_at = ?
                 WHERE cart_key = ? AND version = ?",
            )
            .bind(&payload)
            .bind(&now_raw)
            .bind(&document.cart_key)
            .bind(document.version)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

            if result.rows_affected() == 1 {
                return Ok(ItemUpsert { item: entry.into_cart_item()?, created });
            }
        }

        Err(StoreError::Conflict)
    }
}

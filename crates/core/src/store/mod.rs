use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::cart::{Cart, CartId, CartItem, CustomerId};
use crate::domain::product::Product;

pub mod memory;

pub use memory::InMemoryCartStore;

/// Outcome of a cart-creation request. `created` is false on the idempotent
/// path, where the existing cart's identifier is returned instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CartCreated {
    pub cart_id: CartId,
    pub customer_id: CustomerId,
    pub created: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an item upsert: the resulting line entry plus whether it was
/// freshly inserted or overwrote an existing (cart, product) entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemUpsert {
    pub item: CartItem,
    pub created: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("no cart exists for customer {0}")]
    CartNotFound(CustomerId),
    #[error("concurrent cart modification exhausted retries")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Backend-agnostic cart persistence contract. One implementation is chosen
/// at process construction and injected into the service; request handlers
/// never branch on which backend is active.
///
/// Implementations:
/// - `RelationalCartStore` (trolley-db): normalized carts + cart-items tables
/// - `DocumentCartStore` (trolley-db): one document per cart, embedded items
/// - [`InMemoryCartStore`]: test double
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Idempotent create: at most one cart per customer, ever.
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartCreated, StoreError>;

    /// Full cart view with items ordered most-recent-mutation-first.
    /// Returns `None` when the customer has no cart.
    async fn find_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, StoreError>;

    /// Insert-or-update keyed on (cart, product). The product's manufacturer
    /// and category are denormalized into the stored entry at write time.
    async fn upsert_item(
        &self,
        customer_id: CustomerId,
        product: &Product,
        quantity: i64,
    ) -> Result<ItemUpsert, StoreError>;
}

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::domain::cart::{Cart, CartId, CartItem, CustomerId};
use crate::domain::product::Product;

use super::{CartCreated, CartStore, ItemUpsert, StoreError};

#[derive(Default)]
struct State {
    carts: HashMap<i64, Cart>,
    next_cart_id: i64,
}

/// In-process cart store backing service-level unit tests.
#[derive(Default)]
pub struct InMemoryCartStore {
    state: Mutex<State>,
}

#[async_trait::async_trait]
impl CartStore for InMemoryCartStore {
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartCreated, StoreError> {
        let mut state = self.state.lock().expect("cart store lock poisoned");

        if let Some(cart) = state.carts.get(&customer_id.0) {
            return Ok(CartCreated {
                cart_id: cart.id,
                customer_id,
                created: false,
                created_at: cart.created_at,
            });
        }

        state.next_cart_id += 1;
        let cart_id = CartId(state.next_cart_id);
        let now = Utc::now();
        state.carts.insert(
            customer_id.0,
            Cart { id: cart_id, customer_id, items: Vec::new(), created_at: now, updated_at: now },
        );

        Ok(CartCreated { cart_id, customer_id, created: true, created_at: now })
    }

    async fn find_cart(&self, customer_id: CustomerId) -> Result<Option<Cart>, StoreError> {
        let state = self.state.lock().expect("cart store lock poisoned");

        Ok(state.carts.get(&customer_id.0).map(|cart| {
            let mut view = cart.clone();
            view.items
                .sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
            view
        }))
    }

    async fn upsert_item(
        &self,
        customer_id: CustomerId,
        product: &Product,
        quantity: i64,
    ) -> Result<ItemUpsert, StoreError> {
        let mut state = self.state.lock().expect("cart store lock poisoned");

        let cart = state
            .carts
            .get_mut(&customer_id.0)
            .ok_or(StoreError::CartNotFound(customer_id))?;

        let now = Utc::now();
        cart.updated_at = now;

        if let Some(entry) = cart.items.iter_mut().find(|item| item.product_id == product.id) {
            entry.quantity = quantity;
            entry.manufacturer = product.manufacturer.clone();
            entry.category = product.category.clone();
            entry.updated_at = now;
            return Ok(ItemUpsert { item: entry.clone(), created: false });
        }

        let item = CartItem {
            id: cart.items.len() as i64 + 1,
            product_id: product.id,
            manufacturer: product.manufacturer.clone(),
            category: product.category.clone(),
            quantity,
            created_at: now,
            updated_at: now,
        };
        cart.items.push(item.clone());

        Ok(ItemUpsert { item, created: true })
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog;
    use crate::domain::cart::CustomerId;
    use crate::store::{CartStore, InMemoryCartStore, StoreError};

    #[tokio::test]
    async fn create_cart_is_idempotent_per_customer() {
        let store = InMemoryCartStore::default();

        let first = store.create_cart(CustomerId(7)).await.expect("create");
        let second = store.create_cart(CustomerId(7)).await.expect("repeat create");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.cart_id, second.cart_id);
    }

    #[tokio::test]
    async fn upsert_without_cart_reports_cart_not_found() {
        let store = InMemoryCartStore::default();
        let products = catalog::generate(1);

        let result = store.upsert_item(CustomerId(99), &products[0], 1).await;

        assert_eq!(result, Err(StoreError::CartNotFound(CustomerId(99))));
    }

    #[tokio::test]
    async fn repeat_upsert_overwrites_quantity_in_place() {
        let store = InMemoryCartStore::default();
        let products = catalog::generate(1);
        store.create_cart(CustomerId(1)).await.expect("create");

        let created = store.upsert_item(CustomerId(1), &products[0], 3).await.expect("insert");
        let updated = store.upsert_item(CustomerId(1), &products[0], 5).await.expect("update");

        assert!(created.created);
        assert!(!updated.created);
        assert_eq!(updated.item.id, created.item.id);
        assert_eq!(updated.item.quantity, 5);
        assert_eq!(updated.item.created_at, created.item.created_at);

        let cart = store.find_cart(CustomerId(1)).await.expect("find").expect("cart");
        assert_eq!(cart.items.len(), 1);
    }
}

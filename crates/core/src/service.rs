use std::sync::Arc;

use crate::catalog::ProductCatalog;
use crate::domain::cart::{Cart, CustomerId};
use crate::domain::product::ProductId;
use crate::errors::CartError;
use crate::store::{CartCreated, CartStore, ItemUpsert};

/// Backend-agnostic cart façade. The store implementation is chosen once at
/// process construction and injected here; the service itself is stateless
/// beyond its two collaborators.
pub struct CartService {
    store: Arc<dyn CartStore>,
    catalog: Arc<ProductCatalog>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>, catalog: Arc<ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Creates the customer's cart, or returns the existing one with
    /// `created: false`. Repeated calls never produce a second cart.
    pub async fn create_cart(&self, customer_id: i64) -> Result<CartCreated, CartError> {
        let customer_id = validate_customer_id(customer_id)?;
        Ok(self.store.create_cart(customer_id).await?)
    }

    pub async fn get_cart(&self, customer_id: i64) -> Result<Cart, CartError> {
        let customer_id = validate_customer_id(customer_id)?;
        self.store.find_cart(customer_id).await?.ok_or_else(|| {
            CartError::NotFound(format!("no shopping cart exists for customer {customer_id}"))
        })
    }

    /// Upserts one (cart, product) line. The product must exist in the
    /// catalog; its manufacturer and category are denormalized into the
    /// stored entry by the active backend.
    pub async fn add_or_update_item(
        &self,
        customer_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> Result<ItemUpsert, CartError> {
        let customer_id = validate_customer_id(customer_id)?;
        if quantity < 1 {
            return Err(CartError::Validation("quantity must be at least 1".to_string()));
        }

        let product = self
            .catalog
            .get(ProductId(product_id))
            .ok_or_else(|| CartError::Validation("product not found".to_string()))?;

        Ok(self.store.upsert_item(customer_id, &product, quantity).await?)
    }
}

fn validate_customer_id(customer_id: i64) -> Result<CustomerId, CartError> {
    if customer_id < 1 {
        return Err(CartError::Validation(
            "customer_id must be a positive integer".to_string(),
        ));
    }
    Ok(CustomerId(customer_id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::catalog::{generate, ProductCatalog};
    use crate::errors::CartError;
    use crate::service::CartService;
    use crate::store::InMemoryCartStore;

    fn service() -> CartService {
        CartService::new(
            Arc::new(InMemoryCartStore::default()),
            Arc::new(ProductCatalog::from_products(generate(10))),
        )
    }

    #[tokio::test]
    async fn create_cart_rejects_non_positive_customer_id() {
        let service = service();

        for bad in [0, -1] {
            let result = service.create_cart(bad).await;
            assert!(matches!(result, Err(CartError::Validation(_))), "id {bad} should fail");
        }
    }

    #[tokio::test]
    async fn create_cart_twice_returns_same_id_without_error() {
        let service = service();

        let first = service.create_cart(42).await.expect("first create");
        let second = service.create_cart(42).await.expect("second create");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.cart_id, second.cart_id);
    }

    #[tokio::test]
    async fn get_cart_for_unknown_customer_is_not_found() {
        let service = service();

        let result = service.get_cart(42).await;

        assert!(matches!(result, Err(CartError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_item_requires_existing_cart() {
        let service = service();

        let result = service.add_or_update_item(42, 1, 2).await;

        assert!(matches!(result, Err(CartError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_item_rejects_zero_quantity_and_unknown_product() {
        let service = service();
        service.create_cart(42).await.expect("create");

        let zero_quantity = service.add_or_update_item(42, 1, 0).await;
        assert!(matches!(zero_quantity, Err(CartError::Validation(_))));

        let unknown_product = service.add_or_update_item(42, 9999, 2).await;
        assert!(matches!(
            unknown_product,
            Err(CartError::Validation(ref message)) if message == "product not found"
        ));
    }

    #[tokio::test]
    async fn add_then_update_then_fetch_reflects_final_quantity() {
        let service = service();
        service.create_cart(42).await.expect("create");

        let created = service.add_or_update_item(42, 7, 2).await.expect("add");
        assert!(created.created);
        assert_eq!(created.item.quantity, 2);

        let updated = service.add_or_update_item(42, 7, 9).await.expect("update");
        assert!(!updated.created);
        assert_eq!(updated.item.quantity, 9);
        assert_eq!(updated.item.id, created.item.id);

        let cart = service.get_cart(42).await.expect("get");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].product_id.0, 7);
        assert_eq!(cart.items[0].quantity, 9);
    }

    #[tokio::test]
    async fn item_denormalizes_manufacturer_and_category_from_catalog() {
        let catalog = Arc::new(ProductCatalog::from_products(generate(5)));
        let service =
            CartService::new(Arc::new(InMemoryCartStore::default()), Arc::clone(&catalog));
        service.create_cart(1).await.expect("create");

        let product = catalog.get(crate::domain::product::ProductId(3)).expect("product 3");
        let upsert = service.add_or_update_item(1, 3, 1).await.expect("add");

        assert_eq!(upsert.item.manufacturer, product.manufacturer);
        assert_eq!(upsert.item.category, product.category);
    }
}

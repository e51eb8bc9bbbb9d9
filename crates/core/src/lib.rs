pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod service;
pub mod store;

pub use catalog::{ProductCatalog, SearchOutcome};
pub use domain::cart::{Cart, CartId, CartItem, CustomerId};
pub use domain::product::{Product, ProductId};
pub use errors::CartError;
pub use service::CartService;
pub use store::{CartCreated, CartStore, InMemoryCartStore, ItemUpsert, StoreError};

pub mod connection;
pub mod migrations;
pub mod seed;
pub mod stores;

pub use connection::{connect, connect_with_settings, DbPool};
pub use seed::{seed_products, SeedOutcome};
pub use stores::{DocumentCartStore, RelationalCartStore};

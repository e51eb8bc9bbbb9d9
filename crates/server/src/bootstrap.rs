use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use trolley_core::catalog::{self, ProductCatalog};
use trolley_core::config::{AppConfig, CartBackend, ConfigError, LoadOptions};
use trolley_core::service::CartService;
use trolley_core::store::CartStore;
use trolley_db::stores::{DocumentCartStore, RelationalCartStore};
use trolley_db::{connect_with_settings, migrations, seed, DbPool, SeedOutcome};

/// Composition root output. The cart store is selected exactly once, here;
/// everything downstream works against the injected service.
pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub catalog: Arc<ProductCatalog>,
    pub service: Arc<CartService>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("product seeding failed: {0}")]
    Seed(#[source] sqlx::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        backend = config.backend.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let products = catalog::generate(config.catalog.product_count);
    match seed::seed_products(&db_pool, &products).await.map_err(BootstrapError::Seed)? {
        SeedOutcome::Seeded { inserted } => {
            info!(event_name = "system.bootstrap.products_seeded", inserted, "products seeded");
        }
        SeedOutcome::Skipped { existing } => {
            info!(
                event_name = "system.bootstrap.seed_skipped",
                existing, "products already present, seeding skipped"
            );
        }
    }
    let catalog = Arc::new(ProductCatalog::from_products(products));

    let store: Arc<dyn CartStore> = match config.backend {
        CartBackend::Relational => Arc::new(RelationalCartStore::new(db_pool.clone())),
        CartBackend::Document => Arc::new(DocumentCartStore::new(db_pool.clone())),
    };
    let service = Arc::new(CartService::new(store, Arc::clone(&catalog)));

    Ok(Application { config, db_pool, catalog, service })
}

//! Startup wiring shared by the server and the migration tool.

use orders::persistence::{MemoryOrderStore, PostgresOrderStore, SledOrderStore};
use orders::{CachedOrderRepository, OrderStore};
use shared::config::{Config, DurableBackend, PostgresConfig};
use shared::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage_engine::MokaOrderCache;
use tracing::{info, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const SLED_DIR: &str = "orders.sled";

/// Load variables from the file named by `CONFIG_PATH`, else from `.env` in
/// the working directory. Call before tracing is installed and log the result
/// afterwards.
pub fn load_env_file() -> std::result::Result<PathBuf, dotenvy::Error> {
    match std::env::var("CONFIG_PATH") {
        Ok(path) => dotenvy::from_path(&path).map(|_| PathBuf::from(path)),
        Err(_) => dotenvy::dotenv(),
    }
}

/// Build the PostgreSQL store and prove it is reachable within `PING_TIMEOUT`.
pub async fn connect_postgres(config: &PostgresConfig) -> Result<PostgresOrderStore> {
    info!(
        "Connecting to database: {}@{}:{}/{}",
        config.user, config.host, config.port, config.dbname
    );

    let store = PostgresOrderStore::connect(config)?;
    tokio::time::timeout(PING_TIMEOUT, store.ping())
        .await
        .map_err(|_| {
            Error::Unavailable(format!("database ping timed out after {:?}", PING_TIMEOUT))
        })??;

    info!("Postgres connected successfully");
    Ok(store)
}

pub async fn build_durable_store(config: &Config) -> Result<Arc<dyn OrderStore>> {
    match config.backend {
        DurableBackend::Postgres => Ok(Arc::new(connect_postgres(&config.postgres).await?)),
        DurableBackend::Sled => {
            let path = Path::new(&config.data_dir).join(SLED_DIR);
            info!("Opening sled order store at {}", path.display());
            Ok(Arc::new(SledOrderStore::open(path)?))
        }
        DurableBackend::Memory => {
            warn!("Using the in-memory durable store, orders are lost on restart");
            Ok(Arc::new(MemoryOrderStore::new()))
        }
    }
}

/// Compose the moka cache and the durable store into the cache-aside
/// repository. The cache also serves the aggregate listing.
pub fn build_repository(config: &Config, durable: Arc<dyn OrderStore>) -> CachedOrderRepository {
    let cache = Arc::new(MokaOrderCache::new(
        config.cache.ttl,
        config.cache.max_entries,
    ));
    info!(
        ttl = ?cache.ttl(),
        max_entries = ?config.cache.max_entries,
        "Order cache initialized"
    );

    CachedOrderRepository::new(cache.clone(), durable).with_list_cache(cache)
}

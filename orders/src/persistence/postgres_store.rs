//! PostgreSQL-backed durable order store.
//!
//! Uses a deadpool-postgres connection pool and parameterized statements
//! against a single `orders` table. This store is the source of truth: a
//! write is visible to every subsequent read once its statement commits.

use crate::domain::{Order, OrderId};
use crate::ports::OrderStore;
use async_trait::async_trait;
use deadpool_postgres::{
    Config as PoolSettings, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime,
};
use futures::{TryStreamExt, pin_mut};
use shared::config::PostgresConfig;
use shared::{Error, Result};
use std::error::Error as _;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) const CREATE_ORDERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    item TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    created_at TIMESTAMP DEFAULT NOW(),
    updated_at TIMESTAMP DEFAULT NOW()
)";
pub(crate) const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at)";

const INSERT_ORDER: &str = "INSERT INTO orders (id, item, quantity) VALUES ($1, $2, $3)";
const SELECT_ORDER: &str = "SELECT id, item, quantity FROM orders WHERE id = $1";
const UPDATE_ORDER: &str =
    "UPDATE orders SET item = $2, quantity = $3, updated_at = NOW() WHERE id = $1";
const DELETE_ORDER: &str = "DELETE FROM orders WHERE id = $1";
const SELECT_ORDERS: &str = "SELECT id, item, quantity FROM orders";

pub struct PostgresOrderStore {
    pool: Pool,
}

impl PostgresOrderStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from configuration. Connections are opened lazily.
    pub fn connect(config: &PostgresConfig) -> Result<Self> {
        let mut settings = PoolSettings::new();
        settings.host = Some(config.host.clone());
        settings.port = Some(config.port);
        settings.dbname = Some(config.dbname.clone());
        settings.user = Some(config.user.clone());
        settings.password = Some(config.password.clone());
        settings.connect_timeout = Some(CONNECT_TIMEOUT);
        settings.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.pool_size);
        pool_config.timeouts.wait = Some(CONNECT_TIMEOUT);
        pool_config.timeouts.create = Some(CONNECT_TIMEOUT);
        settings.pool = Some(pool_config);

        let pool = settings
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::Internal(format!("Failed to create pool: {}", e)))?;

        Ok(Self::new(pool))
    }

    /// Round-trip a trivial statement to prove the database is reachable.
    pub async fn ping(&self) -> Result<()> {
        let client = self.client().await?;
        client.simple_query("SELECT 1").await.map_err(classify)?;
        Ok(())
    }

    /// Create the `orders` table and its index if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(CREATE_ORDERS_TABLE)
            .await
            .map_err(classify)?;
        client
            .batch_execute(CREATE_CREATED_AT_INDEX)
            .await
            .map_err(classify)?;
        info!("orders table is up to date");
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

fn pool_error(err: PoolError) -> Error {
    match err {
        PoolError::Backend(e) => classify(e),
        other => Error::Unavailable(format!("connection pool: {}", other)),
    }
}

/// Translate a driver error into the shared taxonomy.
fn classify(err: tokio_postgres::Error) -> Error {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return Error::AlreadyExists;
    }

    // Only transport failures are outages. Client-side errors (parameter
    // encoding, unexpected row counts, bad config) are not.
    let transport = err
        .source()
        .is_some_and(|source| source.downcast_ref::<std::io::Error>().is_some());
    if err.is_closed() || transport {
        return Error::Unavailable(format!("postgres: {}", err));
    }

    Error::Internal(format!("postgres: {}", err))
}

fn decode_row(row: &Row) -> Result<Order> {
    let id: String = row
        .try_get(0)
        .map_err(|e| Error::Internal(format!("scanning order id: {}", e)))?;
    let item: String = row
        .try_get(1)
        .map_err(|e| Error::Internal(format!("scanning order item: {}", e)))?;
    let quantity: i32 = row
        .try_get(2)
        .map_err(|e| Error::Internal(format!("scanning order quantity: {}", e)))?;

    Ok(Order::new(OrderId::from(id), item, quantity))
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let client = self.client().await?;
        let statement = client.prepare_cached(INSERT_ORDER).await.map_err(classify)?;

        client
            .execute(
                &statement,
                &[&order.id.as_str(), &order.item, &order.quantity],
            )
            .await
            .map_err(classify)?;

        debug!(order_id = %order.id, "inserted order");
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        let client = self.client().await?;
        let statement = client.prepare_cached(SELECT_ORDER).await.map_err(classify)?;

        let row = client
            .query_opt(&statement, &[&id.as_str()])
            .await
            .map_err(classify)?
            .ok_or(Error::NotFound)?;

        decode_row(&row)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        let client = self.client().await?;
        let statement = client.prepare_cached(UPDATE_ORDER).await.map_err(classify)?;

        let affected = client
            .execute(
                &statement,
                &[&order.id.as_str(), &order.item, &order.quantity],
            )
            .await
            .map_err(classify)?;

        if affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        let client = self.client().await?;
        let statement = client.prepare_cached(DELETE_ORDER).await.map_err(classify)?;

        let affected = client
            .execute(&statement, &[&id.as_str()])
            .await
            .map_err(classify)?;

        if affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let client = self.client().await?;
        let statement = client.prepare_cached(SELECT_ORDERS).await.map_err(classify)?;

        let no_params: [&(dyn ToSql + Sync); 0] = [];
        let rows = client
            .query_raw(&statement, no_params.iter().copied())
            .await
            .map_err(classify)?;
        pin_mut!(rows);

        let mut orders = Vec::new();
        while let Some(row) = rows.try_next().await.map_err(classify)? {
            orders.push(decode_row(&row)?);
        }

        Ok(orders)
    }
}

impl std::fmt::Debug for PostgresOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.pool.status();
        f.debug_struct("PostgresOrderStore")
            .field("pool_size", &status.size)
            .field("pool_available", &status.available)
            .finish()
    }
}

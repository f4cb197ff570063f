use crate::domain::{Order, OrderId};
use crate::ports::OrderStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

const ORDERS_TREE: &str = "orders";

/// On-disk row layout, mirroring the relational `orders` table.
#[derive(Debug, Serialize, Deserialize)]
struct StoredOrder {
    id: String,
    item: String,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredOrder {
    fn fresh(order: &Order) -> Self {
        let now = Utc::now();
        Self {
            id: order.id.to_string(),
            item: order.item.clone(),
            quantity: order.quantity,
            created_at: now,
            updated_at: now,
        }
    }

    fn revised(&self, order: &Order) -> Self {
        Self {
            id: self.id.clone(),
            item: order.item.clone(),
            quantity: order.quantity,
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }

    fn into_order(self) -> Order {
        Order::new(OrderId::from(self.id), self.item, self.quantity)
    }
}

/// Sled-based durable order store for single-node deployments
pub struct SledOrderStore {
    db: sled::Db,
    orders: sled::Tree,
}

impl SledOrderStore {
    /// Open (or create) the store at `path`.
    /// Creates the parent directory if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Internal(format!("Failed to create directory: {}", e)))?;
        }

        let db = sled::open(path)
            .map_err(|e| Error::Unavailable(format!("Failed to open Sled database: {}", e)))?;
        let orders = db.open_tree(ORDERS_TREE).map_err(storage_error)?;

        Ok(Self { db, orders })
    }

    /// Flush after a write that has already been applied to the tree. The
    /// write is visible either way, so a failed flush is logged, not returned.
    async fn flush(&self, id: &OrderId) -> Result<()> {
        settle_flush(self.orders.flush_async().await, id)
    }
}

fn settle_flush(flushed: sled::Result<usize>, id: &OrderId) -> Result<()> {
    if let Err(e) = flushed {
        warn!(order_id = %id, error = %e, "sled flush failed after write");
    }
    Ok(())
}

fn storage_error(err: sled::Error) -> Error {
    match err {
        sled::Error::Io(e) => Error::Unavailable(format!("Sled IO error: {}", e)),
        other => Error::Internal(format!("Sled error: {}", other)),
    }
}

fn encode(record: &StoredOrder) -> Result<Vec<u8>> {
    serde_json::to_vec(record)
        .map_err(|e| Error::Internal(format!("Failed to serialize order: {}", e)))
}

fn decode(bytes: &[u8]) -> Result<StoredOrder> {
    serde_json::from_slice(bytes)
        .map_err(|e| Error::Internal(format!("Failed to deserialize order: {}", e)))
}

#[async_trait]
impl OrderStore for SledOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        let value = encode(&StoredOrder::fresh(order))?;

        // Insert only if absent, atomically.
        let swapped = self
            .orders
            .compare_and_swap(order.id.as_str(), None::<&[u8]>, Some(value))
            .map_err(storage_error)?;

        if swapped.is_err() {
            return Err(Error::AlreadyExists);
        }

        self.flush(&order.id).await?;
        debug!(order_id = %order.id, "created order in sled");
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        let bytes = self
            .orders
            .get(id.as_str())
            .map_err(storage_error)?
            .ok_or(Error::NotFound)?;

        Ok(decode(&bytes)?.into_order())
    }

    async fn update(&self, order: &Order) -> Result<()> {
        loop {
            let current = self
                .orders
                .get(order.id.as_str())
                .map_err(storage_error)?
                .ok_or(Error::NotFound)?;
            let value = encode(&decode(&current)?.revised(order))?;

            let swapped = self
                .orders
                .compare_and_swap(order.id.as_str(), Some(&current), Some(value))
                .map_err(storage_error)?;

            // Lost a race with another writer, re-read and retry.
            if swapped.is_ok() {
                break;
            }
        }

        self.flush(&order.id).await?;
        debug!(order_id = %order.id, "updated order in sled");
        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        let removed = self.orders.remove(id.as_str()).map_err(storage_error)?;

        if removed.is_none() {
            return Err(Error::NotFound);
        }

        self.flush(id).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let mut orders = Vec::new();

        for result in self.orders.iter() {
            let (_, value) = result.map_err(storage_error)?;
            orders.push(decode(&value)?.into_order());
        }

        Ok(orders)
    }
}

impl std::fmt::Debug for SledOrderStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledOrderStore")
            .field("orders", &self.orders.len())
            .field("size_on_disk", &self.db.size_on_disk().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> SledOrderStore {
        SledOrderStore::open(dir.path().join("orders.sled")).unwrap()
    }

    #[tokio::test]
    async fn test_sled_store_crud() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = open_store(&temp_dir);
        let order = Order::place("pen", 10);

        store.create(&order).await.unwrap();
        assert_eq!(store.get(&order.id).await.unwrap(), order);

        let updated = Order::new(order.id.clone(), "pen", 5);
        store.update(&updated).await.unwrap();
        assert_eq!(store.get(&order.id).await.unwrap(), updated);
        assert_eq!(store.list().await.unwrap(), vec![updated]);

        store.delete(&order.id).await.unwrap();
        assert!(matches!(store.get(&order.id).await, Err(Error::NotFound)));
        assert!(matches!(store.delete(&order.id).await, Err(Error::NotFound)));
    }

    #[tokio::test]
    async fn test_sled_store_duplicate_create() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = open_store(&temp_dir);
        let order = Order::place("pen", 10);

        store.create(&order).await.unwrap();
        let result = store.create(&order).await;

        assert!(matches!(result, Err(Error::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_sled_store_update_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = open_store(&temp_dir);

        let result = store.update(&Order::place("pen", 1)).await;
        assert!(matches!(result, Err(Error::NotFound)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sled_store_update_keeps_created_at() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = open_store(&temp_dir);
        let order = Order::place("pen", 10);
        store.create(&order).await.unwrap();

        let before = decode(&store.orders.get(order.id.as_str()).unwrap().unwrap()).unwrap();
        store
            .update(&Order::new(order.id.clone(), "ink", 3))
            .await
            .unwrap();
        let after = decode(&store.orders.get(order.id.as_str()).unwrap().unwrap()).unwrap();

        assert_eq!(before.created_at, after.created_at);
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(after.item, "ink");
    }

    #[test]
    fn test_flush_failure_does_not_fail_the_write() {
        let failed: sled::Result<usize> =
            Err(sled::Error::Io(std::io::Error::other("disk full")));

        assert!(settle_flush(failed, &OrderId::from("o-1")).is_ok());
        assert!(settle_flush(Ok(128), &OrderId::from("o-1")).is_ok());
    }

    #[tokio::test]
    async fn test_sled_store_list_aborts_on_corrupt_row() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = open_store(&temp_dir);
        store.create(&Order::place("pen", 1)).await.unwrap();
        store.orders.insert("broken", b"not json".to_vec()).unwrap();

        assert!(matches!(store.list().await, Err(Error::Internal(_))));
    }
}

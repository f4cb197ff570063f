use crate::domain::{Order, OrderId};
use crate::ports::OrderStore;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use shared::{Error, Result};
use tracing::debug;

/// In-memory order store backed by a sharded `DashMap`.
///
/// Follows the durable contract (duplicate creates fail, missing ids are
/// `NotFound`), so it can stand in for either the durable store or the cache.
/// Each operation locks a single shard for its own duration only.
#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<OrderId, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &OrderId) -> bool {
        self.orders.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<()> {
        match self.orders.entry(order.id.clone()) {
            Entry::Occupied(_) => Err(Error::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                debug!(order_id = %order.id, "stored order in memory");
                Ok(())
            }
        }
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        self.orders
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::NotFound)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        match self.orders.get_mut(&order.id) {
            Some(mut entry) => {
                *entry = order.clone();
                Ok(())
            }
            None => Err(Error::NotFound),
        }
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        self.orders.remove(id).map(|_| ()).ok_or(Error::NotFound)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self
            .orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }
}

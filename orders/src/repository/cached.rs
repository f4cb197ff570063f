use crate::domain::{Order, OrderId};
use crate::ports::{ListCache, OrderStore};
use async_trait::async_trait;
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache-aside coordinator over a durable store and a cache store.
///
/// Writers never cache; only readers cache. Every mutation goes to the durable
/// store first and then invalidates the per-record cache entry, while `get`
/// and `list` repopulate the cache after a miss. Cache failures are logged and
/// swallowed, durable failures are returned unchanged.
///
/// No lock is held across the two store calls, so a slow or failing cache
/// never blocks a durable operation.
pub struct CachedOrderRepository {
    cache: Arc<dyn OrderStore>,
    list_cache: Option<Arc<dyn ListCache>>,
    durable: Arc<dyn OrderStore>,
}

impl CachedOrderRepository {
    pub fn new(cache: Arc<dyn OrderStore>, durable: Arc<dyn OrderStore>) -> Self {
        Self {
            cache,
            list_cache: None,
            durable,
        }
    }

    /// Enables the aggregate listing cache used by `list`.
    pub fn with_list_cache(mut self, list_cache: Arc<dyn ListCache>) -> Self {
        self.list_cache = Some(list_cache);
        self
    }

    /// Create an order from caller-supplied fields and a generated id.
    pub async fn place(&self, item: impl Into<String>, quantity: i32) -> Result<Order> {
        let order = Order::place(item, quantity);
        self.create(&order).await?;
        Ok(order)
    }

    /// Best-effort removal of the per-record cache entry.
    async fn invalidate(&self, id: &OrderId) {
        match self.cache.delete(id).await {
            Ok(()) | Err(Error::NotFound) => {}
            Err(e) => warn!(order_id = %id, error = %e, "failed to invalidate cached order"),
        }
    }
}

#[async_trait]
impl OrderStore for CachedOrderRepository {
    async fn create(&self, order: &Order) -> Result<()> {
        self.durable.create(order).await?;

        // Clears a stale entry left under a reused id. The new record itself
        // is not cached here; the next read populates it.
        self.invalidate(&order.id).await;
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        match self.cache.get(id).await {
            Ok(order) => {
                debug!(order_id = %id, "order cache hit");
                return Ok(order);
            }
            Err(Error::NotFound) => debug!(order_id = %id, "order cache miss"),
            Err(e) => warn!(order_id = %id, error = %e, "order cache read failed"),
        }

        let order = self.durable.get(id).await?;

        if let Err(e) = self.cache.create(&order).await {
            warn!(order_id = %id, error = %e, "failed to populate order cache");
        }

        Ok(order)
    }

    async fn update(&self, order: &Order) -> Result<()> {
        self.durable.update(order).await?;
        self.invalidate(&order.id).await;
        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        self.durable.delete(id).await?;
        self.invalidate(id).await;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let Some(list_cache) = &self.list_cache else {
            return self.durable.list().await;
        };

        match list_cache.load_list().await {
            Ok(orders) => {
                debug!(count = orders.len(), "order list cache hit");
                return Ok(orders);
            }
            Err(Error::NotFound) => debug!("order list cache miss"),
            Err(e) => warn!(error = %e, "order list cache read failed"),
        }

        let orders = self.durable.list().await?;

        if let Err(e) = list_cache.save_list(&orders).await {
            warn!(error = %e, "failed to populate order list cache");
        }

        Ok(orders)
    }
}

impl std::fmt::Debug for CachedOrderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedOrderRepository")
            .field("list_cache", &self.list_cache.is_some())
            .finish()
    }
}

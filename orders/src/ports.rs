use crate::domain::{Order, OrderId};
use async_trait::async_trait;
use shared::Result;

// Ports are the pluggable extension points for the durable and cache backends

/// Port for order storage.
///
/// Implemented by the durable adapters, the cache adapter, and the cache-aside
/// coordinator that composes them. `list` makes no ordering guarantee.
#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Persist a new order. Durable stores fail with `AlreadyExists` on a
    /// duplicate id; caches overwrite.
    async fn create(&self, order: &Order) -> Result<()>;

    /// Fetch an order or fail with `NotFound`.
    async fn get(&self, id: &OrderId) -> Result<Order>;

    /// Replace the mutable fields of an existing order.
    async fn update(&self, order: &Order) -> Result<()>;

    /// Remove an order.
    async fn delete(&self, id: &OrderId) -> Result<()>;

    async fn list(&self) -> Result<Vec<Order>>;
}

/// Optional bulk capability: a single aggregate entry holding a full listing.
///
/// Kept separate from `OrderStore` so a coordinator's use of it is visible in
/// its constructor rather than probed for at runtime.
#[async_trait]
pub trait ListCache: Send + Sync + 'static {
    /// Load the cached listing. A miss is an error, never an empty `Vec`.
    async fn load_list(&self) -> Result<Vec<Order>>;

    async fn save_list(&self, orders: &[Order]) -> Result<()>;
}

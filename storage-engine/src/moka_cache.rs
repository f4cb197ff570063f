use async_trait::async_trait;
use bytes::Bytes;
use moka::future::Cache;
use orders::{ListCache, Order, OrderId, OrderStore};
use shared::{Error, Result};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, warn};

pub const ORDER_KEY_PREFIX: &str = "order:";
pub const ORDER_LIST_KEY: &str = "orders:list";
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);
/// Moka rejects a time-to-live above 1000 years.
pub const MAX_TTL: Duration = Duration::from_secs(1000 * 365 * 24 * 3600);

const FIELD_ID: &str = "id";
const FIELD_ITEM: &str = "item";
const FIELD_QUANTITY: &str = "quantity";

/// Value stored under a cache key: a field map for single orders, or an
/// opaque JSON payload for the aggregate listing.
#[derive(Clone, Debug)]
enum CachedValue {
    Fields(HashMap<String, String>),
    Blob(Bytes),
}

/// Moka-backed order cache.
///
/// Every entry shares one time-to-live. Per-record entries live under
/// `order:<id>` and the full listing under `orders:list`; the two are not kept
/// consistent with each other. A miss is always an error, never an empty
/// success.
pub struct MokaOrderCache {
    entries: Cache<String, CachedValue>,
    ttl: Duration,
}

impl MokaOrderCache {
    /// Create a cache with the given TTL, bounded to `max_entries` if set.
    /// A TTL above `MAX_TTL` is clamped.
    pub fn new(ttl: Duration, max_entries: Option<u64>) -> Self {
        if ttl > MAX_TTL {
            warn!(requested = ?ttl, "cache TTL exceeds the supported maximum, clamping");
        }
        let ttl = ttl.min(MAX_TTL);
        let mut builder = Cache::builder().name("orders").time_to_live(ttl);

        if let Some(capacity) = max_entries {
            builder = builder.max_capacity(capacity);
        }

        Self {
            entries: builder.build(),
            ttl,
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL, None)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn record_key(id: &OrderId) -> String {
        format!("{}{}", ORDER_KEY_PREFIX, id)
    }

    /// Whether a live per-record entry exists for `id`.
    pub fn contains(&self, id: &OrderId) -> bool {
        self.entries.contains_key(&Self::record_key(id))
    }
}

fn to_fields(order: &Order) -> HashMap<String, String> {
    HashMap::from([
        (FIELD_ID.to_string(), order.id.to_string()),
        (FIELD_ITEM.to_string(), order.item.clone()),
        (FIELD_QUANTITY.to_string(), order.quantity.to_string()),
    ])
}

fn from_fields(fields: &HashMap<String, String>) -> Result<Order> {
    let field = |name: &str| {
        fields
            .get(name)
            .ok_or_else(|| Error::Invalid(format!("cached order is missing `{}`", name)))
    };

    let id = field(FIELD_ID)?;
    let item = field(FIELD_ITEM)?;
    let quantity = field(FIELD_QUANTITY)?
        .parse::<i32>()
        .map_err(|e| Error::Invalid(format!("cached order quantity: {}", e)))?;

    Ok(Order::new(OrderId::new(id.as_str()), item.as_str(), quantity))
}

#[async_trait]
impl OrderStore for MokaOrderCache {
    async fn create(&self, order: &Order) -> Result<()> {
        self.entries
            .insert(
                Self::record_key(&order.id),
                CachedValue::Fields(to_fields(order)),
            )
            .await;
        Ok(())
    }

    async fn get(&self, id: &OrderId) -> Result<Order> {
        match self.entries.get(&Self::record_key(id)).await {
            Some(CachedValue::Fields(fields)) => from_fields(&fields),
            Some(CachedValue::Blob(_)) => Err(Error::Invalid(format!(
                "cache entry for order {} is not a field map",
                id
            ))),
            None => Err(Error::NotFound), // absent or expired
        }
    }

    // Mutations only ever evict; the next read repopulates.
    async fn update(&self, order: &Order) -> Result<()> {
        self.entries.invalidate(&Self::record_key(&order.id)).await;
        Ok(())
    }

    async fn delete(&self, id: &OrderId) -> Result<()> {
        self.entries.invalidate(&Self::record_key(id)).await;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        self.load_list().await
    }
}

#[async_trait]
impl ListCache for MokaOrderCache {
    async fn load_list(&self) -> Result<Vec<Order>> {
        match self.entries.get(ORDER_LIST_KEY).await {
            Some(CachedValue::Blob(payload)) => serde_json::from_slice(&payload)
                .map_err(|e| Error::Invalid(format!("cached order list: {}", e))),
            Some(CachedValue::Fields(_)) => Err(Error::Invalid(
                "cached order list is not a JSON payload".to_string(),
            )),
            None => Err(Error::NotFound),
        }
    }

    async fn save_list(&self, orders: &[Order]) -> Result<()> {
        let payload = serde_json::to_vec(orders)
            .map_err(|e| Error::Internal(format!("Failed to serialize order list: {}", e)))?;

        self.entries
            .insert(
                ORDER_LIST_KEY.to_string(),
                CachedValue::Blob(Bytes::from(payload)),
            )
            .await;
        debug!(count = orders.len(), "cached order list");
        Ok(())
    }
}

impl Debug for MokaOrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaOrderCache")
            .field("ttl", &self.ttl)
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

use orders::CachedOrderRepository;
use std::sync::Arc;

/// Server state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    pub orders: Arc<CachedOrderRepository>,
}

impl AppState {
    pub fn new(orders: CachedOrderRepository) -> Self {
        Self {
            orders: Arc::new(orders),
        }
    }
}

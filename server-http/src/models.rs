use orders::Order;
use serde::{Deserialize, Serialize};

// === Order Models ===

/// Body of both create and update. Missing fields default so that
/// validation, not deserialization, reports them.
#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct DeleteOrderResponse {
    pub success: bool,
}

// === Service Models ===

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

use crate::error::ApiError;
use crate::models::{
    CreateOrderResponse, DeleteOrderResponse, ListOrdersResponse, OrderRequest, OrderResponse,
};
use crate::state::AppState;
use crate::validation::{validate_order_id, validate_order_request};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use orders::{Order, OrderId, OrderStore};
use tracing::info;

/// POST /v1/orders
pub async fn create_order(
    State(state): State<AppState>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let Json(req) = payload?;
    validate_order_request(&req)?;

    let order = state.orders.place(req.item, req.quantity).await?;
    info!(order_id = %order.id, "order created");

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            id: order.id.to_string(),
        }),
    ))
}

/// GET /v1/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    validate_order_id(&id)?;
    let id = OrderId::from(id);

    let order = state
        .orders
        .get(&id)
        .await
        .map_err(|e| ApiError::for_order(e, &id))?;

    Ok(Json(OrderResponse { order }))
}

/// PUT /v1/orders/:id
pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    validate_order_id(&id)?;
    let Json(req) = payload?;
    validate_order_request(&req)?;

    let order = Order::new(OrderId::from(id), req.item, req.quantity);
    state
        .orders
        .update(&order)
        .await
        .map_err(|e| ApiError::for_order(e, &order.id))?;
    info!(order_id = %order.id, "order updated");

    Ok(Json(OrderResponse { order }))
}

/// DELETE /v1/orders/:id
pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteOrderResponse>, ApiError> {
    validate_order_id(&id)?;
    let id = OrderId::from(id);

    state
        .orders
        .delete(&id)
        .await
        .map_err(|e| ApiError::for_order(e, &id))?;
    info!(order_id = %id, "order deleted");

    Ok(Json(DeleteOrderResponse { success: true }))
}

/// GET /v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let orders = state.orders.list().await?;

    Ok(Json(ListOrdersResponse { orders }))
}

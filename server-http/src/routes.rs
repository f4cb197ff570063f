use crate::error::ApiError;
use crate::handlers;
use crate::middleware::access_log;
use crate::state::AppState;
use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware,
    routing::{get, post},
    BoxError, Router,
};
use std::time::Duration;
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::{Layer, ServiceBuilder};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Build and configure the application router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Order routes
        .route(
            "/v1/orders",
            post(handlers::create_order).get(handlers::list_orders),
        )
        .route(
            "/v1/orders/{id}",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        // Middleware, innermost first
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .layer(middleware::from_fn(access_log))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The router wrapped in trailing-slash normalization. Path rewriting has to
/// happen before routing, so this wraps the router rather than layering it.
pub fn build_app(state: AppState, request_timeout: Duration) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state, request_timeout))
}

async fn handle_timeout_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::timeout()
    } else {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {}", err),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, Response};
    use orders::persistence::MemoryOrderStore;
    use orders::{CachedOrderRepository, Order, OrderId, OrderStore};
    use serde_json::{json, Value};
    use shared::{Error, Result};
    use std::sync::Arc;
    use storage_engine::MokaOrderCache;
    use tower::ServiceExt;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Durable store that answers only after a delay.
    struct SlowStore {
        inner: MemoryOrderStore,
        delay: Duration,
    }

    #[async_trait]
    impl OrderStore for SlowStore {
        async fn create(&self, order: &Order) -> Result<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.create(order).await
        }

        async fn get(&self, id: &OrderId) -> Result<Order> {
            tokio::time::sleep(self.delay).await;
            self.inner.get(id).await
        }

        async fn update(&self, order: &Order) -> Result<()> {
            self.inner.update(order).await
        }

        async fn delete(&self, id: &OrderId) -> Result<()> {
            self.inner.delete(id).await
        }

        async fn list(&self) -> Result<Vec<Order>> {
            tokio::time::sleep(self.delay).await;
            self.inner.list().await
        }
    }

    /// Durable store whose backend cannot be reached.
    struct UnreachableStore;

    #[async_trait]
    impl OrderStore for UnreachableStore {
        async fn create(&self, _order: &Order) -> Result<()> {
            Err(Error::Unavailable("connection refused".into()))
        }

        async fn get(&self, _id: &OrderId) -> Result<Order> {
            Err(Error::Unavailable("connection refused".into()))
        }

        async fn update(&self, _order: &Order) -> Result<()> {
            Err(Error::Unavailable("connection refused".into()))
        }

        async fn delete(&self, _id: &OrderId) -> Result<()> {
            Err(Error::Unavailable("connection refused".into()))
        }

        async fn list(&self) -> Result<Vec<Order>> {
            Err(Error::Unavailable("connection refused".into()))
        }
    }

    fn state_with(durable: Arc<dyn OrderStore>) -> AppState {
        let cache = Arc::new(MokaOrderCache::with_default_ttl());
        AppState::new(CachedOrderRepository::new(cache.clone(), durable).with_list_cache(cache))
    }

    fn app() -> NormalizePath<Router> {
        build_app(state_with(Arc::new(MemoryOrderStore::new())), TIMEOUT)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn read_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &NormalizePath<Router>, item: &str, quantity: i32) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                json!({"item": item, "quantity": quantity}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        read_json(response).await["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/health"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({"message": "OK"}));
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let app = app();
        let id = create(&app, "pen", 10).await;

        let response = app
            .oneshot(empty_request(Method::GET, &format!("/v1/orders/{id}")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({"order": {"id": id, "item": "pen", "quantity": 10}})
        );
    }

    #[tokio::test]
    async fn test_create_rejects_blank_item() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                json!({"item": "   ", "quantity": 1}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            read_json(response).await,
            json!({"error": "Field 'item' must not be empty"})
        );
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_json() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1/orders")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"item\": "))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(read_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_unknown_order() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/v1/orders/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            read_json(response).await,
            json!({"error": "order with id missing not found"})
        );
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let app = app();
        let id = create(&app, "pen", 10).await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                &format!("/v1/orders/{id}"),
                json!({"item": "pen", "quantity": 5}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["order"]["quantity"], 5);

        let response = app
            .oneshot(empty_request(Method::GET, &format!("/v1/orders/{id}")))
            .await
            .unwrap();
        assert_eq!(read_json(response).await["order"]["quantity"], 5);
    }

    #[tokio::test]
    async fn test_update_unknown_order() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/v1/orders/missing",
                json!({"item": "pen", "quantity": 1}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let app = app();
        let id = create(&app, "pen", 10).await;
        let uri = format!("/v1/orders/{id}");

        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await, json!({"success": true}));

        let response = app
            .clone()
            .oneshot(empty_request(Method::DELETE, &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .oneshot(empty_request(Method::GET, &uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_orders() {
        let app = app();
        create(&app, "pen", 1).await;
        create(&app, "ink", -2).await;

        let response = app
            .oneshot(empty_request(Method::GET, "/v1/orders"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        let orders = body["orders"].as_array().unwrap();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().any(|o| o["item"] == "ink" && o["quantity"] == -2));
    }

    #[tokio::test]
    async fn test_trailing_slash_is_normalized() {
        let response = app()
            .oneshot(empty_request(Method::GET, "/v1/orders/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_service_unavailable() {
        let app = build_app(state_with(Arc::new(UnreachableStore)), TIMEOUT);

        let response = app
            .clone()
            .oneshot(empty_request(Method::GET, "/v1/orders/abc"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/orders",
                json!({"item": "pen", "quantity": 1}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let durable = Arc::new(SlowStore {
            inner: MemoryOrderStore::new(),
            delay: Duration::from_millis(500),
        });
        let app = build_app(state_with(durable), Duration::from_millis(50));

        let response = app
            .oneshot(empty_request(Method::GET, "/v1/orders"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            read_json(response).await,
            json!({"error": "request timed out"})
        );
    }
}

//! HTTP Controller (Driver Adapter)
//!
//! Axum-based API that delegates to application use cases.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use tracing::{debug, warn};

use crate::application::ports::OrderStore;
use crate::application::services::NotificationHub;
use crate::application::use_cases::SubmitOrderUseCase;
use crate::domain::order::OrderId;
use crate::error::ApiError;

use super::request::SubmitOrderRequest;
use super::response::{HealthResponse, SubmitOrderResponse};
use super::websocket::subscribe_order;

/// Application state shared across handlers.
pub struct AppState<S>
where
    S: OrderStore,
{
    /// Use case for accepting orders.
    pub submit_order: Arc<SubmitOrderUseCase<S>>,
    /// Order store for lookups.
    pub store: Arc<S>,
    /// Live update fan-out.
    pub hub: Arc<NotificationHub>,
    /// Application version.
    pub version: String,
}

impl<S> Clone for AppState<S>
where
    S: OrderStore,
{
    fn clone(&self) -> Self {
        Self {
            submit_order: Arc::clone(&self.submit_order),
            store: Arc::clone(&self.store),
            hub: Arc::clone(&self.hub),
            version: self.version.clone(),
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: OrderStore + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/orders/execute",
            get(subscribe_order::<S>).post(submit_order::<S>),
        )
        .route("/api/orders/{id}", get(get_order::<S>))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check<S>(State(state): State<AppState<S>>) -> impl IntoResponse
where
    S: OrderStore,
{
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Submit order endpoint.
async fn submit_order<S>(
    State(state): State<AppState<S>>,
    payload: Result<Json<SubmitOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
    S: OrderStore,
{
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected order payload");
        ApiError::invalid_payload(vec![rejection.body_text()])
    })?;

    let fields = request.validate().map_err(ApiError::invalid_payload)?;
    let order = state.submit_order.execute(fields).await.map_err(|e| {
        warn!(error = %e, "Order submission failed");
        ApiError::from(e)
    })?;

    Ok((
        StatusCode::OK,
        Json(SubmitOrderResponse {
            order_id: order.id(),
        }),
    ))
}

/// Persisted order lookup.
async fn get_order<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    S: OrderStore,
{
    let order_id: OrderId = id.parse().map_err(|_| ApiError::order_not_found(&id))?;

    match state.store.find_by_id(&order_id).await {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(ApiError::order_not_found(&id)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockOrderStore;
    use crate::application::ports::StoreError;
    use crate::infrastructure::persistence::InMemoryOrderStore;
    use crate::queue::{JobQueue, QueueConfig};
    use crate::testing::NoopHandler;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn state_with<S: OrderStore + 'static>(store: Arc<S>) -> AppState<S> {
        let hub = Arc::new(NotificationHub::new());
        let queue = JobQueue::start(QueueConfig::default(), Arc::new(NoopHandler));
        AppState {
            submit_order: Arc::new(SubmitOrderUseCase::new(
                Arc::clone(&store),
                queue,
                Arc::clone(&hub),
            )),
            store,
            hub,
            version: "test".to_string(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/orders/execute")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let app = create_router(state_with(Arc::new(InMemoryOrderStore::new())));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({"status": "healthy", "version": "test"}));
    }

    #[tokio::test]
    async fn valid_submission_returns_order_id_and_persists() {
        let store = Arc::new(InMemoryOrderStore::new());
        let app = create_router(state_with(Arc::clone(&store)));

        let response = app
            .oneshot(post_json(
                r#"{"tokenIn":"SOL","tokenOut":"USDC","amountIn":1,"limitPrice":"0.01"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let order_id: OrderId = body["orderId"].as_str().unwrap().parse().unwrap();
        assert!(store.find_by_id(&order_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalid_submission_is_rejected_without_creating_an_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let app = create_router(state_with(Arc::clone(&store)));

        let response = app
            .oneshot(post_json(r#"{"tokenIn":"SOL","amountIn":-1}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid payload");
        assert_eq!(body["details"].as_array().unwrap().len(), 3);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_payload() {
        let app = create_router(state_with(Arc::new(InMemoryOrderStore::new())));

        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid payload");
    }

    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let mut store = MockOrderStore::new();
        store.expect_save().returning(|_| {
            Err(StoreError::Unavailable {
                message: "disk full".to_string(),
            })
        });
        let app = create_router(state_with(Arc::new(store)));

        let response = app
            .oneshot(post_json(
                r#"{"tokenIn":"SOL","tokenOut":"USDC","amountIn":1,"limitPrice":1}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let app = create_router(state_with(Arc::new(InMemoryOrderStore::new())));

        for id in [OrderId::generate().to_string(), "not-a-uuid".to_string()] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/orders/{id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(body_json(response).await["code"], "ORDER_NOT_FOUND");
        }
    }

    #[tokio::test]
    async fn lookup_returns_persisted_order() {
        let store = Arc::new(InMemoryOrderStore::new());
        let state = state_with(Arc::clone(&store));
        let order = state
            .submit_order
            .execute(crate::domain::order::NewOrder {
                token_in: "SOL".to_string(),
                token_out: "USDC".to_string(),
                amount_in: rust_decimal::Decimal::ONE,
                limit_price: rust_decimal::Decimal::ONE,
            })
            .await
            .unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/orders/{}", order.id()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], order.id().to_string());
        assert_eq!(body["status"], "pending");
        assert_eq!(body["tokenIn"], "SOL");
    }

    #[tokio::test]
    async fn unreadable_stored_order_is_internal_error() {
        let mut store = MockOrderStore::new();
        store.expect_find_by_id().returning(|_| {
            Err(StoreError::Serialization {
                message: "truncated record".to_string(),
            })
        });
        let app = create_router(state_with(Arc::new(store)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/orders/{}", OrderId::generate()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], "INTERNAL_ERROR");
    }
}

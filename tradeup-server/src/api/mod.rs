//! HTTP and WebSocket API.
//!
//! # Endpoints
//!
//! - `GET    /tradeups`                          – list open tradeups
//! - `GET    /tradeups/{tradeup_id}`             – one tradeup, any status
//! - `POST   /tradeups/{tradeup_id}/items`       – contribute an item
//! - `DELETE /tradeups/{tradeup_id}/items/{inv_id}` – withdraw an item
//! - `GET    /ws`                                – live tradeup stream
//!
//! Write endpoints require the `Tradeup-User-Id` header.

pub mod extractors;
mod tradeups;
mod ws;

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tradeup_core::processors::ContributionError;
use tradeup_core::store::StoreError;

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tradeups", get(tradeups::list_open))
        .route("/tradeups/{tradeup_id}", get(tradeups::get_one))
        .route(
            "/tradeups/{tradeup_id}/items",
            post(tradeups::add_item),
        )
        .route(
            "/tradeups/{tradeup_id}/items/{inv_id}",
            delete(tradeups::remove_item),
        )
        .route("/ws", get(ws::tradeup_ws))
}

/// Errors returned by the tradeup endpoints.
#[derive(Debug)]
enum TradeupApiError {
    /// A contribution or withdrawal was rejected, or failed in storage.
    Contribution(ContributionError),
    /// A read from the store failed.
    Store(StoreError),
    /// The requested tradeup does not exist.
    NotFound,
}

impl From<ContributionError> for TradeupApiError {
    fn from(value: ContributionError) -> Self {
        TradeupApiError::Contribution(value)
    }
}

impl From<StoreError> for TradeupApiError {
    fn from(value: StoreError) -> Self {
        TradeupApiError::Store(value)
    }
}

impl IntoResponse for TradeupApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            TradeupApiError::Store(e) | TradeupApiError::Contribution(ContributionError::Storage(e)) => {
                tracing::error!(error = %e, "Tradeup API storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            TradeupApiError::NotFound => {
                (StatusCode::NOT_FOUND, "tradeup not found").into_response()
            }
            TradeupApiError::Contribution(e) => {
                let status = match &e {
                    ContributionError::TradeupNotFound(_) | ContributionError::NotInTradeup { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    ContributionError::TradeupClosed(_)
                    | ContributionError::PoolFull(_)
                    | ContributionError::ItemUnavailable(_) => StatusCode::CONFLICT,
                    ContributionError::Ownership(_) => StatusCode::FORBIDDEN,
                    ContributionError::MaxContributionExceeded { .. } => StatusCode::BAD_REQUEST,
                    ContributionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string()).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use std::sync::Arc;
    use tokio::sync::watch;
    use tower::ServiceExt;
    use tradeup_core::config::{EngineConfig, HubConfig};
    use tradeup_core::events::winner_channel;
    use tradeup_core::hub::Hub;
    use tradeup_core::processors::ResolutionEngine;
    use tradeup_core::snapshot::SnapshotCache;
    use tradeup_core::store::MemoryStore;
    use tradeup_sdk::objects::{Rarity, Tradeup, TradeupMode, TradeupStatus, UserId};

    struct TestApp {
        router: Router,
        store: Arc<MemoryStore>,
        _shutdown: watch::Sender<bool>,
    }

    fn app(capacity: u32) -> TestApp {
        let store = Arc::new(MemoryStore::default());
        let (winner_tx, _) = winner_channel();
        let config = EngineConfig {
            capacity,
            ..Default::default()
        };
        let engine = Arc::new(ResolutionEngine::new(store.clone(), config, winner_tx));
        let hub_config = HubConfig::default();
        let (hub, handle) = Hub::new(store.clone(), Arc::new(SnapshotCache::default()), &hub_config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(hub.run(shutdown_rx));

        let state = AppState::new(engine, handle, hub_config);
        TestApp {
            router: router().with_state(state),
            store,
            _shutdown: shutdown_tx,
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
        app.router.clone().oneshot(request).await.unwrap()
    }

    fn add_item(tradeup_id: i64, user: &str, inv_id: i64) -> Request<Body> {
        Request::post(format!("/tradeups/{tradeup_id}/items"))
            .header(extractors::USER_ID_HEADER, user)
            .header("content-type", "application/json")
            .body(Body::from(format!(r#"{{"invId":{inv_id}}}"#)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_contribute_and_read_back() {
        let app = app(2);
        let id = app.store.create_tradeup(Rarity::Consumer, 2, TradeupMode::Ffa).await;
        let item = app
            .store
            .grant(&UserId::from("alice"), Rarity::Consumer, 0.25)
            .await
            .unwrap();

        let response = send(&app, add_item(id, "alice", item.inv_id)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let fill: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(fill, serde_json::json!({ "items": 1, "capacity": 2 }));

        let response = send(&app, Request::get(format!("/tradeups/{id}")).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let tradeup: Tradeup = serde_json::from_slice(&body).unwrap();
        assert_eq!(tradeup.status, TradeupStatus::Active);
        assert_eq!(tradeup.items[0].inv_id, item.inv_id);

        let response = send(&app, Request::get("/tradeups").body(Body::empty()).unwrap()).await;
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let open: Vec<Tradeup> = serde_json::from_slice(&body).unwrap();
        assert_eq!(open.len(), 1);
    }

    #[tokio::test]
    async fn test_rejections_map_to_status_codes() {
        let app = app(1);
        let id = app.store.create_tradeup(Rarity::Consumer, 1, TradeupMode::Ffa).await;
        let alice = UserId::from("alice");
        let first = app.store.grant(&alice, Rarity::Consumer, 0.25).await.unwrap();
        let second = app.store.grant(&alice, Rarity::Consumer, 0.25).await.unwrap();

        let response = send(&app, add_item(id, "bob", first.inv_id)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = send(&app, add_item(id, "alice", first.inv_id)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = send(&app, add_item(id, "alice", second.inv_id)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&app, add_item(999, "alice", second.inv_id)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, Request::get("/tradeups/999").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_withdraw_requires_identity() {
        let app = app(2);
        let id = app.store.create_tradeup(Rarity::Consumer, 2, TradeupMode::Ffa).await;
        let item = app
            .store
            .grant(&UserId::from("alice"), Rarity::Consumer, 0.25)
            .await
            .unwrap();
        send(&app, add_item(id, "alice", item.inv_id)).await;

        let uri = format!("/tradeups/{id}/items/{}", item.inv_id);
        let response = send(&app, Request::delete(&uri).body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::delete(&uri)
            .header(extractors::USER_ID_HEADER, "alice")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(app.store.item(item.inv_id).await.unwrap().visible);
    }
}

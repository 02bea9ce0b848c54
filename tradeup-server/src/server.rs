//! HTTP entry point: the tradeup REST routes, the `/ws` upgrade and `/health`.

use crate::api;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, response::IntoResponse, routing::get};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(api::router())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    /// Open WebSocket connections on this instance.
    connections: usize,
}

/// 503 once the connection hub has stopped, since no push can reach
/// clients from then on.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let version = env!("CARGO_PKG_VERSION");
    match state.hub.stats().await {
        Ok(stats) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                version,
                connections: stats.connections,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "hub stopped",
                    version,
                    connections: 0,
                }),
            )
        }
    }
}

/// Run the server until `shutdown` resolves, then drain open requests.
pub async fn run_server(
    router: Router,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use tower::ServiceExt;
    use tradeup_core::config::{EngineConfig, HubConfig};
    use tradeup_core::events::winner_channel;
    use tradeup_core::hub::Hub;
    use tradeup_core::processors::ResolutionEngine;
    use tradeup_core::snapshot::SnapshotCache;
    use tradeup_core::store::MemoryStore;
    use tradeup_sdk::objects::UserId;

    async fn health(router: &Router) -> (StatusCode, serde_json::Value) {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_hub_state() {
        let store = Arc::new(MemoryStore::default());
        let (winner_tx, _) = winner_channel();
        let engine = Arc::new(ResolutionEngine::new(store.clone(), EngineConfig::default(), winner_tx));
        let hub_config = HubConfig::default();
        let (hub, handle) = Hub::new(store, Arc::new(SnapshotCache::default()), &hub_config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let hub_task = tokio::spawn(hub.run(shutdown_rx));
        let router = build_router(AppState::new(engine, handle.clone(), hub_config));

        let (status, body) = health(&router).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["connections"], 0);

        let _conn = handle.register(UserId::from("alice")).await.unwrap();
        let (_, body) = health(&router).await;
        assert_eq!(body["connections"], 1);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), hub_task).await.unwrap().unwrap();
        let (status, body) = health(&router).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "hub stopped");
    }
}

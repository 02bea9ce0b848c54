use std::time::Duration;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::time::{Instant, interval_at, sleep};
use tradeup_core::hub::{ConnectionId, Subscription};
use tradeup_sdk::objects::UserId;
use tradeup_sdk::objects::ws::{WsClientMessage, WsCloseCode, WsServerMessage};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct WsParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// `GET /ws` — live tradeup stream.
///
/// Connections without a `userId` get an ephemeral session id. They can
/// subscribe like anyone else but never match a winner announcement.
pub(super) async fn tradeup_ws(
    state: State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let user = match params.user_id.filter(|id| !id.is_empty()) {
        Some(id) => UserId::from(id),
        None => UserId::from(format!("anon-{}", Uuid::new_v4())),
    };
    let app_state = state.0.clone();
    ws.max_message_size(app_state.hub_config.max_message_size)
        .on_upgrade(move |socket| handle_tradeup_ws(socket, app_state, user))
}

fn subscription_for(message: WsClientMessage) -> Subscription {
    match message {
        WsClientMessage::SubscribeAll => Subscription::All,
        WsClientMessage::SubscribeOne { pool_id } => Subscription::Tradeup(pool_id),
        WsClientMessage::Unsubscribe => Subscription::None,
    }
}

/// Drives a single WebSocket connection.
///
/// Outbound frames come from the hub's queue for this connection. Pings go
/// out every `ping_period`; if nothing at all arrives from the client within
/// `pong_wait` the connection is closed.
async fn handle_tradeup_ws(mut socket: WebSocket, state: AppState, user: UserId) {
    let (id, mut outbound) = match state.hub.register(user.clone()).await {
        Ok(registered) => registered,
        Err(e) => {
            tracing::error!(error = %e, user = %user, "WS: failed to register connection");
            close(&mut socket, WsCloseCode::INTERNAL_ERROR, "internal error").await;
            return;
        }
    };
    tracing::debug!(connection = %id, user = %user, "WS: connection opened");

    let ping_period = state.hub_config.ping_period;
    let pong_wait = state.hub_config.pong_wait;
    let mut ping = interval_at(Instant::now() + ping_period, ping_period);
    let keepalive = sleep(pong_wait);
    tokio::pin!(keepalive);

    loop {
        tokio::select! {
            message = outbound.recv() => {
                match message {
                    Some(message) => {
                        if send_json(&mut socket, message.as_ref()).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!(connection = %id, "WS: dropped by hub");
                        close(&mut socket, WsCloseCode::DROPPED, "dropped by server").await;
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            _ = &mut keepalive => {
                tracing::debug!(connection = %id, "WS: keepalive timeout");
                close(&mut socket, WsCloseCode::KEEPALIVE_TIMEOUT, "keepalive timeout").await;
                break;
            }

            frame = socket.recv() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(frame)) => {
                        reset(keepalive.as_mut(), pong_wait);
                        if let Message::Text(text) = frame {
                            handle_client_text(&mut socket, &state, id, text.as_str()).await;
                        }
                    }
                }
            }
        }
    }

    if let Err(e) = state.hub.unregister(id).await {
        tracing::debug!(connection = %id, error = %e, "WS: hub gone before unregister");
    }
    tracing::debug!(connection = %id, "WS: connection closed");
}

fn reset(keepalive: std::pin::Pin<&mut tokio::time::Sleep>, pong_wait: Duration) {
    keepalive.reset(Instant::now() + pong_wait);
}

async fn handle_client_text(
    socket: &mut WebSocket,
    state: &AppState,
    id: ConnectionId,
    text: &str,
) {
    let message = match serde_json::from_str::<WsClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(connection = %id, error = %e, "WS: invalid client frame");
            let _ = send_json(
                socket,
                &WsServerMessage::Error {
                    code: WsCloseCode::INVALID_MESSAGE,
                    reason: "invalid message".into(),
                },
            )
            .await;
            return;
        }
    };
    if let Err(e) = state.hub.subscribe(id, subscription_for(message)).await {
        tracing::error!(connection = %id, error = %e, "WS: failed to subscribe");
    }
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

/// Serialize `value` as JSON and send it as a text WebSocket frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json<T: serde::Serialize>(socket: &mut WebSocket, value: &T) -> Result<(), ()> {
    let json = serde_json::to_string(value).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_map_to_subscriptions() {
        assert_eq!(subscription_for(WsClientMessage::SubscribeAll), Subscription::All);
        assert_eq!(
            subscription_for(WsClientMessage::SubscribeOne { pool_id: 7 }),
            Subscription::Tradeup(7)
        );
        assert_eq!(subscription_for(WsClientMessage::Unsubscribe), Subscription::None);
    }
}

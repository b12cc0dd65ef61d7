use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    error::{Error, Result},
    middleware::auth::{decode_token, CurrentUser},
    services::signaling_service::SignalingHub,
    AppState,
};

const PING_INTERVAL: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
pub struct RelayQuery {
    pub token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket upgrade, so the bearer token
/// travels in the query string.
#[utoipa::path(
    get,
    path = "/ws/virtual-class",
    params(("token" = String, Query, description = "JWT issued by /api/auth/login")),
    responses(
        (status = 101, description = "Switching to the signaling relay"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn relay_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<RelayQuery>,
) -> Result<Response> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Unauthorized("missing_token".into()))?;
    let user = decode_token(token.trim())?;
    let hub = state.signaling_hub.clone();
    Ok(ws.on_upgrade(move |socket| serve_socket(socket, hub, user)))
}

async fn serve_socket(socket: WebSocket, hub: SignalingHub, user: CurrentUser) {
    let (socket_id, mut outbox) = hub.connect(user.id).await;
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.tick().await;
        loop {
            tokio::select! {
                frame = outbox.recv() => match frame {
                    Some(text) => {
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ping.tick() => {
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => hub.handle_text(&socket_id, &text).await,
            Message::Binary(_) => {
                tracing::debug!(socket_id = %socket_id, "ignoring binary relay frame");
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => break,
        }
    }

    hub.disconnect(&socket_id).await;
    let _ = writer.await;
}

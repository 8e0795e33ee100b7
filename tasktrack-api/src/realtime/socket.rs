/// WebSocket endpoint
///
/// # Endpoint
///
/// `GET /ws?token=<jwt>`
///
/// The caller is authenticated once, before the upgrade, with the same token
/// as the HTTP API. Sources are checked in order: `token` query parameter,
/// `Authorization: Bearer`, `token` cookie. A missing or bad token is
/// answered with 401 and no upgrade happens.
///
/// # Client Frames
///
/// ```json
/// {"type": "task:join", "taskId": "..."}
/// {"type": "task:leave", "taskId": "..."}
/// ```
///
/// Anything else is ignored. Server frames are described in
/// `tasktrack_shared::events::realtime`.

use super::registry::{Channel, ConnectionId, SubscriptionRegistry};
use crate::app::AppState;
use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tasktrack_shared::auth::middleware::{
    authenticate_token, bearer_token, cookie_value, AuthContext, TOKEN_COOKIE,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

/// Query parameters for the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// Frame sent by a client
#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "task:join", rename_all = "camelCase")]
    JoinTask { task_id: Uuid },

    #[serde(rename = "task:leave", rename_all = "camelCase")]
    LeaveTask { task_id: Uuid },
}

/// Upgrade handler
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = params
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers))
        .or_else(|| cookie_value(&headers, TOKEN_COOKIE));

    let auth = match authenticate_token(state.services.accounts.keys(), token) {
        Ok(auth) => auth,
        Err(e) => {
            tracing::debug!(reason = e.message(), "Socket upgrade rejected");
            return e.into_response();
        }
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let registry = state.hub.registry().clone();
    upgrade.on_upgrade(move |socket| handle_socket(socket, auth, registry))
}

async fn handle_socket(socket: WebSocket, auth: AuthContext, registry: Arc<SubscriptionRegistry>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let connection_id = registry.register(auth.user_id, tx);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        let mut outbound = UnboundedReceiverStream::new(rx);
        while let Some(frame) = outbound.next().await {
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handle_client_frame(&registry, connection_id, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(connection_id, error = %e, "Socket read failed");
                break;
            }
        }
    }

    registry.unregister(connection_id);
    writer.abort();
}

/// Applies one client frame to the registry
pub fn handle_client_frame(registry: &SubscriptionRegistry, connection_id: ConnectionId, text: &str) {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::JoinTask { task_id }) => {
            registry.join(connection_id, Channel::Task(task_id));
        }
        Ok(ClientFrame::LeaveTask { task_id }) => {
            registry.leave(connection_id, Channel::Task(task_id));
        }
        Err(e) => {
            tracing::debug!(connection_id, error = %e, "Ignoring unknown client frame");
        }
    }
}

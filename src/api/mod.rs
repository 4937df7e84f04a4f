//! HTTP and WebSocket API.

pub mod admin;
pub mod trading;

use crate::push::PushHub;
use crate::services::{PriceCache, SettlementEngine, SqliteStore};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
    pub store: Arc<SqliteStore>,
    pub prices: Arc<PriceCache>,
    pub push: Arc<PushHub>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(trading::routes())
        .merge(admin::routes())
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsQuery {
    user_id: String,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.user_id))
}

/// Forward push events to the socket until either side hangs up.
async fn handle_socket(mut socket: WebSocket, state: AppState, user_id: String) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = state.push.register(&user_id, tx);
    debug!(%client_id, user_id, "websocket connected");

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(payload) => {
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // inbound traffic is ignored, the socket is push-only
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.push.unregister(client_id);
    debug!(%client_id, "websocket disconnected");
}

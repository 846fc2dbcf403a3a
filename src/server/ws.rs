//! Live event channel
//!
//! One WebSocket connection per session id. On open the subscriber receives
//! an initial-state snapshot, then the ordered live stream of distribution
//! events. Inbound `user_message` control frames are routed to the core;
//! malformed frames are silently ignored.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;

use crate::types::ScanEvent;

use super::AppState;

/// Handle WebSocket upgrade for one session's event stream
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(scan_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, scan_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, scan_id: String) {
    // Snapshot and registration happen under the registry lock, so an event
    // published in between lands in the snapshot or the live stream, never in
    // neither.
    let (subscriber_id, mut events) = state
        .registry
        .with_session(&scan_id, |session| {
            let snapshot = session.map(ScanEvent::initial_state);
            state.distributor.subscribe(&scan_id, snapshot)
        })
        .await;

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward distribution events to the socket until either side goes away
    let send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = ws_receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_control_frame(&state, &scan_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    state.distributor.unsubscribe(&scan_id, subscriber_id);
    send_task.abort();
}

/// Route an inbound control frame; anything unrecognized is dropped
async fn handle_control_frame(state: &AppState, scan_id: &str, text: &str) {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        return;
    };
    if frame.get("type").and_then(Value::as_str) == Some("user_message") {
        let content = frame
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        state.supervisor.send_user_message(scan_id, content).await;
    }
}

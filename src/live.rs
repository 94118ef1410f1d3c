//! Live dashboard WebSocket.
//!
//! JSON over WebSocket: one full snapshot on connect, then every board
//! event as it is applied. Read-only — mutations stay on the REST routes.

use crate::api::SharedState;
use crate::gate::{self, GateState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Snapshot { revision: u64, gate: GateState },
}

// ── WS upgrade handler ────────────────────────────────────────

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

// ── Socket lifecycle ───────────────────────────────────────────

async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe to broadcast BEFORE reading the snapshot, so no event
    // applied between snapshot and subscription is lost.
    let mut events_rx = state.events_tx.subscribe();

    let snapshot = {
        let board = state.board.read().unwrap();
        let academic: Vec<_> = board.academic.values().cloned().collect();
        let secondary: Vec<_> = board.secondary.values().cloned().collect();
        ServerMessage::Snapshot {
            revision: board.revision,
            gate: gate::compute_gate_state(&academic, &secondary, Utc::now(), state.week_start),
        }
    };

    let json = match serde_json::to_string(&snapshot) {
        Ok(json) => json,
        Err(e) => {
            debug!(error = %e, "snapshot serialization failed");
            return;
        }
    };
    if ws_tx.send(Message::Text(json)).await.is_err() {
        return; // client already gone
    }

    // Forward broadcast events to this client.
    let mut send_task = tokio::spawn(async move {
        while let Ok(json) = events_rx.recv().await {
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Drain the client side so pings are answered; no commands come this way.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                Message::Close(_) => break,
                _ => {} // ignore text, ping, pong
            }
        }
    });

    // Wait for either side to finish.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
}

//! WebSocket view of the current session.
//!
//! The server sends the current [`ScreenSnapshot`](nvim_harness::model::ScreenSnapshot)
//! as a JSON text frame on connect and after every screen update. Text frames
//! from the client are key strings, handled like `POST /sessions/current/input`;
//! a rejected frame is answered with an `ErrorInfo` JSON frame. The socket
//! closes when the editor exits.

use crate::api::{ApiError, AppState};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use nvim_harness::bridge::TerminalBridge;
use serde::Serialize;
use std::sync::Arc;

pub(crate) async fn stream_session(
    State(service): State<AppState>,
    upgrade: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let session = service.current().await?;
    tracing::info!(session_id = %session.session_id, "websocket attached");
    Ok(upgrade.on_upgrade(move |socket| relay(socket, session.bridge)))
}

async fn relay(socket: WebSocket, bridge: Arc<TerminalBridge>) {
    let session_id = bridge.session_id();
    let (mut sink, mut incoming) = socket.split();
    let mut snapshots = bridge.subscribe();

    let initial = snapshots.borrow_and_update().clone();
    if send_json(&mut sink, &initial).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if send_json(&mut sink, &snapshot).await.is_err() {
                    break;
                }
            }
            frame = incoming.next() => match frame {
                Some(Ok(Message::Text(keys))) => {
                    if let Err(err) = bridge.send_keys(keys.as_str()).await {
                        if send_json(&mut sink, &err.to_error_info()).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.send(Message::Close(None)).await;
    tracing::info!(session_id = %session_id, "websocket detached");
}

async fn send_json<T: Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(value).map_err(axum::Error::new)?;
    sink.send(Message::Text(text.into())).await
}

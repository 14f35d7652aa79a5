// (c) Cartesi and individual authors (see AUTHORS)
// SPDX-License-Identifier: Apache-2.0 (see LICENSE)

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use mint_core::PortalView;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::AppState;

pub(super) async fn subscribe_view(
    State(state): State<Arc<AppState>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    let views = state.lane.subscribe();
    upgrade.on_upgrade(move |socket| stream_views(socket, views))
}

/// Sends the current view, then every published change until either side goes away.
async fn stream_views(mut socket: WebSocket, mut views: watch::Receiver<PortalView>) {
    loop {
        let frame = match encode_view(&views.borrow_and_update()) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "encode portal view failed");
                return;
            }
        };
        if socket.send(frame).await.is_err() {
            debug!("view subscriber went away");
            return;
        }

        // Client frames are only read to keep ping/pong and close handling moving.
        loop {
            tokio::select! {
                changed = views.changed() => {
                    if changed.is_err() {
                        let _ = socket.send(Message::Close(None)).await;
                        return;
                    }
                    break;
                }
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

fn encode_view(view: &PortalView) -> Result<Message, serde_json::Error> {
    let json = serde_json::to_string(view)?;
    Ok(Message::Text(json.into()))
}

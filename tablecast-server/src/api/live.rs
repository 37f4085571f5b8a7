use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use tablecast_sdk::objects::{LiveMessage, WsCloseCode};

use crate::state::AppState;

/// `GET /ws` — live-update channel.
///
/// Upgrades to a WebSocket and pushes one [`LiveMessage::DataChanged`]
/// frame per snapshot replace. Nothing is sent on connect.
pub(super) async fn live_updates(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_live_socket(socket, state))
}

/// Drives a single live connection until the client leaves, the hub drops
/// the subscriber, or the server shuts down.
async fn handle_live_socket(mut socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.subscribe();
    let mut shutdown_rx = state.shutdown.clone();
    let subscriber = subscription.id();

    if *shutdown_rx.borrow() {
        close(&mut socket, WsCloseCode::GOING_AWAY, "server shutting down").await;
        return;
    }

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    close(&mut socket, WsCloseCode::GOING_AWAY, "server shutting down").await;
                    break;
                }
            }

            message = subscription.recv() => {
                let Some(message) = message else {
                    tracing::warn!(%subscriber, "Live subscriber fell behind, dropping connection");
                    close(&mut socket, WsCloseCode::DROPPED, "subscriber dropped").await;
                    break;
                };
                if send_json(&mut socket, &message).await.is_err() {
                    tracing::debug!(%subscriber, "Live send failed, client gone");
                    break;
                }
            }

            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    // The channel is one-way; anything else the client sends is ignored.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(%subscriber, error = %e, "Live socket error");
                        break;
                    }
                }
            }
        }
    }
    // `subscription` drops here and unregisters itself from the hub.
}

async fn close(socket: &mut WebSocket, code: u16, reason: &'static str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await;
}

/// Serialize `message` as JSON and send it as a text frame.
///
/// Returns `Err(())` if the send fails (client disconnected).
async fn send_json(socket: &mut WebSocket, message: &LiveMessage) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

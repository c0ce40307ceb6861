use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::time::interval;
use uuid::Uuid;

use events::{Broadcaster, ObserverMessage, TranscriptSource};

use crate::messages::{encode, ClientMessage};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sent to a joining observer right after its history batch.
pub const JOIN_NOTICE: &str = "Joined game.";

/// Upgrade an HTTP request into an observer connection for `session_id`.
pub fn observe(
    ws: WebSocketUpgrade,
    broadcaster: Broadcaster,
    session_id: Uuid,
    source: Arc<dyn TranscriptSource + Send + Sync>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster, session_id, source))
}

async fn handle_socket(
    socket: WebSocket,
    broadcaster: Broadcaster,
    session_id: Uuid,
    source: Arc<dyn TranscriptSource + Send + Sync>,
) {
    let (mut sender, mut receiver) = socket.split();

    let mut subscription = broadcaster.connect(session_id, source.as_ref());
    let observer_id = subscription.observer_id;
    tracing::info!(session_id = %session_id, observer_id = %observer_id, "Observer joined");

    // The history batch is always the first queued message.
    if let Some(history) = subscription.receiver.recv().await {
        let sent = match encode(&history) {
            Ok(frame) => sender.send(frame).await.is_ok(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode history batch");
                false
            }
        };
        if !sent {
            broadcaster.disconnect(session_id, observer_id);
            return;
        }
    }
    if let Ok(frame) = encode(&ObserverMessage::notice(JOIN_NOTICE)) {
        let _ = sender.send(frame).await;
    }

    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }

            event = subscription.receiver.recv() => {
                match event {
                    Some(msg) => {
                        let frame = match encode(&msg) {
                            Ok(frame) => frame,
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to encode observer message");
                                continue;
                            }
                        };
                        if sender.send(frame).await.is_err() {
                            break;
                        }
                    }
                    // Pruned by the broadcaster or the session was closed.
                    None => break,
                }
            }

            msg = tokio::time::timeout(CLIENT_TIMEOUT + HEARTBEAT_INTERVAL, receiver.next()) => {
                match msg {
                    Ok(Some(Ok(Message::Text(text)))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Ping) => {
                                if let Ok(frame) = encode(&ObserverMessage::notice("pong")) {
                                    if sender.send(frame).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!(error = %e, "Ignoring observer message");
                            }
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) => {
                        break;
                    }
                    Ok(Some(Ok(Message::Ping(data)))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(_))) => {
                        break;
                    }
                    Ok(None) => {
                        break;
                    }
                    Err(_) => {
                        tracing::debug!("Observer idle, waiting for heartbeat");
                    }
                }
            }
        }
    }

    broadcaster.disconnect(session_id, observer_id);
    tracing::info!(session_id = %session_id, observer_id = %observer_id, "Observer left");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_interval() {
        assert_eq!(HEARTBEAT_INTERVAL, Duration::from_secs(30));
    }

    #[test]
    fn test_client_timeout() {
        assert_eq!(CLIENT_TIMEOUT, Duration::from_secs(10));
    }

    #[test]
    fn test_join_notice_text() {
        assert_eq!(JOIN_NOTICE, "Joined game.");
    }
}

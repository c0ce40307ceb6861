use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use events::ObserverMessage;

/// Messages an observer may send. Observers are read-only; this only
/// covers keep-alive traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Ping,
}

/// Serialize an observer message into a text frame.
pub fn encode(msg: &ObserverMessage) -> Result<Message, serde_json::Error> {
    let json = msg.to_json()?;
    Ok(Message::Text(json.into()))
}

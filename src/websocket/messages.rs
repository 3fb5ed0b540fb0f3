//! WebSocket Message Types
//!
//! Messages exchanged between a live memo page and the server.

use serde::{Deserialize, Serialize};

use crate::memos::Memo;

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a memo
    Add {
        #[serde(default)]
        content: String,
    },
    /// Delete a memo by id
    Delete { id: i64 },
    /// Reload the list from the backend
    Refresh,
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// Current memo list, newest first
    Memos { memos: Vec<Memo> },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_add() {
        let json = r#"{"type": "add", "content": "Buy milk"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Add { content } => assert_eq!(content, "Buy milk"),
            _ => panic!("Expected Add"),
        }
    }

    #[test]
    fn test_client_message_deserialize_delete_and_ping() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "delete", "id": 7}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Delete { id: 7 }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type": "ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_server_message_serialize_memos() {
        let msg = ServerMessage::Memos {
            memos: vec![Memo::new(3, "C")],
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "memos");
        assert_eq!(json["memos"][0]["id"], 3);
        assert_eq!(json["memos"][0]["content"], "C");
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, RoomId};

/// Events sent from the server to chat clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChatEvent {
    /// Full room history, delivered only to the connection that just joined
    ChatHistory { messages: Vec<ChatMessage> },

    /// A message was stored and is being relayed to the room
    ChatMessage {
        sender: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// The other participant started typing
    Typing { room: RoomId, user: String },

    /// The other participant stopped typing
    StopTyping { room: RoomId, user: String },

    /// `user` has read every message currently in the room
    MessagesRead { user: String },

    /// A command from this connection failed
    Error { message: String },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ChatCommand {
    JoinRoom { room: RoomId, user: String },

    ChatMessage {
        room: RoomId,
        sender: String,
        message: String,
    },

    Typing { room: RoomId, user: String },

    StopTyping { room: RoomId, user: String },

    MarkAsRead { room: RoomId, user: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_client_event_names() {
        let raw = r#"{"type":"chatMessage","data":{"room":"20123456-20123457","sender":"20123456","message":"hi"}}"#;
        let cmd: ChatCommand = serde_json::from_str(raw).unwrap();
        assert_eq!(
            cmd,
            ChatCommand::ChatMessage {
                room: RoomId::for_pair("20123456", "20123457"),
                sender: "20123456".into(),
                message: "hi".into(),
            }
        );
    }

    #[test]
    fn command_with_bad_room_is_rejected() {
        let raw = r#"{"type":"joinRoom","data":{"room":"20123457-20123456","user":"20123456"}}"#;
        assert!(serde_json::from_str::<ChatCommand>(raw).is_err());
    }

    #[test]
    fn read_event_shape() {
        let event = ChatEvent::MessagesRead { user: "20123456".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "messagesRead", "data": { "user": "20123456" } })
        );
    }
}

//! Socket wire format: `{"event": "<kebab-name>", "data": {...}}` both ways.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::{FollowRequest, Message, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    SendMessage { receiver_id: Uuid, content: String },
    TypingStart { receiver_id: Uuid },
    TypingStop { receiver_id: Uuid },

    CallUser { to: Uuid, offer: Value, call_type: CallKind },
    CallAnswer { to: Uuid, answer: Value },
    IceCandidate { to: Uuid, candidate: Value },
    CallReject { to: Uuid },
    CallEnd { to: Uuid },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    UserOnline {
        user_id: Uuid,
    },
    UserOffline {
        user_id: Uuid,
        #[serde(with = "time::serde::rfc3339")]
        last_seen_at: OffsetDateTime,
    },

    MessageSent(Message),
    ReceiveMessage(Message),

    UserTyping { user_id: Uuid },
    UserStoppedTyping { user_id: Uuid },

    IncomingCall { from: Uuid, offer: Value, call_type: CallKind, caller: UserSummary },
    CallAnswered { from: Uuid, answer: Value },
    IceCandidate { from: Uuid, candidate: Value },
    CallRejected { from: Uuid },
    CallEnded { from: Uuid },

    FollowRequestReceived { request: FollowRequest },

    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> ServerEvent {
        ServerEvent::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn client_events_use_kebab_names_and_camel_fields() {
        let to = Uuid::now_v7();
        let raw = json!({
            "event": "call-user",
            "data": { "to": to, "offer": { "type": "offer", "sdp": "v=0" }, "callType": "video" },
        });
        let event: ClientEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::CallUser {
                to,
                offer: json!({ "type": "offer", "sdp": "v=0" }),
                call_type: CallKind::Video,
            }
        );

        let raw = json!({ "event": "send-message", "data": { "receiverId": to, "content": "hey" } });
        assert!(matches!(
            serde_json::from_value::<ClientEvent>(raw).unwrap(),
            ClientEvent::SendMessage { receiver_id, .. } if receiver_id == to
        ));
    }

    #[test]
    fn unknown_events_and_call_kinds_are_rejected() {
        let to = Uuid::now_v7();
        assert!(serde_json::from_value::<ClientEvent>(json!({ "event": "join-room", "data": {} })).is_err());
        assert!(serde_json::from_value::<ClientEvent>(json!({
            "event": "call-user",
            "data": { "to": to, "offer": {}, "callType": "hologram" },
        }))
        .is_err());
    }

    #[test]
    fn server_events_serialize_like_the_clients_expect() {
        let user_id = Uuid::now_v7();
        let value = serde_json::to_value(ServerEvent::UserStoppedTyping { user_id }).unwrap();
        assert_eq!(value, json!({ "event": "user-stopped-typing", "data": { "userId": user_id } }));

        let value = serde_json::to_value(ServerEvent::UserOffline {
            user_id,
            last_seen_at: OffsetDateTime::UNIX_EPOCH,
        })
        .unwrap();
        assert_eq!(value["data"]["lastSeenAt"], "1970-01-01T00:00:00Z");

        let value = serde_json::to_value(ServerEvent::error("nope")).unwrap();
        assert_eq!(value, json!({ "event": "error", "data": { "message": "nope" } }));
    }
}

//! JSON frames carried over the WebSocket to the message broker.
//!
//! Client frames are tagged by `command`; the broker pushes untagged
//! `{destination, body}` messages for subscribed topics.

use serde::{Deserialize, Serialize};

/// Fixed publish envelope. `type` is always `text/plain` in the current
/// protocol revision.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub token: String,
}

impl Envelope {
    #[must_use]
    pub fn text(email: &str, message: &str, token: &str) -> Self {
        Self {
            email: email.to_string(),
            kind: "text/plain".to_string(),
            message: message.to_string(),
            token: token.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { destination: String },
    Send { destination: String, body: Envelope },
}

/// Broker-to-client message for a subscribed topic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFrame {
    pub destination: String,
    pub body: serde_json::Value,
}

/// A received notification as held by the channel.
#[derive(Clone, Debug)]
pub struct Notification {
    pub destination: String,
    pub body: serde_json::Value,
}

/// Topic scoped to the authenticated identity.
#[must_use]
pub fn identity_topic(identity: &str) -> String {
    format!("/topic/{identity}")
}

/// Outbound publish destination.
#[must_use]
pub fn publish_destination(name: &str) -> String {
    format!("/app/publish/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_frame_shape() {
        let frame = ClientFrame::Subscribe {
            destination: identity_topic("a@custodia.dev"),
        };
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({"command": "subscribe", "destination": "/topic/a@custodia.dev"})
        );
    }

    #[test]
    fn send_frame_carries_fixed_envelope() {
        let frame = ClientFrame::Send {
            destination: publish_destination("alerts"),
            body: Envelope::text("a@custodia.dev", "hello", "tok"),
        };
        let value = serde_json::to_value(&frame).expect("serialize");
        assert_eq!(
            value,
            json!({
                "command": "send",
                "destination": "/app/publish/alerts",
                "body": {
                    "email": "a@custodia.dev",
                    "type": "text/plain",
                    "message": "hello",
                    "token": "tok"
                }
            })
        );
    }

    #[test]
    fn server_frame_parses() {
        let frame: ServerFrame = serde_json::from_str(
            r#"{"destination":"/topic/a@custodia.dev","body":{"message":"hi"}}"#,
        )
        .expect("parse");
        assert_eq!(frame.destination, "/topic/a@custodia.dev");
        assert_eq!(frame.body["message"], "hi");
    }
}

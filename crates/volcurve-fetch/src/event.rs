//! Gateway events and messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Element;

/// Kind of event delivered by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Part of a response; more events follow.
    PartialResponse,
    /// Final event of a response.
    Response,
    /// Session lifecycle notification.
    SessionStatus,
    /// Service lifecycle notification.
    ServiceStatus,
    /// Request lifecycle notification.
    RequestStatus,
    /// No event arrived within the poll timeout.
    Timeout,
    /// Administrative notification.
    Admin,
    /// Any kind this client does not know about.
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Returns true for partial and final responses.
    #[must_use]
    pub const fn is_response(&self) -> bool {
        matches!(self, Self::PartialResponse | Self::Response)
    }
}

/// A message carried by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message type (e.g., "IntradayBarResponse", "SessionStarted").
    pub message_type: String,
    /// Element tree.
    #[serde(default)]
    pub body: Value,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(message_type: impl Into<String>, body: Value) -> Self {
        Self {
            message_type: message_type.into(),
            body,
        }
    }

    /// Returns the root element of the message.
    #[must_use]
    pub fn root(&self) -> Element<'_> {
        Element::new(&self.message_type, &self.body)
    }
}

/// An event: a kind plus zero or more messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event kind.
    pub kind: EventKind,
    /// Messages in arrival order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub const fn new(kind: EventKind, messages: Vec<Message>) -> Self {
        Self { kind, messages }
    }

    /// Creates an empty timeout event.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::new(EventKind::Timeout, Vec::new())
    }

    /// Creates a partial response event.
    #[must_use]
    pub const fn partial(messages: Vec<Message>) -> Self {
        Self::new(EventKind::PartialResponse, messages)
    }

    /// Creates a final response event.
    #[must_use]
    pub const fn response(messages: Vec<Message>) -> Self {
        Self::new(EventKind::Response, messages)
    }

    /// Returns true if this is the final event of a response.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.kind == EventKind::Response
    }

    /// Returns true if any message has the given type.
    #[must_use]
    pub fn has_message(&self, message_type: &str) -> bool {
        self.messages.iter().any(|m| m.message_type == message_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_deserialize() {
        let event: Event = serde_json::from_value(json!({
            "kind": "PARTIAL_RESPONSE",
            "messages": [{"messageType": "IntradayBarResponse", "body": {"barData": {}}}]
        }))
        .unwrap();
        assert_eq!(event.kind, EventKind::PartialResponse);
        assert!(event.kind.is_response());
        assert!(!event.is_final());
        assert!(event.has_message("IntradayBarResponse"));
    }

    #[test]
    fn test_unknown_kind() {
        let event: Event = serde_json::from_value(json!({"kind": "SUBSCRIPTION_DATA"})).unwrap();
        assert_eq!(event.kind, EventKind::Unknown);
        assert!(event.messages.is_empty());
    }
}

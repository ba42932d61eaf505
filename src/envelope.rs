//! Cross-frame message envelope
//!
//! Wire format shared with independently deployed embedded applications:
//! a JSON object `{ "type": string, "payload"?: object }`. The format must
//! stay bit-compatible; unrecognized `type` values decode to
//! [`Envelope::Unknown`] so receivers can log and ignore them instead of
//! failing.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MessagingError;

/// Raw wire representation of one cross-frame message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Payload of `HOST_CONNECTED`, sent by the host once the embed reports loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostConnectedPayload {
    pub host_app: String,
    pub timestamp: String,
}

/// Payload of `APP_LOADED`, the embedded application's handshake reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLoadedPayload {
    pub app: String,
    pub timestamp: String,
}

/// Payload of `USER_ACTION`, reporting user activity inside the embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionPayload {
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Payload of `TEST_MESSAGE`, used to exercise the channel manually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMessagePayload {
    pub message: String,
}

/// Typed view of a cross-frame message.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    HostConnected(HostConnectedPayload),
    AppLoaded(AppLoadedPayload),
    UserAction(UserActionPayload),
    TestMessage(TestMessagePayload),
    /// Any message whose `type` is not part of the contract. Receivers must
    /// log and ignore these, never error.
    Unknown { kind: String, payload: Option<Value> },
}

pub const TYPE_HOST_CONNECTED: &str = "HOST_CONNECTED";
pub const TYPE_APP_LOADED: &str = "APP_LOADED";
pub const TYPE_USER_ACTION: &str = "USER_ACTION";
pub const TYPE_TEST_MESSAGE: &str = "TEST_MESSAGE";

impl Envelope {
    pub fn host_connected(host_app: impl Into<String>) -> Self {
        Envelope::HostConnected(HostConnectedPayload {
            host_app: host_app.into(),
            timestamp: wire_timestamp(),
        })
    }

    pub fn app_loaded(app: impl Into<String>) -> Self {
        Envelope::AppLoaded(AppLoadedPayload {
            app: app.into(),
            timestamp: wire_timestamp(),
        })
    }

    pub fn user_action(action: impl Into<String>, data: Value) -> Self {
        Envelope::UserAction(UserActionPayload {
            action: action.into(),
            data,
        })
    }

    pub fn test_message(message: impl Into<String>) -> Self {
        Envelope::TestMessage(TestMessagePayload {
            message: message.into(),
        })
    }

    /// The wire `type` tag of this envelope.
    pub fn kind(&self) -> &str {
        match self {
            Envelope::HostConnected(_) => TYPE_HOST_CONNECTED,
            Envelope::AppLoaded(_) => TYPE_APP_LOADED,
            Envelope::UserAction(_) => TYPE_USER_ACTION,
            Envelope::TestMessage(_) => TYPE_TEST_MESSAGE,
            Envelope::Unknown { kind, .. } => kind,
        }
    }

    pub fn to_wire(&self) -> Result<WireEnvelope, MessagingError> {
        let (kind, payload) = match self {
            Envelope::HostConnected(p) => (TYPE_HOST_CONNECTED, Some(serde_json::to_value(p)?)),
            Envelope::AppLoaded(p) => (TYPE_APP_LOADED, Some(serde_json::to_value(p)?)),
            Envelope::UserAction(p) => (TYPE_USER_ACTION, Some(serde_json::to_value(p)?)),
            Envelope::TestMessage(p) => (TYPE_TEST_MESSAGE, Some(serde_json::to_value(p)?)),
            Envelope::Unknown { kind, payload } => {
                return Ok(WireEnvelope {
                    kind: kind.clone(),
                    payload: payload.clone(),
                })
            }
        };
        Ok(WireEnvelope {
            kind: kind.to_string(),
            payload,
        })
    }

    /// Decode a wire envelope. A known `type` with a malformed payload is a
    /// decode error; an unknown `type` is not.
    pub fn from_wire(wire: WireEnvelope) -> Result<Self, MessagingError> {
        let payload = wire.payload.clone().unwrap_or(Value::Null);
        let envelope = match wire.kind.as_str() {
            TYPE_HOST_CONNECTED => Envelope::HostConnected(serde_json::from_value(payload)?),
            TYPE_APP_LOADED => Envelope::AppLoaded(serde_json::from_value(payload)?),
            TYPE_USER_ACTION => Envelope::UserAction(serde_json::from_value(payload)?),
            TYPE_TEST_MESSAGE => Envelope::TestMessage(serde_json::from_value(payload)?),
            _ => Envelope::Unknown {
                kind: wire.kind.clone(),
                payload: wire.payload,
            },
        };
        Ok(envelope)
    }

    pub fn to_value(&self) -> Result<Value, MessagingError> {
        Ok(serde_json::to_value(self.to_wire()?)?)
    }

    pub fn from_value(value: Value) -> Result<Self, MessagingError> {
        let wire: WireEnvelope = serde_json::from_value(value)?;
        Self::from_wire(wire)
    }
}

/// RFC 3339 timestamp with millisecond precision, the format embedded apps
/// already put on the wire.
pub fn wire_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

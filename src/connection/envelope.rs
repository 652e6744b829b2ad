/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Outer messages exchanged on the subscription WebSocket.
//!
//! Every frame is one envelope. Outgoing envelopes name the topic and carry the
//! subscribe options; incoming envelopes are either a `reply` to a request or a data
//! message whose payload depends on the subscribed topic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::YamcsError;

/// Envelope type used for control replies.
pub const REPLY_TYPE: &str = "reply";

/// Envelope sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// Topic name.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Strictly increasing per connection, starting at 1.
    pub id: u64,
    /// Server-assigned call handle, once known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub call: Option<i64>,
    /// Topic-specific subscribe options.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Value>,
}

/// Envelope received from the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerMessage {
    /// Either [`REPLY_TYPE`] or the topic name of a data message.
    #[serde(rename = "type")]
    pub message_type: String,
    /// Call handle the message belongs to.
    #[serde(default)]
    pub call: Option<i64>,
    /// Per-call sequence number of data messages.
    #[serde(default)]
    pub seq: Option<u64>,
    /// Reply or topic payload.
    #[serde(default)]
    pub data: Value,
}

impl ServerMessage {
    /// Returns `true` for control replies.
    pub fn is_reply(&self) -> bool {
        self.message_type == REPLY_TYPE
    }
}

/// Error descriptor carried by a rejecting reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionMessage {
    /// Status-like error code, when provided.
    #[serde(default)]
    pub code: Option<i32>,
    /// Error class name, when provided.
    #[serde(default, rename = "type")]
    pub exception_type: Option<String>,
    /// Human-readable message.
    #[serde(default)]
    pub msg: String,
    /// Structured detail, when provided.
    #[serde(default)]
    pub detail: Option<Value>,
}

impl From<ExceptionMessage> for YamcsError {
    fn from(exception: ExceptionMessage) -> Self {
        let status = exception.code.and_then(|c| u16::try_from(c).ok());
        if status == Some(401) {
            return YamcsError::Unauthorized(exception.msg);
        }
        YamcsError::Server {
            status,
            message: exception.msg,
            detail: exception.detail,
        }
    }
}

/// Payload of a `reply` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Id of the client message this reply answers.
    #[serde(default)]
    pub reply_to: u64,
    /// Present when the request was rejected.
    #[serde(default)]
    pub exception: Option<ExceptionMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_message_omits_call() {
        let msg = ClientMessage {
            message_type: "parameters".to_string(),
            id: 1,
            call: None,
            options: Some(json!({"id": [{"name": "/A/B"}]})),
        };
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            encoded,
            json!({"type": "parameters", "id": 1, "options": {"id": [{"name": "/A/B"}]}})
        );
    }

    #[test]
    fn test_later_message_carries_call() {
        let msg = ClientMessage {
            message_type: "time".to_string(),
            id: 2,
            call: Some(7),
            options: None,
        };
        let encoded = serde_json::to_value(&msg).unwrap();
        assert_eq!(encoded, json!({"type": "time", "id": 2, "call": 7}));
    }

    #[test]
    fn test_decode_success_reply() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"reply","call":3,"data":{"replyTo":1}}"#).unwrap();
        assert!(msg.is_reply());
        assert_eq!(msg.call, Some(3));
        let reply: Reply = serde_json::from_value(msg.data).unwrap();
        assert_eq!(reply.reply_to, 1);
        assert!(reply.exception.is_none());
    }

    #[test]
    fn test_decode_exception_reply() {
        let text = r#"{"type":"reply","data":{"replyTo":1,
            "exception":{"code":400,"type":"BadRequestException","msg":"No parameter by name /X/Y"}}}"#;
        let msg: ServerMessage = serde_json::from_str(text).unwrap();
        let reply: Reply = serde_json::from_value(msg.data).unwrap();
        let err = YamcsError::from(reply.exception.unwrap());
        match err {
            YamcsError::Server { status, message, .. } => {
                assert_eq!(status, Some(400));
                assert_eq!(message, "No parameter by name /X/Y");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unauthorized_exception() {
        let exception = ExceptionMessage {
            code: Some(401),
            exception_type: None,
            msg: "Missing token".to_string(),
            detail: None,
        };
        assert!(matches!(YamcsError::from(exception), YamcsError::Unauthorized(_)));
    }

    #[test]
    fn test_data_message_is_not_reply() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"type":"time","call":3,"seq":9,"data":{"value":"x"}}"#).unwrap();
        assert!(!msg.is_reply());
        assert_eq!(msg.seq, Some(9));
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// DAP request envelope (bridge -> server).
#[derive(Debug, Serialize)]
pub struct Request {
    pub seq: i64,
    #[serde(rename = "type")]
    pub r#type: &'static str,
    pub command: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub arguments: Value,
}

impl Request {
    pub fn new(seq: i64, command: impl Into<String>, arguments: Value) -> Self {
        Request {
            seq,
            r#type: "request",
            command: command.into(),
            arguments,
        }
    }
}

/// DAP response envelope (server -> bridge).
///
/// Note: the DAP specification allows responses with no `body` field at all.
/// Using a `serde_json::Value` keeps the envelope stable and avoids type
/// inference issues around `None` bodies.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub request_seq: i64,
    pub success: bool,
    pub command: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub body: Value,
}

/// Direction-agnostic view over a raw protocol message, used by the
/// interception layer which must not assume well-formedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Request,
    Response,
    Event,
    Unknown,
}

pub fn kind_of(message: &Value) -> MessageKind {
    match message.get("type").and_then(Value::as_str) {
        Some("request") => MessageKind::Request,
        Some("response") => MessageKind::Response,
        Some("event") => MessageKind::Event,
        _ => MessageKind::Unknown,
    }
}

/// `command` of a response or `event` name of an event, if present.
pub fn command_of(message: &Value) -> Option<&str> {
    match kind_of(message) {
        MessageKind::Event => message.get("event").and_then(Value::as_str),
        _ => message.get("command").and_then(Value::as_str),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_envelope_shape() {
        let req = Request::new(7, "dump", json!({"variablesReference": 42}));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["seq"], 7);
        assert_eq!(v["type"], "request");
        assert_eq!(v["command"], "dump");
        assert_eq!(v["arguments"]["variablesReference"], 42);
    }

    #[test]
    fn test_request_omits_null_arguments() {
        let req = Request::new(1, "debugBreakpointBindings", Value::Null);
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("arguments").is_none());
    }

    #[test]
    fn test_response_tolerates_missing_body() {
        let resp: Response = serde_json::from_value(json!({
            "seq": 2, "type": "response", "request_seq": 1,
            "success": true, "command": "dump",
        }))
        .unwrap();
        assert!(resp.body.is_null());
        assert!(resp.message.is_none());
    }

    #[test]
    fn test_message_classification() {
        assert_eq!(kind_of(&json!({"type": "event", "event": "stopped"})), MessageKind::Event);
        assert_eq!(kind_of(&json!({"type": "response"})), MessageKind::Response);
        assert_eq!(kind_of(&json!({"no": "type"})), MessageKind::Unknown);
        assert_eq!(
            command_of(&json!({"type": "event", "event": "stopped"})),
            Some("stopped")
        );
        assert_eq!(
            command_of(&json!({"type": "response", "command": "stackTrace"})),
            Some("stackTrace")
        );
    }
}

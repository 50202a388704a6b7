//! JSON-RPC envelopes.
//!
//! Decoding of incoming frames into [`Incoming`] messages and the response
//! envelope written back for every request. A response carries exactly one
//! of `result` or `error`; [`Payload`] makes that a property of the type.

use rmcp::model::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domains::tools::ToolError;

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const REMOTE_ERROR: i32 = -32000;
}

// ============================================================================
// Requests
// ============================================================================

/// A decoded `tools/call` request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    /// Correlation token, echoed in the response.
    pub id: Value,

    /// Name of the tool to invoke.
    pub tool_name: String,

    /// Loosely-typed arguments.
    pub arguments: JsonObject,
}

/// A decoded incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Initialize { id: Value, params: Value },
    Ping { id: Value },
    ListTools { id: Value },
    CallTool(RequestEnvelope),
    /// Methods under `notifications/`; these get no response.
    Notification { method: String },
    Unknown { id: Value, method: String },
}

/// Raw JSON-RPC request structure.
#[derive(Debug, Deserialize)]
struct RawRequest {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// An undecodable frame, with whatever id could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub id: Value,
    pub code: i32,
    pub message: String,
}

impl DecodeError {
    fn parse(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            code: codes::PARSE_ERROR,
            message: message.into(),
        }
    }

    fn invalid(id: Value, message: impl Into<String>) -> Self {
        Self {
            id,
            code: codes::INVALID_REQUEST,
            message: message.into(),
        }
    }
}

/// Decode one raw frame. Invalid UTF-8 is a parse error like any other.
pub fn decode_bytes(frame: &[u8]) -> Result<Incoming, DecodeError> {
    match std::str::from_utf8(frame) {
        Ok(line) => decode_line(line),
        Err(e) => Err(DecodeError::parse(
            recover_id(&String::from_utf8_lossy(frame)),
            format!("Parse error: frame is not valid UTF-8 ({e})"),
        )),
    }
}

/// Decode one text frame.
pub fn decode_line(line: &str) -> Result<Incoming, DecodeError> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| DecodeError::parse(recover_id(line), format!("Parse error: {e}")))?;
    decode_value(value)
}

/// Best-effort id of a frame that is not valid JSON.
///
/// Takes the first `"id": <number or string>` found in the text.
fn recover_id(text: &str) -> Value {
    let mut rest = text;
    while let Some(pos) = rest.find("\"id\"") {
        rest = &rest[pos + 4..];
        let Some(after_colon) = rest.trim_start().strip_prefix(':') else {
            continue;
        };
        let mut values = serde_json::Deserializer::from_str(after_colon).into_iter::<Value>();
        if let Some(Ok(id @ (Value::Number(_) | Value::String(_)))) = values.next() {
            return id;
        }
    }
    Value::Null
}

/// Decode an already-parsed JSON value.
pub fn decode_value(value: Value) -> Result<Incoming, DecodeError> {
    let id = value.get("id").cloned().unwrap_or(Value::Null);

    if !value.is_object() {
        return Err(DecodeError::invalid(id, "Invalid Request: expected a JSON object"));
    }

    let raw: RawRequest = serde_json::from_value(value)
        .map_err(|e| DecodeError::invalid(id.clone(), format!("Invalid Request: {e}")))?;

    if let Some(version) = raw.jsonrpc.as_deref() {
        if version != JSONRPC_VERSION {
            return Err(DecodeError::invalid(
                id,
                format!("Invalid Request: unsupported jsonrpc version '{version}'"),
            ));
        }
    }

    let id = raw.id.unwrap_or(Value::Null);
    let method = raw.method;

    match method.as_str() {
        "initialize" => Ok(Incoming::Initialize {
            id,
            params: raw.params.unwrap_or_else(|| json!({})),
        }),
        "ping" => Ok(Incoming::Ping { id }),
        "tools/list" => Ok(Incoming::ListTools { id }),
        "tools/call" => decode_tool_call(id, raw.params).map(Incoming::CallTool),
        m if m.starts_with("notifications/") => Ok(Incoming::Notification {
            method: m.to_string(),
        }),
        m => Ok(Incoming::Unknown {
            id,
            method: m.to_string(),
        }),
    }
}

fn decode_tool_call(id: Value, params: Option<Value>) -> Result<RequestEnvelope, DecodeError> {
    let Some(Value::Object(mut params)) = params else {
        return Err(DecodeError::invalid(id, "Invalid Request: tools/call requires params"));
    };

    let tool_name = match params.remove("name") {
        Some(Value::String(name)) => name,
        _ => return Err(DecodeError::invalid(id, "Invalid Request: missing tool name")),
    };

    let arguments = match params.remove("arguments") {
        None | Some(Value::Null) => JsonObject::new(),
        Some(Value::Object(args)) => args,
        Some(_) => {
            return Err(DecodeError::invalid(
                id,
                "Invalid Request: arguments must be an object",
            ));
        }
    };

    Ok(RequestEnvelope {
        id,
        tool_name,
        arguments,
    })
}

// ============================================================================
// Responses
// ============================================================================

/// Error payload of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i32,
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorBody {
    pub fn new(code: i32, kind: &str, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: kind.to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Method not found error.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, "MethodNotFound", method)
    }

    /// Undecodable frame.
    pub fn decode(err: &DecodeError) -> Self {
        Self::new(err.code, "TransportDecodeError", err.message.clone())
    }
}

impl From<&ToolError> for ErrorBody {
    fn from(err: &ToolError) -> Self {
        let code = match err {
            ToolError::NotFound(_)
            | ToolError::MissingArgument { .. }
            | ToolError::InvalidArgument { .. } => codes::INVALID_PARAMS,
            ToolError::RemoteCall { .. } => codes::REMOTE_ERROR,
            ToolError::Unknown(_) => codes::INTERNAL_ERROR,
        };
        let mut body = Self::new(code, err.kind(), err.wire_message());
        body.data = match err {
            ToolError::InvalidArgument {
                parameter,
                expected,
            } => Some(json!({ "parameter": parameter, "expected": expected })),
            ToolError::RemoteCall { status, .. } => Some(json!({ "status": status })),
            _ => None,
        };
        body
    }
}

/// Exactly one of result or error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    Result(Value),
    Error(ErrorBody),
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub payload: Payload,
}

impl ResponseEnvelope {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: Payload::Result(result),
        }
    }

    /// Create an error response.
    pub fn failure(id: Value, error: ErrorBody) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: Payload::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, Payload::Error(_))
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        match &self.payload {
            Payload::Error(body) => Some(body),
            Payload::Result(_) => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Result(value) => Some(value),
            Payload::Error(_) => None,
        }
    }

    /// Encode as a single line of JSON (without the trailing newline).
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_tool_call() {
        let incoming = decode_line(
            r#"{"id":1,"method":"tools/call","params":{"name":"get_issue","arguments":{"key":"KW-123"}}}"#,
        )
        .unwrap();
        match incoming {
            Incoming::CallTool(envelope) => {
                assert_eq!(envelope.id, json!(1));
                assert_eq!(envelope.tool_name, "get_issue");
                assert_eq!(envelope.arguments["key"], "KW-123");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_decode_without_arguments() {
        let incoming =
            decode_line(r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"get_projects"}}"#)
                .unwrap();
        assert!(matches!(incoming, Incoming::CallTool(ref e) if e.arguments.is_empty()));
    }

    #[test]
    fn test_decode_list_without_id() {
        let incoming = decode_line(r#"{"method":"tools/list"}"#).unwrap();
        assert_eq!(incoming, Incoming::ListTools { id: Value::Null });
    }

    #[test]
    fn test_decode_notification() {
        let incoming = decode_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(incoming, Incoming::Notification { .. }));
    }

    #[test]
    fn test_decode_garbage_has_null_id() {
        let err = decode_line("{not json").unwrap_err();
        assert_eq!(err.id, Value::Null);
        assert_eq!(err.code, codes::PARSE_ERROR);
    }

    #[test]
    fn test_decode_recovers_id() {
        let err = decode_line(r#"{"id":7,"params":{}}"#).unwrap_err();
        assert_eq!(err.id, json!(7));
        assert_eq!(err.code, codes::INVALID_REQUEST);

        let err = decode_line(r#"{"id":8,"method":"tools/call","params":{"arguments":{}}}"#).unwrap_err();
        assert_eq!(err.id, json!(8));

        let err = decode_line(r#"{"jsonrpc":"1.0","id":9,"method":"ping"}"#).unwrap_err();
        assert_eq!(err.id, json!(9));
    }

    #[test]
    fn test_decode_truncated_frame_recovers_id() {
        let err = decode_line(r#"{"id":5,"method":"ping""#).unwrap_err();
        assert_eq!(err.id, json!(5));
        assert_eq!(err.code, codes::PARSE_ERROR);

        let err = decode_line(r#"{"jsonrpc":"2.0", "id" : "req-7", "method":"#).unwrap_err();
        assert_eq!(err.id, json!("req-7"));

        let err = decode_line(r#"{"method":"ping","params":{"name":"id"}"#).unwrap_err();
        assert_eq!(err.id, Value::Null);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = decode_bytes(b"{\"method\":\"ping\",\"x\":\"\xff\xfe\"}").unwrap_err();
        assert_eq!(err.id, Value::Null);
        assert_eq!(err.code, codes::PARSE_ERROR);
        assert!(err.message.contains("UTF-8"));

        let err = decode_bytes(b"{\"id\":2,\"method\":\"\xff\"}").unwrap_err();
        assert_eq!(err.id, json!(2));

        let incoming = decode_bytes(br#"{"id":3,"method":"ping"}"#).unwrap();
        assert_eq!(incoming, Incoming::Ping { id: json!(3) });
    }

    #[test]
    fn test_decode_non_object() {
        let err = decode_line("[1,2,3]").unwrap_err();
        assert_eq!(err.id, Value::Null);
        assert_eq!(err.code, codes::INVALID_REQUEST);
    }

    #[test]
    fn test_response_has_exactly_one_payload() {
        let ok = serde_json::to_value(ResponseEnvelope::success(json!(1), json!({"a": 1}))).unwrap();
        assert_eq!(ok["jsonrpc"], "2.0");
        assert_eq!(ok["id"], 1);
        assert!(ok.get("result").is_some());
        assert!(ok.get("error").is_none());

        let err = serde_json::to_value(ResponseEnvelope::failure(
            json!(1),
            ErrorBody::from(&ToolError::missing("key")),
        ))
        .unwrap();
        assert!(err.get("result").is_none());
        assert_eq!(err["error"]["kind"], "MissingArgument");
        assert_eq!(err["error"]["message"], "key");
        assert!(err["error"].get("data").is_none());
    }

    #[test]
    fn test_remote_error_carries_status() {
        let body = ErrorBody::from(&ToolError::RemoteCall {
            status: 403,
            message: "Forbidden".into(),
        });
        assert_eq!(body.kind, "RemoteCallError");
        assert_eq!(body.code, codes::REMOTE_ERROR);
        assert_eq!(body.data, Some(json!({ "status": 403 })));
    }
}

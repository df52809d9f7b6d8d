//! Request and Response message types.
//!
//! Defines the wire format for CDP commands and their replies.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, SessionId};

use super::Command;

// ============================================================================
// Request
// ============================================================================

/// A command sent to the browser.
///
/// # Format
///
/// ```json
/// {
///   "id": 7,
///   "method": "Runtime.evaluate",
///   "params": { "expression": "1 + 1" },
///   "sessionId": "optional-session"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Correlation id, strictly increasing per connection.
    pub id: CommandId,

    /// Target session for flattened attachments.
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,

    /// Method name, cached for logging and error context.
    #[serde(skip)]
    method: String,
}

impl Request {
    /// Creates a request with the given id.
    #[must_use]
    pub fn new(id: CommandId, session_id: Option<SessionId>, command: Command) -> Self {
        let method = command.method();
        Self {
            id,
            session_id,
            command,
            method,
        }
    }

    /// Returns the CDP method name.
    #[inline]
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }
}

// ============================================================================
// Response
// ============================================================================

/// A reply to a command.
///
/// Success:
/// ```json
/// { "id": 7, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 7, "error": { "code": -32000, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if error).
    #[serde(default)]
    pub error: Option<ProtocolError>,

    /// Session the reply belongs to.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

/// CDP error payload.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProtocolError {
    /// JSON-RPC style error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional extra detail.
    #[serde(default)]
    pub data: Option<String>,
}

impl Response {
    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning an error if the browser
    /// rejected the command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] carrying the CDP code and message.
    pub fn into_result(self, method: &str) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(err) => {
                let message = match err.data {
                    Some(data) if !data.is_empty() => format!("{} ({})", err.message, data),
                    _ => err.message,
                };
                Err(Error::protocol(method, err.code, message))
            }
        }
    }

    /// Gets a string value from the result.
    ///
    /// Returns empty string if key not found or not a string.
    #[inline]
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a u64 value from the result.
    ///
    /// Returns 0 if key not found or not a number.
    #[inline]
    #[must_use]
    pub fn get_u64(&self, key: &str) -> u64 {
        self.result
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(|v| v.as_u64())
            .unwrap_or_default()
    }
}

// ============================================================================
// Value Helpers
// ============================================================================

/// Looks up a dotted path such as `"exceptionDetails.exception.description"`.
#[must_use]
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, key| {
        if let Ok(index) = key.parse::<usize>()
            && let Some(array) = current.as_array()
        {
            return array.get(index);
        }
        current.get(key)
    })
}

/// Looks up a dotted path and returns it as a string slice.
#[inline]
#[must_use]
pub fn get_path_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    get_path(value, path).and_then(Value::as_str)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PageCommand, RuntimeCommand};

    #[test]
    fn test_request_serialization() {
        let command = Command::Page(PageCommand::Navigate {
            url: "https://example.com".to_string(),
        });

        let request = Request::new(CommandId::new(1), None, command);
        let json: Value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["id"], 1);
        assert_eq!(json["method"], "Page.navigate");
        assert_eq!(json["params"]["url"], "https://example.com");
        assert!(json.get("sessionId").is_none());
        assert_eq!(request.method(), "Page.navigate");
    }

    #[test]
    fn test_request_with_session() {
        let command = Command::Runtime(RuntimeCommand::Enable);
        let request = Request::new(CommandId::new(9), Some(SessionId::new("S-1")), command);
        let json: Value = serde_json::to_value(&request).expect("serialize");

        assert_eq!(json["sessionId"], "S-1");
        assert_eq!(json["method"], "Runtime.enable");
    }

    #[test]
    fn test_success_response() {
        let json_str = r#"{"id": 3, "result": {"frameTree": {"frame": {"id": "F1"}}}}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_success());
        assert_eq!(response.id, CommandId::new(3));

        let result = response.into_result("Page.getFrameTree").expect("ok");
        assert_eq!(get_path_str(&result, "frameTree.frame.id"), Some("F1"));
    }

    #[test]
    fn test_error_response() {
        let json_str = r#"{
            "id": 4,
            "error": {"code": -32000, "message": "Cannot find context with specified id"}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert!(response.is_error());

        let err = response.into_result("Runtime.evaluate").unwrap_err();
        assert!(err.is_transient_context_error());
        assert!(err.to_string().contains("Runtime.evaluate"));
    }

    #[test]
    fn test_error_data_is_appended() {
        let json_str = r#"{
            "id": 5,
            "error": {"code": -32602, "message": "Invalid parameters", "data": "url: string value expected"}
        }"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        let err = response.into_result("Page.navigate").unwrap_err();
        assert!(err.to_string().contains("string value expected"));
    }

    #[test]
    fn test_event_is_not_a_response() {
        let json_str = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}}"#;
        assert!(serde_json::from_str::<Response>(json_str).is_err());
    }

    #[test]
    fn test_get_path_through_arrays() {
        let value = serde_json::json!({"args": [{"value": "a"}, {"value": "b"}]});
        assert_eq!(get_path_str(&value, "args.1.value"), Some("b"));
        assert!(get_path(&value, "args.5.value").is_none());
    }

    #[test]
    fn test_response_get_helpers() {
        let json_str = r#"{"id": 1, "result": {"data": "aGk=", "windowId": 12}}"#;

        let response: Response = serde_json::from_str(json_str).expect("parse");
        assert_eq!(response.get_string("data"), "aGk=");
        assert_eq!(response.get_u64("windowId"), 12);
        assert_eq!(response.get_string("missing"), "");
        assert_eq!(response.get_u64("missing"), 0);
    }
}

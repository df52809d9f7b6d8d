//! Event message types.
//!
//! Events are unsolicited notifications the browser pushes over the same
//! socket as command replies. They carry a method name but no `id`.
//!
//! # Event Types
//!
//! | Domain | Events |
//! |--------|--------|
//! | `Page` | `lifecycleEvent`, `domContentEventFired`, `loadEventFired`, `frame*`, `javascriptDialog*` |
//! | `Runtime` | `executionContext*`, `consoleAPICalled`, `exceptionThrown` |
//! | `Network` | `requestWillBeSent`, `responseReceived` |
//! | `Fetch` | `requestPaused` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::identifiers::{ContextId, FetchRequestId, FrameId, SessionId};

// ============================================================================
// Event
// ============================================================================

/// An event notification from the browser.
///
/// # Format
///
/// ```json
/// {
///   "method": "Page.loadEventFired",
///   "params": { "timestamp": 1234.5 },
///   "sessionId": "optional-session"
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Session the event originated from.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<SessionId>,
}

impl Event {
    /// Creates an event; used by the transport for synthetic dispatch and
    /// by tests.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
            session_id: None,
        }
    }

    /// Returns the domain from the method, e.g. `Page`.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method, e.g. `loadEventFired`.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        self.parse_internal()
    }
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone)]
pub enum ParsedEvent {
    /// Page lifecycle milestone for a frame.
    Lifecycle {
        /// Frame the milestone belongs to.
        frame_id: FrameId,
        /// Milestone name, e.g. `DOMContentLoaded`, `networkIdle`.
        name: String,
    },

    /// Main document finished parsing.
    DomContentEventFired,

    /// Main document finished loading.
    LoadEventFired,

    /// A child frame was attached.
    FrameAttached {
        /// New frame.
        frame_id: FrameId,
        /// Its parent.
        parent_frame_id: FrameId,
    },

    /// A frame was detached.
    FrameDetached {
        /// Removed frame.
        frame_id: FrameId,
    },

    /// A frame committed a navigation.
    FrameNavigated {
        /// Navigated frame.
        frame_id: FrameId,
        /// Parent frame, `None` for the main frame.
        parent_id: Option<FrameId>,
        /// New URL.
        url: String,
    },

    /// A frame started loading.
    FrameStartedLoading {
        /// Loading frame.
        frame_id: FrameId,
    },

    /// A frame stopped loading.
    FrameStoppedLoading {
        /// Frame that finished.
        frame_id: FrameId,
    },

    /// An execution context was created.
    ExecutionContextCreated {
        /// New context.
        context_id: ContextId,
        /// Frame owning the context, when any.
        frame_id: Option<FrameId>,
        /// Whether this is the frame's main world.
        is_default: bool,
    },

    /// An execution context was destroyed.
    ExecutionContextDestroyed {
        /// Destroyed context.
        context_id: ContextId,
    },

    /// All execution contexts were cleared.
    ExecutionContextsCleared,

    /// A JavaScript dialog is about to open.
    DialogOpening {
        /// Dialog message.
        message: String,
        /// `alert`, `confirm`, `prompt` or `beforeunload`.
        dialog_type: String,
        /// Default prompt text.
        default_prompt: Option<String>,
        /// URL of the page that opened it.
        url: String,
    },

    /// A JavaScript dialog was closed.
    DialogClosed {
        /// Whether it was accepted.
        result: bool,
    },

    /// A request was paused by the `Fetch` domain.
    RequestPaused {
        /// Paused request id.
        request_id: FetchRequestId,
        /// Request URL.
        url: String,
        /// HTTP method.
        method: String,
        /// Request headers.
        headers: Value,
        /// Request body, when any.
        post_data: Option<String>,
        /// Resource type, e.g. `Document`, `XHR`.
        resource_type: String,
    },

    /// A network request is about to be sent.
    RequestWillBeSent {
        /// Network request id.
        request_id: String,
        /// Request URL.
        url: String,
        /// HTTP method.
        method: String,
        /// Resource type, e.g. `Document`, `XHR`.
        resource_type: String,
    },

    /// Response headers arrived for a network request.
    ResponseReceived {
        /// Network request id.
        request_id: String,
        /// Response URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response MIME type.
        mime_type: String,
        /// Resource type, e.g. `Document`, `XHR`.
        resource_type: String,
    },

    /// `console.*` was called.
    ConsoleApiCalled {
        /// `log`, `warning`, `error` and so on.
        level: String,
        /// Arguments joined by spaces.
        text: String,
    },

    /// An uncaught exception was thrown.
    ExceptionThrown {
        /// Exception description.
        text: String,
    },

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Parsing Implementation
// ============================================================================

impl Event {
    /// Internal parsing implementation.
    fn parse_internal(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Page.lifecycleEvent" => ParsedEvent::Lifecycle {
                frame_id: FrameId::new(self.get_string("frameId")),
                name: self.get_string("name"),
            },

            "Page.domContentEventFired" => ParsedEvent::DomContentEventFired,

            "Page.loadEventFired" => ParsedEvent::LoadEventFired,

            "Page.frameAttached" => ParsedEvent::FrameAttached {
                frame_id: FrameId::new(self.get_string("frameId")),
                parent_frame_id: FrameId::new(self.get_string("parentFrameId")),
            },

            "Page.frameDetached" => ParsedEvent::FrameDetached {
                frame_id: FrameId::new(self.get_string("frameId")),
            },

            "Page.frameNavigated" => {
                let frame = self.params.get("frame").unwrap_or(&Value::Null);
                ParsedEvent::FrameNavigated {
                    frame_id: FrameId::new(str_field(frame, "id")),
                    parent_id: frame
                        .get("parentId")
                        .and_then(Value::as_str)
                        .map(FrameId::from),
                    url: str_field(frame, "url"),
                }
            }

            "Page.frameStartedLoading" => ParsedEvent::FrameStartedLoading {
                frame_id: FrameId::new(self.get_string("frameId")),
            },

            "Page.frameStoppedLoading" => ParsedEvent::FrameStoppedLoading {
                frame_id: FrameId::new(self.get_string("frameId")),
            },

            "Runtime.executionContextCreated" => {
                let context = self.params.get("context").unwrap_or(&Value::Null);
                let aux = context.get("auxData").unwrap_or(&Value::Null);
                ParsedEvent::ExecutionContextCreated {
                    context_id: ContextId::new(
                        context.get("id").and_then(Value::as_i64).unwrap_or_default(),
                    ),
                    frame_id: aux.get("frameId").and_then(Value::as_str).map(FrameId::from),
                    is_default: aux
                        .get("isDefault")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                }
            }

            "Runtime.executionContextDestroyed" => ParsedEvent::ExecutionContextDestroyed {
                context_id: ContextId::new(
                    self.params
                        .get("executionContextId")
                        .and_then(Value::as_i64)
                        .unwrap_or_default(),
                ),
            },

            "Runtime.executionContextsCleared" => ParsedEvent::ExecutionContextsCleared,

            "Page.javascriptDialogOpening" => ParsedEvent::DialogOpening {
                message: self.get_string("message"),
                dialog_type: self.get_string_or("type", "alert"),
                default_prompt: self.get_optional_string("defaultPrompt"),
                url: self.get_string("url"),
            },

            "Page.javascriptDialogClosed" => ParsedEvent::DialogClosed {
                result: self
                    .params
                    .get("result")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },

            "Fetch.requestPaused" => {
                let request = self.params.get("request").unwrap_or(&Value::Null);
                ParsedEvent::RequestPaused {
                    request_id: FetchRequestId::new(self.get_string("requestId")),
                    url: str_field(request, "url"),
                    method: request
                        .get("method")
                        .and_then(Value::as_str)
                        .unwrap_or("GET")
                        .to_string(),
                    headers: request.get("headers").cloned().unwrap_or(Value::Null),
                    post_data: request
                        .get("postData")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    resource_type: self.get_string_or("resourceType", "Other"),
                }
            }

            "Network.requestWillBeSent" => {
                let request = self.params.get("request").unwrap_or(&Value::Null);
                ParsedEvent::RequestWillBeSent {
                    request_id: self.get_string("requestId"),
                    url: str_field(request, "url"),
                    method: request
                        .get("method")
                        .and_then(Value::as_str)
                        .unwrap_or("GET")
                        .to_string(),
                    resource_type: self.get_string_or("type", "Other"),
                }
            }

            "Network.responseReceived" => {
                let response = self.params.get("response").unwrap_or(&Value::Null);
                ParsedEvent::ResponseReceived {
                    request_id: self.get_string("requestId"),
                    url: str_field(response, "url"),
                    status: response
                        .get("status")
                        .and_then(Value::as_f64)
                        .map_or(0, |s| s as u16),
                    mime_type: str_field(response, "mimeType"),
                    resource_type: self.get_string_or("type", "Other"),
                }
            }

            "Runtime.consoleAPICalled" => ParsedEvent::ConsoleApiCalled {
                level: self.get_string_or("type", "log"),
                text: self.console_text(),
            },

            "Runtime.exceptionThrown" => ParsedEvent::ExceptionThrown {
                text: self.exception_text(),
            },

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Joins console arguments, preferring primitive values over previews.
    fn console_text(&self) -> String {
        let Some(args) = self.params.get("args").and_then(Value::as_array) else {
            return String::new();
        };

        args.iter()
            .map(|arg| match arg.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => arg
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_else(|| arg.get("type").and_then(Value::as_str).unwrap_or(""))
                    .to_string(),
                Some(other) => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn exception_text(&self) -> String {
        let details = self.params.get("exceptionDetails").unwrap_or(&Value::Null);
        details
            .get("exception")
            .and_then(|e| e.get("description"))
            .and_then(Value::as_str)
            .or_else(|| details.get("text").and_then(Value::as_str))
            .unwrap_or_default()
            .to_string()
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> String {
        str_field(&self.params, key)
    }

    /// Gets a string from params with default.
    #[inline]
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    }

    /// Gets an optional string from params.
    #[inline]
    fn get_optional_string(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

#[inline]
fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json_str: &str) -> ParsedEvent {
        let event: Event = serde_json::from_str(json_str).expect("parse event");
        event.parse()
    }

    #[test]
    fn test_event_domain_and_name() {
        let event: Event = serde_json::from_str(
            r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.5}, "sessionId": "S"}"#,
        )
        .expect("parse event");

        assert_eq!(event.domain(), "Page");
        assert_eq!(event.event_name(), "loadEventFired");
        assert_eq!(event.session_id, Some(SessionId::new("S")));
        assert!(matches!(event.parse(), ParsedEvent::LoadEventFired));
    }

    #[test]
    fn test_execution_context_created() {
        let parsed = parse(
            r#"{
                "method": "Runtime.executionContextCreated",
                "params": {"context": {"id": 7, "origin": "", "name": "",
                    "auxData": {"isDefault": true, "type": "default", "frameId": "F2"}}}
            }"#,
        );

        match parsed {
            ParsedEvent::ExecutionContextCreated {
                context_id,
                frame_id,
                is_default,
            } => {
                assert_eq!(context_id, ContextId::new(7));
                assert_eq!(frame_id, Some(FrameId::new("F2")));
                assert!(is_default);
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_frame_navigated_main_frame() {
        let parsed = parse(
            r#"{"method": "Page.frameNavigated",
                "params": {"frame": {"id": "MAIN", "url": "https://example.com/"}}}"#,
        );

        match parsed {
            ParsedEvent::FrameNavigated { frame_id, parent_id, url } => {
                assert_eq!(frame_id.as_str(), "MAIN");
                assert!(parent_id.is_none());
                assert_eq!(url, "https://example.com/");
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_dialog_opening() {
        let parsed = parse(
            r#"{"method": "Page.javascriptDialogOpening",
                "params": {"url": "about:blank", "message": "Sure?", "type": "confirm",
                           "hasBrowserHandler": false}}"#,
        );

        match parsed {
            ParsedEvent::DialogOpening { message, dialog_type, default_prompt, .. } => {
                assert_eq!(message, "Sure?");
                assert_eq!(dialog_type, "confirm");
                assert!(default_prompt.is_none());
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_request_paused() {
        let parsed = parse(
            r#"{"method": "Fetch.requestPaused",
                "params": {"requestId": "interception-job-1.0", "resourceType": "XHR",
                    "request": {"url": "https://api.test/users", "method": "POST",
                                "headers": {"Accept": "*/*"}, "postData": "{}"}}}"#,
        );

        match parsed {
            ParsedEvent::RequestPaused {
                request_id,
                url,
                method,
                headers,
                post_data,
                resource_type,
            } => {
                assert_eq!(request_id.as_str(), "interception-job-1.0");
                assert_eq!(url, "https://api.test/users");
                assert_eq!(method, "POST");
                assert_eq!(headers["Accept"], "*/*");
                assert_eq!(post_data.as_deref(), Some("{}"));
                assert_eq!(resource_type, "XHR");
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_console_text_joins_args() {
        let parsed = parse(
            r#"{"method": "Runtime.consoleAPICalled",
                "params": {"type": "error", "args": [
                    {"type": "string", "value": "count"},
                    {"type": "number", "value": 3},
                    {"type": "object", "description": "Object"}]}}"#,
        );

        match parsed {
            ParsedEvent::ConsoleApiCalled { level, text } => {
                assert_eq!(level, "error");
                assert_eq!(text, "count 3 Object");
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_exception_thrown_prefers_description() {
        let parsed = parse(
            r#"{"method": "Runtime.exceptionThrown",
                "params": {"exceptionDetails": {"text": "Uncaught",
                    "exception": {"description": "ReferenceError: foo is not defined"}}}}"#,
        );

        match parsed {
            ParsedEvent::ExceptionThrown { text } => {
                assert!(text.starts_with("ReferenceError"));
            }
            _ => panic!("unexpected parsed event type"),
        }
    }

    #[test]
    fn test_unknown_event() {
        let parsed = parse(r#"{"method": "Custom.thing", "params": {"foo": "bar"}}"#);

        match parsed {
            ParsedEvent::Unknown { method, params } => {
                assert_eq!(method, "Custom.thing");
                assert_eq!(params["foo"], "bar");
            }
            _ => panic!("expected Unknown variant"),
        }
    }

    #[test]
    fn test_network_events() {
        let sent = parse(
            r#"{"method": "Network.requestWillBeSent", "params": {
                "requestId": "1000.7", "type": "Fetch",
                "request": {"url": "https://site.test/api", "method": "POST", "headers": {}}
            }}"#,
        );
        assert!(matches!(
            sent,
            ParsedEvent::RequestWillBeSent { ref request_id, ref method, ref resource_type, .. }
                if request_id == "1000.7" && method == "POST" && resource_type == "Fetch"
        ));

        let received = parse(
            r#"{"method": "Network.responseReceived", "params": {
                "requestId": "1000.7", "type": "Fetch",
                "response": {"url": "https://site.test/api", "status": 201, "mimeType": "application/json"}
            }}"#,
        );
        match received {
            ParsedEvent::ResponseReceived { status, mime_type, url, .. } => {
                assert_eq!(status, 201);
                assert_eq!(mime_type, "application/json");
                assert_eq!(url, "https://site.test/api");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

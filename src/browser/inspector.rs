//! Console capture, network observation and page snapshots.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::protocol::ParsedEvent;

// ============================================================================
// Constants
// ============================================================================

/// Messages kept per buffer before the oldest are dropped.
pub const CONSOLE_CAPACITY: usize = 1000;

// ============================================================================
// ConsoleMessage
// ============================================================================

/// One captured console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// `log`, `info`, `warning`, `error`, `debug` or `exception`.
    pub level: String,
    /// Message text.
    pub text: String,
}

impl ConsoleMessage {
    /// Builds a message from a console or exception event.
    #[must_use]
    pub fn from_event(event: &ParsedEvent) -> Option<Self> {
        match event {
            ParsedEvent::ConsoleApiCalled { level, text } => Some(Self {
                level: level.clone(),
                text: text.clone(),
            }),
            ParsedEvent::ExceptionThrown { text } => Some(Self {
                level: "exception".to_string(),
                text: text.clone(),
            }),
            _ => None,
        }
    }

    /// `true` for errors, failed assertions and uncaught exceptions.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.level.as_str(), "error" | "assert" | "exception")
    }

    fn is_warning(&self) -> bool {
        matches!(self.level.as_str(), "warning" | "warn")
    }
}

// ============================================================================
// Network
// ============================================================================

/// A request the page is about to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    /// Network request id, shared with the matching response.
    pub request_id: String,
    /// Request URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Resource type, e.g. `Document`, `XHR`.
    pub resource_type: String,
}

impl NetworkRequest {
    /// Builds a request from a `Network.requestWillBeSent` event.
    #[must_use]
    pub fn from_event(event: &ParsedEvent) -> Option<Self> {
        match event {
            ParsedEvent::RequestWillBeSent {
                request_id,
                url,
                method,
                resource_type,
            } => Some(Self {
                request_id: request_id.clone(),
                url: url.clone(),
                method: method.clone(),
                resource_type: resource_type.clone(),
            }),
            _ => None,
        }
    }
}

/// Response headers received for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    /// Network request id.
    pub request_id: String,
    /// Response URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// MIME type.
    pub mime_type: String,
    /// Resource type.
    pub resource_type: String,
}

impl NetworkResponse {
    /// Builds a response from a `Network.responseReceived` event.
    #[must_use]
    pub fn from_event(event: &ParsedEvent) -> Option<Self> {
        match event {
            ParsedEvent::ResponseReceived {
                request_id,
                url,
                status,
                mime_type,
                resource_type,
            } => Some(Self {
                request_id: request_id.clone(),
                url: url.clone(),
                status: *status,
                mime_type: mime_type.clone(),
                resource_type: resource_type.clone(),
            }),
            _ => None,
        }
    }

    /// `true` for 4xx and 5xx statuses.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

// ============================================================================
// ConsoleBuffer
// ============================================================================

#[derive(Debug, Default)]
struct Buffers {
    messages: VecDeque<ConsoleMessage>,
    errors: VecDeque<ConsoleMessage>,
    warnings: VecDeque<ConsoleMessage>,
}

/// Bounded console log with errors and warnings also kept apart.
#[derive(Debug, Default)]
pub struct ConsoleBuffer {
    inner: Mutex<Buffers>,
}

impl ConsoleBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a console or exception event; other events are ignored.
    pub fn record(&self, event: &ParsedEvent) {
        if let Some(message) = ConsoleMessage::from_event(event) {
            self.push(message);
        }
    }

    /// Appends a message.
    pub fn push(&self, message: ConsoleMessage) {
        let mut buffers = self.inner.lock();
        if message.is_error() {
            push_bounded(&mut buffers.errors, message.clone());
        } else if message.is_warning() {
            push_bounded(&mut buffers.warnings, message.clone());
        }
        push_bounded(&mut buffers.messages, message);
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.inner.lock().messages.iter().cloned().collect()
    }

    /// Errors and uncaught exceptions.
    #[must_use]
    pub fn errors(&self) -> Vec<ConsoleMessage> {
        self.inner.lock().errors.iter().cloned().collect()
    }

    /// Warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<ConsoleMessage> {
        self.inner.lock().warnings.iter().cloned().collect()
    }

    /// Drops everything.
    pub fn clear(&self) {
        *self.inner.lock() = Buffers::default();
    }
}

fn push_bounded(queue: &mut VecDeque<ConsoleMessage>, message: ConsoleMessage) {
    if queue.len() == CONSOLE_CAPACITY {
        queue.pop_front();
    }
    queue.push_back(message);
}

// ============================================================================
// Snapshot
// ============================================================================

/// Aggregated diagnostic state of the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Current URL.
    pub url: String,
    /// Document title.
    pub title: String,
    /// All console lines.
    pub console_messages: Vec<String>,
    /// Console errors and exceptions.
    pub console_errors: Vec<String>,
    /// Base64 PNG of the viewport; absent for light snapshots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_base64: Option<String>,
}

impl Snapshot {
    /// Builds a snapshot from page state and the console buffer.
    #[must_use]
    pub fn new(url: String, title: String, console: &ConsoleBuffer, screenshot_base64: Option<String>) -> Self {
        let render = |m: &ConsoleMessage| format!("[{}] {}", m.level, m.text);
        Self {
            url,
            title,
            console_messages: console.messages().iter().map(render).collect(),
            console_errors: console.errors().iter().map(render).collect(),
            screenshot_base64,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

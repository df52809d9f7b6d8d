//! Error types for the CDP driver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_driver::{Driver, Result};
//!
//! async fn example(driver: &Driver) -> Result<()> {
//!     driver.click("#submit").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Launch`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::InvalidArgument`] |
//! | Element | [`Error::ElementNotFound`] |
//! | Navigation | [`Error::FrameNotFound`], [`Error::Navigation`], [`Error::PageNotFound`] |
//! | Execution | [`Error::Script`], [`Error::Timeout`], [`Error::RequestTimeout`] |
//! | Dialog | [`Error::DialogNotHandled`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`], [`Error::Base64`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use base64::DecodeError;
use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Constants
// ============================================================================

/// CDP error code for server-side failures such as a destroyed context.
pub const SERVER_ERROR_CODE: i64 = -32000;

/// Messages the browser returns while an execution context is being swapped.
const TRANSIENT_CONTEXT_MESSAGES: &[&str] = &[
    "Execution context was destroyed",
    "Cannot find context with specified id",
    "Inspected target navigated or closed",
    "Execution context with given id not found",
];

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when driver options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Failed to launch or reach the browser process.
    #[error("Failed to launch browser ({executable}): {message}")]
    Launch {
        /// Executable that was started.
        executable: PathBuf,
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The DevTools endpoint did not become ready in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed.
    ///
    /// Returned for commands pending when the socket closed and for every
    /// command sent afterwards.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The browser answered a command with a CDP error.
    #[error("Protocol error {code} in {method}: {message}")]
    Protocol {
        /// Method of the failed command.
        method: String,
        /// CDP error code.
        code: i64,
        /// CDP error message.
        message: String,
    },

    /// Invalid argument passed to a driver operation.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Element Errors
    // ========================================================================
    /// Operation invoked on an element that does not exist.
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Locator that matched nothing.
        locator: String,
    },

    // ========================================================================
    // Navigation Errors
    // ========================================================================
    /// Frame could not be switched to.
    #[error("Frame not found: {reason}")]
    FrameNotFound {
        /// Why the frame could not be resolved.
        reason: String,
    },

    /// Navigation was rejected by the browser.
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// Target URL.
        url: String,
        /// Browser-reported error text.
        message: String,
    },

    /// No page target matched.
    #[error("Page not found: {query}")]
    PageNotFound {
        /// Index or title/url fragment used.
        query: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// JavaScript evaluation threw.
    #[error("Script error: {message}")]
    Script {
        /// Exception description from the browser.
        message: String,
    },

    /// A wait or poll exceeded its deadline.
    #[error("Timeout after {elapsed_ms}ms (limit {timeout_ms}ms): {operation}")]
    Timeout {
        /// Locator, expression or condition being waited on.
        operation: String,
        /// Configured limit.
        timeout_ms: u64,
        /// Time actually spent.
        elapsed_ms: u64,
    },

    /// A single command got no reply in time.
    #[error("Command {command_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Id of the abandoned command.
        command_id: CommandId,
        /// Method of the abandoned command.
        method: String,
        /// Milliseconds waited.
        timeout_ms: u64,
    },

    // ========================================================================
    // Dialog Errors
    // ========================================================================
    /// A dialog handler returned without accepting or dismissing.
    #[error("Dialog not handled, auto-dismissed: {message}")]
    DialogNotHandled {
        /// Dialog message.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP error while talking to the DevTools endpoint.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid base64 payload from the browser.
    #[error("Base64 error: {0}")]
    Base64(#[from] DecodeError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a launch error.
    #[inline]
    pub fn launch(executable: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Launch {
            executable: executable.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(method: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            method: method.into(),
            code,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(locator: impl Into<String>) -> Self {
        Self::ElementNotFound {
            locator: locator.into(),
        }
    }

    /// Creates a frame not found error.
    #[inline]
    pub fn frame_not_found(reason: impl Into<String>) -> Self {
        Self::FrameNotFound {
            reason: reason.into(),
        }
    }

    /// Creates a navigation error.
    #[inline]
    pub fn navigation(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Navigation {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a page not found error.
    #[inline]
    pub fn page_not_found(query: impl Into<String>) -> Self {
        Self::PageNotFound {
            query: query.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
            elapsed_ms,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(command_id: CommandId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            command_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a dialog-not-handled error.
    #[inline]
    pub fn dialog_not_handled(message: impl Into<String>) -> Self {
        Self::DialogNotHandled {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::Timeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is an element or frame lookup error.
    #[inline]
    #[must_use]
    pub fn is_element_error(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::FrameNotFound { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
                | Self::ChannelClosed(_)
        )
    }

    /// Returns `true` if the browser rejected a command because the
    /// execution context it targeted is gone or being replaced.
    #[must_use]
    pub fn is_transient_context_error(&self) -> bool {
        match self {
            Self::Protocol { code, message, .. } => {
                *code == SERVER_ERROR_CODE
                    && TRANSIENT_CONTEXT_MESSAGES
                        .iter()
                        .any(|m| message.contains(m))
            }
            Self::Script { message } => TRANSIENT_CONTEXT_MESSAGES
                .iter()
                .any(|m| message.contains(m)),
            _ => false,
        }
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::RequestTimeout { .. }
                | Self::ElementNotFound { .. }
                | Self::FrameNotFound { .. }
                | Self::Script { .. }
        ) || self.is_transient_context_error()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_protocol_error_display() {
        let err = Error::protocol("DOM.describeNode", -32000, "No node with given id");
        assert_eq!(
            err.to_string(),
            "Protocol error -32000 in DOM.describeNode: No node with given id"
        );
    }

    #[test]
    fn test_timeout_display_carries_elapsed() {
        let err = Error::timeout("{button}Save", 5000, 5012);
        let text = err.to_string();
        assert!(text.contains("5012ms"));
        assert!(text.contains("{button}Save"));
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("x", 10, 10);
        let request_err = Error::request_timeout(CommandId::new(3), "Page.navigate", 100);
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(request_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::connection_timeout(1000).is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_transient_context_error() {
        let err = Error::protocol(
            "Runtime.evaluate",
            SERVER_ERROR_CODE,
            "Cannot find context with specified id",
        );
        assert!(err.is_transient_context_error());
        assert!(err.is_recoverable());

        let other = Error::protocol("Runtime.evaluate", -32602, "Invalid parameters");
        assert!(!other.is_transient_context_error());
        assert!(!other.is_recoverable());
    }

    #[test]
    fn test_is_element_error() {
        assert!(Error::element_not_found("#missing").is_element_error());
        assert!(Error::frame_not_found("index 3").is_element_error());
        assert!(!Error::ConnectionClosed.is_element_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}

//! Chrome DevTools Protocol message types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Driver → Browser | Command with integer id |
//! | `Response` | Browser → Driver | Result or error for an id |
//! | `Event` | Browser → Driver | Notification, no id |
//!
//! # Command Naming
//!
//! Commands follow `Domain.methodName` format:
//!
//! - `Page.navigate`
//! - `Runtime.evaluate`
//! - `Fetch.fulfillRequest`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command definitions by domain |
//! | `event` | Event and parsed event types |
//! | `request` | Request and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    BrowserCommand, Command, Cookie, DomCommand, FetchCommand, HeaderEntry, InputCommand,
    NetworkCommand, PageCommand, RawCommand, RequestPattern, RuntimeCommand, TargetCommand,
    Viewport,
};
pub use event::{Event, ParsedEvent};
pub use request::{ProtocolError, Request, Response, get_path, get_path_str};

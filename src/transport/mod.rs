//! WebSocket transport layer.
//!
//! This module handles communication with the browser's DevTools endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Driver (Rust)  │         WebSocket            │  Chrome         │
//! │                 │◄────────────────────────────►│  DevTools       │
//! │  Connection     │   ws://HOST:PORT/devtools/…  │  endpoint       │
//! └─────────────────┘                              └─────────────────┘
//!          ▲                    HTTP /json, /json/version
//!          └──── Discovery ◄───────────────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Discovery::wait_until_ready` - Poll until the endpoint answers
//! 2. `Discovery::page_ws_url` - Pick the page to drive
//! 3. `Connection::connect` - Open the socket and spawn the event loop
//! 4. `Connection::execute` / `post` / `on` - Drive the browser
//! 5. `Connection::shutdown` - Close the socket
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `discovery` | DevTools HTTP endpoint discovery |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// DevTools HTTP endpoint discovery.
pub mod discovery;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{
    Connection, DEFAULT_COMMAND_TIMEOUT, EventHandler, EventPredicate, EventWaiter,
    MAX_PENDING_COMMANDS,
};
pub use discovery::{BrowserVersion, Discovery, TargetInfo, select_page_target};

//! CDP Driver - browser automation over the Chrome DevTools Protocol.
//!
//! This library drives Chromium-family browsers through their DevTools
//! WebSocket: locating elements with a compact locator syntax, waiting on
//! page state, synthesizing keyboard and mouse input, intercepting
//! requests and handling dialogs.
//!
//! # Architecture
//!
//! - **Transport**: one WebSocket per driver; commands are correlated with
//!   replies by id, events are fanned out to handlers and one-shot waiters
//! - **Session**: the driver attaches to a page target and tracks its frame
//!   tree and execution contexts from events
//! - **Locators**: compiled to JavaScript expressions and resolved in the
//!   page on every use, so elements never go stale
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_driver::{Driver, DriverOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let driver = Driver::launch(DriverOptions::headless()).await?;
//!
//!     driver.goto("https://example.com").await?;
//!     driver.input("input[name=q]", "rust").await?;
//!     driver.click("{button}Search").await?;
//!     driver.wait_for_text("#results", "crates.io").await?;
//!
//!     println!("{}", driver.title().await?);
//!     driver.quit().await
//! }
//! ```
//!
//! # Locators
//!
//! | Form | Meaning |
//! |------|---------|
//! | `#id`, `div > a` | CSS selector |
//! | `//a[@href]`, `./p` | XPath |
//! | `{a}Sign in` | `<a>` whose visible text is exactly "Sign in" |
//! | `{^button}Save` | `<button>` whose text contains "Save" |
//! | `{div:2}Item` | second visible `<div>` with text "Item" |
//! | `{}Username` | any element with text "Username" |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Elements, input, interception, dialogs, frames |
//! | [`driver`] | [`Driver`] facade, options, launcher, providers |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`locator`] | Locator compiler |
//! | [`protocol`] | CDP message types |
//! | [`transport`] | WebSocket connection and endpoint discovery |

// ============================================================================
// Modules
// ============================================================================

/// Page-level building blocks: elements, input, interception, dialogs.
pub mod browser;

/// Driver facade and configuration.
///
/// Use [`Driver::builder()`] or [`Driver::launch`] to get a driver.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Locator compiler.
///
/// Turns locator strings into JavaScript expressions.
pub mod locator;

/// CDP message types.
///
/// Commands, replies and events as exchanged over the socket.
pub mod protocol;

/// WebSocket transport layer.
///
/// Command correlation, event dispatch and endpoint discovery.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{
    ConsoleMessage, Cookie, Dialog, DialogKind, Element, Finder, FrameInfo, InterceptRequest,
    InterceptResponse, Key, Keys, Modifiers, Mouse, MouseButton, NetworkRequest, NetworkResponse,
    Position, Rect, RetryPolicy, Snapshot,
};

// Driver types
pub use driver::{
    BrowserProcess, Driver, DriverBuilder, DriverObject, DriverOptions, DriverProvider,
    FrameSelector, ImageFormat, PageInfo, PageLoadStrategy, PooledDriverProvider,
    ScreenshotBuilder, WindowBounds,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ContextId, DriverId, FrameId, HandlerToken, SessionId, TargetId};

// Locator types
pub use locator::Locator;

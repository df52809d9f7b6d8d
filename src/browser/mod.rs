//! Page-level building blocks used by the driver.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Element`] | Located element, re-resolved on every use |
//! | [`Finder`] | Positional lookup relative to another element |
//! | [`Keys`] | Keyboard with modifier state |
//! | [`Mouse`] | Pointer with a current position |
//! | [`Interceptor`] | Request interception rules |
//! | [`DialogSlot`] | Single dialog handler |
//! | [`FrameRegistry`] | Frames, contexts and load milestones |
//! | [`ConsoleBuffer`] | Captured console output |
//! | [`RetryPolicy`] | Bounded retry of an action |
//!
//! # Example
//!
//! ```no_run
//! use cdp_driver::{Driver, Key, Result};
//!
//! # async fn example(driver: Driver) -> Result<()> {
//! let search = driver.locate("input[name=q]").await?;
//! search.input("rust").await?;
//! driver
//!     .keys()
//!     .down(Key::Shift)
//!     .type_text("abc")
//!     .up(Key::Shift)
//!     .press("Enter")
//!     .perform()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// JavaScript dialogs and the handler slot.
pub mod dialog;

/// Located elements.
pub mod element;

/// Positional element finding.
pub mod finder;

/// Frame tree, execution contexts and load state.
pub mod frames;

/// Input event sinks.
pub mod input;

/// Console capture and snapshots.
pub mod inspector;

/// Keyboard synthesis.
pub mod keyboard;

/// Mouse synthesis.
pub mod mouse;

/// Request interception.
pub mod network;

/// Polling and retry.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use dialog::{Dialog, DialogHandler, DialogKind, DialogSlot};
pub use element::Element;
pub use finder::{Finder, Position, Rect};
pub use frames::{FrameInfo, FrameRegistry, LoadState};
pub use input::{InputSink, PageInput, RecordingInput};
pub use inspector::{ConsoleBuffer, ConsoleMessage, NetworkRequest, NetworkResponse, Snapshot};
pub use keyboard::{Key, Keys, Modifiers};
pub use mouse::{Mouse, MouseButton};
pub use network::{InterceptHandler, InterceptRequest, InterceptResponse, Interceptor};
pub use wait::RetryPolicy;

pub use crate::protocol::Cookie;

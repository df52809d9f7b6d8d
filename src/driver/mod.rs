//! Driver facade.
//!
//! [`Driver`] is the entry point: it launches or attaches to a browser,
//! owns the DevTools connection and exposes every page operation. The
//! operations live in one submodule per concern, each adding an
//! `impl Driver` block.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Driver`] | Connected page with all operations |
//! | [`DriverBuilder`] | Fluent configuration builder |
//! | [`DriverOptions`] | Timeouts, retries, launch settings |
//! | [`BrowserProcess`] | Launched browser and its profile |
//! | [`ScreenshotBuilder`] | Screenshot format and clipping |
//! | [`PooledDriverProvider`] | Driver pool for parallel runners |
//! | [`DriverObject`] | Name-table boundary for script engines |
//!
//! # Example
//!
//! ```no_run
//! use cdp_driver::{Driver, Result};
//!
//! # async fn example() -> Result<()> {
//! let driver = Driver::builder().headless().build().await?;
//!
//! driver.goto("https://example.com").await?;
//! let heading = driver.text("h1").await?;
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for driver configuration.
pub mod builder;

/// Core driver: construction, session wiring, quit.
pub mod core;

/// Dialog handler slot access.
mod dialogs;

/// Element lookup, actions and queries.
mod elements;

/// Frame and page switching.
pub mod frames;

/// Keyboard and mouse entry points.
mod input;

/// Browser process launching.
pub mod launcher;

/// Navigation and page-load waits.
mod navigation;

/// Request interception.
mod network;

/// Name-table boundary for script engines.
pub mod object;

/// Console, network, load and error observers.
mod observers;

/// Driver options and page-load strategies.
pub mod options;

/// Driver providers for test runners.
pub mod provider;

/// Screenshots, PDF and diagnostics.
pub mod screenshot;

/// Script evaluation and execution contexts.
mod script;

/// Cookies.
mod storage;

/// Element and page waits.
mod waits;

/// Window geometry and tabs.
pub mod window;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::DriverBuilder;
pub use core::Driver;
pub use frames::{FrameSelector, PageInfo};
pub use launcher::BrowserProcess;
pub use object::DriverObject;
pub use options::{DriverOptions, PageLoadStrategy};
pub use provider::{DriverFactory, DriverProvider, PoolStats, PooledDriverProvider};
pub use screenshot::{ImageFormat, ScreenshotBuilder};
pub use window::WindowBounds;

//! Builder pattern for driver configuration.
//!
//! Provides a fluent API over [`DriverOptions`] that ends in a connected
//! [`Driver`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use cdp_driver::Driver;
//!
//! # async fn example() -> cdp_driver::Result<()> {
//! let driver = Driver::builder()
//!     .binary("/usr/bin/chromium")
//!     .headless()
//!     .timeout(Duration::from_secs(10))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

use super::core::Driver;
use super::options::{DriverOptions, PageLoadStrategy};

// ============================================================================
// DriverBuilder
// ============================================================================

/// Builder for configuring a [`Driver`] instance.
///
/// Use [`Driver::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct DriverBuilder {
    options: DriverOptions,
}

// ============================================================================
// DriverBuilder Implementation
// ============================================================================

impl DriverBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from existing options.
    #[inline]
    #[must_use]
    pub fn from_options(options: DriverOptions) -> Self {
        Self { options }
    }

    /// Sets the browser executable.
    #[inline]
    #[must_use]
    pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.executable = Some(path.into());
        self
    }

    /// Attaches to a running browser instead of launching one.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, ws_url: impl Into<String>) -> Self {
        self.options.web_socket_url = Some(ws_url.into());
        self
    }

    /// Runs the browser headless.
    #[inline]
    #[must_use]
    pub fn headless(mut self) -> Self {
        self.options.headless = true;
        self
    }

    /// Default timeout for commands and waits.
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Existence retries per action and the pause between them.
    #[inline]
    #[must_use]
    pub fn retries(mut self, count: u32, interval: Duration) -> Self {
        self.options.retry_count = count;
        self.options.retry_interval = interval;
        self
    }

    /// DevTools port; `0` picks a free one.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Profile directory; a temporary one is used otherwise.
    #[inline]
    #[must_use]
    pub fn user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.user_data_dir = Some(path.into());
        self
    }

    /// Overrides the user agent.
    #[inline]
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// When `goto` considers a page loaded.
    #[inline]
    #[must_use]
    pub fn page_load_strategy(mut self, strategy: PageLoadStrategy) -> Self {
        self.options.page_load_strategy = strategy;
        self
    }

    /// Outlines elements before acting on them.
    #[inline]
    #[must_use]
    pub fn highlight(mut self, duration: Duration) -> Self {
        self.options = self.options.with_highlight(duration);
        self
    }

    /// Adds a command-line argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.options.extra_args.push(arg.into());
        self
    }

    /// Options collected so far.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Launches or connects, depending on whether an endpoint was given.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid or the binary is missing
    /// - Any error from [`Driver::launch`] or [`Driver::connect`]
    pub async fn build(self) -> Result<Driver> {
        self.validate_binary()?;
        match self.options.web_socket_url.clone() {
            Some(ws_url) => Driver::connect(&ws_url, self.options).await,
            None => Driver::launch(self.options).await,
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

impl DriverBuilder {
    fn validate_binary(&self) -> Result<()> {
        if self.options.web_socket_url.is_some() {
            return Ok(());
        }
        if let Some(binary) = &self.options.executable
            && !binary.exists()
        {
            return Err(Error::config(format!(
                "browser binary not found: {}",
                binary.display()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_options() {
        let builder = DriverBuilder::new()
            .binary("/opt/chrome")
            .headless()
            .port(9333)
            .retries(5, Duration::from_millis(10))
            .arg("--mute-audio");

        let options = builder.options();
        assert!(options.headless);
        assert_eq!(options.port, 9333);
        assert_eq!(options.retry_count, 5);
        assert_eq!(options.extra_args, ["--mute-audio"]);
    }

    #[test]
    fn test_missing_binary_rejected() {
        let builder = DriverBuilder::new().binary("/nonexistent/path/to/chrome");
        let err = builder.validate_binary().expect_err("missing binary");
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_endpoint_skips_binary_check() {
        let builder = DriverBuilder::new()
            .binary("/nonexistent")
            .endpoint("ws://127.0.0.1:9222/devtools/page/X");
        assert!(builder.validate_binary().is_ok());
    }

    #[test]
    fn test_from_options() {
        let builder = DriverBuilder::from_options(DriverOptions::headless());
        assert!(builder.options().headless);
    }
}

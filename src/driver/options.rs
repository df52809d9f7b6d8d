//! Driver configuration.
//!
//! [`DriverOptions`] is a plain struct with `with_*` builder methods. It also
//! deserializes from a camelCase JSON map so a test runner can pass its
//! configuration through unchanged; durations are given in milliseconds.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use cdp_driver::{DriverOptions, PageLoadStrategy};
//!
//! let options = DriverOptions::new()
//!     .with_headless()
//!     .with_timeout(Duration::from_secs(10))
//!     .with_page_load_strategy(PageLoadStrategy::Load);
//!
//! let same = DriverOptions::from_value(serde_json::json!({
//!     "headless": true,
//!     "timeout": 10000,
//!     "pageLoadStrategy": "load"
//! }))?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::frames::LoadState;
use crate::browser::wait::{DEFAULT_RETRY_COUNT, DEFAULT_RETRY_INTERVAL, RetryPolicy};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for waits and page loads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default polling interval for page-load waits.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default time a dialog handler gets before the dialog is dismissed.
pub const DEFAULT_DIALOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Default highlight duration.
pub const DEFAULT_HIGHLIGHT_DURATION: Duration = Duration::from_millis(3000);

// ============================================================================
// PageLoadStrategy
// ============================================================================

/// When a navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageLoadStrategy {
    /// `DOMContentLoaded` on the main frame.
    #[serde(alias = "DOMCONTENT")]
    Domcontent,
    /// `DOMContentLoaded` and no frame still loading.
    #[default]
    #[serde(alias = "DOMCONTENT_AND_FRAMES")]
    DomcontentAndFrames,
    /// The `load` event.
    #[serde(alias = "LOAD")]
    Load,
    /// The `networkIdle` lifecycle milestone.
    #[serde(alias = "NETWORKIDLE")]
    Networkidle,
}

impl PageLoadStrategy {
    /// Returns `true` once `state` satisfies the strategy.
    ///
    /// `ready_state` is the page's `document.readyState`, or empty when
    /// unknown; it stands in for milestones fired before the driver attached.
    #[must_use]
    pub fn is_satisfied(self, state: &LoadState, ready_state: &str) -> bool {
        let dom_ready =
            state.dom_content_loaded || matches!(ready_state, "interactive" | "complete");
        let loaded = state.loaded || ready_state == "complete";
        let frames_done = state.frames_loading == 0;

        match self {
            Self::Domcontent => dom_ready,
            Self::DomcontentAndFrames => dom_ready && frames_done,
            Self::Load => loaded && frames_done,
            Self::Networkidle => state.network_idle || (loaded && frames_done),
        }
    }
}

// ============================================================================
// DriverOptions
// ============================================================================

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverOptions {
    /// Timeout for waits, page loads and commands.
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// Existence retries before element actions.
    pub retry_count: u32,

    /// Pause between existence retries; also the wait polling interval.
    #[serde(with = "millis")]
    pub retry_interval: Duration,

    /// Polling interval for page-load waits.
    #[serde(with = "millis")]
    pub poll_interval: Duration,

    /// Launch without a visible window.
    pub headless: bool,

    /// DevTools host.
    pub host: String,

    /// DevTools port; 0 picks a free one when launching.
    pub port: u16,

    /// Browser executable; a platform default is searched when unset.
    pub executable: Option<PathBuf>,

    /// Profile directory; a temporary one is used when unset.
    pub user_data_dir: Option<PathBuf>,

    /// User agent override.
    pub user_agent: Option<String>,

    /// When navigations count as finished.
    pub page_load_strategy: PageLoadStrategy,

    /// Outline elements before acting on them.
    pub highlight: bool,

    /// How long highlights stay.
    #[serde(with = "millis")]
    pub highlight_duration: Duration,

    /// Time a dialog handler gets to settle a dialog.
    #[serde(with = "millis")]
    pub dialog_timeout: Duration,

    /// Extra browser command-line arguments.
    #[serde(alias = "addOptions")]
    pub extra_args: Vec<String>,

    /// Attach to this endpoint instead of launching.
    pub web_socket_url: Option<String>,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
            headless: false,
            host: "localhost".to_string(),
            port: 0,
            executable: None,
            user_data_dir: None,
            user_agent: None,
            page_load_strategy: PageLoadStrategy::default(),
            highlight: false,
            highlight_duration: DEFAULT_HIGHLIGHT_DURATION,
            dialog_timeout: DEFAULT_DIALOG_TIMEOUT,
            extra_args: Vec::new(),
            web_socket_url: None,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl DriverOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for headless mode.
    #[inline]
    #[must_use]
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Default::default()
        }
    }

    /// Reads options from a camelCase JSON map; missing keys keep defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] for wrongly typed values
    /// - [`Error::Config`] if the result fails [`validate`](Self::validate)
    pub fn from_value(value: Value) -> Result<Self> {
        let options: Self = serde_json::from_value(value)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl DriverOptions {
    /// Sets the wait and page-load timeout.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the existence retry count.
    #[inline]
    #[must_use]
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Sets the existence retry interval.
    #[inline]
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Sets the page-load polling interval.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Enables headless mode.
    #[inline]
    #[must_use]
    pub fn with_headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Sets the DevTools host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the DevTools port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the browser executable.
    #[inline]
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Sets the profile directory.
    #[inline]
    #[must_use]
    pub fn with_user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(path.into());
        self
    }

    /// Overrides the user agent.
    #[inline]
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the page load strategy.
    #[inline]
    #[must_use]
    pub fn with_page_load_strategy(mut self, strategy: PageLoadStrategy) -> Self {
        self.page_load_strategy = strategy;
        self
    }

    /// Outlines elements before acting on them.
    #[inline]
    #[must_use]
    pub fn with_highlight(mut self, duration: Duration) -> Self {
        self.highlight = true;
        self.highlight_duration = duration;
        self
    }

    /// Sets the dialog handler deadline.
    #[inline]
    #[must_use]
    pub fn with_dialog_timeout(mut self, timeout: Duration) -> Self {
        self.dialog_timeout = timeout;
        self
    }

    /// Adds a browser command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.extra_args.push(arg.into());
        self
    }

    /// Adds several browser command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Attaches to an existing endpoint instead of launching.
    #[inline]
    #[must_use]
    pub fn with_web_socket_url(mut self, url: impl Into<String>) -> Self {
        self.web_socket_url = Some(url.into());
        self
    }
}

// ============================================================================
// Derived Values
// ============================================================================

impl DriverOptions {
    /// Retry policy for element existence checks.
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.retry_interval)
    }

    /// Browser command-line arguments for a launch on `port`.
    #[must_use]
    pub fn to_args(&self, port: u16, user_data_dir: &std::path::Path) -> Vec<String> {
        let mut args = Vec::with_capacity(8 + self.extra_args.len());

        args.push(format!("--remote-debugging-port={port}"));
        args.push(format!("--user-data-dir={}", user_data_dir.display()));
        args.push("--no-first-run".to_string());
        args.push("--no-default-browser-check".to_string());
        args.push("--disable-popup-blocking".to_string());

        if self.headless {
            args.push("--headless=new".to_string());
        }

        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={ua}"));
        }

        args.extend(self.extra_args.iter().cloned());
        args.push("about:blank".to_string());
        args
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero timeout, an empty host or a
    /// malformed WebSocket URL.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than zero"));
        }
        if self.host.trim().is_empty() {
            return Err(Error::config("host cannot be empty"));
        }
        if let Some(ws) = &self.web_socket_url {
            let parsed = url::Url::parse(ws)
                .map_err(|e| Error::config(format!("invalid webSocketUrl {ws}: {e}")))?;
            if !matches!(parsed.scheme(), "ws" | "wss") {
                return Err(Error::config(format!("webSocketUrl must use ws or wss: {ws}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Millisecond Durations
// ============================================================================

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::Path;

    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = DriverOptions::new();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.retry_count, 3);
        assert_eq!(options.retry_interval, Duration::from_millis(500));
        assert_eq!(options.page_load_strategy, PageLoadStrategy::DomcontentAndFrames);
        assert_eq!(options.host, "localhost");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = DriverOptions::new()
            .with_headless()
            .with_timeout(Duration::from_secs(5))
            .with_retry_count(7)
            .with_port(9333)
            .with_arg("--mute-audio");

        assert!(options.headless);
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.retry_policy().count, 7);
        assert_eq!(options.port, 9333);
        assert_eq!(options.extra_args, ["--mute-audio"]);
    }

    #[test]
    fn test_from_value_camel_case() {
        let options = DriverOptions::from_value(json!({
            "headless": true,
            "timeout": 10000,
            "retryInterval": 250,
            "pageLoadStrategy": "load",
            "addOptions": ["--incognito"],
            "userAgent": "bot"
        }))
        .expect("options");

        assert!(options.headless);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.retry_interval, Duration::from_millis(250));
        assert_eq!(options.page_load_strategy, PageLoadStrategy::Load);
        assert_eq!(options.extra_args, ["--incognito"]);
        assert_eq!(options.user_agent.as_deref(), Some("bot"));
        assert_eq!(options.retry_count, 3);
    }

    #[test]
    fn test_from_value_rejects_bad_values() {
        assert!(matches!(
            DriverOptions::from_value(json!({"timeout": "soon"})),
            Err(Error::Json(_))
        ));
        assert!(matches!(
            DriverOptions::from_value(json!({"timeout": 0})),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            DriverOptions::from_value(json!({"webSocketUrl": "http://x"})),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_to_args() {
        let args = DriverOptions::headless()
            .with_user_agent("ua")
            .with_arg("--custom")
            .to_args(9555, Path::new("/tmp/profile"));

        assert!(args.contains(&"--remote-debugging-port=9555".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--user-agent=ua".to_string()));
        assert!(args.contains(&"--custom".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_strategy_satisfaction() {
        let dom_only = LoadState {
            dom_content_loaded: true,
            frames_loading: 1,
            ..LoadState::default()
        };
        assert!(PageLoadStrategy::Domcontent.is_satisfied(&dom_only, ""));
        assert!(!PageLoadStrategy::DomcontentAndFrames.is_satisfied(&dom_only, ""));
        assert!(!PageLoadStrategy::Load.is_satisfied(&dom_only, ""));

        let fallback = LoadState::default();
        assert!(PageLoadStrategy::DomcontentAndFrames.is_satisfied(&fallback, "interactive"));
        assert!(!PageLoadStrategy::Load.is_satisfied(&fallback, "interactive"));
        assert!(PageLoadStrategy::Load.is_satisfied(&fallback, "complete"));

        let idle = LoadState {
            network_idle: true,
            ..LoadState::default()
        };
        assert!(PageLoadStrategy::Networkidle.is_satisfied(&idle, ""));
    }
}

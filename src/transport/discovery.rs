//! DevTools HTTP endpoint discovery.
//!
//! A browser started with `--remote-debugging-port` serves `/json/version`
//! and `/json` over HTTP. These give the browser-level and per-page
//! WebSocket URLs to connect to.

// ============================================================================
// Imports
// ============================================================================

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Interval between readiness probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout for a single HTTP probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Types
// ============================================================================

/// `/json/version` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    /// Product string, e.g. `Chrome/131.0.0.0`.
    #[serde(rename = "Browser", default)]
    pub browser: String,
    /// DevTools protocol version.
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    /// Default user agent.
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    /// Browser-level WebSocket URL.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: String,
}

/// One entry of the `/json` target list.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetInfo {
    /// Target id.
    pub id: String,
    /// `page`, `iframe`, `service_worker` and so on.
    #[serde(rename = "type")]
    pub target_type: String,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Page-level WebSocket URL.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

// ============================================================================
// Discovery
// ============================================================================

/// HTTP client for one DevTools endpoint.
#[derive(Debug, Clone)]
pub struct Discovery {
    client: Client,
    base: String,
}

impl Discovery {
    /// Creates a discovery client for `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client cannot be built.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let client = Client::builder().timeout(PROBE_TIMEOUT).build()?;
        Ok(Self {
            client,
            base: format!("http://{host}:{port}"),
        })
    }

    /// Fetches `/json/version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport or decoding failure.
    pub async fn version(&self) -> Result<BrowserVersion> {
        let url = format!("{}/json/version", self.base);
        let version = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<BrowserVersion>()
            .await?;
        Ok(version)
    }

    /// Fetches the `/json` target list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on transport or decoding failure.
    pub async fn targets(&self) -> Result<Vec<TargetInfo>> {
        let url = format!("{}/json", self.base);
        let targets = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<TargetInfo>>()
            .await?;
        Ok(targets)
    }

    /// Polls `/json/version` until it answers or `timeout` passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionTimeout`] if the endpoint never answered.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<BrowserVersion> {
        let start = Instant::now();

        loop {
            match self.version().await {
                Ok(version) => {
                    debug!(browser = %version.browser, "DevTools endpoint ready");
                    return Ok(version);
                }
                Err(e) => trace!(error = %e, "DevTools endpoint not ready yet"),
            }

            if start.elapsed() >= timeout {
                return Err(Error::connection_timeout(timeout.as_millis() as u64));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Resolves the WebSocket URL to drive.
    ///
    /// Prefers the first ordinary page target; falls back to the
    /// browser-level URL from `/json/version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if neither source yields a URL.
    pub async fn page_ws_url(&self) -> Result<String> {
        if let Ok(targets) = self.targets().await
            && let Some(url) = select_page_target(&targets)
                .and_then(|t| t.web_socket_debugger_url.clone())
        {
            return Ok(url);
        }

        let version = self.version().await?;
        if version.web_socket_debugger_url.is_empty() {
            return Err(Error::connection(format!(
                "no WebSocket URL advertised at {}",
                self.base
            )));
        }
        Ok(version.web_socket_debugger_url)
    }
}

/// Picks the first `page` target that is not an internal browser page.
#[must_use]
pub fn select_page_target(targets: &[TargetInfo]) -> Option<&TargetInfo> {
    targets
        .iter()
        .find(|t| t.target_type == "page" && !t.url.starts_with("chrome-"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn target(target_type: &str, url: &str) -> TargetInfo {
        TargetInfo {
            id: url.to_string(),
            target_type: target_type.to_string(),
            title: String::new(),
            url: url.to_string(),
            web_socket_debugger_url: Some(format!("ws://x/{url}")),
        }
    }

    #[test]
    fn test_select_skips_internal_pages_and_workers() {
        let targets = vec![
            target("service_worker", "https://a.test/sw.js"),
            target("page", "chrome-extension://abc/bg.html"),
            target("page", "about:blank"),
        ];

        let picked = select_page_target(&targets).expect("page");
        assert_eq!(picked.url, "about:blank");
    }

    #[test]
    fn test_select_none() {
        assert!(select_page_target(&[target("iframe", "https://a.test")]).is_none());
    }

    #[test]
    fn test_version_parses() {
        let version: BrowserVersion = serde_json::from_str(
            r#"{"Browser": "Chrome/131.0.6778.85", "Protocol-Version": "1.3",
                "User-Agent": "Mozilla/5.0", "V8-Version": "13.1",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/abc"}"#,
        )
        .expect("parse");

        assert_eq!(version.protocol_version, "1.3");
        assert!(version.web_socket_debugger_url.ends_with("/abc"));
    }

    #[tokio::test]
    async fn test_wait_until_ready_times_out() {
        let discovery = Discovery::new("127.0.0.1", 1).expect("client");
        let err = discovery
            .wait_until_ready(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionTimeout { .. }));
    }
}

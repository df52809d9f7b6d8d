//! Browser process launch.
//!
//! Starts a Chromium-family browser with remote debugging enabled, waits for
//! its DevTools HTTP endpoint and hands back the page WebSocket URL.

// ============================================================================
// Imports
// ============================================================================

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::transport::Discovery;

use super::options::DriverOptions;

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the process to exit after a kill.
const EXIT_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(target_os = "macos")]
const DEFAULT_EXECUTABLES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];

#[cfg(target_os = "windows")]
const DEFAULT_EXECUTABLES: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const DEFAULT_EXECUTABLES: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

// ============================================================================
// Executable Resolution
// ============================================================================

/// Picks the browser executable.
///
/// A configured path wins; otherwise the first platform default that exists.
///
/// # Errors
///
/// Returns [`Error::Launch`] if nothing usable is found.
pub fn resolve_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::launch(path, "executable does not exist"));
    }

    DEFAULT_EXECUTABLES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| Error::launch("chrome", "no browser found in default locations"))
}

/// Asks the OS for an unused local port.
///
/// # Errors
///
/// Returns [`Error::Io`] if no port can be bound.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

// ============================================================================
// BrowserProcess
// ============================================================================

/// A launched browser.
///
/// The process is killed when this value is dropped; a temporary
/// user-data directory is removed with it.
pub struct BrowserProcess {
    child: Option<Child>,
    pid: u32,
    executable: PathBuf,
    port: u16,
    ws_url: String,
    _profile: Option<TempDir>,
}

impl BrowserProcess {
    /// Launches a browser and waits for its DevTools endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Launch`] if the executable is missing, fails to start or
    ///   exits early
    /// - [`Error::Timeout`] if the endpoint does not answer within
    ///   `options.timeout`
    pub async fn launch(options: &DriverOptions) -> Result<Self> {
        let executable = resolve_executable(options.executable.as_deref())?;
        let port = if options.port == 0 {
            free_port()?
        } else {
            options.port
        };

        let (profile, user_data_dir) = match &options.user_data_dir {
            Some(dir) => (None, dir.clone()),
            None => {
                let dir = tempfile::Builder::new().prefix("cdp-driver-").tempdir()?;
                let path = dir.path().to_path_buf();
                (Some(dir), path)
            }
        };

        let mut cmd = Command::new(&executable);
        cmd.args(options.to_args(port, &user_data_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::launch(&executable, e.to_string()))?;
        let pid = child.id().unwrap_or(0);
        info!(pid, port, executable = %executable.display(), "Browser process spawned");

        let discovery = Discovery::new(&options.host, port)?;
        if let Err(e) = discovery.wait_until_ready(options.timeout).await {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(Error::launch(&executable, format!("exited early: {status}")));
            }
            let _ = child.start_kill();
            return Err(e);
        }

        let ws_url = discovery.page_ws_url().await?;
        debug!(pid, url = %ws_url, "DevTools endpoint ready");

        Ok(Self {
            child: Some(child),
            pid,
            executable,
            port,
            ws_url,
            _profile: profile,
        })
    }

    /// WebSocket URL of the page to drive.
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Remote debugging port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Process id, 0 if unknown.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Executable that was started.
    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Kills the process and waits for it to exit.
    pub async fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Err(e) = child.start_kill() {
            debug!(pid = self.pid, error = %e, "Failed to kill browser");
        }
        match tokio::time::timeout(EXIT_TIMEOUT, child.wait()).await {
            Ok(Ok(status)) => info!(pid = self.pid, %status, "Browser terminated"),
            Ok(Err(e)) => debug!(pid = self.pid, error = %e, "Failed to wait for browser"),
            Err(_) => debug!(pid = self.pid, "Browser did not exit in time"),
        }
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_configured_executable() {
        let err = resolve_executable(Some(Path::new("/definitely/not/a/browser"))).unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
    }

    #[test]
    fn test_existing_configured_executable() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let resolved = resolve_executable(Some(file.path())).expect("resolve");
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn test_free_port_is_bindable() {
        let port = free_port().expect("port");
        assert!(port > 0);
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[tokio::test]
    async fn test_launch_missing_executable_fails() {
        let options = DriverOptions::new().with_executable("/definitely/not/a/browser");
        let err = BrowserProcess::launch(&options).await.err().expect("error");
        assert!(matches!(err, Error::Launch { .. }));
    }
}

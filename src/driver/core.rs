//! Driver facade: connection, session and event wiring.
//!
//! The [`Driver`] composes the transport with the frame registry, dialog
//! slot, interceptor and console buffer. Its operations are spread over the
//! sibling modules as separate `impl Driver` blocks.
//!
//! # Example
//!
//! ```no_run
//! use cdp_driver::{Driver, DriverOptions};
//!
//! # async fn example() -> cdp_driver::Result<()> {
//! let driver = Driver::launch(DriverOptions::headless()).await?;
//!
//! driver.goto("https://example.com").await?;
//! driver.click("{a}More information...").await?;
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::dialog::DialogResponder;
use crate::browser::{
    ConsoleBuffer, Dialog, DialogSlot, FrameInfo, FrameRegistry, InterceptRequest, Interceptor,
    RetryPolicy,
};
use crate::error::{Error, Result, SERVER_ERROR_CODE};
use crate::identifiers::{DriverId, FrameId, HandlerToken, SessionId, TargetId};
use crate::protocol::{
    BrowserCommand, Command, Event, NetworkCommand, PageCommand, RuntimeCommand, get_path_str,
};
use crate::transport::Connection;

use super::builder::DriverBuilder;
use super::launcher::BrowserProcess;
use super::options::DriverOptions;

// ============================================================================
// Constants
// ============================================================================

/// Events that feed the frame registry.
const FRAME_EVENTS: &[&str] = &[
    "Page.lifecycleEvent",
    "Page.domContentEventFired",
    "Page.loadEventFired",
    "Page.frameAttached",
    "Page.frameDetached",
    "Page.frameNavigated",
    "Page.frameStartedLoading",
    "Page.frameStoppedLoading",
    "Runtime.executionContextCreated",
    "Runtime.executionContextDestroyed",
    "Runtime.executionContextsCleared",
];

/// Events that feed the console buffer.
const CONSOLE_EVENTS: &[&str] = &["Runtime.consoleAPICalled", "Runtime.exceptionThrown"];

/// How long `quit` waits for `Browser.close` before killing the process.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ============================================================================
// Types
// ============================================================================

/// The page target currently driven.
///
/// Both ids are `None` when the socket is a page endpoint, in which case
/// commands go out without a session id.
#[derive(Debug, Clone, Default)]
pub(crate) struct PageTarget {
    pub target_id: Option<TargetId>,
    pub session_id: Option<SessionId>,
}

/// Internal shared state for the driver.
pub(crate) struct DriverInner {
    /// Unique id, used in logs.
    pub id: DriverId,

    /// The DevTools socket; the driver is its only user.
    pub connection: Connection,

    /// Options the driver was created with.
    pub options: DriverOptions,

    /// Active target and flattened session.
    pub page: Arc<Mutex<PageTarget>>,

    /// Frame tree, execution contexts and load milestones.
    pub frames: Arc<Mutex<FrameRegistry>>,

    /// Single dialog handler slot.
    pub dialogs: Arc<DialogSlot>,

    /// Interception rules.
    pub interceptor: Arc<Interceptor>,

    /// Console capture.
    pub console: Arc<ConsoleBuffer>,

    /// Standing event handlers, removed on quit.
    pub handlers: Mutex<Vec<HandlerToken>>,

    /// User observers, removed on quit or pool reset.
    pub observers: Mutex<Vec<HandlerToken>>,

    /// Browser started by [`Driver::launch`].
    pub process: Mutex<Option<BrowserProcess>>,

    /// Set once `quit` ran.
    pub terminated: AtomicBool,
}

impl Drop for DriverInner {
    fn drop(&mut self) {
        // Handlers hold connection clones, so the loop only stops on request.
        self.connection.shutdown();
    }
}

// ============================================================================
// Driver
// ============================================================================

/// A connected browser page.
///
/// Cheap to clone; clones drive the same page. Elements returned by
/// [`locate`](Driver::locate) borrow the driver.
#[derive(Clone)]
pub struct Driver {
    /// Shared inner state.
    pub(crate) inner: Arc<DriverInner>,
}

// ============================================================================
// Driver - Display
// ============================================================================

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.inner.id)
            .field("session_id", &self.session_id())
            .field("current_frame", &self.inner.frames.lock().current_frame())
            .field("terminated", &self.is_terminated())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Driver - Construction
// ============================================================================

impl Driver {
    /// Creates a configuration builder for the driver.
    #[inline]
    #[must_use]
    pub fn builder() -> DriverBuilder {
        DriverBuilder::new()
    }

    /// Launches a browser and connects to its first page.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Launch`] if the browser cannot be started
    /// - Any error from [`Driver::connect`]
    pub async fn launch(options: DriverOptions) -> Result<Self> {
        options.validate()?;
        let process = BrowserProcess::launch(&options).await?;
        let connection = Connection::connect(process.ws_url(), options.timeout).await?;
        let ws_url = process.ws_url().to_string();
        Self::from_connection(connection, options, &ws_url, Some(process)).await
    }

    /// Connects to a running browser.
    ///
    /// A page endpoint (`/devtools/page/…`) is driven directly; a browser
    /// endpoint (`/devtools/browser/…`) is attached to its first page.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - [`Error::Connection`] if the socket cannot be opened
    /// - [`Error::PageNotFound`] if a browser endpoint has no page
    pub async fn connect(ws_url: &str, options: DriverOptions) -> Result<Self> {
        options.validate()?;
        let connection = Connection::connect(ws_url, options.timeout).await?;
        Self::from_connection(connection, options, ws_url, None).await
    }

    /// Wraps an established connection and initializes the page.
    pub(crate) async fn from_connection(
        connection: Connection,
        options: DriverOptions,
        ws_url: &str,
        process: Option<BrowserProcess>,
    ) -> Result<Self> {
        let driver = Self {
            inner: Arc::new(DriverInner {
                id: DriverId::generate(),
                connection,
                options,
                page: Arc::new(Mutex::new(PageTarget::default())),
                frames: Arc::new(Mutex::new(FrameRegistry::new())),
                dialogs: Arc::new(DialogSlot::new()),
                interceptor: Arc::new(Interceptor::new()),
                console: Arc::new(ConsoleBuffer::new()),
                handlers: Mutex::new(Vec::new()),
                observers: Mutex::new(Vec::new()),
                process: Mutex::new(process),
                terminated: AtomicBool::new(false),
            }),
        };

        if is_browser_endpoint(ws_url) {
            let target = driver.first_page_target().await?;
            driver.attach(target).await?;
        }

        driver.install_handlers();
        driver.enable_domains().await?;

        info!(id = %driver.inner.id, url = %ws_url, "Driver connected");
        Ok(driver)
    }

    /// Reads the frame tree and enables the domains the driver listens to.
    ///
    /// Handlers are installed first so no context or frame event is missed.
    pub(crate) async fn enable_domains(&self) -> Result<()> {
        let tree = self.execute(Command::Page(PageCommand::GetFrameTree)).await?;
        let frame_id = get_path_str(&tree, "frameTree.frame.id").ok_or_else(|| {
            Error::protocol("Page.getFrameTree", SERVER_ERROR_CODE, "reply has no frame id")
        })?;
        let url = get_path_str(&tree, "frameTree.frame.url").unwrap_or_default();

        {
            let mut frames = self.inner.frames.lock();
            frames.reset();
            frames.set_main_frame(FrameId::new(frame_id), url);
        }

        self.execute(Command::Page(PageCommand::Enable)).await?;
        self.execute(Command::Runtime(RuntimeCommand::Enable)).await?;
        self.execute(Command::Network(NetworkCommand::Enable)).await?;
        self.execute(Command::Page(PageCommand::SetLifecycleEventsEnabled { enabled: true }))
            .await?;

        match self.script("document.readyState").await {
            Ok(state) => debug!(id = %self.inner.id, ready_state = %state, "Domains enabled"),
            Err(e) => debug!(id = %self.inner.id, error = %e, "Ready state unavailable"),
        }
        Ok(())
    }

    /// Registers the standing event handlers.
    ///
    /// Each handler ignores events from sessions other than the active one.
    fn install_handlers(&self) {
        let connection = &self.inner.connection;
        let mut tokens = Vec::new();

        for method in FRAME_EVENTS {
            let page = Arc::clone(&self.inner.page);
            let frames = Arc::clone(&self.inner.frames);
            tokens.push(connection.on(*method, move |event| {
                if is_active(&page, event) {
                    frames.lock().apply(&event.parse());
                }
            }));
        }

        for method in CONSOLE_EVENTS {
            let page = Arc::clone(&self.inner.page);
            let console = Arc::clone(&self.inner.console);
            tokens.push(connection.on(*method, move |event| {
                if is_active(&page, event) {
                    console.record(&event.parse());
                }
            }));
        }

        {
            let page = Arc::clone(&self.inner.page);
            let dialogs = Arc::clone(&self.inner.dialogs);
            let conn = connection.clone();
            let timeout = self.inner.options.dialog_timeout;
            tokens.push(connection.on("Page.javascriptDialogOpening", move |event| {
                if !is_active(&page, event) {
                    return;
                }
                let responder = dialog_responder(conn.clone(), event.session_id.clone());
                if let Some(dialog) = Dialog::from_event(&event.parse(), responder) {
                    debug!(kind = %dialog.kind(), message = dialog.message(), "Dialog opened");
                    dialogs.dispatch(dialog, timeout);
                }
            }));
        }

        {
            let page = Arc::clone(&self.inner.page);
            let interceptor = Arc::clone(&self.inner.interceptor);
            let conn = connection.clone();
            tokens.push(connection.on("Fetch.requestPaused", move |event| {
                if !is_active(&page, event) {
                    return;
                }
                match InterceptRequest::from_event(&event.parse()) {
                    Some(request) => {
                        let decision = interceptor.respond(&request);
                        conn.post(event.session_id.clone(), Command::Fetch(decision));
                    }
                    None => warn!("Malformed Fetch.requestPaused event"),
                }
            }));
        }

        self.inner.handlers.lock().extend(tokens);
    }
}

pub(crate) fn is_active(page: &Mutex<PageTarget>, event: &Event) -> bool {
    page.lock().session_id == event.session_id
}

pub(crate) fn dialog_responder(connection: Connection, session_id: Option<SessionId>) -> DialogResponder {
    Arc::new(move |accept, prompt_text| {
        connection.post(
            session_id.clone(),
            Command::Page(PageCommand::HandleJavaScriptDialog {
                accept,
                prompt_text,
            }),
        );
    })
}

/// Returns `true` for a browser-level DevTools URL.
#[must_use]
pub(crate) fn is_browser_endpoint(ws_url: &str) -> bool {
    ws_url.contains("/devtools/browser/")
}

// ============================================================================
// Driver - Accessors
// ============================================================================

impl Driver {
    /// Unique driver id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> DriverId {
        self.inner.id
    }

    /// Options the driver runs with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &DriverOptions {
        &self.inner.options
    }

    /// The underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Session id of the active page, `None` on a page endpoint.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.page.lock().session_id.clone()
    }

    /// Target id of the active page when attached through the browser.
    #[must_use]
    pub fn target_id(&self) -> Option<TargetId> {
        self.inner.page.lock().target_id.clone()
    }

    /// Frame currently targeted by scripts, `None` for the main frame.
    #[must_use]
    pub fn current_frame(&self) -> Option<FrameInfo> {
        let frames = self.inner.frames.lock();
        frames.current_frame().and_then(|id| frames.frame(id)).cloned()
    }

    /// Every known frame of the page.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameInfo> {
        self.inner.frames.lock().frames()
    }

    /// Existence retry applied before element actions.
    #[inline]
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.options.retry_policy()
    }

    /// Returns `true` once [`quit`](Driver::quit) ran.
    #[inline]
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.inner.terminated.load(Ordering::Acquire)
    }

    /// Sends a command to the active page session.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] after quit or socket loss
    /// - [`Error::Protocol`] if the browser rejects the command
    pub async fn execute(&self, command: Command) -> Result<Value> {
        self.inner.connection.execute(self.session_id(), command).await
    }

    /// Sends a command to the active session without awaiting the reply.
    pub(crate) fn post(&self, command: Command) {
        self.inner.connection.post(self.session_id(), command);
    }
}

// ============================================================================
// Driver - Shutdown
// ============================================================================

impl Driver {
    /// Shuts the driver down.
    ///
    /// Idempotent. Drops event handlers, fails pending commands and closes
    /// the browser if this driver launched it.
    ///
    /// # Errors
    ///
    /// Currently infallible; the signature leaves room for close failures.
    pub async fn quit(&self) -> Result<()> {
        if self.inner.terminated.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let tokens: Vec<HandlerToken> = self.inner.handlers.lock().drain(..).collect();
        for token in tokens {
            self.inner.connection.off(token);
        }
        self.clear_observers();
        self.inner.dialogs.clear();
        self.inner.interceptor.clear();

        let process = self.inner.process.lock().take();
        if let Some(mut process) = process {
            let request = self
                .inner
                .connection
                .request(None, Command::Browser(BrowserCommand::Close));
            if let Err(e) = self.inner.connection.send_with_timeout(request, CLOSE_TIMEOUT).await {
                debug!(error = %e, "Browser.close failed");
            }
            self.inner.connection.shutdown();
            process.close().await;
        } else {
            self.inner.connection.shutdown();
        }

        info!(id = %self.inner.id, "Driver terminated");
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
    fn test_builder_returns_driver_builder() {
        let _builder = Driver::builder();
    }

    #[test]
    fn test_driver_is_clone_send_sync() {
        fn assert_bounds<T: Clone + Send + Sync + fmt::Debug>() {}
        assert_bounds::<Driver>();
    }

    #[test]
    fn test_browser_endpoint_detection() {
        assert!(is_browser_endpoint("ws://127.0.0.1:9222/devtools/browser/abc"));
        assert!(!is_browser_endpoint("ws://127.0.0.1:9222/devtools/page/abc"));
    }

    #[test]
    fn test_is_active_compares_sessions() {
        let page = Mutex::new(PageTarget::default());
        let mut event = Event::new("Page.loadEventFired", Value::Null);
        assert!(is_active(&page, &event));

        event.session_id = Some(SessionId::new("other"));
        assert!(!is_active(&page, &event));

        page.lock().session_id = Some(SessionId::new("other"));
        assert!(is_active(&page, &event));
    }
}

//! Callbacks for console output, network traffic, page loads and uncaught
//! errors.
//!
//! Observers run on the connection task, after the driver's own handlers,
//! and must not block. Each registration returns a [`HandlerToken`] for
//! [`Driver::remove_observer`]; `quit` and pool reuse remove them all.
//!
//! ```ignore
//! driver.on_network_response(|response| {
//!     if response.is_error() {
//!         eprintln!("{} {}", response.status, response.url);
//!     }
//! });
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::browser::{ConsoleMessage, NetworkRequest, NetworkResponse};
use crate::identifiers::HandlerToken;
use crate::protocol::ParsedEvent;

use super::Driver;
use super::core::is_active;

// ============================================================================
// Driver - Observers
// ============================================================================

impl Driver {
    /// Calls `callback` for every `console.*` call on the page.
    pub fn on_console_message<F>(&self, callback: F) -> HandlerToken
    where
        F: Fn(ConsoleMessage) + Send + Sync + 'static,
    {
        self.observe("Runtime.consoleAPICalled", ConsoleMessage::from_event, callback)
    }

    /// Calls `callback` for every request the page sends.
    pub fn on_network_request<F>(&self, callback: F) -> HandlerToken
    where
        F: Fn(NetworkRequest) + Send + Sync + 'static,
    {
        self.observe("Network.requestWillBeSent", NetworkRequest::from_event, callback)
    }

    /// Calls `callback` when response headers arrive.
    pub fn on_network_response<F>(&self, callback: F) -> HandlerToken
    where
        F: Fn(NetworkResponse) + Send + Sync + 'static,
    {
        self.observe("Network.responseReceived", NetworkResponse::from_event, callback)
    }

    /// Calls `callback` on every `load` event of the main document.
    pub fn on_page_load<F>(&self, callback: F) -> HandlerToken
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.observe(
            "Page.loadEventFired",
            |event| matches!(event, ParsedEvent::LoadEventFired).then_some(()),
            move |()| callback(),
        )
    }

    /// Calls `callback` for every uncaught exception, as an `exception`
    /// level [`ConsoleMessage`].
    pub fn on_error<F>(&self, callback: F) -> HandlerToken
    where
        F: Fn(ConsoleMessage) + Send + Sync + 'static,
    {
        self.observe("Runtime.exceptionThrown", ConsoleMessage::from_event, callback)
    }

    /// Unregisters one observer. Returns `false` if it was already gone.
    pub fn remove_observer(&self, token: HandlerToken) -> bool {
        self.inner.observers.lock().retain(|t| *t != token);
        self.inner.connection.off(token)
    }

    /// Unregisters every observer.
    pub fn clear_observers(&self) {
        let tokens: Vec<HandlerToken> = self.inner.observers.lock().drain(..).collect();
        for token in tokens {
            self.inner.connection.off(token);
        }
    }

    fn observe<T, E, F>(&self, method: &'static str, extract: E, callback: F) -> HandlerToken
    where
        T: 'static,
        E: Fn(&ParsedEvent) -> Option<T> + Send + Sync + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let page = Arc::clone(&self.inner.page);
        let token = self.inner.connection.on(method, move |event| {
            if !is_active(&page, event) {
                return;
            }
            if let Some(value) = extract(&event.parse()) {
                callback(value);
            }
        });

        self.inner.observers.lock().push(token);
        debug!(id = %self.inner.id, method, "Observer registered");
        token
    }
}

//! WebSocket connection and event loop.
//!
//! One [`Connection`] owns one DevTools WebSocket. A spawned task reads
//! frames, correlates replies with pending commands by integer id and
//! dispatches events to registered handlers and one-shot waiters.
//!
//! # Event Loop
//!
//! The connection task handles:
//!
//! - Outgoing commands from the driver API
//! - Incoming replies, routed to the awaiting caller by id
//! - Incoming events, fanned out to handlers then to waiters
//! - Failing every pending command once the socket closes

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, CommandIdGenerator, HandlerToken, SessionId, WaiterToken};
use crate::protocol::{Command, Event, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for a single command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest frame accepted from the browser; screenshots are big.
const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Commands awaiting a reply before new sends are refused.
pub const MAX_PENDING_COMMANDS: usize = 1024;

// ============================================================================
// Types
// ============================================================================

/// Map of command ids to response channels.
type CorrelationMap = FxHashMap<CommandId, oneshot::Sender<Result<Response>>>;

/// Event handler callback type.
///
/// Handlers run on the connection task, in registration order, and must
/// not block. A handler that needs to send commands should spawn.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Predicate deciding whether an event satisfies a waiter.
pub type EventPredicate = Box<dyn Fn(&Event) -> bool + Send + Sync>;

/// Handlers keyed by event method.
type HandlerMap = FxHashMap<String, Vec<(HandlerToken, EventHandler)>>;

/// A one-shot waiter for the first event matching a predicate.
struct Waiter {
    method: String,
    predicate: EventPredicate,
    tx: oneshot::Sender<Event>,
}

type WaiterMap = FxHashMap<WaiterToken, Waiter>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Send a request and route its reply back.
    Send {
        request: Request,
        response_tx: oneshot::Sender<Result<Response>>,
    },
    /// Remove a timed-out correlation entry.
    RemoveCorrelation(CommandId),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// Shared State
// ============================================================================

/// State shared between the handle and the event loop.
struct Shared {
    correlation: Mutex<CorrelationMap>,
    handlers: Mutex<HandlerMap>,
    waiters: Mutex<WaiterMap>,
    ids: CommandIdGenerator,
    closed: AtomicBool,
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to a DevTools endpoint.
///
/// Handles request/response correlation and event routing.
/// The connection spawns an internal event loop task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the
/// same socket.
#[derive(Clone)]
pub struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// State shared with the event loop.
    shared: Arc<Shared>,
    /// Timeout applied by [`Connection::send`].
    command_timeout: Duration,
}

impl Connection {
    /// Connects to a DevTools WebSocket URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the handshake fails.
    pub async fn connect(ws_url: &str, command_timeout: Duration) -> Result<Self> {
        let config = WebSocketConfig::default()
            .max_message_size(Some(MAX_MESSAGE_SIZE))
            .max_frame_size(Some(MAX_MESSAGE_SIZE));

        let (ws_stream, _) =
            tokio_tungstenite::connect_async_with_config(ws_url, Some(config), true)
                .await
                .map_err(|e| Error::connection(format!("{ws_url}: {e}")))?;

        debug!(url = %ws_url, "Connected to DevTools endpoint");
        Ok(Self::new(ws_stream, command_timeout))
    }

    /// Creates a connection from an established WebSocket stream.
    ///
    /// Spawns the event loop task internally.
    pub fn new<S>(ws_stream: WebSocketStream<S>, command_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            correlation: Mutex::new(CorrelationMap::default()),
            handlers: Mutex::new(HandlerMap::default()),
            waiters: Mutex::new(WaiterMap::default()),
            ids: CommandIdGenerator::new(),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&shared),
        ));

        Self {
            command_tx,
            shared,
            command_timeout,
        }
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Builds a request with the next command id.
    #[must_use]
    pub fn request(&self, session_id: Option<SessionId>, command: Command) -> Request {
        Request::new(self.shared.ids.next_id(), session_id, command)
    }

    /// Sends a command and returns its result value.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the socket is gone
    /// - [`Error::RequestTimeout`] if no reply arrives in time
    /// - [`Error::Protocol`] if the browser rejected the command
    pub async fn execute(&self, session_id: Option<SessionId>, command: Command) -> Result<Value> {
        let request = self.request(session_id, command);
        let method = request.method().to_string();
        self.send(request).await?.into_result(&method)
    }

    /// Sends a request and waits for its reply with the default timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    pub async fn send(&self, request: Request) -> Result<Response> {
        self.send_with_timeout(request, self.command_timeout).await
    }

    /// Sends a request and waits for its reply with a custom timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if connection is closed
    /// - [`Error::RequestTimeout`] if response not received within timeout
    pub async fn send_with_timeout(
        &self,
        request: Request,
        request_timeout: Duration,
    ) -> Result<Response> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if self.pending_count() >= MAX_PENDING_COMMANDS {
            return Err(Error::connection(format!(
                "{MAX_PENDING_COMMANDS} commands already pending"
            )));
        }

        let request_id = request.id;
        let method = request.method().to_string();
        let (response_tx, response_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(request_timeout, response_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => {
                let _ = self
                    .command_tx
                    .send(ConnectionCommand::RemoveCorrelation(request_id));

                Err(Error::request_timeout(
                    request_id,
                    method,
                    request_timeout.as_millis() as u64,
                ))
            }
        }
    }

    /// Sends a command without waiting for its reply.
    ///
    /// Used for mouse input, dialog answers and interception decisions,
    /// which may be issued from inside event handlers. The command is queued
    /// in order with awaited sends; a detached task settles its reply and
    /// logs a rejection or timeout.
    pub fn post(&self, session_id: Option<SessionId>, command: Command) {
        let request = self.request(session_id, command);
        let request_id = request.id;
        let method = request.method().to_string();
        trace!(%request_id, method = %method, "Posting command");

        let (response_tx, response_rx) = oneshot::channel();
        if self
            .command_tx
            .send(ConnectionCommand::Send {
                request,
                response_tx,
            })
            .is_err()
        {
            debug!(method = %method, "Post on closed connection dropped");
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            // The entry still settles when the reply arrives; only the log is lost.
            trace!(%request_id, "Posted outside a runtime, reply unobserved");
            return;
        };

        let command_tx = self.command_tx.clone();
        let post_timeout = self.command_timeout;
        runtime.spawn(async move {
            match timeout(post_timeout, response_rx).await {
                Ok(Ok(Ok(response))) => {
                    if let Err(e) = response.into_result(&method) {
                        warn!(%request_id, error = %e, "Posted command rejected");
                    }
                }
                Ok(Ok(Err(Error::ConnectionClosed)) | Err(_)) => {
                    debug!(%request_id, method = %method, "Posted command dropped on close");
                }
                Ok(Ok(Err(e))) => {
                    warn!(%request_id, method = %method, error = %e, "Posted command failed");
                }
                Err(_) => {
                    let _ = command_tx.send(ConnectionCommand::RemoveCorrelation(request_id));
                    warn!(%request_id, method = %method, "Posted command got no reply");
                }
            }
        });
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    /// Registers a handler for an event method.
    ///
    /// Several handlers may be registered for the same method; they run in
    /// registration order.
    pub fn on<F>(&self, method: impl Into<String>, handler: F) -> HandlerToken
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let token = HandlerToken::generate();
        self.shared
            .handlers
            .lock()
            .entry(method.into())
            .or_default()
            .push((token, Arc::new(handler)));
        token
    }

    /// Removes exactly the handler registered under `token`.
    ///
    /// Returns `false` if it was already removed.
    pub fn off(&self, token: HandlerToken) -> bool {
        let mut handlers = self.shared.handlers.lock();
        let mut removed = false;

        handlers.retain(|_, list| {
            let before = list.len();
            list.retain(|(t, _)| *t != token);
            removed |= list.len() != before;
            !list.is_empty()
        });

        removed
    }

    /// Returns the number of handlers registered for a method.
    #[must_use]
    pub fn handler_count(&self, method: &str) -> usize {
        self.shared
            .handlers
            .lock()
            .get(method)
            .map_or(0, Vec::len)
    }

    // ========================================================================
    // Event Waiters
    // ========================================================================

    /// Registers a one-shot waiter for the first `method` event that
    /// satisfies `predicate`.
    ///
    /// Register before triggering the action that produces the event, then
    /// await [`EventWaiter::wait`].
    pub fn waiter<P>(&self, method: impl Into<String>, predicate: P) -> EventWaiter
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        let token = WaiterToken::generate();
        let (tx, rx) = oneshot::channel();
        let method = method.into();

        self.shared.waiters.lock().insert(
            token,
            Waiter {
                method: method.clone(),
                predicate: Box::new(predicate),
                tx,
            },
        );

        EventWaiter {
            token,
            method,
            rx: Some(rx),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Waits for the first `method` event satisfying `predicate`.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no event matched in time
    /// - [`Error::ConnectionClosed`] if the socket closed first
    pub async fn wait_for_event<P>(
        &self,
        method: impl Into<String>,
        predicate: P,
        wait_timeout: Duration,
    ) -> Result<Event>
    where
        P: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.waiter(method, predicate).wait(wait_timeout).await
    }

    /// Returns the number of registered waiters.
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.shared.waiters.lock().len()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.correlation.lock().len()
    }

    /// Returns `true` once the event loop has exited.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Shuts down the connection.
    ///
    /// Idempotent. Pending commands fail with [`Error::ConnectionClosed`].
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    // ========================================================================
    // Event Loop
    // ========================================================================

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        shared: Arc<Shared>,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_message(&text, &shared);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send { request, response_tx }) => {
                            let request_id = request.id;
                            let json = match to_string(&request) {
                                Ok(j) => j,
                                Err(e) => {
                                    let _ = response_tx.send(Err(Error::Json(e)));
                                    continue;
                                }
                            };

                            shared.correlation.lock().insert(request_id, response_tx);

                            if let Err(e) = ws_write.send(Message::Text(json.into())).await
                                && let Some(tx) = shared.correlation.lock().remove(&request_id)
                            {
                                let _ = tx.send(Err(Error::connection(e.to_string())));
                            }

                            trace!(%request_id, method = request.method(), "Request sent");
                        }

                        Some(ConnectionCommand::RemoveCorrelation(request_id)) => {
                            shared.correlation.lock().remove(&request_id);
                            debug!(%request_id, "Removed timed-out correlation");
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        shared.closed.store(true, Ordering::Release);
        Self::fail_pending_requests(&shared);

        // Handlers capture connection clones; dropping them breaks the cycle.
        shared.handlers.lock().clear();
        shared.waiters.lock().clear();

        debug!("Event loop terminated");
    }

    /// Handles an incoming text frame.
    fn handle_incoming_message(text: &str, shared: &Shared) {
        if let Ok(response) = from_str::<Response>(text) {
            let tx = shared.correlation.lock().remove(&response.id);

            match tx {
                Some(tx) => {
                    let _ = tx.send(Ok(response));
                }
                None => trace!(id = %response.id, "Discarding reply for unknown command"),
            }
            return;
        }

        match from_str::<Event>(text) {
            Ok(event) => Self::dispatch_event(&event, shared),
            Err(e) => warn!(error = %e, "Failed to parse incoming message"),
        }
    }

    /// Runs handlers for an event, then resolves matching waiters.
    fn dispatch_event(event: &Event, shared: &Shared) {
        trace!(method = %event.method, "Event received");

        // Snapshot so handlers may register or remove handlers themselves.
        let handlers: Vec<EventHandler> = shared
            .handlers
            .lock()
            .get(&event.method)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                error!(method = %event.method, "Event handler panicked");
            }
        }

        let mut waiters = shared.waiters.lock();
        let matched: Vec<WaiterToken> = waiters
            .iter()
            .filter(|(_, w)| {
                w.method == event.method
                    && catch_unwind(AssertUnwindSafe(|| (w.predicate)(event))).unwrap_or(false)
            })
            .map(|(token, _)| *token)
            .collect();

        for token in matched {
            if let Some(waiter) = waiters.remove(&token) {
                let _ = waiter.tx.send(event.clone());
            }
        }
    }

    /// Fails all pending requests with ConnectionClosed error.
    fn fail_pending_requests(shared: &Shared) {
        let pending: Vec<_> = shared.correlation.lock().drain().collect();
        let count = pending.len();

        for (_, tx) in pending {
            let _ = tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending requests on shutdown");
        }
    }
}

// ============================================================================
// EventWaiter
// ============================================================================

/// A registered one-shot event waiter.
///
/// Dropping it without waiting deregisters it.
pub struct EventWaiter {
    token: WaiterToken,
    method: String,
    rx: Option<oneshot::Receiver<Event>>,
    shared: Arc<Shared>,
}

impl EventWaiter {
    /// Returns the waiter's registry token.
    #[inline]
    #[must_use]
    pub fn token(&self) -> WaiterToken {
        self.token
    }

    /// Waits for the matching event.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no event matched in time
    /// - [`Error::ConnectionClosed`] if the socket closed first
    pub async fn wait(mut self, wait_timeout: Duration) -> Result<Event> {
        let Some(rx) = self.rx.take() else {
            return Err(Error::ConnectionClosed);
        };
        let start = Instant::now();

        match timeout(wait_timeout, rx).await {
            Ok(Ok(event)) => Ok(event),
            Ok(Err(_)) => Err(Error::ConnectionClosed),
            Err(_) => Err(Error::timeout(
                format!("event {}", self.method),
                wait_timeout.as_millis() as u64,
                start.elapsed().as_millis() as u64,
            )),
        }
    }
}

impl Drop for EventWaiter {
    fn drop(&mut self) {
        self.shared.waiters.lock().remove(&self.token);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{MaybeTlsStream, accept_async, connect_async};

    use crate::protocol::{PageCommand, RuntimeCommand};

    type ServerSocket = WebSocketStream<TcpStream>;

    async fn pair() -> (Connection, ServerSocket) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            accept_async(stream).await.expect("handshake")
        });

        let (client, _) = connect_async(format!("ws://{addr}")).await.expect("connect");
        let server = accept.await.expect("join");
        let client: WebSocketStream<MaybeTlsStream<TcpStream>> = client;

        (Connection::new(client, Duration::from_secs(2)), server)
    }

    async fn next_json(server: &mut ServerSocket) -> Value {
        loop {
            match server.next().await {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).expect("json"),
                Some(Ok(_)) => continue,
                other => panic!("unexpected frame: {other:?}"),
            }
        }
    }

    async fn push(server: &mut ServerSocket, value: Value) {
        server
            .send(Message::Text(value.to_string().into()))
            .await
            .expect("push");
    }

    #[tokio::test]
    async fn test_reply_is_routed_by_id() {
        let (conn, mut server) = pair().await;

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.execute(None, Command::Runtime(RuntimeCommand::Enable)).await }
        });

        let request = next_json(&mut server).await;
        assert_eq!(request["method"], "Runtime.enable");
        assert_eq!(request["id"], 1);

        push(&mut server, json!({"id": 1, "result": {"ok": true}})).await;
        let value = call.await.expect("join").expect("result");
        assert_eq!(value["ok"], true);
        assert_eq!(conn.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_protocol_error_surfaces() {
        let (conn, mut server) = pair().await;

        let call = tokio::spawn({
            let conn = conn.clone();
            async move {
                conn.execute(
                    None,
                    Command::Page(PageCommand::Navigate { url: "bad".into() }),
                )
                .await
            }
        });

        let request = next_json(&mut server).await;
        let id = request["id"].clone();
        push(
            &mut server,
            json!({"id": id, "error": {"code": -32000, "message": "Cannot navigate to invalid URL"}}),
        )
        .await;

        let err = call.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::Protocol { code: -32000, .. }));
    }

    #[tokio::test]
    async fn test_handlers_run_and_can_be_removed() {
        let (conn, mut server) = pair().await;
        let hits = Arc::new(AtomicUsize::new(0));

        let token = conn.on("Page.loadEventFired", {
            let hits = Arc::clone(&hits);
            move |_| {
                hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        conn.on("Page.loadEventFired", |_| panic!("boom"));

        let waiter = conn.waiter("Page.loadEventFired", |_| true);
        push(&mut server, json!({"method": "Page.loadEventFired", "params": {}})).await;
        waiter.wait(Duration::from_secs(1)).await.expect("event");
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(conn.off(token));
        assert!(!conn.off(token));
        assert_eq!(conn.handler_count("Page.loadEventFired"), 1);
    }

    #[tokio::test]
    async fn test_waiter_predicate_and_timeout() {
        let (conn, mut server) = pair().await;

        let waiter = conn.waiter("Page.frameStoppedLoading", |e| e.params["frameId"] == "F2");
        push(&mut server, json!({"method": "Page.frameStoppedLoading", "params": {"frameId": "F1"}})).await;
        push(&mut server, json!({"method": "Page.frameStoppedLoading", "params": {"frameId": "F2"}})).await;

        let event = waiter.wait(Duration::from_secs(1)).await.expect("event");
        assert_eq!(event.params["frameId"], "F2");
        assert_eq!(conn.waiter_count(), 0);

        let err = conn
            .wait_for_event("Page.never", |_| true, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(conn.waiter_count(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_pending_and_later_sends() {
        let (conn, mut server) = pair().await;

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.execute(None, Command::Page(PageCommand::Enable)).await }
        });

        let _ = next_json(&mut server).await;
        server.close(None).await.expect("close");
        drop(server);

        let err = call.await.expect("join").unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(conn.is_closed());
        let err = conn
            .execute(None, Command::Page(PageCommand::Enable))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_posted_error_reply_settles_entry() {
        let (conn, mut server) = pair().await;

        conn.post(
            None,
            Command::Page(PageCommand::HandleJavaScriptDialog {
                accept: true,
                prompt_text: None,
            }),
        );

        let sent = next_json(&mut server).await;
        assert_eq!(sent["method"], "Page.handleJavaScriptDialog");
        assert_eq!(conn.pending_count(), 1);

        push(
            &mut server,
            json!({"id": sent["id"], "error": {"code": -32602, "message": "No dialog is showing"}}),
        )
        .await;

        let deadline = Instant::now() + Duration::from_secs(1);
        while conn.pending_count() > 0 {
            assert!(Instant::now() < deadline, "posted entry never settled");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_post_keeps_order_with_sends() {
        let (conn, mut server) = pair().await;

        conn.post(None, Command::Page(PageCommand::BringToFront));
        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.execute(None, Command::Page(PageCommand::Enable)).await }
        });

        let first = next_json(&mut server).await;
        let second = next_json(&mut server).await;
        assert_eq!(first["method"], "Page.bringToFront");
        assert_eq!(second["method"], "Page.enable");

        push(&mut server, json!({"id": second["id"], "result": {}})).await;
        push(&mut server, json!({"id": first["id"], "result": {}})).await;
        call.await.expect("join").expect("result");
    }

    #[tokio::test]
    async fn test_late_reply_is_discarded() {
        let (conn, mut server) = pair().await;

        let request = conn.request(None, Command::Page(PageCommand::Enable));
        let err = conn
            .send_with_timeout(request, Duration::from_millis(30))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RequestTimeout { .. }));

        let sent = next_json(&mut server).await;
        push(&mut server, json!({"id": sent["id"], "result": {}})).await;

        let call = tokio::spawn({
            let conn = conn.clone();
            async move { conn.execute(None, Command::Page(PageCommand::BringToFront)).await }
        });
        let next = next_json(&mut server).await;
        assert!(next["id"].as_u64() > sent["id"].as_u64());
        push(&mut server, json!({"id": next["id"], "result": {"second": 1}})).await;

        let value = call.await.expect("join").expect("result");
        assert_eq!(value["second"], 1);
    }
}

//! In-process DevTools endpoint for driving the real transport in tests.

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use cdp_driver::{Driver, DriverOptions};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Decides the messages sent back for one command.
///
/// Messages without a `method` are replies and get the command's id; an
/// empty vector leaves the command unanswered.
pub type Responder = Arc<dyn Fn(&str, &Value) -> Vec<Value> + Send + Sync>;

/// A scripted page endpoint.
pub struct MockBrowser {
    pub ws_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    events: mpsc::UnboundedSender<Value>,
}

impl MockBrowser {
    /// Starts an endpoint answering with [`default_reply`].
    pub async fn start() -> Self {
        Self::with(default_reply).await
    }

    /// Starts an endpoint answering with `responder`.
    pub async fn with<F>(responder: F) -> Self
    where
        F: Fn(&str, &Value) -> Vec<Value> + Send + Sync + 'static,
    {
        init_tracing();
        let responder: Responder = Arc::new(responder);
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (events, mut events_rx) = mpsc::unbounded_channel::<Value>();

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            loop {
                tokio::select! {
                    incoming = ws.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let request: Value = serde_json::from_str(&text).expect("json request");
                            log.lock().push(request.clone());

                            let method = request["method"].as_str().unwrap_or_default().to_string();
                            for mut out in responder(&method, &request["params"]) {
                                if out.get("method").is_none() {
                                    out["id"] = request["id"].clone();
                                }
                                if let Some(session) = request.get("sessionId") {
                                    out["sessionId"] = session.clone();
                                }
                                if ws.send(Message::Text(out.to_string().into())).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                        Some(Ok(_)) => {}
                    },
                    Some(event) = events_rx.recv() => {
                        if ws.send(Message::Text(event.to_string().into())).await.is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Self {
            ws_url: format!("ws://{addr}/devtools/page/MOCK"),
            requests,
            events,
        }
    }

    /// Connects a driver with fast test options.
    pub async fn driver(&self) -> Driver {
        Driver::connect(&self.ws_url, test_options())
            .await
            .expect("driver connects")
    }

    /// Pushes an event to the driver.
    pub fn emit(&self, method: &str, params: Value) {
        self.events
            .send(event(method, params))
            .expect("server running");
    }

    /// Every command received so far.
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    /// Methods of every command received so far.
    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| r["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Waits for the first command with `method`.
    pub async fn expect(&self, method: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(found) = self
                .requests
                .lock()
                .iter()
                .find(|r| r["method"] == method)
                .cloned()
            {
                return found;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "no {method} command; got {:?}",
                self.methods()
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Timeouts and retries short enough for tests.
pub fn test_options() -> DriverOptions {
    DriverOptions::default()
        .with_timeout(Duration::from_secs(2))
        .with_retry_count(2)
        .with_retry_interval(Duration::from_millis(10))
        .with_poll_interval(Duration::from_millis(10))
        .with_dialog_timeout(Duration::from_millis(50))
}

pub fn result(value: Value) -> Value {
    json!({ "result": value })
}

pub fn error(code: i64, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

pub fn event(method: &str, params: Value) -> Value {
    json!({ "method": method, "params": params })
}

/// Evaluation result carrying `value` by value.
pub fn evaluated(value: Value) -> Value {
    result(json!({ "result": { "type": "object", "value": value } }))
}

/// Answers the startup commands and evaluates everything to `"complete"`.
pub fn default_reply(method: &str, _params: &Value) -> Vec<Value> {
    match method {
        "Page.getFrameTree" => vec![result(json!({
            "frameTree": { "frame": { "id": "MAIN", "loaderId": "L1", "url": "about:blank" } }
        }))],
        "Page.navigate" => vec![result(json!({ "frameId": "MAIN", "loaderId": "L2" }))],
        "Runtime.evaluate" => vec![evaluated(json!("complete"))],
        "Network.getCookies" => vec![result(json!({ "cookies": [] }))],
        _ => vec![result(json!({}))],
    }
}

/// Expression text of a `Runtime.evaluate` command.
pub fn expression(params: &Value) -> &str {
    params["expression"].as_str().unwrap_or_default()
}

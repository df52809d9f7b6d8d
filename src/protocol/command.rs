//! Command definitions organized by CDP domain.
//!
//! Each domain enum is adjacently tagged so a variant serializes straight
//! into the `{"method": ..., "params": ...}` shape CDP expects.
//!
//! # Domains
//!
//! | Domain | Used for |
//! |--------|----------|
//! | `Page` | Navigation, lifecycle, frames, dialogs, screenshots, PDF |
//! | `Runtime` | Script evaluation |
//! | `DOM` | Resolving frame-owner elements |
//! | `Input` | Mouse and keyboard synthesis |
//! | `Network` | Cookies |
//! | `Fetch` | Request interception |
//! | `Target` | Tabs and sessions |
//! | `Browser` | Version, window bounds |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::{ContextId, FetchRequestId, FrameId, TargetId};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All protocol commands organized by domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page domain commands.
    Page(PageCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// DOM domain commands.
    Dom(DomCommand),
    /// Input domain commands.
    Input(InputCommand),
    /// Network domain commands.
    Network(NetworkCommand),
    /// Fetch domain commands.
    Fetch(FetchCommand),
    /// Target domain commands.
    Target(TargetCommand),
    /// Browser domain commands.
    Browser(BrowserCommand),
    /// Any other method, passed through untyped.
    Raw(RawCommand),
}

impl Command {
    /// Returns the CDP method name of this command.
    #[must_use]
    pub fn method(&self) -> String {
        if let Self::Raw(raw) = self {
            return raw.method.clone();
        }
        serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default()
    }
}

/// An untyped command for methods without a typed variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCommand {
    /// Method name, e.g. `"Emulation.setDeviceMetricsOverride"`.
    pub method: String,
    /// Parameters object.
    #[serde(default)]
    pub params: Value,
}

impl RawCommand {
    /// Creates a raw command.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Enable page events.
    #[serde(rename = "Page.enable")]
    Enable,

    /// Toggle `Page.lifecycleEvent` notifications.
    #[serde(rename = "Page.setLifecycleEventsEnabled")]
    SetLifecycleEventsEnabled {
        /// Whether to emit lifecycle events.
        enabled: bool,
    },

    /// Get the frame tree of the page.
    #[serde(rename = "Page.getFrameTree")]
    GetFrameTree,

    /// Navigate the main frame.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Reload the page.
    #[serde(rename = "Page.reload")]
    Reload {
        /// Bypass the cache.
        #[serde(rename = "ignoreCache", skip_serializing_if = "Option::is_none")]
        ignore_cache: Option<bool>,
    },

    /// Get the session history.
    #[serde(rename = "Page.getNavigationHistory")]
    GetNavigationHistory,

    /// Navigate to a session history entry.
    #[serde(rename = "Page.navigateToHistoryEntry")]
    NavigateToHistoryEntry {
        /// Entry id from the history.
        #[serde(rename = "entryId")]
        entry_id: i64,
    },

    /// Capture a screenshot.
    #[serde(rename = "Page.captureScreenshot")]
    CaptureScreenshot {
        /// `png` or `jpeg`.
        format: String,
        /// JPEG quality 0-100.
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
        /// Region to capture.
        #[serde(skip_serializing_if = "Option::is_none")]
        clip: Option<Viewport>,
        /// Capture content outside the viewport.
        #[serde(rename = "captureBeyondViewport", skip_serializing_if = "Option::is_none")]
        capture_beyond_viewport: Option<bool>,
    },

    /// Print the page to PDF; params are passed through.
    #[serde(rename = "Page.printToPDF")]
    PrintToPdf(Value),

    /// Accept or dismiss a JavaScript dialog.
    #[serde(rename = "Page.handleJavaScriptDialog")]
    HandleJavaScriptDialog {
        /// Accept (`true`) or dismiss (`false`).
        accept: bool,
        /// Text entered into a prompt.
        #[serde(rename = "promptText", skip_serializing_if = "Option::is_none")]
        prompt_text: Option<String>,
    },

    /// Create an isolated world for a frame.
    #[serde(rename = "Page.createIsolatedWorld")]
    CreateIsolatedWorld {
        /// Frame to create the world in.
        #[serde(rename = "frameId")]
        frame_id: FrameId,
        /// Optional world name.
        #[serde(rename = "worldName", skip_serializing_if = "Option::is_none")]
        world_name: Option<String>,
    },

    /// Bring the page to front.
    #[serde(rename = "Page.bringToFront")]
    BringToFront,
}

/// Clip rectangle for screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// X offset in CSS pixels.
    pub x: f64,
    /// Y offset in CSS pixels.
    pub y: f64,
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
    /// Page scale factor.
    pub scale: f64,
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Enable runtime events.
    #[serde(rename = "Runtime.enable")]
    Enable,

    /// Evaluate an expression.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// Expression to evaluate.
        expression: String,
        /// Return the value as JSON instead of a remote object.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Await a returned promise.
        #[serde(rename = "awaitPromise", skip_serializing_if = "Option::is_none")]
        await_promise: Option<bool>,
        /// Context to evaluate in; the main world when absent.
        #[serde(rename = "contextId", skip_serializing_if = "Option::is_none")]
        context_id: Option<ContextId>,
    },

    /// Release a remote object.
    #[serde(rename = "Runtime.releaseObject")]
    ReleaseObject {
        /// Remote object id.
        #[serde(rename = "objectId")]
        object_id: String,
    },
}

// ============================================================================
// DOM Commands
// ============================================================================

/// DOM domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum DomCommand {
    /// Describe the node behind a remote object.
    #[serde(rename = "DOM.describeNode")]
    DescribeNode {
        /// Remote object id of the node.
        #[serde(rename = "objectId")]
        object_id: String,
    },
}

// ============================================================================
// Input Commands
// ============================================================================

/// Input domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch a mouse event.
    #[serde(rename = "Input.dispatchMouseEvent")]
    DispatchMouseEvent {
        /// `mouseMoved`, `mousePressed`, `mouseReleased` or `mouseWheel`.
        #[serde(rename = "type")]
        event_type: String,
        /// X in CSS pixels relative to the viewport.
        x: f64,
        /// Y in CSS pixels relative to the viewport.
        y: f64,
        /// `none`, `left`, `middle` or `right`.
        button: String,
        /// Bit mask of pressed buttons.
        buttons: u8,
        /// Click count for press/release.
        #[serde(rename = "clickCount")]
        click_count: u8,
        /// Modifier bit mask.
        modifiers: u8,
        /// Horizontal wheel delta.
        #[serde(rename = "deltaX", skip_serializing_if = "Option::is_none")]
        delta_x: Option<f64>,
        /// Vertical wheel delta.
        #[serde(rename = "deltaY", skip_serializing_if = "Option::is_none")]
        delta_y: Option<f64>,
    },

    /// Dispatch a key event.
    #[serde(rename = "Input.dispatchKeyEvent")]
    DispatchKeyEvent {
        /// `rawKeyDown`, `keyDown`, `char` or `keyUp`.
        #[serde(rename = "type")]
        event_type: String,
        /// Modifier bit mask.
        modifiers: u8,
        /// DOM `key` value.
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// DOM `code` value.
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Text generated by the key.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Windows virtual key code.
        #[serde(rename = "windowsVirtualKeyCode", skip_serializing_if = "Option::is_none")]
        windows_virtual_key_code: Option<u32>,
        /// 1 left, 2 right, 3 numpad.
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<u8>,
    },

    /// Insert text as if typed by an IME.
    #[serde(rename = "Input.insertText")]
    InsertText {
        /// Text to insert.
        text: String,
    },
}

// ============================================================================
// Network Commands
// ============================================================================

/// Network domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum NetworkCommand {
    /// Enable network events.
    #[serde(rename = "Network.enable")]
    Enable,

    /// Get cookies for the current URL.
    #[serde(rename = "Network.getCookies")]
    GetCookies,

    /// Set a cookie.
    #[serde(rename = "Network.setCookie")]
    SetCookie(Cookie),

    /// Delete matching cookies.
    #[serde(rename = "Network.deleteCookies")]
    DeleteCookies {
        /// Cookie name.
        name: String,
        /// Restrict to a domain.
        #[serde(skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        /// Restrict to a path.
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },

    /// Clear all browser cookies.
    #[serde(rename = "Network.clearBrowserCookies")]
    ClearBrowserCookies,
}

// ============================================================================
// Fetch Commands
// ============================================================================

/// Fetch domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum FetchCommand {
    /// Start pausing requests matching the patterns.
    #[serde(rename = "Fetch.enable")]
    Enable {
        /// URL patterns.
        patterns: Vec<RequestPattern>,
    },

    /// Stop pausing requests.
    #[serde(rename = "Fetch.disable")]
    Disable,

    /// Let a paused request go to the network unmodified.
    #[serde(rename = "Fetch.continueRequest")]
    ContinueRequest {
        /// Paused request id.
        #[serde(rename = "requestId")]
        request_id: FetchRequestId,
    },

    /// Answer a paused request locally.
    #[serde(rename = "Fetch.fulfillRequest")]
    FulfillRequest {
        /// Paused request id.
        #[serde(rename = "requestId")]
        request_id: FetchRequestId,
        /// HTTP status.
        #[serde(rename = "responseCode")]
        response_code: u16,
        /// Response headers.
        #[serde(rename = "responseHeaders")]
        response_headers: Vec<HeaderEntry>,
        /// Base64 body.
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },

    /// Fail a paused request.
    #[serde(rename = "Fetch.failRequest")]
    FailRequest {
        /// Paused request id.
        #[serde(rename = "requestId")]
        request_id: FetchRequestId,
        /// Network error reason, e.g. `"Failed"`.
        #[serde(rename = "errorReason")]
        error_reason: String,
    },
}

/// A `Fetch.enable` URL pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPattern {
    /// Glob with `*` and `?` wildcards.
    #[serde(rename = "urlPattern")]
    pub url_pattern: String,
}

/// A response header entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    /// Header name.
    pub name: String,
    /// Header value.
    pub value: String,
}

// ============================================================================
// Target Commands
// ============================================================================

/// Target domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum TargetCommand {
    /// List targets.
    #[serde(rename = "Target.getTargets")]
    GetTargets,

    /// Focus a target.
    #[serde(rename = "Target.activateTarget")]
    ActivateTarget {
        /// Target id.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },

    /// Attach to a target.
    #[serde(rename = "Target.attachToTarget")]
    AttachToTarget {
        /// Target id.
        #[serde(rename = "targetId")]
        target_id: TargetId,
        /// Use flattened sessions.
        flatten: bool,
    },

    /// Close a target.
    #[serde(rename = "Target.closeTarget")]
    CloseTarget {
        /// Target id.
        #[serde(rename = "targetId")]
        target_id: TargetId,
    },
}

// ============================================================================
// Browser Commands
// ============================================================================

/// Browser domain commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum BrowserCommand {
    /// Browser version info; used as a readiness probe.
    #[serde(rename = "Browser.getVersion")]
    GetVersion,

    /// Window containing a target.
    #[serde(rename = "Browser.getWindowForTarget")]
    GetWindowForTarget,

    /// Window bounds.
    #[serde(rename = "Browser.getWindowBounds")]
    GetWindowBounds {
        /// Window id.
        #[serde(rename = "windowId")]
        window_id: i64,
    },

    /// Change window bounds or state.
    #[serde(rename = "Browser.setWindowBounds")]
    SetWindowBounds {
        /// Window id.
        #[serde(rename = "windowId")]
        window_id: i64,
        /// Bounds object (`left`, `top`, `width`, `height`, `windowState`).
        bounds: Value,
    },

    /// Close the browser.
    #[serde(rename = "Browser.close")]
    Close,
}

// ============================================================================
// Cookie
// ============================================================================

/// A browser cookie as exchanged with the `Network` domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// URL to associate the cookie with when setting.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub url: Option<String>,
    /// Domain.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub domain: Option<String>,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<String>,
    /// Secure flag.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub secure: Option<bool>,
    /// HttpOnly flag.
    #[serde(rename = "httpOnly", skip_serializing_if = "Option::is_none", default)]
    pub http_only: Option<bool>,
    /// SameSite attribute.
    #[serde(rename = "sameSite", skip_serializing_if = "Option::is_none", default)]
    pub same_site: Option<String>,
    /// Expiration as seconds since epoch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expires: Option<f64>,
}

impl Cookie {
    /// Creates a new cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            url: None,
            domain: None,
            path: None,
            secure: None,
            http_only: None,
            same_site: None,
            expires: None,
        }
    }

    /// Sets the URL scope.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the secure flag.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    /// Sets the HttpOnly flag.
    #[inline]
    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = Some(http_only);
        self
    }

    /// Sets the expiry.
    #[inline]
    #[must_use]
    pub fn with_expires(mut self, expires: f64) -> Self {
        self.expires = Some(expires);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_unit_variant_has_no_params() {
        let value = serde_json::to_value(Command::Page(PageCommand::Enable)).expect("serialize");
        assert_eq!(value, json!({"method": "Page.enable"}));
    }

    #[test]
    fn test_evaluate_skips_absent_context() {
        let command = Command::Runtime(RuntimeCommand::Evaluate {
            expression: "1+1".into(),
            return_by_value: true,
            await_promise: None,
            context_id: None,
        });
        let value = serde_json::to_value(&command).expect("serialize");

        assert_eq!(value["params"]["returnByValue"], true);
        assert!(value["params"].get("contextId").is_none());
        assert_eq!(command.method(), "Runtime.evaluate");
    }

    #[test]
    fn test_fulfill_request_shape() {
        let command = Command::Fetch(FetchCommand::FulfillRequest {
            request_id: FetchRequestId::new("interception-1"),
            response_code: 404,
            response_headers: vec![HeaderEntry {
                name: "Content-Type".into(),
                value: "text/plain".into(),
            }],
            body: Some("Tm90IEZvdW5k".into()),
        });
        let value = serde_json::to_value(&command).expect("serialize");

        assert_eq!(value["method"], "Fetch.fulfillRequest");
        assert_eq!(value["params"]["requestId"], "interception-1");
        assert_eq!(value["params"]["responseCode"], 404);
        assert_eq!(value["params"]["responseHeaders"][0]["name"], "Content-Type");
    }

    #[test]
    fn test_newtype_variant_passes_params() {
        let command = Command::Page(PageCommand::PrintToPdf(json!({"landscape": true})));
        let value = serde_json::to_value(&command).expect("serialize");
        assert_eq!(value["params"]["landscape"], true);
        assert_eq!(command.method(), "Page.printToPDF");
    }

    #[test]
    fn test_raw_command() {
        let command = Command::Raw(RawCommand::new("Emulation.setTouchEmulationEnabled", json!({"enabled": true})));
        assert_eq!(command.method(), "Emulation.setTouchEmulationEnabled");

        let value = serde_json::to_value(&command).expect("serialize");
        assert_eq!(value["params"]["enabled"], true);
    }

    #[test]
    fn test_cookie_builder() {
        let cookie = Cookie::new("session", "abc")
            .with_domain("example.com")
            .with_path("/")
            .with_http_only(true);

        let value = serde_json::to_value(&cookie).expect("serialize");
        assert_eq!(value["httpOnly"], true);
        assert_eq!(value["domain"], "example.com");
        assert!(value.get("secure").is_none());
    }

    #[test]
    fn test_cookie_parses_browser_shape() {
        let cookie: Cookie = serde_json::from_value(json!({
            "name": "id", "value": "1", "domain": ".example.com", "path": "/",
            "expires": -1, "size": 3, "httpOnly": false, "secure": true,
            "session": true, "priority": "Medium"
        }))
        .expect("parse");

        assert_eq!(cookie.secure, Some(true));
        assert_eq!(cookie.expires, Some(-1.0));
    }
}

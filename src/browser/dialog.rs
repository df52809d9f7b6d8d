//! JavaScript dialog handling.
//!
//! A single handler slot receives every `alert`, `confirm`, `prompt` and
//! `beforeunload` dialog. Each [`Dialog`] settles exactly once; with no
//! handler installed dialogs are dismissed as soon as they open.
//!
//! # Example
//!
//! ```ignore
//! driver.on_dialog(|dialog| {
//!     if dialog.kind() == DialogKind::Prompt {
//!         dialog.accept(Some("John"));
//!     } else {
//!         dialog.dismiss();
//!     }
//! });
//! driver.click("{button}Ask name").await?;
//! driver.detach_dialog();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::Error;
use crate::protocol::ParsedEvent;

// ============================================================================
// Types
// ============================================================================

/// User callback for opened dialogs.
pub type DialogHandler = Arc<dyn Fn(Dialog) + Send + Sync>;

/// Sends the answer to the browser: `(accept, prompt_text)`.
pub type DialogResponder = Arc<dyn Fn(bool, Option<String>) + Send + Sync>;

// ============================================================================
// DialogKind
// ============================================================================

/// Kind of JavaScript dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialogKind {
    /// `window.alert`
    Alert,
    /// `window.confirm`
    Confirm,
    /// `window.prompt`
    Prompt,
    /// Leave-page confirmation.
    BeforeUnload,
}

impl DialogKind {
    /// Parses the CDP dialog type, defaulting to [`DialogKind::Alert`].
    #[must_use]
    pub fn from_cdp(value: &str) -> Self {
        match value {
            "confirm" => Self::Confirm,
            "prompt" => Self::Prompt,
            "beforeunload" => Self::BeforeUnload,
            _ => Self::Alert,
        }
    }

    /// CDP name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Confirm => "confirm",
            Self::Prompt => "prompt",
            Self::BeforeUnload => "beforeunload",
        }
    }
}

impl fmt::Display for DialogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Dialog
// ============================================================================

struct DialogInner {
    kind: DialogKind,
    message: String,
    default_prompt: Option<String>,
    url: String,
    handled: AtomicBool,
    responder: DialogResponder,
}

/// An open dialog.
///
/// Clones share the settled state; only the first
/// [`accept`](Dialog::accept) or [`dismiss`](Dialog::dismiss) reaches the
/// browser.
#[derive(Clone)]
pub struct Dialog {
    inner: Arc<DialogInner>,
}

impl fmt::Debug for Dialog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialog")
            .field("kind", &self.inner.kind)
            .field("message", &self.inner.message)
            .field("handled", &self.is_handled())
            .finish_non_exhaustive()
    }
}

impl Dialog {
    /// Creates a dialog answered through `responder`.
    #[must_use]
    pub fn new(
        kind: DialogKind,
        message: impl Into<String>,
        default_prompt: Option<String>,
        url: impl Into<String>,
        responder: DialogResponder,
    ) -> Self {
        Self {
            inner: Arc::new(DialogInner {
                kind,
                message: message.into(),
                default_prompt,
                url: url.into(),
                handled: AtomicBool::new(false),
                responder,
            }),
        }
    }

    /// Builds a dialog from a `Page.javascriptDialogOpening` event.
    #[must_use]
    pub fn from_event(event: &ParsedEvent, responder: DialogResponder) -> Option<Self> {
        match event {
            ParsedEvent::DialogOpening {
                message,
                dialog_type,
                default_prompt,
                url,
            } => Some(Self::new(
                DialogKind::from_cdp(dialog_type),
                message.clone(),
                default_prompt.clone(),
                url.clone(),
                responder,
            )),
            _ => None,
        }
    }

    /// Dialog kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DialogKind {
        self.inner.kind
    }

    /// Dialog message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Default prompt text.
    #[inline]
    #[must_use]
    pub fn default_prompt(&self) -> Option<&str> {
        self.inner.default_prompt.as_deref()
    }

    /// URL of the page that opened the dialog.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Returns `true` once accepted or dismissed.
    #[inline]
    #[must_use]
    pub fn is_handled(&self) -> bool {
        self.inner.handled.load(Ordering::Acquire)
    }

    /// Accepts, optionally entering prompt text.
    ///
    /// Returns `false` if the dialog was already settled.
    pub fn accept(&self, text: Option<&str>) -> bool {
        self.settle(true, text.map(str::to_string))
    }

    /// Dismisses (cancel).
    ///
    /// Returns `false` if the dialog was already settled.
    pub fn dismiss(&self) -> bool {
        self.settle(false, None)
    }

    fn settle(&self, accept: bool, text: Option<String>) -> bool {
        if self.inner.handled.swap(true, Ordering::AcqRel) {
            return false;
        }
        debug!(kind = %self.inner.kind, accept, "Settling dialog");
        (self.inner.responder)(accept, text);
        true
    }
}

// ============================================================================
// DialogSlot
// ============================================================================

/// The single dialog handler slot plus the last dialog seen.
#[derive(Default)]
pub struct DialogSlot {
    handler: Mutex<Option<DialogHandler>>,
    last: Mutex<Option<Dialog>>,
}

impl DialogSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the handler.
    pub fn set(&self, handler: DialogHandler) {
        *self.handler.lock() = Some(handler);
    }

    /// Removes the handler.
    pub fn clear(&self) {
        *self.handler.lock() = None;
    }

    /// Returns `true` if a handler is installed.
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Message of the most recent dialog.
    #[must_use]
    pub fn last_text(&self) -> Option<String> {
        self.last.lock().as_ref().map(|d| d.message().to_string())
    }

    /// The most recent dialog; clones share its settled state.
    #[must_use]
    pub fn last_dialog(&self) -> Option<Dialog> {
        self.last.lock().clone()
    }

    /// Routes a freshly opened dialog.
    ///
    /// With no handler it is dismissed now. Otherwise the handler runs
    /// inline; if it leaves the dialog open, a timer dismisses it after
    /// `timeout`.
    pub fn dispatch(&self, dialog: Dialog, timeout: Duration) {
        *self.last.lock() = Some(dialog.clone());

        let handler = self.handler.lock().clone();
        let Some(handler) = handler else {
            debug!(kind = %dialog.kind(), "No dialog handler, dismissing");
            dialog.dismiss();
            return;
        };

        let for_handler = dialog.clone();
        if catch_unwind(AssertUnwindSafe(|| handler(for_handler))).is_err() {
            warn!(kind = %dialog.kind(), "Dialog handler panicked");
        }

        if dialog.is_handled() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(timeout).await;
                    dismiss_unhandled(&dialog);
                });
            }
            Err(_) => dismiss_unhandled(&dialog),
        }
    }
}

fn dismiss_unhandled(dialog: &Dialog) {
    if dialog.dismiss() {
        let err = Error::dialog_not_handled(dialog.message());
        warn!(error = %err, "Dialog handler left dialog open");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    type Answers = Arc<Mutex<Vec<(bool, Option<String>)>>>;

    fn recorder() -> (Answers, DialogResponder) {
        let answers: Answers = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&answers);
        (answers, Arc::new(move |accept, text| sink.lock().push((accept, text))))
    }

    fn prompt(responder: DialogResponder) -> Dialog {
        Dialog::new(DialogKind::Prompt, "Name?", Some("anon".into()), "https://x.test", responder)
    }

    #[test]
    fn test_settles_once() {
        let (answers, responder) = recorder();
        let dialog = prompt(responder);

        assert!(dialog.accept(Some("John")));
        assert!(!dialog.dismiss());
        assert!(!dialog.clone().accept(None));

        assert_eq!(*answers.lock(), vec![(true, Some("John".to_string()))]);
    }

    #[test]
    fn test_no_handler_dismisses() {
        let (answers, responder) = recorder();
        let slot = DialogSlot::new();

        slot.dispatch(prompt(responder), Duration::from_secs(5));

        assert_eq!(*answers.lock(), vec![(false, None)]);
        assert_eq!(slot.last_text().as_deref(), Some("Name?"));
    }

    #[test]
    fn test_handler_replaced_and_detached() {
        let (answers, responder) = recorder();
        let slot = DialogSlot::new();
        let first = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&first);

        slot.set(Arc::new(move |d: Dialog| {
            counter.fetch_add(1, Ordering::SeqCst);
            d.accept(None);
        }));
        slot.set(Arc::new(|d: Dialog| {
            d.accept(Some("second"));
        }));
        slot.dispatch(prompt(Arc::clone(&responder)), Duration::from_secs(5));

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(answers.lock()[0], (true, Some("second".to_string())));

        slot.clear();
        assert!(!slot.is_set());
        slot.dispatch(prompt(responder), Duration::from_secs(5));
        assert_eq!(answers.lock()[1], (false, None));
    }

    #[tokio::test]
    async fn test_unsettled_dialog_dismissed_after_timeout() {
        let (answers, responder) = recorder();
        let slot = DialogSlot::new();
        slot.set(Arc::new(|_d: Dialog| {}));

        slot.dispatch(prompt(responder), Duration::from_millis(30));
        assert!(answers.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(*answers.lock(), vec![(false, None)]);
    }

    #[tokio::test]
    async fn test_late_settle_beats_timer_once() {
        let (answers, responder) = recorder();
        let slot = DialogSlot::new();
        let held: Arc<Mutex<Option<Dialog>>> = Arc::new(Mutex::new(None));
        let keep = Arc::clone(&held);
        slot.set(Arc::new(move |d: Dialog| {
            *keep.lock() = Some(d);
        }));

        slot.dispatch(prompt(responder), Duration::from_millis(50));
        let dialog = held.lock().take().expect("handler kept dialog");
        assert!(dialog.accept(None));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(answers.lock().len(), 1);
    }

    #[test]
    fn test_panicking_handler_still_settled_without_runtime() {
        let (answers, responder) = recorder();
        let slot = DialogSlot::new();
        slot.set(Arc::new(|_d: Dialog| panic!("handler bug")));

        slot.dispatch(prompt(responder), Duration::from_millis(10));
        assert_eq!(*answers.lock(), vec![(false, None)]);
    }

    #[test]
    fn test_kind_from_event() {
        let (_, responder) = recorder();
        let event = ParsedEvent::DialogOpening {
            message: "Sure?".into(),
            dialog_type: "confirm".into(),
            default_prompt: None,
            url: "about:blank".into(),
        };
        let dialog = Dialog::from_event(&event, responder).expect("dialog");
        assert_eq!(dialog.kind(), DialogKind::Confirm);
        assert_eq!(dialog.message(), "Sure?");
        assert_eq!(DialogKind::from_cdp("weird"), DialogKind::Alert);
    }
}

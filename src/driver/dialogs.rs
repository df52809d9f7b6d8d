//! JavaScript dialogs.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::browser::Dialog;
use crate::error::{Error, Result};

use super::Driver;

// ============================================================================
// Driver - Dialogs
// ============================================================================

impl Driver {
    /// Installs the dialog handler, replacing any previous one.
    ///
    /// The handler runs on the connection task and must not block. A dialog
    /// it leaves open is dismissed after `dialog_timeout`.
    ///
    /// ```ignore
    /// driver.on_dialog(|dialog| {
    ///     dialog.accept(Some("yes"));
    /// });
    /// ```
    pub fn on_dialog<F>(&self, handler: F)
    where
        F: Fn(Dialog) + Send + Sync + 'static,
    {
        self.inner.dialogs.set(Arc::new(handler));
    }

    /// Removes the dialog handler; later dialogs are dismissed.
    pub fn detach_dialog(&self) {
        self.inner.dialogs.clear();
    }

    /// Message of the most recent dialog.
    #[must_use]
    pub fn dialog_text(&self) -> Option<String> {
        self.inner.dialogs.last_text()
    }

    /// Answers the most recent dialog directly.
    ///
    /// Useful from a handler that defers the decision. Returns `false` if
    /// there is no dialog or it was already settled, in which case nothing
    /// is sent.
    pub fn dialog(&self, accept: bool, text: Option<&str>) -> bool {
        let Some(dialog) = self.inner.dialogs.last_dialog() else {
            debug!("No dialog to answer");
            return false;
        };
        if accept {
            dialog.accept(text)
        } else {
            dialog.dismiss()
        }
    }

    /// Waits for the next dialog to open and returns it.
    ///
    /// The dialog has already been routed to the handler slot when this
    /// returns, so with no handler installed it is dismissed; check
    /// [`Dialog::is_handled`].
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`](crate::Error::Timeout) if none opens in time.
    pub async fn wait_for_dialog(&self, timeout: Duration) -> Result<Dialog> {
        let expected = self.session_id();
        self.inner
            .connection
            .waiter("Page.javascriptDialogOpening", move |e| e.session_id == expected)
            .wait(timeout)
            .await?;

        self.inner
            .dialogs
            .last_dialog()
            .ok_or_else(|| Error::script("dialog event was not routed"))
    }
}

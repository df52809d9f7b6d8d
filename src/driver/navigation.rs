//! Navigation and page-load waiting.

use serde_json::Value;
use tracing::debug;

use crate::browser::wait::poll_true;
use crate::error::{Error, Result};
use crate::protocol::{Command, PageCommand, get_path, get_path_str};

use super::Driver;

// ============================================================================
// Driver - Navigation
// ============================================================================

impl Driver {
    /// Navigates the page and waits per the configured
    /// [`PageLoadStrategy`](super::PageLoadStrategy).
    ///
    /// `data:` and `about:` URLs return as soon as the browser accepts
    /// them. The current frame is reset to the main frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Navigation`] if the browser reports a navigation error
    /// - [`Error::Timeout`] if the page does not load in time
    pub async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");
        {
            let mut frames = self.inner.frames.lock();
            frames.set_current(None);
            frames.begin_navigation();
        }

        let reply = self
            .execute(Command::Page(PageCommand::Navigate {
                url: url.to_string(),
            }))
            .await?;

        if let Some(error) = get_path_str(&reply, "errorText")
            && !error.is_empty()
        {
            return Err(Error::navigation(url, error));
        }

        if is_immediate(url) {
            return Ok(());
        }
        self.wait_for_page_load().await
    }

    /// Replaces the page with `html`, loaded through a `data:` URL.
    pub async fn set_content(&self, html: &str) -> Result<()> {
        let url = format!("data:text/html;charset=utf-8,{}", urlencoding::encode(html));
        self.goto(&url).await
    }

    /// Reloads the page.
    pub async fn refresh(&self) -> Result<()> {
        self.reload_with(None).await
    }

    /// Reloads the page bypassing the cache.
    pub async fn reload(&self) -> Result<()> {
        self.reload_with(Some(true)).await
    }

    async fn reload_with(&self, ignore_cache: Option<bool>) -> Result<()> {
        self.inner.frames.lock().begin_navigation();
        self.execute(Command::Page(PageCommand::Reload { ignore_cache }))
            .await?;
        self.wait_for_page_load().await
    }

    /// Goes one entry back in history; a no-op at the first entry.
    pub async fn back(&self) -> Result<()> {
        self.history_step(-1).await
    }

    /// Goes one entry forward in history; a no-op at the last entry.
    pub async fn forward(&self) -> Result<()> {
        self.history_step(1).await
    }

    async fn history_step(&self, delta: i64) -> Result<()> {
        let history = self
            .execute(Command::Page(PageCommand::GetNavigationHistory))
            .await?;
        let current = get_path(&history, "currentIndex")
            .and_then(Value::as_i64)
            .unwrap_or_default();

        let Some(entry_id) = usize::try_from(current + delta)
            .ok()
            .and_then(|i| get_path(&history, &format!("entries.{i}.id")))
            .and_then(Value::as_i64)
        else {
            debug!(current, delta, "No history entry to move to");
            return Ok(());
        };

        self.inner.frames.lock().begin_navigation();
        self.execute(Command::Page(PageCommand::NavigateToHistoryEntry { entry_id }))
            .await?;
        self.wait_for_page_load().await
    }

    /// Current URL of the page.
    pub async fn url(&self) -> Result<String> {
        self.script_string("location.href").await
    }

    /// Document title.
    pub async fn title(&self) -> Result<String> {
        self.script_string("document.title").await
    }

    /// Waits until the configured page-load strategy is satisfied.
    ///
    /// Load events are checked first; `document.readyState` covers pages
    /// whose events fired before the wait started.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] after `options.timeout`.
    pub async fn wait_for_page_load(&self) -> Result<()> {
        let strategy = self.inner.options.page_load_strategy;
        poll_true(
            "page load",
            self.inner.options.timeout,
            self.inner.options.poll_interval,
            move || async move {
                let state = self.inner.frames.lock().load_state();
                if strategy.is_satisfied(&state, "") {
                    return Ok(true);
                }
                let ready = self.script("document.readyState").await?;
                Ok(strategy.is_satisfied(&state, ready.as_str().unwrap_or_default()))
            },
        )
        .await
    }

    pub(crate) async fn script_string(&self, expression: &str) -> Result<String> {
        Ok(super::elements::as_string(self.script(expression).await?))
    }
}

/// URLs that load synchronously and fire no useful lifecycle events.
fn is_immediate(url: &str) -> bool {
    url.starts_with("data:") || url.starts_with("about:")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_immediate() {
        assert!(is_immediate("about:blank"));
        assert!(is_immediate("data:text/html,<p>hi</p>"));
        assert!(!is_immediate("https://example.com"));
    }
}

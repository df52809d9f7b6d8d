//! Browser window and tab management.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::protocol::{
    BrowserCommand, Command, PageCommand, RawCommand, TargetCommand, get_path, get_path_str,
};

use super::Driver;

// ============================================================================
// Bounds
// ============================================================================

/// Outer window geometry in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    /// Left edge.
    #[serde(default)]
    pub left: i64,
    /// Top edge.
    #[serde(default)]
    pub top: i64,
    /// Width.
    #[serde(default)]
    pub width: i64,
    /// Height.
    #[serde(default)]
    pub height: i64,
}

// ============================================================================
// Driver - Window
// ============================================================================

impl Driver {
    /// Maximizes the window.
    pub async fn maximize(&self) -> Result<()> {
        self.set_window_state("maximized").await
    }

    /// Minimizes the window.
    pub async fn minimize(&self) -> Result<()> {
        self.set_window_state("minimized").await
    }

    /// Makes the window fullscreen.
    pub async fn fullscreen(&self) -> Result<()> {
        self.set_window_state("fullscreen").await
    }

    /// Current window bounds.
    pub async fn dimensions(&self) -> Result<WindowBounds> {
        let window_id = self.window_id().await?;
        let reply = self
            .execute(Command::Browser(BrowserCommand::GetWindowBounds { window_id }))
            .await?;
        let bounds = get_path(&reply, "bounds").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(bounds)?)
    }

    /// Moves and resizes the window, restoring it first if maximized.
    pub async fn set_dimensions(&self, bounds: WindowBounds) -> Result<()> {
        if bounds.width <= 0 || bounds.height <= 0 {
            return Err(Error::invalid_argument(format!(
                "window size must be positive, got {}x{}",
                bounds.width, bounds.height
            )));
        }

        let window_id = self.window_id().await?;
        self.set_window_bounds(window_id, json!({ "windowState": "normal" }))
            .await?;
        self.set_window_bounds(window_id, serde_json::to_value(bounds)?)
            .await?;
        debug!(?bounds, "Resized window");
        Ok(())
    }

    /// Brings the page to the front.
    pub async fn activate(&self) -> Result<()> {
        self.execute(Command::Page(PageCommand::BringToFront))
            .await?;
        Ok(())
    }

    async fn window_id(&self) -> Result<i64> {
        let reply = self
            .execute(Command::Browser(BrowserCommand::GetWindowForTarget))
            .await?;
        get_path(&reply, "windowId")
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::script("getWindowForTarget reply has no windowId"))
    }

    async fn set_window_state(&self, state: &str) -> Result<()> {
        let window_id = self.window_id().await?;
        self.set_window_bounds(window_id, json!({ "windowState": state }))
            .await?;
        debug!(state, "Set window state");
        Ok(())
    }

    async fn set_window_bounds(&self, window_id: i64, bounds: Value) -> Result<()> {
        self.execute(Command::Browser(BrowserCommand::SetWindowBounds {
            window_id,
            bounds,
        }))
        .await?;
        Ok(())
    }
}

// ============================================================================
// Driver - Tabs
// ============================================================================

impl Driver {
    /// Opens a new tab at `url` and switches to it.
    pub async fn new_page(&self, url: &str) -> Result<TargetId> {
        let reply = self
            .inner
            .connection
            .execute(
                None,
                Command::Raw(RawCommand::new("Target.createTarget", json!({ "url": url }))),
            )
            .await?;
        let target_id = get_path_str(&reply, "targetId")
            .map(TargetId::new)
            .ok_or_else(|| Error::page_not_found(url))?;

        self.attach(target_id.clone()).await?;
        self.enable_domains().await?;
        info!(%target_id, url, "Opened page");
        Ok(target_id)
    }

    /// Closes the current tab and switches to the first remaining one.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if no page is left to switch to.
    pub async fn close_page(&self) -> Result<()> {
        let Some(target_id) = self.target_id() else {
            return Err(Error::invalid_argument(
                "connected to a single page endpoint; nothing else to switch to",
            ));
        };

        self.inner
            .connection
            .execute(
                None,
                Command::Target(TargetCommand::CloseTarget {
                    target_id: target_id.clone(),
                }),
            )
            .await?;
        info!(%target_id, "Closed page");

        let next = self.first_page_target().await?;
        self.attach(next).await?;
        self.enable_domains().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_wire_format() {
        let bounds = WindowBounds {
            left: 10,
            top: 20,
            width: 800,
            height: 600,
        };
        assert_eq!(
            serde_json::to_value(bounds).expect("serialize"),
            json!({"left": 10, "top": 20, "width": 800, "height": 600})
        );

        let parsed: WindowBounds =
            serde_json::from_value(json!({"left": 0, "top": 0, "width": 1280, "height": 720, "windowState": "normal"}))
                .expect("deserialize");
        assert_eq!(parsed.width, 1280);
    }
}

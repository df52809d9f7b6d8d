//! Keyboard and mouse handles bound to the active page.

use crate::browser::{Keys, Mouse, PageInput};
use crate::error::Result;

use super::Driver;

// ============================================================================
// Driver - Input
// ============================================================================

impl Driver {
    /// A keyboard for the active page.
    ///
    /// The handle keeps its own held-modifier state. Events go out on
    /// [`Keys::perform`], each one awaited.
    ///
    /// ```ignore
    /// driver.focus("#search").await?;
    /// driver.keys().type_text("rust").press("Enter").perform().await?;
    /// ```
    #[must_use]
    pub fn keys(&self) -> Keys {
        Keys::new(PageInput::new(self.inner.connection.clone(), self.session_id()))
    }

    /// A mouse cursor at the top-left corner of the viewport.
    ///
    /// Mouse events are posted without awaiting replies.
    #[must_use]
    pub fn mouse(&self) -> Mouse {
        self.mouse_at(0.0, 0.0)
    }

    /// A mouse cursor at viewport coordinates.
    #[must_use]
    pub fn mouse_at(&self, x: f64, y: f64) -> Mouse {
        Mouse::new(
            PageInput::new(self.inner.connection.clone(), self.session_id()),
            x,
            y,
        )
    }

    /// A mouse cursor at the centre of an element.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`](crate::Error::ElementNotFound) if the
    /// element never appears.
    pub async fn mouse_on(&self, locator: &str) -> Result<Mouse> {
        let (x, y) = self.position_relative(locator).await?.center();
        Ok(self.mouse_at(x, y))
    }
}

//! Located elements.
//!
//! An [`Element`] is a locator plus a borrowed driver. Nothing is held in
//! the browser: every operation re-resolves the locator against the
//! current frame, so an element survives re-renders of its node.
//!
//! # Example
//!
//! ```ignore
//! let email = driver.locate("input[name=email]").await?;
//! email.clear().await?;
//! email.input("user@example.com").await?;
//!
//! for row in driver.locate_all("table tr").await? {
//!     println!("{}", row.text().await?);
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::driver::{Driver, ScreenshotBuilder};
use crate::error::{Error, Result};
use crate::locator::{DOCUMENT, Locator, js};

use super::finder::Rect;
use super::mouse::Mouse;
use super::wait::RetryPolicy;

// ============================================================================
// Element
// ============================================================================

/// A located element.
///
/// `exists` records whether the locator matched when the element was
/// created. Operations on a missing element fail with
/// [`Error::ElementNotFound`].
#[derive(Clone)]
pub struct Element<'d> {
    driver: &'d Driver,
    locator: String,
    exists: bool,
    retry: Option<RetryPolicy>,
}

// ============================================================================
// Element - Display
// ============================================================================

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("locator", &self.locator)
            .field("exists", &self.exists)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Element - Constructor
// ============================================================================

impl<'d> Element<'d> {
    pub(crate) fn new(driver: &'d Driver, locator: &str, exists: bool) -> Self {
        Self {
            driver,
            locator: locator.to_string(),
            exists,
            retry: None,
        }
    }

    /// The locator this element re-resolves.
    #[inline]
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Whether the locator matched when the element was created.
    #[inline]
    #[must_use]
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The driver this element belongs to.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &'d Driver {
        self.driver
    }

    /// Re-attempts actions under `policy` before giving up.
    ///
    /// This is separate from the existence wait every action performs.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Compiled single-element expression.
    pub(crate) fn selector(&self) -> Result<String> {
        Ok(Locator::parse(&self.locator)?.selector(DOCUMENT))
    }

    fn present(&self) -> Result<()> {
        if self.exists {
            Ok(())
        } else {
            Err(Error::element_not_found(&self.locator))
        }
    }

    async fn act<T, F, Fut>(&self, operation: &str, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.present()?;
        match self.retry {
            Some(policy) => policy.run(operation, action).await,
            None => action().await,
        }
    }
}

// ============================================================================
// Element - Actions
// ============================================================================

impl Element<'_> {
    /// Clicks the element.
    pub async fn click(&self) -> Result<()> {
        self.act("click", || self.driver.click(&self.locator)).await
    }

    /// Focuses the element.
    pub async fn focus(&self) -> Result<()> {
        self.act("focus", || self.driver.focus(&self.locator)).await
    }

    /// Empties the form control.
    pub async fn clear(&self) -> Result<()> {
        self.act("clear", || self.driver.clear(&self.locator)).await
    }

    /// Types `text` into the element.
    pub async fn input(&self, text: &str) -> Result<()> {
        self.act("input", || self.driver.input(&self.locator, text))
            .await
    }

    /// Sets the value directly.
    pub async fn set_value(&self, value: &str) -> Result<()> {
        self.act("set value", || self.driver.set_value(&self.locator, value))
            .await
    }

    /// Selects an option by value or text.
    pub async fn select(&self, text: &str) -> Result<()> {
        self.act("select", || self.driver.select(&self.locator, text))
            .await
    }

    /// Selects an option by 0-based index.
    pub async fn select_index(&self, index: usize) -> Result<()> {
        self.act("select", || self.driver.select_index(&self.locator, index))
            .await
    }

    /// Scrolls the element into view.
    pub async fn scroll(&self) -> Result<()> {
        self.act("scroll", || self.driver.scroll(&self.locator)).await
    }

    /// Outlines the element briefly.
    pub async fn highlight(&self) -> Result<()> {
        self.act("highlight", || self.driver.highlight(&self.locator))
            .await
    }

    /// A mouse positioned at the element's centre.
    pub async fn mouse(&self) -> Result<Mouse> {
        self.present()?;
        self.driver.mouse_on(&self.locator).await
    }
}

// ============================================================================
// Element - Queries
// ============================================================================

impl Element<'_> {
    /// `textContent`.
    pub async fn text(&self) -> Result<String> {
        self.present()?;
        self.driver.text(&self.locator).await
    }

    /// `outerHTML`.
    pub async fn html(&self) -> Result<String> {
        self.present()?;
        self.driver.html(&self.locator).await
    }

    /// `innerHTML`.
    pub async fn inner_html(&self) -> Result<String> {
        self.present()?;
        self.driver.inner_html(&self.locator).await
    }

    /// Form control value.
    pub async fn value(&self) -> Result<String> {
        self.present()?;
        self.driver.value(&self.locator).await
    }

    /// An attribute, `None` if absent.
    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.present()?;
        self.driver.attribute(&self.locator, name).await
    }

    /// A DOM property.
    pub async fn property(&self, name: &str) -> Result<Value> {
        self.present()?;
        self.driver.property(&self.locator, name).await
    }

    /// All attributes.
    pub async fn attributes(&self) -> Result<HashMap<String, String>> {
        self.present()?;
        self.driver.attributes(&self.locator).await
    }

    /// `true` unless disabled.
    pub async fn enabled(&self) -> Result<bool> {
        self.present()?;
        self.driver.enabled(&self.locator).await
    }

    /// Bounding box in page coordinates.
    pub async fn position(&self) -> Result<Rect> {
        self.present()?;
        self.driver.position(&self.locator).await
    }

    /// Bounding box relative to the viewport.
    pub async fn position_relative(&self) -> Result<Rect> {
        self.present()?;
        self.driver.position_relative(&self.locator).await
    }

    /// Applies a function, or `_` shorthand, to the element.
    pub async fn script(&self, expression: &str) -> Result<Value> {
        self.present()?;
        self.driver.script_on(&self.locator, expression).await
    }

    /// Applies a function to every descendant matching `locator`.
    pub async fn script_all(&self, locator: &str, expression: &str) -> Result<Vec<Value>> {
        self.present()?;
        let all = Locator::parse(locator)?.selector_all(&self.selector()?);
        match self.driver.script(&js::script_all(&all, expression)).await? {
            Value::Array(values) => Ok(values),
            _ => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// Element - Relatives
// ============================================================================

impl<'d> Element<'d> {
    /// First descendant matching `locator`.
    pub async fn locate(&self, locator: &str) -> Result<Element<'d>> {
        self.present()?;
        let child = Locator::parse(locator)?.selector(&self.selector()?);
        self.driver.locate(&format!("({child})")).await
    }

    /// Every descendant matching `locator`.
    pub async fn locate_all(&self, locator: &str) -> Result<Vec<Element<'d>>> {
        self.present()?;
        let all = Locator::parse(locator)?.selector_all(&self.selector()?);
        self.driver.elements_at(&all).await
    }

    /// Parent element.
    pub async fn parent(&self) -> Result<Element<'d>> {
        self.relative(js::parent).await
    }

    /// Child elements.
    pub async fn children(&self) -> Result<Vec<Element<'d>>> {
        self.present()?;
        self.driver.elements_at(&js::children(&self.selector()?)).await
    }

    /// First child element.
    pub async fn first_child(&self) -> Result<Element<'d>> {
        self.relative(js::first_child).await
    }

    /// Last child element.
    pub async fn last_child(&self) -> Result<Element<'d>> {
        self.relative(js::last_child).await
    }

    /// Next sibling element.
    pub async fn next_sibling(&self) -> Result<Element<'d>> {
        self.relative(js::next_sibling).await
    }

    /// Previous sibling element.
    pub async fn previous_sibling(&self) -> Result<Element<'d>> {
        self.relative(js::previous_sibling).await
    }

    async fn relative(&self, expr: fn(&str) -> String) -> Result<Element<'d>> {
        self.present()?;
        self.driver
            .locate(&format!("({})", expr(&self.selector()?)))
            .await
    }
}

// ============================================================================
// Element - Waits
// ============================================================================

impl<'d> Element<'d> {
    /// Waits until the element exists.
    pub async fn wait_for(&self) -> Result<Element<'d>> {
        self.driver.wait_for(&self.locator).await
    }

    /// Waits until the element exists, with an explicit timeout.
    pub async fn wait_for_timeout(&self, timeout: Duration) -> Result<Element<'d>> {
        self.driver.wait_for_timeout(&self.locator, timeout).await
    }

    /// Waits until `expression` holds for the element, e.g. `_.value != ''`.
    pub async fn wait_until(&self, expression: &str) -> Result<Element<'d>> {
        self.driver.wait_until(&self.locator, expression).await
    }

    /// Waits until the element's text contains `text`.
    pub async fn wait_for_text(&self, text: &str) -> Result<Element<'d>> {
        self.driver.wait_for_text(&self.locator, text).await
    }

    /// Waits until the element is enabled.
    pub async fn wait_for_enabled(&self) -> Result<Element<'d>> {
        self.driver.wait_for_enabled(&self.locator).await
    }
}

// ============================================================================
// Element - Screenshot
// ============================================================================

impl<'d> Element<'d> {
    /// Screenshot builder clipped to the element.
    ///
    /// ```ignore
    /// let png = driver.locate("#chart").await?.screenshot().await?.capture().await?;
    /// ```
    pub async fn screenshot(&self) -> Result<ScreenshotBuilder<'d>> {
        let rect = self.position().await?;
        Ok(self.driver.screenshot().clip(rect))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_is_debug_and_clone() {
        fn assert_bounds<T: fmt::Debug + Clone>() {}
        assert_bounds::<Element<'static>>();
    }
}

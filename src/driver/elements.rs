//! Element lookup, actions and queries by locator string.
//!
//! Every action first waits for the element with the driver's existence
//! retry policy, then runs a snippet against the current frame.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use crate::browser::{Element, Finder, Position, Rect};
use crate::error::{Error, Result};
use crate::locator::{DOCUMENT, Locator, js};

use super::Driver;

// ============================================================================
// Driver - Lookup
// ============================================================================

impl Driver {
    /// Returns `true` if the locator matches right now.
    pub async fn exists(&self, locator: &str) -> Result<bool> {
        let sel = Locator::parse(locator)?.selector(DOCUMENT);
        Ok(self.script(&js::exists(&sel)).await?.as_bool().unwrap_or(false))
    }

    /// Looks an element up once.
    ///
    /// Never fails because nothing matched; the returned element records
    /// whether it existed and fails its operations if not.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for an empty locator, or transport errors.
    pub async fn locate(&self, locator: &str) -> Result<Element<'_>> {
        let exists = self.exists(locator).await?;
        trace!(locator, exists, "Located");
        Ok(Element::new(self, locator, exists))
    }

    /// Same as [`locate`](Driver::locate); reads better when absence is
    /// expected.
    pub async fn optional(&self, locator: &str) -> Result<Element<'_>> {
        self.locate(locator).await
    }

    /// Every match, in document order.
    ///
    /// Each element addresses its index within the all-matches query.
    pub async fn locate_all(&self, locator: &str) -> Result<Vec<Element<'_>>> {
        let all = Locator::parse(locator)?.selector_all(DOCUMENT);
        self.elements_at(&all).await
    }

    /// Elements of an array expression, addressed by index.
    pub(crate) async fn elements_at(&self, all: &str) -> Result<Vec<Element<'_>>> {
        let count = self.script(&js::count(all)).await?.as_u64().unwrap_or(0);
        Ok((0..count)
            .map(|i| Element::new(self, &format!("({all})[{i}]"), true))
            .collect())
    }

    /// Waits for `locator` with the existence retry policy and returns its
    /// compiled selector.
    ///
    /// # Errors
    ///
    /// [`Error::ElementNotFound`] once the retries are used up.
    pub(crate) async fn wait_for_locator(&self, locator: &str) -> Result<String> {
        let sel = Locator::parse(locator)?.selector(DOCUMENT);
        self.retry_policy()
            .run("element", || async {
                if self.script(&js::exists(&sel)).await?.as_bool().unwrap_or(false) {
                    Ok(())
                } else {
                    Err(Error::element_not_found(locator))
                }
            })
            .await?;

        if self.inner.options.highlight {
            let millis = self.inner.options.highlight_duration.as_millis() as u64;
            if let Err(e) = self.script(&js::highlight(&sel, millis)).await {
                debug!(locator, error = %e, "Highlight failed");
            }
        }
        Ok(sel)
    }

    async fn run_on(&self, locator: &str, snippet: impl FnOnce(&str) -> String) -> Result<Value> {
        let sel = self.wait_for_locator(locator).await?;
        self.script(&snippet(&sel)).await
    }
}

// ============================================================================
// Driver - Actions
// ============================================================================

impl Driver {
    /// Clicks the element.
    pub async fn click(&self, locator: &str) -> Result<()> {
        self.run_on(locator, js::click).await.map(drop)
    }

    /// Focuses the element.
    pub async fn focus(&self, locator: &str) -> Result<()> {
        self.run_on(locator, js::focus).await.map(drop)
    }

    /// Empties a form control.
    pub async fn clear(&self, locator: &str) -> Result<()> {
        self.run_on(locator, js::clear).await.map(drop)
    }

    /// Focuses and empties the element, then types `text` as key events.
    ///
    /// Returns once the browser acknowledged every key event.
    pub async fn input(&self, locator: &str, text: &str) -> Result<()> {
        self.focus(locator).await?;
        self.clear(locator).await?;
        self.keys().type_text(text).perform().await
    }

    /// Sets a form control's value directly and fires `input`/`change`.
    pub async fn set_value(&self, locator: &str, value: &str) -> Result<()> {
        self.run_on(locator, |sel| js::input(sel, value)).await.map(drop)
    }

    /// Selects an option by value or text.
    ///
    /// `{}text` matches the option text exactly and `{^}text` by substring.
    pub async fn select(&self, locator: &str, text: &str) -> Result<()> {
        self.run_on(locator, |sel| js::select_option(sel, text))
            .await
            .map(drop)
    }

    /// Selects an option by 0-based index.
    pub async fn select_index(&self, locator: &str, index: usize) -> Result<()> {
        self.run_on(locator, |sel| js::select_index(sel, index))
            .await
            .map(drop)
    }

    /// Scrolls the element into view.
    pub async fn scroll(&self, locator: &str) -> Result<()> {
        self.run_on(locator, js::scroll).await.map(drop)
    }

    /// Outlines the element for the configured highlight duration.
    pub async fn highlight(&self, locator: &str) -> Result<()> {
        let millis = self.inner.options.highlight_duration.as_millis() as u64;
        self.run_on(locator, |sel| js::highlight(sel, millis))
            .await
            .map(drop)
    }

    /// Outlines every match.
    pub async fn highlight_all(&self, locator: &str) -> Result<()> {
        let millis = self.inner.options.highlight_duration.as_millis() as u64;
        for element in self.locate_all(locator).await? {
            self.script(&js::highlight(&element.selector()?, millis))
                .await?;
        }
        Ok(())
    }
}

// ============================================================================
// Driver - Queries
// ============================================================================

impl Driver {
    /// `textContent` of the element.
    pub async fn text(&self, locator: &str) -> Result<String> {
        Ok(as_string(self.run_on(locator, js::text).await?))
    }

    /// `outerHTML` of the element.
    pub async fn html(&self, locator: &str) -> Result<String> {
        Ok(as_string(self.run_on(locator, js::outer_html).await?))
    }

    /// `innerHTML` of the element.
    pub async fn inner_html(&self, locator: &str) -> Result<String> {
        Ok(as_string(self.run_on(locator, js::inner_html).await?))
    }

    /// Form control value.
    pub async fn value(&self, locator: &str) -> Result<String> {
        Ok(as_string(self.run_on(locator, js::value).await?))
    }

    /// An attribute, `None` if absent.
    pub async fn attribute(&self, locator: &str, name: &str) -> Result<Option<String>> {
        Ok(match self.run_on(locator, |sel| js::attribute(sel, name)).await? {
            Value::Null => None,
            other => Some(as_string(other)),
        })
    }

    /// A DOM property as JSON.
    pub async fn property(&self, locator: &str, name: &str) -> Result<Value> {
        self.run_on(locator, |sel| js::property(sel, name)).await
    }

    /// All attributes.
    pub async fn attributes(&self, locator: &str) -> Result<HashMap<String, String>> {
        let value = self.run_on(locator, js::attributes).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `true` unless the element is disabled.
    pub async fn enabled(&self, locator: &str) -> Result<bool> {
        Ok(self.run_on(locator, js::enabled).await?.as_bool().unwrap_or(false))
    }

    /// Bounding box in page coordinates.
    pub async fn position(&self, locator: &str) -> Result<Rect> {
        self.rect(locator, false).await
    }

    /// Bounding box relative to the viewport.
    pub async fn position_relative(&self, locator: &str) -> Result<Rect> {
        self.rect(locator, true).await
    }

    async fn rect(&self, locator: &str, relative: bool) -> Result<Rect> {
        let value = self.run_on(locator, |sel| js::position(sel, relative)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `textContent` of every match.
    pub async fn text_all(&self, locator: &str) -> Result<Vec<String>> {
        let values = self.script_all(locator, "_.textContent").await?;
        Ok(values.into_iter().map(as_string).collect())
    }
}

// ============================================================================
// Driver - Positional
// ============================================================================

impl Driver {
    /// Finds elements to the right of `reference`.
    #[must_use]
    pub fn right_of(&self, reference: &str) -> Finder<'_> {
        Finder::new(self, reference, Position::RightOf)
    }

    /// Finds elements to the left of `reference`.
    #[must_use]
    pub fn left_of(&self, reference: &str) -> Finder<'_> {
        Finder::new(self, reference, Position::LeftOf)
    }

    /// Finds elements above `reference`.
    #[must_use]
    pub fn above(&self, reference: &str) -> Finder<'_> {
        Finder::new(self, reference, Position::Above)
    }

    /// Finds elements below `reference`.
    #[must_use]
    pub fn below(&self, reference: &str) -> Finder<'_> {
        Finder::new(self, reference, Position::Below)
    }

    /// Finds elements whose centre is near that of `reference`.
    #[must_use]
    pub fn near(&self, reference: &str) -> Finder<'_> {
        Finder::new(self, reference, Position::Near)
    }
}

pub(crate) fn as_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
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
    fn test_as_string() {
        assert_eq!(as_string(json!("abc")), "abc");
        assert_eq!(as_string(Value::Null), "");
        assert_eq!(as_string(json!(9.5)), "9.5");
    }
}

//! Waits: poll a predicate at `retry_interval` until it holds or the
//! timeout elapses.
//!
//! Every wait has a `_timeout` twin taking an explicit limit; the plain
//! form uses `options.timeout`. Timeouts fail with [`Error::Timeout`]
//! naming the locator or expression.
//!
//! [`Error::Timeout`]: crate::Error::Timeout

use std::time::Duration;

use serde_json::Value;

use crate::browser::Element;
use crate::browser::wait::poll_until;
use crate::error::Result;
use crate::locator::{DOCUMENT, Locator, js};

use super::Driver;
use super::elements::as_string;

// ============================================================================
// Driver - Element Waits
// ============================================================================

impl Driver {
    /// Waits until `locator` matches.
    pub async fn wait_for(&self, locator: &str) -> Result<Element<'_>> {
        self.wait_for_timeout(locator, self.inner.options.timeout).await
    }

    /// Waits until `locator` matches, with an explicit timeout.
    pub async fn wait_for_timeout(&self, locator: &str, timeout: Duration) -> Result<Element<'_>> {
        let sel = Locator::parse(locator)?.selector(DOCUMENT);
        let probe = js::exists(&sel);
        self.poll(&format!("wait for {locator}"), timeout, || async {
            Ok(truthy(&self.script(&probe).await?).then_some(()))
        })
        .await?;
        Ok(Element::new(self, locator, true))
    }

    /// Waits until any of `locators` matches and returns the first that
    /// does, in argument order.
    pub async fn wait_for_any(&self, locators: &[&str]) -> Result<Element<'_>> {
        self.wait_for_any_timeout(locators, self.inner.options.timeout)
            .await
    }

    /// [`wait_for_any`](Driver::wait_for_any) with an explicit timeout.
    pub async fn wait_for_any_timeout(
        &self,
        locators: &[&str],
        timeout: Duration,
    ) -> Result<Element<'_>> {
        let mut probes = Vec::with_capacity(locators.len());
        for locator in locators {
            probes.push((*locator, js::exists(&Locator::parse(locator)?.selector(DOCUMENT))));
        }

        let found = self
            .poll(&format!("wait for any of {locators:?}"), timeout, || async {
                for (locator, probe) in &probes {
                    if truthy(&self.script(probe).await?) {
                        return Ok(Some(*locator));
                    }
                }
                Ok(None)
            })
            .await?;
        Ok(Element::new(self, found, true))
    }

    /// Waits until the element's text contains `text`.
    pub async fn wait_for_text(&self, locator: &str, text: &str) -> Result<Element<'_>> {
        self.wait_for_text_timeout(locator, text, self.inner.options.timeout)
            .await
    }

    /// [`wait_for_text`](Driver::wait_for_text) with an explicit timeout.
    pub async fn wait_for_text_timeout(
        &self,
        locator: &str,
        text: &str,
        timeout: Duration,
    ) -> Result<Element<'_>> {
        let probe = js::text(&Locator::parse(locator)?.selector(DOCUMENT));
        self.poll(&format!("wait for text {text:?} in {locator}"), timeout, || async {
            Ok(match self.script(&probe).await? {
                Value::Null => None,
                value => as_string(value).contains(text).then_some(()),
            })
        })
        .await?;
        Ok(Element::new(self, locator, true))
    }

    /// Waits until the element exists and is not disabled.
    pub async fn wait_for_enabled(&self, locator: &str) -> Result<Element<'_>> {
        self.wait_for_enabled_timeout(locator, self.inner.options.timeout)
            .await
    }

    /// [`wait_for_enabled`](Driver::wait_for_enabled) with an explicit
    /// timeout.
    pub async fn wait_for_enabled_timeout(
        &self,
        locator: &str,
        timeout: Duration,
    ) -> Result<Element<'_>> {
        let probe = js::enabled(&Locator::parse(locator)?.selector(DOCUMENT));
        self.poll(&format!("wait for enabled {locator}"), timeout, || async {
            Ok(truthy(&self.script(&probe).await?).then_some(()))
        })
        .await?;
        Ok(Element::new(self, locator, true))
    }

    /// Waits until `expression` is truthy for the element; `_` is bound to
    /// it, e.g. `_.value.length > 3`.
    pub async fn wait_until(&self, locator: &str, expression: &str) -> Result<Element<'_>> {
        self.wait_until_timeout(locator, expression, self.inner.options.timeout)
            .await
    }

    /// [`wait_until`](Driver::wait_until) with an explicit timeout.
    pub async fn wait_until_timeout(
        &self,
        locator: &str,
        expression: &str,
        timeout: Duration,
    ) -> Result<Element<'_>> {
        let probe = js::script_on(&Locator::parse(locator)?.selector(DOCUMENT), expression);
        self.poll(&format!("wait until {expression} on {locator}"), timeout, || async {
            Ok(truthy(&self.script(&probe).await?).then_some(()))
        })
        .await?;
        Ok(Element::new(self, locator, true))
    }

    /// Waits until exactly `count` elements match and returns them.
    pub async fn wait_for_result_count(&self, locator: &str, count: usize) -> Result<Vec<Element<'_>>> {
        self.wait_for_result_count_timeout(locator, count, self.inner.options.timeout)
            .await
    }

    /// [`wait_for_result_count`](Driver::wait_for_result_count) with an
    /// explicit timeout.
    pub async fn wait_for_result_count_timeout(
        &self,
        locator: &str,
        count: usize,
        timeout: Duration,
    ) -> Result<Vec<Element<'_>>> {
        let all = Locator::parse(locator)?.selector_all(DOCUMENT);
        let probe = js::count(&all);
        self.poll(&format!("wait for {count} x {locator}"), timeout, || async {
            let found = self.script(&probe).await?.as_u64().unwrap_or(0);
            Ok((found == count as u64).then_some(()))
        })
        .await?;
        self.elements_at(&all).await
    }
}

// ============================================================================
// Driver - Page Waits
// ============================================================================

impl Driver {
    /// Waits until the URL contains `fragment` and returns it.
    pub async fn wait_for_url(&self, fragment: &str) -> Result<String> {
        self.wait_for_url_timeout(fragment, self.inner.options.timeout)
            .await
    }

    /// [`wait_for_url`](Driver::wait_for_url) with an explicit timeout.
    pub async fn wait_for_url_timeout(&self, fragment: &str, timeout: Duration) -> Result<String> {
        self.poll(&format!("wait for url {fragment}"), timeout, || async {
            let url = self.url().await?;
            Ok(url.contains(fragment).then_some(url))
        })
        .await
    }

    /// Waits until a page expression is truthy and returns its value.
    pub async fn wait_until_script(&self, expression: &str) -> Result<Value> {
        self.wait_until_script_timeout(expression, self.inner.options.timeout)
            .await
    }

    /// [`wait_until_script`](Driver::wait_until_script) with an explicit
    /// timeout.
    pub async fn wait_until_script_timeout(&self, expression: &str, timeout: Duration) -> Result<Value> {
        self.poll(&format!("wait until {expression}"), timeout, || async {
            let value = self.script(expression).await?;
            Ok(truthy(&value).then_some(value))
        })
        .await
    }

    /// Polls an async closure until it yields `Some`.
    ///
    /// ```ignore
    /// let rows = driver
    ///     .wait_until_fn(|| async {
    ///         let n = driver.locate_all("tr").await?.len();
    ///         Ok((n > 10).then_some(n))
    ///     })
    ///     .await?;
    /// ```
    pub async fn wait_until_fn<T, F, Fut>(&self, probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.wait_until_fn_timeout(self.inner.options.timeout, probe)
            .await
    }

    /// [`wait_until_fn`](Driver::wait_until_fn) with an explicit timeout.
    pub async fn wait_until_fn_timeout<T, F, Fut>(&self, timeout: Duration, probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        self.poll("wait until function", timeout, probe).await
    }

    async fn poll<T, F, Fut>(&self, operation: &str, timeout: Duration, probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        poll_until(operation, timeout, self.inner.options.retry_interval, probe).await
    }
}

/// JavaScript truthiness of a JSON value.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
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
    fn test_truthy() {
        assert!(!truthy(&Value::Null));
        assert!(!truthy(&json!(false)));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(truthy(&json!(true)));
        assert!(truthy(&json!(-1.5)));
        assert!(truthy(&json!("0")));
        assert!(truthy(&json!([])));
        assert!(truthy(&json!({})));
    }
}

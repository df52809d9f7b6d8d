//! Name-table boundary for script engines.
//!
//! An embedded interpreter sees the driver as an object whose members are
//! looked up by name. [`DriverObject`] maps each name to a typed driver call
//! through a fixed table, converting JSON arguments in and JSON results out.
//! Nothing inside the crate dispatches by name.
//!
//! ```ignore
//! let object = DriverObject::new(driver.clone());
//! object.call("input", &[json!("#q"), json!("rust")]).await?;
//! let heading = object.call("text", &[json!("h1")]).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use tracing::trace;

use crate::browser::Element;
use crate::error::{Error, Result};
use crate::protocol::Cookie;

use super::Driver;
use super::frames::FrameSelector;

// ============================================================================
// Method Table
// ============================================================================

/// A driver call taking JSON arguments.
pub type Method = for<'a> fn(&'a Driver, &'a [Value]) -> BoxFuture<'a, Result<Value>>;

macro_rules! method {
    ($name:ident, |$driver:ident, $args:ident| $body:expr) => {
        fn $name<'a>($driver: &'a Driver, $args: &'a [Value]) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move { $body })
        }
    };
}

/// Members visible to scripts, by name.
pub const METHODS: &[(&str, Method)] = &[
    ("attribute", attribute),
    ("back", back),
    ("clear", clear),
    ("clearCookies", clear_cookies),
    ("click", click),
    ("cookie", cookie),
    ("deleteCookie", delete_cookie),
    ("dialog", dialog),
    ("enabled", enabled),
    ("exists", exists),
    ("focus", focus),
    ("forward", forward),
    ("fullscreen", fullscreen),
    ("getPages", get_pages),
    ("highlight", highlight),
    ("html", html),
    ("input", input),
    ("locate", locate),
    ("locateAll", locate_all),
    ("maximize", maximize),
    ("minimize", minimize),
    ("optional", optional),
    ("position", position),
    ("refresh", refresh),
    ("screenshot", screenshot),
    ("script", script),
    ("scriptAll", script_all),
    ("scroll", scroll),
    ("select", select),
    ("setUrl", set_url),
    ("switchFrame", switch_frame),
    ("switchPage", switch_page),
    ("text", text),
    ("title", title),
    ("url", url),
    ("value", value),
    ("waitFor", wait_for),
    ("waitForEnabled", wait_for_enabled),
    ("waitForText", wait_for_text),
    ("waitForUrl", wait_for_url),
    ("waitUntil", wait_until),
];

// ============================================================================
// DriverObject
// ============================================================================

/// A driver exposed to a script engine by member name.
#[derive(Debug, Clone)]
pub struct DriverObject {
    driver: Driver,
}

impl DriverObject {
    /// Wraps a driver.
    #[inline]
    #[must_use]
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// The wrapped driver.
    #[inline]
    #[must_use]
    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Member names, for engine completion and binding.
    pub fn names() -> impl Iterator<Item = &'static str> {
        METHODS.iter().map(|(name, _)| *name)
    }

    /// Returns `true` if `name` is a member.
    #[must_use]
    pub fn has(name: &str) -> bool {
        lookup(name).is_some()
    }

    /// Calls member `name` with `args`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for unknown members or bad arguments
    /// - Any error of the underlying driver call
    pub async fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let method = lookup(name)
            .ok_or_else(|| Error::invalid_argument(format!("unknown driver method: {name}")))?;
        trace!(name, args = args.len(), "Driver object call");
        method(&self.driver, args).await
    }
}

fn lookup(name: &str) -> Option<Method> {
    METHODS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, method)| *method)
}

// ============================================================================
// Argument Helpers
// ============================================================================

fn str_arg<'a>(args: &'a [Value], index: usize) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_argument(format!("argument {index} must be a string")))
}

fn opt_str_arg(args: &[Value], index: usize) -> Option<&str> {
    args.get(index).and_then(Value::as_str)
}

fn index_arg(value: &Value) -> Option<usize> {
    value.as_u64().map(|n| n as usize)
}

fn element_json(element: &Element<'_>) -> Value {
    json!({ "locator": element.locator(), "exists": element.exists() })
}

fn done() -> Result<Value> {
    Ok(Value::Null)
}

// ============================================================================
// Element Actions
// ============================================================================

method!(click, |d, a| {
    d.click(str_arg(a, 0)?).await?;
    done()
});

method!(input, |d, a| {
    d.input(str_arg(a, 0)?, opt_str_arg(a, 1).unwrap_or_default())
        .await?;
    done()
});

method!(clear, |d, a| {
    d.clear(str_arg(a, 0)?).await?;
    done()
});

method!(focus, |d, a| {
    d.focus(str_arg(a, 0)?).await?;
    done()
});

method!(scroll, |d, a| {
    d.scroll(str_arg(a, 0)?).await?;
    done()
});

method!(highlight, |d, a| {
    d.highlight(str_arg(a, 0)?).await?;
    done()
});

method!(select, |d, a| {
    let locator = str_arg(a, 0)?;
    match a.get(1) {
        Some(v) if v.is_number() => {
            let index = index_arg(v)
                .ok_or_else(|| Error::invalid_argument("select index must be non-negative"))?;
            d.select_index(locator, index).await?;
        }
        other => {
            d.select(locator, other.and_then(Value::as_str).unwrap_or_default())
                .await?;
        }
    }
    done()
});

// ============================================================================
// Element State
// ============================================================================

method!(text, |d, a| Ok(Value::String(d.text(str_arg(a, 0)?).await?)));

method!(html, |d, a| Ok(Value::String(d.html(str_arg(a, 0)?).await?)));

method!(value, |d, a| {
    let locator = str_arg(a, 0)?;
    match opt_str_arg(a, 1) {
        Some(v) => {
            d.set_value(locator, v).await?;
            done()
        }
        None => Ok(Value::String(d.value(locator).await?)),
    }
});

method!(attribute, |d, a| Ok(serde_json::to_value(
    d.attribute(str_arg(a, 0)?, str_arg(a, 1)?).await?
)?));

method!(exists, |d, a| Ok(Value::Bool(d.exists(str_arg(a, 0)?).await?)));

method!(enabled, |d, a| Ok(Value::Bool(d.enabled(str_arg(a, 0)?).await?)));

method!(position, |d, a| Ok(serde_json::to_value(
    d.position(str_arg(a, 0)?).await?
)?));

// ============================================================================
// Waits
// ============================================================================

method!(wait_for, |d, a| Ok(element_json(&d.wait_for(str_arg(a, 0)?).await?)));

method!(wait_for_text, |d, a| Ok(element_json(
    &d.wait_for_text(str_arg(a, 0)?, str_arg(a, 1)?).await?
)));

method!(wait_for_enabled, |d, a| Ok(element_json(
    &d.wait_for_enabled(str_arg(a, 0)?).await?
)));

method!(wait_for_url, |d, a| Ok(Value::String(d.wait_for_url(str_arg(a, 0)?).await?)));

method!(wait_until, |d, a| match opt_str_arg(a, 1) {
    Some(expression) => Ok(element_json(&d.wait_until(str_arg(a, 0)?, expression).await?)),
    None => d.wait_until_script(str_arg(a, 0)?).await,
});

// ============================================================================
// Locators
// ============================================================================

method!(locate, |d, a| Ok(element_json(&d.locate(str_arg(a, 0)?).await?)));

method!(optional, |d, a| Ok(element_json(&d.optional(str_arg(a, 0)?).await?)));

method!(locate_all, |d, a| {
    let elements = d.locate_all(str_arg(a, 0)?).await?;
    Ok(Value::Array(elements.iter().map(element_json).collect()))
});

// ============================================================================
// Frames and Pages
// ============================================================================

method!(switch_frame, |d, a| {
    let selector = match a.first() {
        None | Some(Value::Null) => FrameSelector::Main,
        Some(v) if v.is_number() => index_arg(v)
            .map(FrameSelector::Index)
            .ok_or_else(|| Error::invalid_argument("frame index must be non-negative"))?,
        Some(_) => FrameSelector::Locator(str_arg(a, 0)?.to_string()),
    };
    d.switch_frame(selector).await?;
    done()
});

method!(switch_page, |d, a| {
    match a.first().and_then(index_arg) {
        Some(index) => d.switch_page_index(index).await?,
        None => d.switch_page(str_arg(a, 0)?).await?,
    }
    done()
});

method!(get_pages, |d, _a| {
    let pages = d.pages().await?;
    Ok(Value::Array(
        pages
            .into_iter()
            .map(|p| json!({ "targetId": p.target_id.as_str(), "title": p.title, "url": p.url }))
            .collect(),
    ))
});

// ============================================================================
// Script
// ============================================================================

method!(script, |d, a| match opt_str_arg(a, 1) {
    Some(expression) => d.script_on(str_arg(a, 0)?, expression).await,
    None => d.script(str_arg(a, 0)?).await,
});

method!(script_all, |d, a| Ok(Value::Array(
    d.script_all(str_arg(a, 0)?, str_arg(a, 1)?).await?
)));

// ============================================================================
// Navigation
// ============================================================================

method!(set_url, |d, a| {
    d.goto(str_arg(a, 0)?).await?;
    done()
});

method!(refresh, |d, _a| {
    d.refresh().await?;
    done()
});

method!(back, |d, _a| {
    d.back().await?;
    done()
});

method!(forward, |d, _a| {
    d.forward().await?;
    done()
});

method!(url, |d, _a| Ok(Value::String(d.url().await?)));

method!(title, |d, _a| Ok(Value::String(d.title().await?)));

// ============================================================================
// Window, Screenshots, Cookies, Dialogs
// ============================================================================

method!(maximize, |d, _a| {
    d.maximize().await?;
    done()
});

method!(minimize, |d, _a| {
    d.minimize().await?;
    done()
});

method!(fullscreen, |d, _a| {
    d.fullscreen().await?;
    done()
});

method!(screenshot, |d, _a| Ok(Value::String(d.screenshot().capture().await?)));

method!(cookie, |d, a| match a.first() {
    Some(Value::Object(_)) => {
        let cookie: Cookie = serde_json::from_value(a[0].clone())?;
        d.set_cookie(cookie).await?;
        done()
    }
    _ => Ok(serde_json::to_value(d.cookie(str_arg(a, 0)?).await?)?),
});

method!(delete_cookie, |d, a| {
    d.delete_cookie(str_arg(a, 0)?).await?;
    done()
});

method!(clear_cookies, |d, _a| {
    d.clear_cookies().await?;
    done()
});

method!(dialog, |d, a| {
    let accept = a.first().and_then(Value::as_bool).unwrap_or(true);
    Ok(Value::Bool(d.dialog(accept, opt_str_arg(a, 1))))
});

// ============================================================================
// Tests
// ============================================================================

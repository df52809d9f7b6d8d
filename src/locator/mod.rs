//! Locator parsing and compilation.
//!
//! A locator string is parsed once into a [`Locator`] and compiled into
//! browser-side JavaScript expressions that evaluate to one element (or
//! `null`) or to an array of elements.
//!
//! # Syntax
//!
//! | Form | Kind | Example |
//! |------|------|---------|
//! | `/…`, `./…`, `../…`, `(/…` | XPath | `//button[@type='submit']` |
//! | `{tag}text` | Wildcard, exact text | `{button}Save` |
//! | `{^tag}text` | Wildcard, contains text | `{^a}Read more` |
//! | `{tag:N}text`, `{:N}text` | Nth visible match, 1-based | `{li:2}Item` |
//! | `(expr)` | Raw JavaScript | `(document.activeElement)` |
//! | anything else | CSS | `#login .primary` |
//!
//! Wildcard text is compared with whitespace collapsed and trimmed. Roles
//! such as `button`, `link` or `heading` also match their ARIA equivalents,
//! hidden elements are skipped and the innermost match wins.

// ============================================================================
// Submodules
// ============================================================================

/// JavaScript escaping helpers and element snippets.
pub mod js;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

use self::js::escape_for_js;

// ============================================================================
// Constants
// ============================================================================

/// Root expression for document-level queries.
pub const DOCUMENT: &str = "document";

/// Prefixes that mark a locator as XPath.
const XPATH_PREFIXES: &[&str] = &["/", "./", "../", "(/"];

/// Browser-side wildcard resolver, installed lazily per execution context.
const RESOLVER_JS: &str = include_str!("resolver.js");

/// `{^tag:index}text`; the text may span lines.
static WILDCARD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{(\^)?([^:}]*)?(?::(\d+))?\}(?s:(.*))$").expect("valid wildcard pattern")
});

// ============================================================================
// MatchMode
// ============================================================================

/// How wildcard text is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchMode {
    /// Normalized text equals the locator text.
    #[default]
    Exact,
    /// Normalized text contains the locator text.
    Contains,
}

// ============================================================================
// Wildcard
// ============================================================================

/// A parsed `{tag:index}text` locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wildcard {
    /// Tag or role name; `None` matches any element.
    pub tag: Option<String>,
    /// Text comparison mode.
    pub mode: MatchMode,
    /// 1-based index among visible matches; `None` means the first.
    pub index: Option<u32>,
    /// Text to match.
    pub text: String,
}

impl Wildcard {
    /// Parses the wildcard form, returning `None` if the head is malformed.
    fn parse(locator: &str) -> Option<Self> {
        let caps = WILDCARD_PATTERN.captures(locator)?;

        let tag = caps
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let index = match caps.get(3) {
            Some(m) => Some(m.as_str().parse::<u32>().ok().filter(|i| *i > 0)?),
            None => None,
        };

        Some(Self {
            tag,
            mode: if caps.get(1).is_some() {
                MatchMode::Contains
            } else {
                MatchMode::Exact
            },
            index,
            text: caps
                .get(4)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        })
    }

    fn tag_js(&self) -> String {
        escape_for_js(self.tag.as_deref().unwrap_or("*"))
    }

    fn contains(&self) -> bool {
        self.mode == MatchMode::Contains
    }
}

// ============================================================================
// Locator
// ============================================================================

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// XPath expression.
    XPath(String),
    /// Text/role wildcard.
    Wildcard(Wildcard),
    /// Raw JavaScript expression evaluating to an element.
    Script(String),
}

impl Locator {
    /// Parses a locator string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty locator.
    pub fn parse(locator: &str) -> Result<Self> {
        if locator.trim().is_empty() {
            return Err(Error::invalid_argument("locator cannot be empty"));
        }

        if is_xpath(locator) {
            return Ok(Self::XPath(locator.to_string()));
        }

        if locator.starts_with('{')
            && let Some(wildcard) = Wildcard::parse(locator)
        {
            return Ok(Self::Wildcard(wildcard));
        }

        if locator.starts_with('(') {
            return Ok(Self::Script(locator.to_string()));
        }

        Ok(Self::Css(locator.to_string()))
    }

    /// Returns `true` for XPath locators.
    #[inline]
    #[must_use]
    pub fn is_xpath(&self) -> bool {
        matches!(self, Self::XPath(_))
    }

    /// Compiles to an expression evaluating to one element or `null`.
    ///
    /// `root` is a JS expression for the query root, [`DOCUMENT`] for the
    /// whole document or a parent element's expression for child lookups.
    #[must_use]
    pub fn selector(&self, root: &str) -> String {
        match self {
            Self::Css(css) => format!("{}.querySelector(\"{}\")", wrap_root(root), escape_for_js(css)),
            Self::XPath(xpath) => format!(
                "document.evaluate(\"{}\", {}, null, 9, null).singleNodeValue",
                escape_for_js(&relative_xpath(xpath, root)),
                root
            ),
            Self::Wildcard(w) => format!(
                "{}.resolve(\"{}\", \"{}\", {}, {}, {})",
                resolver(),
                w.tag_js(),
                escape_for_js(&w.text),
                w.index.unwrap_or(1),
                w.contains(),
                root
            ),
            Self::Script(expr) => expr.clone(),
        }
    }

    /// Compiles to an expression evaluating to an array of elements in
    /// document order.
    #[must_use]
    pub fn selector_all(&self, root: &str) -> String {
        match self {
            Self::Css(css) => format!(
                "Array.from({}.querySelectorAll(\"{}\"))",
                wrap_root(root),
                escape_for_js(css)
            ),
            Self::XPath(xpath) => format!(
                "(function(){{ var it = document.evaluate(\"{}\", {}, null, 5, null), r = [], n; \
                 while ((n = it.iterateNext())) r.push(n); return r }})()",
                escape_for_js(&relative_xpath(xpath, root)),
                root
            ),
            Self::Wildcard(w) if w.index.is_some() => format!(
                "(function(){{ var e = {}; return e ? [e] : [] }})()",
                self.selector(root)
            ),
            Self::Wildcard(w) => format!(
                "{}.resolveAll(\"{}\", \"{}\", {}, {})",
                resolver(),
                w.tag_js(),
                escape_for_js(&w.text),
                w.contains(),
                root
            ),
            Self::Script(expr) => format!(
                "(function(v){{ return v == null ? [] : (typeof v.length === 'number' ? Array.from(v) : [v]) }})({expr})"
            ),
        }
    }
}

impl FromStr for Locator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) | Self::XPath(s) | Self::Script(s) => f.write_str(s),
            Self::Wildcard(w) => {
                f.write_str("{")?;
                if w.mode == MatchMode::Contains {
                    f.write_str("^")?;
                }
                if let Some(tag) = &w.tag {
                    f.write_str(tag)?;
                }
                if let Some(index) = w.index {
                    write!(f, ":{index}")?;
                }
                write!(f, "}}{}", w.text)
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if the string has an XPath prefix.
#[inline]
#[must_use]
pub fn is_xpath(locator: &str) -> bool {
    XPATH_PREFIXES.iter().any(|p| locator.starts_with(p))
}

/// Expression for the lazily installed wildcard resolver.
#[must_use]
pub fn resolver() -> String {
    format!("(window.__wl || (window.__wl = {}))", RESOLVER_JS.trim())
}

fn wrap_root(root: &str) -> String {
    if root == DOCUMENT {
        root.to_string()
    } else {
        format!("({root})")
    }
}

/// Makes an XPath relative when the query root is not the document.
fn relative_xpath(xpath: &str, root: &str) -> String {
    if root == DOCUMENT || xpath.starts_with('.') {
        return xpath.to_string();
    }
    match xpath.strip_prefix('(') {
        Some(rest) if rest.starts_with('/') => format!("(.{rest}"),
        _ => format!(".{xpath}"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn wildcard(s: &str) -> Wildcard {
        match Locator::parse(s).expect("parse") {
            Locator::Wildcard(w) => w,
            other => panic!("expected wildcard, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_detection() {
        assert!(matches!(Locator::parse("#id"), Ok(Locator::Css(_))));
        assert!(matches!(Locator::parse("div > span.x"), Ok(Locator::Css(_))));
        assert!(matches!(Locator::parse("//div"), Ok(Locator::XPath(_))));
        assert!(matches!(Locator::parse("./span"), Ok(Locator::XPath(_))));
        assert!(matches!(Locator::parse("../p"), Ok(Locator::XPath(_))));
        assert!(matches!(Locator::parse("(//li)[2]"), Ok(Locator::XPath(_))));
        assert!(matches!(Locator::parse("{a}Home"), Ok(Locator::Wildcard(_))));
        assert!(matches!(Locator::parse("(document.body)"), Ok(Locator::Script(_))));
        assert!(Locator::parse("   ").is_err());
    }

    #[test]
    fn test_wildcard_parts() {
        let w = wildcard("{^button:3}Save draft");
        assert_eq!(w.tag.as_deref(), Some("button"));
        assert_eq!(w.mode, MatchMode::Contains);
        assert_eq!(w.index, Some(3));
        assert_eq!(w.text, "Save draft");

        let any = wildcard("{:2}Item");
        assert!(any.tag.is_none());
        assert_eq!(any.index, Some(2));

        let plain = wildcard("{}Hello");
        assert!(plain.tag.is_none());
        assert_eq!(plain.mode, MatchMode::Exact);
        assert!(plain.index.is_none());
    }

    #[test]
    fn test_index_only_inside_braces() {
        let w = wildcard("{div}Total:2");
        assert_eq!(w.text, "Total:2");
        assert!(w.index.is_none());
    }

    #[test]
    fn test_multiline_text_stays_wildcard() {
        let w = wildcard("{^p}first line\nsecond line");
        assert_eq!(w.tag.as_deref(), Some("p"));
        assert_eq!(w.text, "first line\nsecond line");

        let sel = Locator::Wildcard(w).selector(DOCUMENT);
        assert!(sel.contains(r#""first line\nsecond line""#), "{sel}");
    }

    #[test]
    fn test_malformed_wildcard_falls_back_to_css() {
        assert!(matches!(Locator::parse("{div:x}text"), Ok(Locator::Css(_))));
        assert!(matches!(Locator::parse("{div:0}text"), Ok(Locator::Css(_))));
    }

    #[test]
    fn test_css_selector_is_escaped() {
        let loc = Locator::parse(r#"input[name="q"]"#).expect("parse");
        assert_eq!(
            loc.selector(DOCUMENT),
            r#"document.querySelector("input[name=\"q\"]")"#
        );
        assert_eq!(
            loc.selector("document.body"),
            r#"(document.body).querySelector("input[name=\"q\"]")"#
        );
    }

    #[test]
    fn test_xpath_single_and_all() {
        let loc = Locator::parse("//button").expect("parse");
        assert_eq!(
            loc.selector(DOCUMENT),
            r#"document.evaluate("//button", document, null, 9, null).singleNodeValue"#
        );
        assert!(loc.selector_all(DOCUMENT).contains(", null, 5, null)"));
    }

    #[test]
    fn test_child_xpath_gets_dot_prefix() {
        let loc = Locator::parse("//span").expect("parse");
        assert!(loc.selector("PARENT").contains(r#"evaluate(".//span", PARENT"#));

        let grouped = Locator::parse("(//li)[2]").expect("parse");
        assert!(grouped.selector("PARENT").contains(r#"evaluate("(.//li)[2]", PARENT"#));

        let already = Locator::parse("./a").expect("parse");
        assert!(already.selector("PARENT").contains(r#"evaluate("./a", PARENT"#));
    }

    #[test]
    fn test_wildcard_compiles_to_resolver_call() {
        let loc = Locator::parse("{^a:2}Learn \"more\"").expect("parse");
        let js = loc.selector(DOCUMENT);

        assert!(js.starts_with("(window.__wl || (window.__wl = "));
        assert!(js.ends_with(r#".resolve("a", "Learn \"more\"", 2, true, document)"#));
    }

    #[test]
    fn test_wildcard_without_index_resolves_all() {
        let loc = Locator::parse("{li}Item").expect("parse");
        assert!(loc.selector_all(DOCUMENT).ends_with(r#".resolveAll("li", "Item", false, document)"#));

        let indexed = Locator::parse("{li:2}Item").expect("parse");
        assert!(indexed.selector_all(DOCUMENT).contains("return e ? [e] : []"));
    }

    #[test]
    fn test_display_round_trips_source() {
        for source in ["{^button:2}Go", "{}x", "{:3}y", "#a", "//b"] {
            assert_eq!(Locator::parse(source).expect("parse").to_string(), source);
        }
    }

    proptest! {
        #[test]
        fn prop_css_never_panics(s in "[a-z#.\\[\\]=\"' >:-]{1,30}") {
            if let Ok(loc) = Locator::parse(&s) {
                let _ = loc.selector(DOCUMENT);
                let _ = loc.selector_all(DOCUMENT);
            }
        }

        #[test]
        fn prop_wildcard_fields(tag in "[a-z]{1,8}", index in 1u32..50, text in "[A-Za-z0-9 ]{0,20}") {
            let w = wildcard(&format!("{{^{tag}:{index}}}{text}"));
            prop_assert_eq!(w.tag.as_deref(), Some(tag.as_str()));
            prop_assert_eq!(w.index, Some(index));
            prop_assert_eq!(w.text, text);
            prop_assert_eq!(w.mode, MatchMode::Contains);
        }
    }
}

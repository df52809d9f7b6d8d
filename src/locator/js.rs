//! JavaScript escaping helpers and element snippets.
//!
//! Every snippet takes an already compiled selector expression (see
//! [`Locator::selector`](super::Locator::selector)) so the same builders
//! serve top-level locators, indexed matches and child lookups.

// ============================================================================
// Escaping
// ============================================================================

/// Escapes text for a double-quoted JavaScript string literal.
#[must_use]
pub fn escape_for_js(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Quotes text as an XPath string literal.
///
/// Text containing both quote kinds is assembled with `concat()`.
#[must_use]
pub fn escape_xpath_string(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    format!("concat('{}')", text.replace('\'', "',\"'\",'"))
}

/// Turns `_`/`!` shorthand into a one-argument function.
///
/// `_.value` becomes `function(_){ return _.value }`; anything else is
/// assumed to already be a function expression.
#[must_use]
pub fn to_function(expression: &str) -> String {
    let expression = expression.trim();
    if expression.is_empty() {
        return "function(_){ return _ }".to_string();
    }
    if (expression.starts_with('_') || expression.starts_with('!')) && !expression.contains("=>") {
        return format!("function(_){{ return {expression} }}");
    }
    expression.to_string()
}

/// Wraps statements in an immediately invoked function.
#[inline]
#[must_use]
pub fn iife(body: &str) -> String {
    format!("(function(){{ {body} }})()")
}

/// Wraps statements with `e` bound to the element; throws if it is missing.
fn with_element(sel: &str, body: &str) -> String {
    iife(&format!(
        "var e = {sel}; if (!e) throw new Error('element not found'); {body}"
    ))
}

/// Wraps statements with `e` bound to the element, returning `null` if it is
/// missing.
fn read_element(sel: &str, expr: &str) -> String {
    iife(&format!("var e = {sel}; return e ? {expr} : null"))
}

const FIRE_INPUT_CHANGE: &str = "e.dispatchEvent(new Event('input', { bubbles: true })); \
                                 e.dispatchEvent(new Event('change', { bubbles: true }))";

// ============================================================================
// Actions
// ============================================================================

/// Clicks via `HTMLElement.click()`.
#[must_use]
pub fn click(sel: &str) -> String {
    with_element(sel, "e.click()")
}

/// Focuses and moves the caret to the end.
#[must_use]
pub fn focus(sel: &str) -> String {
    with_element(
        sel,
        "e.focus(); try { e.selectionStart = e.selectionEnd = e.value.length } catch (x) {}",
    )
}

/// Clears a form control and fires `input`/`change`.
#[must_use]
pub fn clear(sel: &str) -> String {
    with_element(sel, &format!("e.focus(); e.value = ''; {FIRE_INPUT_CHANGE}"))
}

/// Sets a form control value and fires `input`/`change`.
#[must_use]
pub fn input(sel: &str, value: &str) -> String {
    with_element(
        sel,
        &format!(
            "e.focus(); e.value = \"{}\"; {FIRE_INPUT_CHANGE}",
            escape_for_js(value)
        ),
    )
}

/// Selects an option of a `<select>`.
///
/// `{}text` matches option text exactly, `{^}text` by substring; otherwise
/// the option value is tried, then the text.
#[must_use]
pub fn select_option(sel: &str, text: &str) -> String {
    let (text, condition) = if let Some(rest) = text.strip_prefix("{^}") {
        (rest, "e.options[i].text.indexOf(t) !== -1")
    } else if let Some(rest) = text.strip_prefix("{}") {
        (rest, "e.options[i].text === t")
    } else {
        (text, "e.options[i].value === t || e.options[i].text === t")
    };

    with_element(
        sel,
        &format!(
            "var t = \"{}\"; var found = false; \
             for (var i = 0; i < e.options.length; ++i) \
             if ({condition}) {{ e.options[i].selected = true; found = true; break }} \
             if (!found) throw new Error('option not found: ' + t); {FIRE_INPUT_CHANGE}",
            escape_for_js(text)
        ),
    )
}

/// Selects a `<select>` option by 0-based index.
#[must_use]
pub fn select_index(sel: &str, index: usize) -> String {
    with_element(
        sel,
        &format!(
            "if ({index} >= e.options.length) throw new Error('option index out of range'); \
             e.selectedIndex = {index}; {FIRE_INPUT_CHANGE}"
        ),
    )
}

/// Scrolls the nearest displayed ancestor into the viewport centre.
#[must_use]
pub fn scroll(sel: &str) -> String {
    with_element(
        sel,
        "while (e.parentElement && window.getComputedStyle(e).display === 'none') e = e.parentElement; \
         e.scrollIntoView({ block: 'center' })",
    )
}

/// Outlines the element for `millis` milliseconds.
#[must_use]
pub fn highlight(sel: &str, millis: u64) -> String {
    with_element(
        sel,
        &format!(
            "var old = e.getAttribute('style'); \
             e.setAttribute('style', 'background: yellow; border: 2px solid red;'); \
             setTimeout(function(){{ e.setAttribute('style', old || '') }}, {millis})"
        ),
    )
}

// ============================================================================
// Queries
// ============================================================================

/// `true` if the element exists; a failing relative lookup counts as absent.
#[must_use]
pub fn exists(sel: &str) -> String {
    iife(&format!("try {{ return ({sel}) != null }} catch (x) {{ return false }}"))
}

/// Number of elements in an array expression.
#[must_use]
pub fn count(all: &str) -> String {
    format!("({all}).length")
}

/// `textContent`.
#[must_use]
pub fn text(sel: &str) -> String {
    read_element(sel, "e.textContent")
}

/// Form control value.
#[must_use]
pub fn value(sel: &str) -> String {
    read_element(sel, "e.value")
}

/// `outerHTML`.
#[must_use]
pub fn outer_html(sel: &str) -> String {
    read_element(sel, "e.outerHTML")
}

/// `innerHTML`.
#[must_use]
pub fn inner_html(sel: &str) -> String {
    read_element(sel, "e.innerHTML")
}

/// An attribute value.
#[must_use]
pub fn attribute(sel: &str, name: &str) -> String {
    read_element(sel, &format!("e.getAttribute(\"{}\")", escape_for_js(name)))
}

/// A DOM property value.
#[must_use]
pub fn property(sel: &str, name: &str) -> String {
    read_element(sel, &format!("e[\"{}\"]", escape_for_js(name)))
}

/// All attributes as a name to value map.
#[must_use]
pub fn attributes(sel: &str) -> String {
    with_element(
        sel,
        "var r = {}; for (var i = 0; i < e.attributes.length; i++) \
         r[e.attributes[i].name] = e.attributes[i].value; return r",
    )
}

/// `true` unless the element is disabled.
#[must_use]
pub fn enabled(sel: &str) -> String {
    iife(&format!("var e = {sel}; return e ? !e.disabled : false"))
}

/// Bounding rectangle; page-absolute unless `relative` to the viewport.
#[must_use]
pub fn position(sel: &str, relative: bool) -> String {
    let (dx, dy) = if relative {
        ("0", "0")
    } else {
        ("window.scrollX", "window.scrollY")
    };
    with_element(
        sel,
        &format!(
            "var r = e.getBoundingClientRect(); \
             return {{ x: r.x + {dx}, y: r.y + {dy}, width: r.width, height: r.height }}"
        ),
    )
}

/// Rectangles of every element in an array expression, viewport-relative.
#[must_use]
pub fn positions(all: &str) -> String {
    format!(
        "({all}).map(function(e){{ var r = e.getBoundingClientRect(); \
         return {{ x: r.x, y: r.y, width: r.width, height: r.height }} }})"
    )
}

// ============================================================================
// Scripts
// ============================================================================

/// Applies a function (or `_` shorthand) to the element.
#[must_use]
pub fn script_on(sel: &str, expression: &str) -> String {
    iife(&format!(
        "var fun = {}; var e = {sel}; return fun(e)",
        to_function(expression)
    ))
}

/// Applies a function (or `_` shorthand) to every element.
#[must_use]
pub fn script_all(all: &str, expression: &str) -> String {
    iife(&format!(
        "var fun = {}; return ({all}).map(function(e){{ return fun(e) }})",
        to_function(expression)
    ))
}

// ============================================================================
// Relatives
// ============================================================================

/// Parent element.
#[must_use]
pub fn parent(sel: &str) -> String {
    format!("({sel}).parentElement")
}

/// Child elements as an array.
#[must_use]
pub fn children(sel: &str) -> String {
    format!("Array.from(({sel}).children)")
}

/// First child element.
#[must_use]
pub fn first_child(sel: &str) -> String {
    format!("({sel}).firstElementChild")
}

/// Last child element.
#[must_use]
pub fn last_child(sel: &str) -> String {
    format!("({sel}).lastElementChild")
}

/// Next sibling element.
#[must_use]
pub fn next_sibling(sel: &str) -> String {
    format!("({sel}).nextElementSibling")
}

/// Previous sibling element.
#[must_use]
pub fn previous_sibling(sel: &str) -> String {
    format!("({sel}).previousElementSibling")
}

/// The `index`th `<iframe>`/`<frame>` of the document.
#[must_use]
pub fn frame_at(index: usize) -> String {
    format!("document.querySelectorAll('iframe,frame')[{index}]")
}

// ============================================================================
// Tests
// ============================================================================

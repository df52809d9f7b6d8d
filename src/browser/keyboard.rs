//! Keyboard key definitions and key event synthesis.
//!
//! [`Key`] names the non-printing keys; [`Keys`] turns text, key names and
//! `Mod+Key` combos into `Input.dispatchKeyEvent` sequences while tracking
//! which modifiers are held. Events queue up until [`Keys::perform`] sends
//! them.
//!
//! # Example
//!
//! ```ignore
//! use cdp_driver::Key;
//!
//! driver.focus("#name").await?;
//! driver
//!     .keys()
//!     .down(Key::Shift)
//!     .type_text("abc")
//!     .up(Key::Shift)
//!     .type_text("def")
//!     .press("Enter")
//!     .perform()
//!     .await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::InputCommand;

use super::input::InputSink;

// ============================================================================
// Modifiers
// ============================================================================

/// Bit mask of held modifier keys, as CDP expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self(0);
    /// Alt.
    pub const ALT: Self = Self(1);
    /// Control.
    pub const CTRL: Self = Self(2);
    /// Meta / Command.
    pub const META: Self = Self(4);
    /// Shift.
    pub const SHIFT: Self = Self(8);

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `true` if every bit of `other` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// `true` if a modifier other than Shift is held.
    #[inline]
    #[must_use]
    pub const fn has_command_modifier(self) -> bool {
        self.0 & !Self::SHIFT.0 != 0
    }
}

// ============================================================================
// Key Enum
// ============================================================================

/// Named keys that do not map to a single printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    // ========================================================================
    // Navigation & Control
    // ========================================================================
    /// Backspace key
    Backspace,
    /// Tab key
    Tab,
    /// Enter/Return key
    Enter,
    /// Escape key
    Escape,
    /// Space bar
    Space,
    /// Insert key
    Insert,
    /// Delete key
    Delete,

    // ========================================================================
    // Modifiers
    // ========================================================================
    /// Shift key
    Shift,
    /// Control key
    Control,
    /// Alt key
    Alt,
    /// Meta / Command key
    Meta,

    // ========================================================================
    // Arrow Keys
    // ========================================================================
    /// Arrow Left
    ArrowLeft,
    /// Arrow Up
    ArrowUp,
    /// Arrow Right
    ArrowRight,
    /// Arrow Down
    ArrowDown,

    // ========================================================================
    // Page Navigation
    // ========================================================================
    /// Page Up key
    PageUp,
    /// Page Down key
    PageDown,
    /// End key
    End,
    /// Home key
    Home,

    // ========================================================================
    // Numpad & Function Keys
    // ========================================================================
    /// Numpad digit, 0-9
    Numpad(u8),
    /// Numpad `*`
    NumpadMultiply,
    /// Numpad `+`
    NumpadAdd,
    /// Numpad separator
    NumpadComma,
    /// Numpad `-`
    NumpadSubtract,
    /// Numpad `.`
    NumpadDecimal,
    /// Numpad `/`
    NumpadDivide,
    /// Function key, F1-F12
    F(u8),
}

/// Everything CDP needs to describe one key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDefinition {
    /// DOM `key` value.
    pub key: String,
    /// DOM `code` value.
    pub code: String,
    /// Windows virtual key code, 0 when unknown.
    pub key_code: u32,
    /// Text produced, when the key is printing.
    pub text: Option<String>,
    /// 0 standard, 1 left, 2 right, 3 numpad.
    pub location: u8,
}

impl KeyDefinition {
    fn named(key: &str, code: &str, key_code: u32) -> Self {
        Self {
            key: key.to_string(),
            code: code.to_string(),
            key_code,
            text: None,
            location: 0,
        }
    }

    fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    fn at(mut self, location: u8) -> Self {
        self.location = location;
        self
    }

    /// Describes a printable character on a US layout.
    #[must_use]
    pub fn for_char(c: char) -> Self {
        let text = c.to_string();
        let (code, key_code) = match c {
            'a'..='z' | 'A'..='Z' => {
                let upper = c.to_ascii_uppercase();
                (format!("Key{upper}"), upper as u32)
            }
            '0'..='9' => (format!("Digit{c}"), c as u32),
            ' ' => ("Space".to_string(), 32),
            _ => match punctuation(c) {
                Some((code, key_code)) => (code.to_string(), key_code),
                None => (String::new(), 0),
            },
        };

        Self {
            key: text.clone(),
            code,
            key_code,
            text: Some(text),
            location: 0,
        }
    }
}

/// US layout punctuation keys, unshifted and shifted.
fn punctuation(c: char) -> Option<(&'static str, u32)> {
    Some(match c {
        '.' | '>' => ("Period", 190),
        ',' | '<' => ("Comma", 188),
        ';' | ':' => ("Semicolon", 186),
        '\'' | '"' => ("Quote", 222),
        '[' | '{' => ("BracketLeft", 219),
        ']' | '}' => ("BracketRight", 221),
        '\\' | '|' => ("Backslash", 220),
        '/' | '?' => ("Slash", 191),
        '`' | '~' => ("Backquote", 192),
        '-' | '_' => ("Minus", 189),
        '=' | '+' => ("Equal", 187),
        _ => return None,
    })
}

impl Key {
    /// Returns the key's CDP description.
    #[must_use]
    pub fn definition(self) -> KeyDefinition {
        match self {
            Key::Backspace => KeyDefinition::named("Backspace", "Backspace", 8),
            Key::Tab => KeyDefinition::named("Tab", "Tab", 9),
            Key::Enter => KeyDefinition::named("Enter", "Enter", 13).with_text("\r"),
            Key::Escape => KeyDefinition::named("Escape", "Escape", 27),
            Key::Space => KeyDefinition::named(" ", "Space", 32).with_text(" "),
            Key::Insert => KeyDefinition::named("Insert", "Insert", 45),
            Key::Delete => KeyDefinition::named("Delete", "Delete", 46),
            Key::Shift => KeyDefinition::named("Shift", "ShiftLeft", 16).at(1),
            Key::Control => KeyDefinition::named("Control", "ControlLeft", 17).at(1),
            Key::Alt => KeyDefinition::named("Alt", "AltLeft", 18).at(1),
            Key::Meta => KeyDefinition::named("Meta", "MetaLeft", 91).at(1),
            Key::ArrowLeft => KeyDefinition::named("ArrowLeft", "ArrowLeft", 37),
            Key::ArrowUp => KeyDefinition::named("ArrowUp", "ArrowUp", 38),
            Key::ArrowRight => KeyDefinition::named("ArrowRight", "ArrowRight", 39),
            Key::ArrowDown => KeyDefinition::named("ArrowDown", "ArrowDown", 40),
            Key::PageUp => KeyDefinition::named("PageUp", "PageUp", 33),
            Key::PageDown => KeyDefinition::named("PageDown", "PageDown", 34),
            Key::End => KeyDefinition::named("End", "End", 35),
            Key::Home => KeyDefinition::named("Home", "Home", 36),
            Key::Numpad(n) => {
                let digit = n.min(9);
                let text = digit.to_string();
                KeyDefinition::named(&text, &format!("Numpad{digit}"), 96 + u32::from(digit))
                    .with_text(&text)
                    .at(3)
            }
            Key::NumpadMultiply => numpad("*", "NumpadMultiply", 106),
            Key::NumpadAdd => numpad("+", "NumpadAdd", 107),
            Key::NumpadComma => numpad(",", "NumpadComma", 108),
            Key::NumpadSubtract => numpad("-", "NumpadSubtract", 109),
            Key::NumpadDecimal => numpad(".", "NumpadDecimal", 110),
            Key::NumpadDivide => numpad("/", "NumpadDivide", 111),
            Key::F(n) => {
                let n = n.clamp(1, 12);
                let name = format!("F{n}");
                KeyDefinition::named(&name, &name, 111 + u32::from(n))
            }
        }
    }

    /// Modifier bit for modifier keys.
    #[must_use]
    pub fn modifier(self) -> Option<Modifiers> {
        match self {
            Key::Alt => Some(Modifiers::ALT),
            Key::Control => Some(Modifiers::CTRL),
            Key::Meta => Some(Modifiers::META),
            Key::Shift => Some(Modifiers::SHIFT),
            _ => None,
        }
    }

    /// Resolves a key name or alias, e.g. `Ctrl`, `Cmd`, `Esc`, `Left`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Control" | "Ctrl" => Key::Control,
            "Shift" => Key::Shift,
            "Alt" => Key::Alt,
            "Meta" | "Command" | "Cmd" => Key::Meta,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "ArrowUp" | "Up" => Key::ArrowUp,
            "ArrowDown" | "Down" => Key::ArrowDown,
            "Enter" | "Return" => Key::Enter,
            "Tab" => Key::Tab,
            "Backspace" => Key::Backspace,
            "Delete" => Key::Delete,
            "Escape" | "Esc" => Key::Escape,
            "Home" => Key::Home,
            "End" => Key::End,
            "PageUp" => Key::PageUp,
            "PageDown" => Key::PageDown,
            "Insert" => Key::Insert,
            "Space" => Key::Space,
            _ => {
                let n = name.strip_prefix('F')?.parse::<u8>().ok()?;
                return (1..=12).contains(&n).then_some(Key::F(n));
            }
        })
    }

    /// Resolves a WebDriver private-use code point (U+E000 to U+E03D).
    #[must_use]
    pub fn from_code_point(c: char) -> Option<Self> {
        Some(match c {
            '\u{E003}' => Key::Backspace,
            '\u{E004}' => Key::Tab,
            '\u{E006}' | '\u{E007}' => Key::Enter,
            '\u{E008}' => Key::Shift,
            '\u{E009}' => Key::Control,
            '\u{E00A}' => Key::Alt,
            '\u{E00C}' => Key::Escape,
            '\u{E00D}' => Key::Space,
            '\u{E00E}' => Key::PageUp,
            '\u{E00F}' => Key::PageDown,
            '\u{E010}' => Key::End,
            '\u{E011}' => Key::Home,
            '\u{E012}' => Key::ArrowLeft,
            '\u{E013}' => Key::ArrowUp,
            '\u{E014}' => Key::ArrowRight,
            '\u{E015}' => Key::ArrowDown,
            '\u{E016}' => Key::Insert,
            '\u{E017}' => Key::Delete,
            '\u{E01A}'..='\u{E023}' => Key::Numpad((c as u32 - 0xE01A) as u8),
            '\u{E024}' => Key::NumpadMultiply,
            '\u{E025}' => Key::NumpadAdd,
            '\u{E026}' => Key::NumpadComma,
            '\u{E027}' => Key::NumpadSubtract,
            '\u{E028}' => Key::NumpadDecimal,
            '\u{E029}' => Key::NumpadDivide,
            '\u{E031}'..='\u{E03C}' => Key::F((c as u32 - 0xE030) as u8),
            '\u{E03D}' => Key::Meta,
            _ => return None,
        })
    }
}

fn numpad(key: &str, code: &str, key_code: u32) -> KeyDefinition {
    KeyDefinition::named(key, code, key_code)
        .with_text(key)
        .at(3)
}

/// Shift applied to a US layout character.
#[must_use]
pub fn apply_shift(c: char) -> char {
    match c {
        'a'..='z' => c.to_ascii_uppercase(),
        '1' => '!',
        '2' => '@',
        '3' => '#',
        '4' => '$',
        '5' => '%',
        '6' => '^',
        '7' => '&',
        '8' => '*',
        '9' => '(',
        '0' => ')',
        '-' => '_',
        '=' => '+',
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        ';' => ':',
        '\'' => '"',
        ',' => '<',
        '.' => '>',
        '/' => '?',
        '`' => '~',
        _ => c,
    }
}

// ============================================================================
// Keys
// ============================================================================

/// Keyboard handle with held-modifier state.
///
/// Methods queue events and return `&mut Self` for chaining;
/// [`perform`](Keys::perform) sends the queue in order.
pub struct Keys {
    sink: Arc<dyn InputSink>,
    modifiers: Modifiers,
    queued: Vec<InputCommand>,
}

impl Keys {
    /// Creates a keyboard over an input sink.
    #[must_use]
    pub fn new(sink: Arc<dyn InputSink>) -> Self {
        Self {
            sink,
            modifiers: Modifiers::NONE,
            queued: Vec::new(),
        }
    }

    /// Sends every queued event, waiting for each acknowledgement.
    ///
    /// Stops at the first rejected event; the rest of the queue is dropped.
    ///
    /// # Errors
    ///
    /// The protocol or transport error of the first event that failed.
    pub async fn perform(&mut self) -> Result<()> {
        for command in std::mem::take(&mut self.queued) {
            self.sink.send(command).await?;
        }
        Ok(())
    }

    /// Number of events waiting for [`perform`](Keys::perform).
    #[inline]
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Currently held modifiers.
    #[inline]
    #[must_use]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Types text character by character.
    ///
    /// WebDriver key code points in the text press the named key.
    pub fn type_text(&mut self, text: &str) -> &mut Self {
        for c in text.chars() {
            match Key::from_code_point(c) {
                Some(key) => self.press_key(key),
                None => self.type_char(c),
            };
        }
        self
    }

    /// Presses a key given by name, literal text or `Mod+Key` notation.
    ///
    /// `"Enter"`, `"Esc"`, `"Control+a"`, `"Ctrl+Shift+ArrowLeft"` and
    /// `"x"` are all accepted; unknown names are typed literally.
    pub fn press(&mut self, key: &str) -> &mut Self {
        if let Some((mods, last)) = split_combo(key) {
            let resolved: Vec<Option<Key>> = mods.iter().map(|m| Key::from_name(m)).collect();
            if resolved.iter().all(Option::is_some) {
                let mods: Vec<Key> = resolved.into_iter().flatten().collect();
                return self.combo(&mods, last);
            }
        }

        if let Some(named) = Key::from_name(key) {
            return self.press_key(named);
        }

        let mut chars = key.chars();
        if let (Some(c), None) = (chars.next(), chars.next())
            && let Some(named) = Key::from_code_point(c)
        {
            return self.press_key(named);
        }

        for c in key.chars() {
            self.type_char(c);
        }
        self
    }

    /// Presses and releases a named key.
    pub fn press_key(&mut self, key: Key) -> &mut Self {
        let def = key.definition();
        self.dispatch_key("rawKeyDown", &def, false);
        if def.text.is_some() {
            self.dispatch_key("char", &def, true);
        }
        self.dispatch_key("keyUp", &def, false);
        self
    }

    /// Holds a key down, updating the modifier mask.
    pub fn down(&mut self, key: Key) -> &mut Self {
        if let Some(flag) = key.modifier() {
            self.modifiers.insert(flag);
        }
        self.dispatch_key("rawKeyDown", &key.definition(), false);
        self
    }

    /// Releases a key, updating the modifier mask.
    pub fn up(&mut self, key: Key) -> &mut Self {
        if let Some(flag) = key.modifier() {
            self.modifiers.remove(flag);
        }
        self.dispatch_key("keyUp", &key.definition(), false);
        self
    }

    /// Holds `modifiers`, presses `key`, then releases them in reverse order.
    pub fn combo(&mut self, modifiers: &[Key], key: &str) -> &mut Self {
        for m in modifiers {
            self.down(*m);
        }
        self.press(key);
        for m in modifiers.iter().rev() {
            self.up(*m);
        }
        self
    }

    /// `Control` + key.
    pub fn ctrl(&mut self, key: &str) -> &mut Self {
        self.combo(&[Key::Control], key)
    }

    /// `Alt` + key.
    pub fn alt(&mut self, key: &str) -> &mut Self {
        self.combo(&[Key::Alt], key)
    }

    /// `Shift` + key.
    pub fn shift(&mut self, key: &str) -> &mut Self {
        self.combo(&[Key::Shift], key)
    }

    /// `Meta` + key.
    pub fn meta(&mut self, key: &str) -> &mut Self {
        self.combo(&[Key::Meta], key)
    }

    fn type_char(&mut self, c: char) -> &mut Self {
        let shifted = if self.modifiers.contains(Modifiers::SHIFT) {
            apply_shift(c)
        } else {
            c
        };
        let def = KeyDefinition::for_char(shifted);

        self.dispatch_key("rawKeyDown", &def, false);
        if !self.modifiers.has_command_modifier() {
            self.dispatch_key("char", &def, true);
        }
        self.dispatch_key("keyUp", &def, false);
        self
    }

    fn dispatch_key(&mut self, event_type: &str, def: &KeyDefinition, with_text: bool) {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let char_event = event_type == "char";

        self.queued.push(InputCommand::DispatchKeyEvent {
            event_type: event_type.to_string(),
            modifiers: self.modifiers.bits(),
            key: if char_event { None } else { non_empty(&def.key) },
            code: if char_event { None } else { non_empty(&def.code) },
            text: if with_text { def.text.clone() } else { None },
            windows_virtual_key_code: (def.key_code > 0).then_some(def.key_code),
            location: (def.location > 0 && !char_event).then_some(def.location),
        });
    }
}

/// Splits `Mod+Mod+Key` into modifiers and the final key.
fn split_combo(key: &str) -> Option<(Vec<&str>, &str)> {
    if key.len() < 2 || !key.contains('+') {
        return None;
    }

    let (head, last) = if let Some(head) = key.strip_suffix("++") {
        (head, "+")
    } else {
        key.rsplit_once('+')?
    };

    if head.is_empty() || last.is_empty() {
        return None;
    }
    Some((head.split('+').collect(), last))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::browser::input::RecordingInput;

    /// Sends whatever `build` queued into a fresh recorder.
    fn record(build: impl FnOnce(&mut Keys) -> &mut Keys) -> Arc<RecordingInput> {
        let rec = RecordingInput::new();
        let mut keys = Keys::new(rec.clone());
        tokio_test::block_on(build(&mut keys).perform()).expect("perform");
        rec
    }

    fn event_types(rec: &RecordingInput) -> Vec<(String, u8)> {
        rec.commands()
            .into_iter()
            .filter_map(|c| match c {
                InputCommand::DispatchKeyEvent {
                    event_type,
                    modifiers,
                    ..
                } => Some((event_type, modifiers)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_shift_held_uppercases() {
        let rec = RecordingInput::new();
        let mut keys = Keys::new(rec.clone());

        keys.down(Key::Shift)
            .type_text("abc")
            .up(Key::Shift)
            .type_text("def");
        assert!(rec.commands().is_empty(), "nothing sent before perform");

        tokio_test::block_on(keys.perform()).expect("perform");
        assert_eq!(rec.typed_text(), "ABCdef");
        assert_eq!(keys.queued(), 0);
        assert_eq!(keys.modifiers(), Modifiers::NONE);
    }

    #[test]
    fn test_perform_stops_at_rejected_event() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        use crate::error::Error;

        #[derive(Default)]
        struct Rejecting {
            sent: AtomicUsize,
        }

        #[async_trait::async_trait]
        impl InputSink for Rejecting {
            fn dispatch(&self, _command: InputCommand) {}

            async fn send(&self, _command: InputCommand) -> Result<()> {
                self.sent.fetch_add(1, Ordering::SeqCst);
                Err(Error::protocol("Input.dispatchKeyEvent", -32602, "Invalid parameters"))
            }
        }

        let sink = Arc::new(Rejecting::default());
        let mut keys = Keys::new(sink.clone());
        keys.type_text("abc");
        assert_eq!(keys.queued(), 9);

        let err = tokio_test::block_on(keys.perform()).unwrap_err();
        assert!(matches!(err, Error::Protocol { code: -32602, .. }));
        assert_eq!(sink.sent.load(Ordering::SeqCst), 1);
        assert_eq!(keys.queued(), 0);
    }

    #[test]
    fn test_shift_maps_number_row() {
        let rec = record(|k| k.down(Key::Shift).type_text("1/"));
        assert_eq!(rec.typed_text(), "!?");
    }

    #[test]
    fn test_type_sends_down_char_up() {
        let rec = record(|k| k.type_text("9.99"));

        assert_eq!(rec.typed_text(), "9.99");
        let types: Vec<String> = event_types(&rec).into_iter().map(|(t, _)| t).collect();
        assert_eq!(&types[..3], ["rawKeyDown", "char", "keyUp"]);
        assert_eq!(types.len(), 12);
    }

    #[test]
    fn test_ctrl_suppresses_char() {
        let rec = record(|k| k.press("Control+a"));

        assert_eq!(rec.typed_text(), "");
        let events = event_types(&rec);
        assert_eq!(events.first(), Some(&("rawKeyDown".to_string(), 2)));
        assert_eq!(events.last(), Some(&("keyUp".to_string(), 0)));
    }

    #[test]
    fn test_combo_releases_in_reverse_order() {
        let rec = record(|k| k.press("Ctrl+Shift+ArrowLeft"));

        let keys: Vec<(String, Option<String>)> = rec
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                InputCommand::DispatchKeyEvent { event_type, key, .. } => Some((event_type, key)),
                _ => None,
            })
            .collect();

        let ups: Vec<&str> = keys
            .iter()
            .filter(|(t, _)| t == "keyUp")
            .filter_map(|(_, k)| k.as_deref())
            .collect();
        assert_eq!(ups, ["ArrowLeft", "Shift", "Control"]);
    }

    #[test]
    fn test_enter_sends_carriage_return_char() {
        let rec = record(|k| k.press("Enter"));
        assert_eq!(rec.typed_text(), "\r");
    }

    #[test]
    fn test_code_point_in_text_presses_key() {
        let rec = record(|k| k.type_text("a\u{E004}b"));

        let tab_pressed = rec.commands().iter().any(|c| {
            matches!(c, InputCommand::DispatchKeyEvent { key: Some(k), .. } if k == "Tab")
        });
        assert!(tab_pressed);
        assert_eq!(rec.typed_text(), "ab");
    }

    #[test]
    fn test_unknown_name_typed_literally() {
        let rec = record(|k| k.press("hi").press("+"));
        assert_eq!(rec.typed_text(), "hi+");
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Key::from_name("Cmd"), Some(Key::Meta));
        assert_eq!(Key::from_name("Esc"), Some(Key::Escape));
        assert_eq!(Key::from_name("Left"), Some(Key::ArrowLeft));
        assert_eq!(Key::from_name("F12"), Some(Key::F(12)));
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("a"), None);
    }

    #[test]
    fn test_definitions() {
        let f5 = Key::F(5).definition();
        assert_eq!((f5.code.as_str(), f5.key_code), ("F5", 116));

        let n7 = Key::Numpad(7).definition();
        assert_eq!((n7.code.as_str(), n7.key_code, n7.location), ("Numpad7", 103, 3));

        let shift = Key::Shift.definition();
        assert_eq!((shift.code.as_str(), shift.location), ("ShiftLeft", 1));

        let q = KeyDefinition::for_char('q');
        assert_eq!((q.code.as_str(), q.key_code), ("KeyQ", 81));

        let quote = KeyDefinition::for_char('\'');
        assert_eq!((quote.code.as_str(), quote.key_code), ("Quote", 222));
    }

    #[test]
    fn test_code_points() {
        assert_eq!(Key::from_code_point('\u{E007}'), Some(Key::Enter));
        assert_eq!(Key::from_code_point('\u{E01A}'), Some(Key::Numpad(0)));
        assert_eq!(Key::from_code_point('\u{E031}'), Some(Key::F(1)));
        assert_eq!(Key::from_code_point('\u{E03C}'), Some(Key::F(12)));
        assert_eq!(Key::from_code_point('\u{E03D}'), Some(Key::Meta));
        assert_eq!(Key::from_code_point('x'), None);
    }

    proptest! {
        #[test]
        fn prop_lowercase_text_round_trips(s in "[a-z0-9 .,;/-]{0,30}") {
            let rec = record(|k| k.type_text(&s));
            prop_assert_eq!(rec.typed_text(), s);
        }

        #[test]
        fn prop_shift_uppercases_letters(s in "[a-z]{0,30}") {
            let rec = record(|k| k.down(Key::Shift).type_text(&s));
            prop_assert_eq!(rec.typed_text(), s.to_uppercase());
        }
    }
}

//! Type-safe identifiers for protocol and browser entities.
//!
//! Newtype wrappers keep command ids, session ids, frame ids and the
//! various registry tokens from being mixed up at compile time.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`CommandId`] | `u64` | Assigned by the transport, strictly increasing |
//! | [`SessionId`] | `String` | CDP flattened target session |
//! | [`TargetId`] | `String` | CDP target (tab) |
//! | [`FrameId`] | `String` | CDP frame |
//! | [`ContextId`] | `i64` | CDP execution context |
//! | [`HandlerToken`] | `u64` | Event handler registration |
//! | [`WaiterToken`] | `u64` | One-shot event waiter registration |
//! | [`FetchRequestId`] | `String` | Paused `Fetch` request |
//! | [`DriverId`] | `Uuid` | Pooled driver lease |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Macros
// ============================================================================

/// Declares a string-backed identifier newtype.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

/// Declares a process-wide counter token.
macro_rules! counter_token {
    ($(#[$meta:meta])* $name:ident, $counter:ident) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Generates a new unique token.
            #[inline]
            #[must_use]
            pub fn generate() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            /// Returns the raw token value.
            #[inline]
            #[must_use]
            pub const fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ============================================================================
// CommandId
// ============================================================================

/// Integer id correlating a CDP command with its reply.
///
/// Ids come from a per-connection [`CommandIdGenerator`] and are never
/// reused, so a late reply can never be mistaken for a newer command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strictly increasing id source, one per connection.
#[derive(Debug)]
pub struct CommandIdGenerator {
    next: AtomicU64,
}

impl CommandIdGenerator {
    /// Creates a generator whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    #[inline]
    pub fn next_id(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommandIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// String Identifiers
// ============================================================================

string_id!(
    /// CDP session id of an attached target (flatten mode).
    SessionId
);

string_id!(
    /// CDP target id (a tab or other browsing context).
    TargetId
);

string_id!(
    /// CDP frame id.
    FrameId
);

string_id!(
    /// Request id of a request paused by the `Fetch` domain.
    FetchRequestId
);

// ============================================================================
// ContextId
// ============================================================================

/// CDP execution context id, scoping `Runtime.evaluate` to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(i64);

impl ContextId {
    /// Wraps a raw context id.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw context id.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Registry Tokens
// ============================================================================

counter_token!(
    /// Handle for a registered event handler, used to remove exactly it.
    HandlerToken,
    NEXT_HANDLER_TOKEN
);

counter_token!(
    /// Key of a one-shot event waiter in the transport's waiter registry.
    WaiterToken,
    NEXT_WAITER_TOKEN
);

// ============================================================================
// DriverId
// ============================================================================

/// Identity of a driver handed out by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DriverId(Uuid);

impl DriverId {
    /// Generates a random driver id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_ids_strictly_increase() {
        let generator = CommandIdGenerator::new();
        let first = generator.next_id();
        let second = generator.next_id();
        let third = generator.next_id();

        assert_eq!(first.as_u64(), 1);
        assert!(second > first);
        assert!(third > second);
    }

    #[test]
    fn test_generators_are_independent() {
        let a = CommandIdGenerator::new();
        let b = CommandIdGenerator::new();
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id().as_u64(), 1);
    }

    #[test]
    fn test_string_id_serde_is_transparent() {
        let frame = FrameId::new("ABC123");
        let json = serde_json::to_string(&frame).expect("serialize");
        assert_eq!(json, "\"ABC123\"");

        let back: FrameId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, frame);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = WaiterToken::generate();
        let b = WaiterToken::generate();
        assert_ne!(a, b);

        let h1 = HandlerToken::generate();
        let h2 = HandlerToken::generate();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionId::from("S1").to_string(), "S1");
        assert_eq!(ContextId::new(7).to_string(), "7");
        assert_eq!(CommandId::new(42).to_string(), "42");
    }
}

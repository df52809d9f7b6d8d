//! Frame tree, execution contexts and load state.
//!
//! [`FrameRegistry`] is plain state fed by page and runtime events; the
//! driver keeps one behind a mutex and consults it to scope evaluation to
//! the current frame.
//!
//! | Event | Effect |
//! |-------|--------|
//! | `Page.frameAttached` / `frameNavigated` | Frame recorded |
//! | `Page.frameNavigated` (main) | Main frame set, current frame reset |
//! | `Page.frameDetached` | Frame forgotten, current reset if it was current |
//! | `Runtime.executionContextCreated` | Default context mapped to its frame |
//! | `Runtime.executionContextDestroyed` / `Cleared` | Mapping dropped |
//! | `Page.lifecycleEvent` / `loadEventFired` / ... | Load state updated |

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::identifiers::{ContextId, FrameId};
use crate::protocol::ParsedEvent;

// ============================================================================
// FrameInfo
// ============================================================================

/// A known frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    /// Frame id.
    pub frame_id: FrameId,
    /// Parent frame, `None` for the main frame.
    pub parent_id: Option<FrameId>,
    /// Last committed URL.
    pub url: String,
}

// ============================================================================
// LoadState
// ============================================================================

/// Main-frame load milestones since the last navigation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadState {
    /// `DOMContentLoaded` fired.
    pub dom_content_loaded: bool,
    /// `load` fired.
    pub loaded: bool,
    /// `networkIdle` lifecycle event fired.
    pub network_idle: bool,
    /// Frames that started loading and have not stopped.
    pub frames_loading: usize,
}

// ============================================================================
// FrameRegistry
// ============================================================================

/// Frame and execution-context bookkeeping for one page session.
#[derive(Debug, Default)]
pub struct FrameRegistry {
    main_frame: Option<FrameId>,
    current: Option<FrameId>,
    frames: FxHashMap<FrameId, FrameInfo>,
    contexts: FxHashMap<FrameId, ContextId>,
    loading: FxHashSet<FrameId>,
    load: LoadState,
}

impl FrameRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything, e.g. after switching to another page.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ========================================================================
    // Frames
    // ========================================================================

    /// Records the main frame, typically from `Page.getFrameTree`.
    pub fn set_main_frame(&mut self, frame_id: FrameId, url: impl Into<String>) {
        self.frames.insert(
            frame_id.clone(),
            FrameInfo {
                frame_id: frame_id.clone(),
                parent_id: None,
                url: url.into(),
            },
        );
        self.main_frame = Some(frame_id);
    }

    /// Main frame id, once known.
    #[inline]
    #[must_use]
    pub fn main_frame(&self) -> Option<&FrameId> {
        self.main_frame.as_ref()
    }

    /// Current frame; `None` means the main frame.
    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> Option<&FrameId> {
        self.current.as_ref()
    }

    /// Frame that evaluation targets.
    #[must_use]
    pub fn target_frame(&self) -> Option<&FrameId> {
        self.current.as_ref().or(self.main_frame.as_ref())
    }

    /// Makes `frame` current; `None` returns to the main frame.
    pub fn set_current(&mut self, frame: Option<FrameId>) {
        let frame = frame.filter(|f| Some(f) != self.main_frame.as_ref());
        debug!(frame = ?frame, "Current frame changed");
        self.current = frame;
    }

    /// Looks up a frame.
    #[must_use]
    pub fn frame(&self, frame_id: &FrameId) -> Option<&FrameInfo> {
        self.frames.get(frame_id)
    }

    /// All known frames.
    #[must_use]
    pub fn frames(&self) -> Vec<FrameInfo> {
        self.frames.values().cloned().collect()
    }

    /// Direct children of `parent`.
    #[must_use]
    pub fn children(&self, parent: &FrameId) -> Vec<FrameId> {
        self.frames
            .values()
            .filter(|f| f.parent_id.as_ref() == Some(parent))
            .map(|f| f.frame_id.clone())
            .collect()
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    /// Default execution context of a frame.
    #[must_use]
    pub fn context_for(&self, frame_id: &FrameId) -> Option<ContextId> {
        self.contexts.get(frame_id).copied()
    }

    /// Execution context for evaluation in the current frame.
    ///
    /// `None` for the main frame when its context is unknown, which lets
    /// the browser pick the page's default.
    #[must_use]
    pub fn current_context(&self) -> Option<ContextId> {
        self.target_frame().and_then(|f| self.context_for(f))
    }

    /// Maps a frame to a context, e.g. an isolated world created on demand.
    pub fn set_context(&mut self, frame_id: FrameId, context_id: ContextId) {
        self.contexts.insert(frame_id, context_id);
    }

    // ========================================================================
    // Load State
    // ========================================================================

    /// Load milestones since the last navigation started.
    #[must_use]
    pub fn load_state(&self) -> LoadState {
        LoadState {
            frames_loading: self.loading.len(),
            ..self.load
        }
    }

    /// Clears load milestones before a navigation is issued.
    pub fn begin_navigation(&mut self) {
        self.load = LoadState::default();
    }

    fn is_main(&self, frame_id: &FrameId) -> bool {
        self.main_frame.as_ref().is_none_or(|m| m == frame_id)
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Updates state from a page or runtime event. Other events are ignored.
    pub fn apply(&mut self, event: &ParsedEvent) {
        match event {
            ParsedEvent::Lifecycle { frame_id, name } if self.is_main(frame_id) => {
                match name.as_str() {
                    "init" => self.load = LoadState::default(),
                    "DOMContentLoaded" => self.load.dom_content_loaded = true,
                    "load" => self.load.loaded = true,
                    "networkIdle" => self.load.network_idle = true,
                    _ => {}
                }
            }

            ParsedEvent::DomContentEventFired => self.load.dom_content_loaded = true,

            ParsedEvent::LoadEventFired => self.load.loaded = true,

            ParsedEvent::FrameAttached {
                frame_id,
                parent_frame_id,
            } => {
                self.frames.entry(frame_id.clone()).or_insert_with(|| FrameInfo {
                    frame_id: frame_id.clone(),
                    parent_id: Some(parent_frame_id.clone()),
                    url: String::new(),
                });
            }

            ParsedEvent::FrameDetached { frame_id } => self.detach(frame_id),

            ParsedEvent::FrameNavigated {
                frame_id,
                parent_id,
                url,
            } => {
                self.frames.insert(
                    frame_id.clone(),
                    FrameInfo {
                        frame_id: frame_id.clone(),
                        parent_id: parent_id.clone(),
                        url: url.clone(),
                    },
                );

                if parent_id.is_none() {
                    if self.current.is_some() {
                        debug!(url, "Main frame navigated, returning to main frame");
                    }
                    self.main_frame = Some(frame_id.clone());
                    self.current = None;
                    let stale: Vec<FrameId> = self
                        .frames
                        .keys()
                        .filter(|f| *f != frame_id)
                        .cloned()
                        .collect();
                    for f in stale {
                        self.frames.remove(&f);
                        self.loading.remove(&f);
                    }
                }
            }

            ParsedEvent::FrameStartedLoading { frame_id } => {
                if self.is_main(frame_id) {
                    self.load = LoadState::default();
                }
                self.loading.insert(frame_id.clone());
            }

            ParsedEvent::FrameStoppedLoading { frame_id } => {
                self.loading.remove(frame_id);
            }

            ParsedEvent::ExecutionContextCreated {
                context_id,
                frame_id: Some(frame_id),
                is_default: true,
            } => {
                trace!(%frame_id, %context_id, "Default context created");
                self.contexts.insert(frame_id.clone(), *context_id);
            }

            ParsedEvent::ExecutionContextDestroyed { context_id } => {
                self.contexts.retain(|_, c| c != context_id);
            }

            ParsedEvent::ExecutionContextsCleared => self.contexts.clear(),

            _ => {}
        }
    }

    fn detach(&mut self, frame_id: &FrameId) {
        let mut doomed = vec![frame_id.clone()];
        let mut i = 0;
        while i < doomed.len() {
            let children = self.children(&doomed[i]);
            doomed.extend(children);
            i += 1;
        }

        for f in &doomed {
            self.frames.remove(f);
            self.contexts.remove(f);
            self.loading.remove(f);
        }

        if self.current.as_ref().is_some_and(|c| doomed.contains(c)) {
            debug!(%frame_id, "Current frame detached, returning to main frame");
            self.current = None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> FrameRegistry {
        let mut reg = FrameRegistry::new();
        reg.set_main_frame(FrameId::new("main"), "https://x.test/");
        reg.apply(&ParsedEvent::FrameAttached {
            frame_id: FrameId::new("child"),
            parent_frame_id: FrameId::new("main"),
        });
        reg.apply(&ParsedEvent::FrameAttached {
            frame_id: FrameId::new("grandchild"),
            parent_frame_id: FrameId::new("child"),
        });
        reg
    }

    fn context(frame: &str, id: i64) -> ParsedEvent {
        ParsedEvent::ExecutionContextCreated {
            context_id: ContextId::new(id),
            frame_id: Some(FrameId::new(frame)),
            is_default: true,
        }
    }

    #[test]
    fn test_current_context_follows_frame() {
        let mut reg = registry();
        reg.apply(&context("main", 1));
        reg.apply(&context("child", 2));

        assert_eq!(reg.current_context(), Some(ContextId::new(1)));

        reg.set_current(Some(FrameId::new("child")));
        assert_eq!(reg.current_context(), Some(ContextId::new(2)));

        reg.set_current(None);
        assert_eq!(reg.current_context(), Some(ContextId::new(1)));
    }

    #[test]
    fn test_non_default_context_ignored() {
        let mut reg = registry();
        reg.apply(&ParsedEvent::ExecutionContextCreated {
            context_id: ContextId::new(9),
            frame_id: Some(FrameId::new("main")),
            is_default: false,
        });
        assert_eq!(reg.current_context(), None);
    }

    #[test]
    fn test_main_navigation_resets_current() {
        let mut reg = registry();
        reg.set_current(Some(FrameId::new("child")));

        reg.apply(&ParsedEvent::FrameNavigated {
            frame_id: FrameId::new("main"),
            parent_id: None,
            url: "https://x.test/next".into(),
        });

        assert_eq!(reg.current_frame(), None);
        assert!(reg.frame(&FrameId::new("child")).is_none());
    }

    #[test]
    fn test_child_navigation_keeps_current() {
        let mut reg = registry();
        reg.set_current(Some(FrameId::new("child")));

        reg.apply(&ParsedEvent::FrameNavigated {
            frame_id: FrameId::new("child"),
            parent_id: Some(FrameId::new("main")),
            url: "https://x.test/inner".into(),
        });

        assert_eq!(reg.current_frame(), Some(&FrameId::new("child")));
        assert_eq!(reg.frame(&FrameId::new("child")).map(|f| f.url.as_str()), Some("https://x.test/inner"));
    }

    #[test]
    fn test_detaching_ancestor_resets_current() {
        let mut reg = registry();
        reg.apply(&context("grandchild", 3));
        reg.set_current(Some(FrameId::new("grandchild")));

        reg.apply(&ParsedEvent::FrameDetached {
            frame_id: FrameId::new("child"),
        });

        assert_eq!(reg.current_frame(), None);
        assert_eq!(reg.context_for(&FrameId::new("grandchild")), None);
    }

    #[test]
    fn test_context_destroyed_and_cleared() {
        let mut reg = registry();
        reg.apply(&context("main", 1));
        reg.apply(&context("child", 2));

        reg.apply(&ParsedEvent::ExecutionContextDestroyed {
            context_id: ContextId::new(2),
        });
        assert_eq!(reg.context_for(&FrameId::new("child")), None);
        assert_eq!(reg.context_for(&FrameId::new("main")), Some(ContextId::new(1)));

        reg.apply(&ParsedEvent::ExecutionContextsCleared);
        assert_eq!(reg.current_context(), None);
    }

    #[test]
    fn test_load_state_milestones() {
        let mut reg = registry();
        reg.apply(&ParsedEvent::FrameStartedLoading {
            frame_id: FrameId::new("main"),
        });
        reg.apply(&ParsedEvent::FrameStartedLoading {
            frame_id: FrameId::new("child"),
        });
        assert_eq!(reg.load_state().frames_loading, 2);

        reg.apply(&ParsedEvent::DomContentEventFired);
        reg.apply(&ParsedEvent::FrameStoppedLoading {
            frame_id: FrameId::new("child"),
        });
        let state = reg.load_state();
        assert!(state.dom_content_loaded);
        assert!(!state.loaded);
        assert_eq!(state.frames_loading, 1);

        reg.apply(&ParsedEvent::Lifecycle {
            frame_id: FrameId::new("main"),
            name: "networkIdle".into(),
        });
        reg.apply(&ParsedEvent::LoadEventFired);
        assert!(reg.load_state().network_idle);
        assert!(reg.load_state().loaded);

        reg.begin_navigation();
        assert_eq!(reg.load_state().frames_loading, 1);
        assert!(!reg.load_state().loaded);
    }

    #[test]
    fn test_child_lifecycle_ignored() {
        let mut reg = registry();
        reg.apply(&ParsedEvent::Lifecycle {
            frame_id: FrameId::new("child"),
            name: "load".into(),
        });
        assert!(!reg.load_state().loaded);
    }

    #[test]
    fn test_selecting_main_frame_is_main() {
        let mut reg = registry();
        reg.set_current(Some(FrameId::new("main")));
        assert_eq!(reg.current_frame(), None);
    }
}

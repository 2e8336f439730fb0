//! Navigation history abstraction.
//!
//! The session controller records screens into a platform history stack
//! and reacts when the platform restores an entry (back/forward gestures).
//! [`NavigationHistory`] is the only thing the controller knows about the
//! platform; [`InMemoryHistory`] is a browser-like implementation used by
//! the headless shell and in tests.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::view::View;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// State attached to one history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// View name as pushed. Kept as a string because platform history can
    /// hand back entries written by other builds.
    pub view: String,
}

impl HistoryEntry {
    pub fn new(view: View) -> Self {
        Self {
            view: view.as_str().to_owned(),
        }
    }

    /// The recorded view, if it is one this build knows.
    pub fn view(&self) -> Option<View> {
        self.view.parse().ok()
    }
}

/// Which way the platform moved through history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

/// Delivered when the platform restores a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySignal {
    pub direction: Direction,
    /// The restored entry; `None` for entries carrying no state (such as
    /// the page the session started on).
    pub entry: Option<HistoryEntry>,
}

impl HistorySignal {
    pub fn back(entry: Option<HistoryEntry>) -> Self {
        Self {
            direction: Direction::Back,
            entry,
        }
    }

    pub fn forward(entry: Option<HistoryEntry>) -> Self {
        Self {
            direction: Direction::Forward,
            entry,
        }
    }
}

/// Callback invoked for every restored entry.
pub type RestoreHandler = Box<dyn Fn(HistorySignal) + Send + Sync>;

/// A platform navigation-history stack.
pub trait NavigationHistory: Send + Sync {
    /// Record a new entry on top of the current one.
    fn push(&self, entry: HistoryEntry);

    /// Register the handler for restored entries, replacing any previous one.
    fn on_restore(&self, handler: RestoreHandler);
}

// ---------------------------------------------------------------------------
// InMemoryHistory
// ---------------------------------------------------------------------------

/// Browser-style history: starts with one stateless entry, `push` drops any
/// forward entries, and `back`/`forward` move a cursor.
#[derive(Default)]
pub struct InMemoryHistory {
    stack: Mutex<Stack>,
    handler: Mutex<Option<Arc<dyn Fn(HistorySignal) + Send + Sync>>>,
}

struct Stack {
    entries: Vec<Option<HistoryEntry>>,
    cursor: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self {
            entries: vec![None],
            cursor: 0,
        }
    }
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step back one entry. Returns `false` if already at the oldest entry.
    pub fn back(&self) -> bool {
        self.step(Direction::Back)
    }

    /// Step forward one entry. Returns `false` if already at the newest.
    pub fn forward(&self) -> bool {
        self.step(Direction::Forward)
    }

    /// The entry the cursor is on.
    pub fn current(&self) -> Option<HistoryEntry> {
        match self.stack.lock() {
            Ok(stack) => stack.entries[stack.cursor].clone(),
            Err(_) => None,
        }
    }

    /// Number of entries, including the initial stateless one.
    pub fn len(&self) -> usize {
        self.stack.lock().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn step(&self, direction: Direction) -> bool {
        let entry = {
            let Ok(mut stack) = self.stack.lock() else {
                warn!("history stack poisoned");
                return false;
            };
            match direction {
                Direction::Back if stack.cursor > 0 => stack.cursor -= 1,
                Direction::Forward if stack.cursor + 1 < stack.entries.len() => stack.cursor += 1,
                _ => return false,
            }
            stack.entries[stack.cursor].clone()
        };

        // Call out without holding the stack lock: the handler may push.
        let handler = self.handler.lock().ok().and_then(|h| h.clone());
        if let Some(handler) = handler {
            handler(HistorySignal { direction, entry });
        }
        true
    }
}

impl NavigationHistory for InMemoryHistory {
    fn push(&self, entry: HistoryEntry) {
        let Ok(mut stack) = self.stack.lock() else {
            warn!("history stack poisoned");
            return;
        };
        let keep = stack.cursor + 1;
        stack.entries.truncate(keep);
        debug!(view = %entry.view, depth = keep + 1, "history entry pushed");
        stack.entries.push(Some(entry));
        stack.cursor = keep;
    }

    fn on_restore(&self, handler: RestoreHandler) {
        if let Ok(mut slot) = self.handler.lock() {
            *slot = Some(Arc::from(handler));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

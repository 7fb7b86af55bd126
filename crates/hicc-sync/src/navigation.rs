//! The host's navigation log.
//!
//! In a browser this is the address bar plus the session history. HICC does
//! not own it: the user can move through it (back/forward, editing the URL)
//! at any time, so sync backends treat it as a peer to observe.

use bitflags::bitflags;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::watch;

bitflags! {
    /// Optional features of a navigation log.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        /// The log notifies subscribers when the current entry changes.
        const CHANGE_EVENTS = 0b0000_0001;
        /// Entries can carry a state object alongside the URL.
        const STATE_OBJECTS = 0b0000_0010;
    }
}

/// One entry of the navigation log.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationEntry {
    /// The raw URL, exactly as the host stores it.
    pub url: String,
    /// State object attached by the application, if any.
    pub state: Option<Value>,
}

impl NavigationEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: None,
        }
    }

    pub fn with_state(url: impl Into<String>, state: Value) -> Self {
        Self {
            url: url.into(),
            state: Some(state),
        }
    }
}

/// Access to the host's navigation log.
#[cfg_attr(test, mockall::automock)]
pub trait NavigationLog: Send + Sync {
    /// What this log supports.
    fn capabilities(&self) -> Capabilities;

    /// The current entry.
    fn current(&self) -> NavigationEntry;

    /// Add a new entry after the current one, dropping any forward entries.
    fn push(&self, entry: NavigationEntry);

    /// Overwrite the current entry.
    fn replace(&self, entry: NavigationEntry);

    /// Change notifications, if the log supports them.
    ///
    /// The value is a change counter; only its changes matter.
    fn subscribe(&self) -> Option<watch::Receiver<u64>>;
}

// =============================================================================
// MemoryNavigationLog
// =============================================================================

struct Entries {
    entries: Vec<NavigationEntry>,
    cursor: usize,
}

/// An in-process navigation log with back/forward support.
///
/// Used by the headless dashboard and by tests to play the role of the
/// browser. Every change of the current entry is broadcast, including the
/// application's own writes, the way browsers fire `hashchange` for them.
pub struct MemoryNavigationLog {
    inner: RwLock<Entries>,
    capabilities: Capabilities,
    tx: watch::Sender<u64>,
}

impl MemoryNavigationLog {
    /// Create a log holding a single entry, with every capability.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_capabilities(url, Capabilities::all())
    }

    /// Create a log with a restricted capability set.
    pub fn with_capabilities(url: impl Into<String>, capabilities: Capabilities) -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            inner: RwLock::new(Entries {
                entries: vec![NavigationEntry::new(url)],
                cursor: 0,
            }),
            capabilities,
            tx,
        }
    }

    /// Simulate the user typing a URL: a new entry without state.
    pub fn navigate(&self, url: impl Into<String>) {
        self.push(NavigationEntry::new(url));
    }

    /// Simulate the back button. Returns false at the oldest entry.
    pub fn back(&self) -> bool {
        let moved = {
            let mut inner = self.inner.write();
            if inner.cursor > 0 {
                inner.cursor -= 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.notify();
        }
        moved
    }

    /// Simulate the forward button. Returns false at the newest entry.
    pub fn forward(&self) -> bool {
        let moved = {
            let mut inner = self.inner.write();
            if inner.cursor + 1 < inner.entries.len() {
                inner.cursor += 1;
                true
            } else {
                false
            }
        };
        if moved {
            self.notify();
        }
        moved
    }

    /// Number of entries in the log.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Index of the current entry.
    pub fn position(&self) -> usize {
        self.inner.read().cursor
    }

    /// A copy of every entry, oldest first.
    pub fn entries(&self) -> Vec<NavigationEntry> {
        self.inner.read().entries.clone()
    }

    fn notify(&self) {
        self.tx.send_modify(|n| *n += 1);
    }
}

impl NavigationLog for MemoryNavigationLog {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn current(&self) -> NavigationEntry {
        let inner = self.inner.read();
        inner.entries[inner.cursor].clone()
    }

    fn push(&self, entry: NavigationEntry) {
        {
            let mut inner = self.inner.write();
            let keep = inner.cursor + 1;
            inner.entries.truncate(keep);
            inner.entries.push(entry);
            inner.cursor = keep;
            tracing::trace!("Pushed navigation entry, depth: {}", inner.entries.len());
        }
        self.notify();
    }

    fn replace(&self, entry: NavigationEntry) {
        let changed = {
            let mut inner = self.inner.write();
            let cursor = inner.cursor;
            let changed = inner.entries[cursor] != entry;
            inner.entries[cursor] = entry;
            changed
        };
        if changed {
            self.notify();
        }
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        if self.capabilities.contains(Capabilities::CHANGE_EVENTS) {
            Some(self.tx.subscribe())
        } else {
            None
        }
    }
}

//! URL state persistence for the HICC dashboard.
//!
//! This crate provides:
//! - `NavigationLog` - the host's address bar and session history
//! - `HashSync` - exposed parameters in the URL fragment
//! - `HistorySync` - exposed parameters in navigation state objects
//! - `DetachedSync` - no persistence at all
//! - `SyncWatcher` - the task that notices out-of-band navigation
//!
//! ## Save Rule
//!
//! Saving writes the exposed string to the log. If the log already holds an
//! equal value, or nothing at all, the current entry is replaced; otherwise a
//! new entry is pushed so back/forward walks through query states. The
//! in-memory snapshot is updated on every save, before the write, so a
//! watcher woken by the write already sees the new snapshot.
//!
//! ## Drift
//!
//! The log drifted when its stored string differs from the snapshot under
//! the backend's [`ChangeStrategy`]. Comparing against the snapshot is what
//! keeps the backend from reloading on its own writes.

use std::time::Duration;

use hicc_core::{has_changed, ChangeStrategy, SetupError};
use tokio::sync::watch;

mod detached;
mod hash;
mod history;
mod navigation;
mod watcher;

pub use detached::DetachedSync;
pub use hash::HashSync;
pub use history::HistorySync;
pub use navigation::{Capabilities, MemoryNavigationLog, NavigationEntry, NavigationLog};
pub use watcher::SyncWatcher;

/// How a sync backend learns about external changes.
#[derive(Debug)]
pub enum ChangeSource {
    /// The log notifies on change.
    Notify(watch::Receiver<u64>),
    /// The log has to be polled.
    Poll(Duration),
    /// Nothing to watch.
    Disabled,
}

/// Persistence of the exposed parameters in an external channel.
pub trait StateSync: Send + Sync {
    /// Backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Check that the host provides what this backend needs.
    fn init(&self) -> Result<(), SetupError> {
        Ok(())
    }

    /// Persist the exposed string and remember it as the snapshot.
    fn save(&self, exposed: &str);

    /// The value currently held by the external channel, read raw.
    fn stored_string(&self) -> String;

    /// The last value written to or read from the external channel.
    fn last_known(&self) -> String;

    /// Overwrite the snapshot without writing to the channel.
    fn remember(&self, snapshot: &str);

    /// How stored strings are compared with the snapshot.
    fn strategy(&self) -> ChangeStrategy;

    /// Where change signals come from. `interval` is used when polling.
    fn change_source(&self, interval: Duration) -> ChangeSource;

    /// The stored string, if it drifted from the snapshot.
    fn drift(&self) -> Option<String> {
        let stored = self.stored_string();
        if has_changed(self.strategy(), &self.last_known(), &stored) {
            Some(stored)
        } else {
            None
        }
    }
}

/// Decide between pushing and replacing, then write.
///
/// Shared by the log-backed backends so they follow the same save rule.
pub(crate) fn write_entry(
    log: &dyn NavigationLog,
    strategy: ChangeStrategy,
    stored: &str,
    exposed: &str,
    entry: NavigationEntry,
) {
    if stored.is_empty() || !has_changed(strategy, stored, exposed) {
        tracing::trace!("Replacing navigation entry with '{}'", exposed);
        log.replace(entry);
    } else {
        tracing::debug!("Pushing navigation entry '{}'", exposed);
        log.push(entry);
    }
}

/// Change source for a log: its notifications if it has them, else polling.
pub(crate) fn log_change_source(log: &dyn NavigationLog, interval: Duration) -> ChangeSource {
    if log.capabilities().contains(Capabilities::CHANGE_EVENTS) {
        if let Some(rx) = log.subscribe() {
            return ChangeSource::Notify(rx);
        }
    }
    ChangeSource::Poll(interval)
}

//! Exposed parameters stored in the URL fragment.

use std::sync::Arc;
use std::time::Duration;

use hicc_core::ChangeStrategy;
use parking_lot::RwLock;

use crate::navigation::{NavigationEntry, NavigationLog};
use crate::{log_change_source, write_entry, ChangeSource, StateSync};

/// Keeps exposed parameters in `#name=value&...`.
///
/// The fragment is always read from the raw URL. Hosts disagree on whether
/// their fragment accessor unescapes, but they leave the full URL alone.
/// For the same reason drift is only reported when the fragment differs from
/// the snapshot both raw and decoded.
pub struct HashSync {
    log: Arc<dyn NavigationLog>,
    last_known: RwLock<String>,
}

impl HashSync {
    pub fn new(log: Arc<dyn NavigationLog>) -> Self {
        Self {
            log,
            last_known: RwLock::new(String::new()),
        }
    }
}

/// Split a URL into the part before `#` and the fragment.
fn split_fragment(url: &str) -> (&str, &str) {
    url.split_once('#').unwrap_or((url, ""))
}

impl StateSync for HashSync {
    fn name(&self) -> &'static str {
        "HashSync"
    }

    fn save(&self, exposed: &str) {
        let url = self.log.current().url;
        let (base, stored) = split_fragment(&url);
        let entry = NavigationEntry::new(format!("{base}#{exposed}"));
        // Snapshot first: the write notifies watchers
        self.remember(exposed);
        write_entry(self.log.as_ref(), self.strategy(), stored, exposed, entry);
    }

    fn stored_string(&self) -> String {
        let url = self.log.current().url;
        split_fragment(&url).1.to_string()
    }

    fn last_known(&self) -> String {
        self.last_known.read().clone()
    }

    fn remember(&self, snapshot: &str) {
        *self.last_known.write() = snapshot.to_string();
    }

    fn strategy(&self) -> ChangeStrategy {
        ChangeStrategy::DecodedTolerant
    }

    fn change_source(&self, interval: Duration) -> ChangeSource {
        log_change_source(self.log.as_ref(), interval)
    }
}

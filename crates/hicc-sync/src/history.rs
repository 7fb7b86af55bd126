//! Exposed parameters stored in navigation state objects.

use std::sync::Arc;
use std::time::Duration;

use hicc_core::{ChangeStrategy, SetupError};
use parking_lot::RwLock;
use serde_json::json;

use crate::navigation::{Capabilities, NavigationEntry, NavigationLog};
use crate::{log_change_source, write_entry, ChangeSource, StateSync};

/// Keeps exposed parameters in a `{"params": "..."}` state object and mirrors
/// them as the URL's query string so the page stays bookmarkable.
///
/// On a fresh page load there is no state object yet; the query string is
/// read instead.
pub struct HistorySync {
    log: Arc<dyn NavigationLog>,
    last_known: RwLock<String>,
}

impl HistorySync {
    pub fn new(log: Arc<dyn NavigationLog>) -> Self {
        Self {
            log,
            last_known: RwLock::new(String::new()),
        }
    }
}

/// The part of a URL before its query string and fragment.
fn base_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// The query string of a URL, without the fragment.
fn query_of(url: &str) -> &str {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    without_fragment
        .split_once('?')
        .map_or("", |(_, query)| query)
}

impl StateSync for HistorySync {
    fn name(&self) -> &'static str {
        "HistorySync"
    }

    fn init(&self) -> Result<(), SetupError> {
        if !self
            .log
            .capabilities()
            .contains(Capabilities::STATE_OBJECTS)
        {
            return Err(SetupError::MissingRequiredExternalLibrary {
                sync: "HistorySync",
                library: "a navigation state API",
            });
        }
        Ok(())
    }

    fn save(&self, exposed: &str) {
        let url = self.log.current().url;
        let stored = self.stored_string();
        let entry = NavigationEntry::with_state(
            format!("{}?{}", base_url(&url), exposed),
            json!({ "params": exposed }),
        );
        // Snapshot first: the write notifies watchers
        self.remember(exposed);
        write_entry(self.log.as_ref(), self.strategy(), &stored, exposed, entry);
    }

    fn stored_string(&self) -> String {
        let entry = self.log.current();
        if let Some(params) = entry
            .state
            .as_ref()
            .and_then(|s| s.get("params"))
            .and_then(|p| p.as_str())
        {
            return params.to_string();
        }
        query_of(&entry.url).to_string()
    }

    fn last_known(&self) -> String {
        self.last_known.read().clone()
    }

    fn remember(&self, snapshot: &str) {
        *self.last_known.write() = snapshot.to_string();
    }

    fn strategy(&self) -> ChangeStrategy {
        ChangeStrategy::Raw
    }

    fn change_source(&self, interval: Duration) -> ChangeSource {
        log_change_source(self.log.as_ref(), interval)
    }
}

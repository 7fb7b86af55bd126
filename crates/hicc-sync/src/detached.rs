//! No persistence.

use std::time::Duration;

use hicc_core::ChangeStrategy;
use parking_lot::RwLock;

use crate::{ChangeSource, StateSync};

/// A sync backend for dashboards that do not persist state.
///
/// Saves only update the snapshot; there is never anything stored and never
/// anything to watch.
#[derive(Default)]
pub struct DetachedSync {
    last_known: RwLock<String>,
}

impl DetachedSync {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateSync for DetachedSync {
    fn name(&self) -> &'static str {
        "DetachedSync"
    }

    fn save(&self, exposed: &str) {
        self.remember(exposed);
    }

    fn stored_string(&self) -> String {
        String::new()
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

    fn change_source(&self, _interval: Duration) -> ChangeSource {
        ChangeSource::Disabled
    }

    fn drift(&self) -> Option<String> {
        None
    }
}

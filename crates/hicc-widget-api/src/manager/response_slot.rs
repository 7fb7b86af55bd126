//! The most recent response, with change notifications.
//!
//! Storing a response also broadcasts it, so subscribers cannot miss a
//! response that widgets have seen.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use hicc_core::{Response, ResponsePolicy};

/// Holds the current response and hands out request sequence numbers.
pub struct ResponseSlot {
    inner: RwLock<Option<Arc<Response>>>,
    tx: watch::Sender<Option<Arc<Response>>>,
    next_seq: AtomicU64,
    policy: ResponsePolicy,
}

impl ResponseSlot {
    pub fn new(policy: ResponsePolicy) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            inner: RwLock::new(None),
            tx,
            next_seq: AtomicU64::new(0),
            policy,
        }
    }

    /// Allocate the sequence number for a new request. The first is 1.
    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Store a response, subject to the response policy.
    ///
    /// Returns false if the response was discarded as stale.
    pub fn accept(&self, response: Arc<Response>) -> bool {
        let mut inner = self.inner.write();
        if self.policy == ResponsePolicy::DiscardStale {
            if let Some(current) = inner.as_ref() {
                if current.seq() > response.seq() {
                    tracing::debug!(
                        "Discarding response #{} (current is #{})",
                        response.seq(),
                        current.seq()
                    );
                    return false;
                }
            }
        }
        tracing::trace!("Storing response #{}", response.seq());
        *inner = Some(response.clone());
        self.tx.send_replace(Some(response));
        true
    }

    pub fn current(&self) -> Option<Arc<Response>> {
        self.inner.read().clone()
    }

    /// Subscribe to response changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Response>>> {
        self.tx.subscribe()
    }
}

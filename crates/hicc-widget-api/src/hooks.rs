//! Error hooks for failed request cycles.
//!
//! A failed request never surfaces as an `Err` from the manager. Instead every
//! registered hook is called with the error, in registration order.
//!
//! ## Error Isolation
//!
//! Hooks run inside `catch_unwind`. A panicking hook is logged and the next
//! hook still runs. With no hooks registered the error is logged at
//! `error` level.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hicc_core::RequestError;

/// Global counter for generating unique hook IDs.
static HOOK_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_hook_id() -> String {
    let id = HOOK_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("hook:{}", id)
}

/// Callback invoked with a request failure.
pub type ErrorHookFn = Arc<dyn Fn(&RequestError) + Send + Sync>;

struct HookEntry {
    id: String,
    hook: ErrorHookFn,
}

/// Registry for error hooks.
pub struct ErrorHooks {
    hooks: RwLock<Vec<HookEntry>>,
}

impl ErrorHooks {
    pub fn new() -> Self {
        Self {
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Register a hook. Returns its ID for later removal.
    pub fn add(&self, hook: ErrorHookFn) -> String {
        let id = generate_hook_id();
        self.hooks.write().push(HookEntry {
            id: id.clone(),
            hook,
        });
        tracing::debug!("Added error hook (id: {})", id);
        id
    }

    /// Remove a hook by ID.
    ///
    /// Returns true if the hook was found and removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut hooks = self.hooks.write();
        if let Some(pos) = hooks.iter().position(|h| h.id == id) {
            hooks.remove(pos);
            tracing::debug!("Removed error hook (id: {})", id);
            return true;
        }
        false
    }

    pub fn count(&self) -> usize {
        self.hooks.read().len()
    }

    /// Report an error to every hook.
    pub fn dispatch(&self, error: &RequestError) {
        // Snapshot so hooks may register or remove hooks themselves
        let hooks: Vec<(String, ErrorHookFn)> = self
            .hooks
            .read()
            .iter()
            .map(|h| (h.id.clone(), h.hook.clone()))
            .collect();

        if hooks.is_empty() {
            tracing::error!("Request failed: {}", error);
            return;
        }

        for (id, hook) in hooks {
            if catch_unwind(AssertUnwindSafe(|| hook(error))).is_err() {
                tracing::error!("Error hook '{}' panicked", id);
            }
        }
    }
}

impl Default for ErrorHooks {
    fn default() -> Self {
        Self::new()
    }
}

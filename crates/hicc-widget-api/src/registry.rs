//! Registered widgets, in registration order.

use parking_lot::RwLock;
use std::sync::Arc;

use hicc_core::SetupError;

use crate::widget::{Widget, WidgetContext};

struct WidgetEntry {
    widget: Arc<dyn Widget>,
    ctx: WidgetContext,
}

/// Storage for registered widgets.
///
/// Hooks are fanned out in registration order, so entries live in a `Vec`
/// rather than a map.
pub struct WidgetRegistry {
    entries: RwLock<Vec<WidgetEntry>>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register a widget.
    ///
    /// Returns an error if a widget with the same id already exists.
    pub fn add(&self, widget: Arc<dyn Widget>, ctx: WidgetContext) -> Result<(), SetupError> {
        let mut entries = self.entries.write();
        if entries.iter().any(|e| e.widget.id() == widget.id()) {
            return Err(SetupError::DuplicateWidgetId(widget.id().to_string()));
        }
        tracing::info!("Registered widget: {}", widget.id());
        entries.push(WidgetEntry { widget, ctx });
        Ok(())
    }

    /// Widgets and their contexts, in registration order.
    ///
    /// Hooks are run on this copy so they can register widgets themselves.
    pub fn snapshot(&self) -> Vec<(Arc<dyn Widget>, WidgetContext)> {
        self.entries
            .read()
            .iter()
            .map(|e| (e.widget.clone(), e.ctx.clone()))
            .collect()
    }

    /// The context handed to a widget at registration.
    pub fn context(&self, id: &str) -> Option<WidgetContext> {
        self.entries
            .read()
            .iter()
            .find(|e| e.widget.id() == id)
            .map(|e| e.ctx.clone())
    }

    /// Registered ids, in registration order.
    pub fn list(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.widget.id().to_string())
            .collect()
    }

    pub fn exists(&self, id: &str) -> bool {
        self.entries.read().iter().any(|e| e.widget.id() == id)
    }

    pub fn count(&self) -> usize {
        self.entries.read().len()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

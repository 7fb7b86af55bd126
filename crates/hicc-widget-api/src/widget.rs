//! The widget contract.
//!
//! A widget is any participant in the request cycle. It implements
//! [`Widget`] and overrides only the hooks it cares about. Each widget gets
//! a [`WidgetContext`] when it is registered; every hook receives it, and the
//! caller that registered the widget keeps a copy to forward user events.

use std::sync::{Arc, Weak};

use hicc_core::{ParameterStore, Response};

use crate::manager::{Manager, RequestHandle, Shared};

/// A participant in the request cycle.
///
/// Hooks run synchronously on the task driving the cycle, in registration
/// order. They may mutate the store and start new requests through the
/// context.
pub trait Widget: Send + Sync {
    /// Unique id within a manager.
    fn id(&self) -> &str;

    /// Offset used when this widget starts a request without naming one.
    fn start(&self) -> Option<u64> {
        None
    }

    /// Servlet used when this widget starts a request without naming one.
    fn servlet(&self) -> Option<&str> {
        None
    }

    /// Called once, after the store was seeded from external state.
    fn init(&self, _ctx: &WidgetContext) {}

    /// Called before every request is sent.
    fn before_request(&self, _ctx: &WidgetContext) {}

    /// Called after a response was received and stored.
    fn after_request(&self, _ctx: &WidgetContext) {}
}

/// A widget's handle on the manager.
///
/// Cheap to clone. Holds the manager weakly, so a widget that keeps its
/// context does not keep the manager alive.
#[derive(Clone)]
pub struct WidgetContext {
    widget_id: Arc<str>,
    start: Option<u64>,
    servlet: Option<String>,
    shared: Arc<Shared>,
    manager: Weak<Manager>,
}

impl WidgetContext {
    pub(crate) fn new(
        widget: &dyn Widget,
        shared: Arc<Shared>,
        manager: Weak<Manager>,
    ) -> Self {
        Self {
            widget_id: Arc::from(widget.id()),
            start: widget.start(),
            servlet: widget.servlet().map(str::to_string),
            shared,
            manager,
        }
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    /// Mutate the parameter store.
    pub fn with_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut ParameterStore) -> R,
    {
        f(&mut *self.shared.store.write())
    }

    /// Read the parameter store.
    pub fn read_store<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ParameterStore) -> R,
    {
        f(&*self.shared.store.read())
    }

    /// The most recent response, if any.
    pub fn response(&self) -> Option<Arc<Response>> {
        self.shared.responses.current()
    }

    /// Start a request cycle in the background.
    ///
    /// Missing arguments fall back to this widget's defaults, then to the
    /// manager's. Returns `None` if the manager is gone.
    pub fn do_request(&self, start: Option<u64>, servlet: Option<&str>) -> Option<RequestHandle> {
        let manager = self.manager.upgrade()?;
        let start = start.or(self.start);
        let servlet = servlet.map(str::to_string).or_else(|| self.servlet.clone());
        tracing::debug!("Widget '{}' requested a cycle", self.widget_id);
        Some(manager.spawn_request(start, servlet))
    }
}

impl std::fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetContext")
            .field("widget_id", &self.widget_id)
            .field("start", &self.start)
            .field("servlet", &self.servlet)
            .finish_non_exhaustive()
    }
}

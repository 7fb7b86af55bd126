//! Free-text query widget.

use hicc_core::ParameterStore;

use crate::manager::RequestHandle;
use crate::widget::{Widget, WidgetContext};

/// Base for widgets that own the main query `q`.
///
/// Setting a new query restarts paging at 0.
pub struct TextWidget {
    id: String,
    start: Option<u64>,
    servlet: Option<String>,
}

impl TextWidget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: Some(0),
            servlet: None,
        }
    }

    pub fn with_servlet(mut self, servlet: impl Into<String>) -> Self {
        self.servlet = Some(servlet.into());
        self
    }

    /// Set the query. Returns true if it changed.
    pub fn set(&self, ctx: &WidgetContext, q: &str) -> bool {
        change_selection(ctx, |store| store.get("q").set_val(q))
    }

    /// Remove the query. Returns true if there was one.
    pub fn clear(&self, ctx: &WidgetContext) -> bool {
        change_selection(ctx, |store| {
            store.remove("q");
        })
    }

    /// Set the query and, if it changed, run a request.
    pub fn submit(&self, ctx: &WidgetContext, q: &str) -> Option<RequestHandle> {
        if self.set(ctx, q) {
            ctx.do_request(None, None)
        } else {
            None
        }
    }

    /// Clear the query and, if there was one, run a request.
    pub fn unclick(&self, ctx: &WidgetContext) -> Option<RequestHandle> {
        if self.clear(ctx) {
            ctx.do_request(None, None)
        } else {
            None
        }
    }

    /// The current query, if any.
    pub fn query(&self, ctx: &WidgetContext) -> Option<String> {
        ctx.read_store(query_of)
    }
}

/// Apply `f` to the store and report whether the value of `q` changed.
fn change_selection<F>(ctx: &WidgetContext, f: F) -> bool
where
    F: FnOnce(&mut ParameterStore),
{
    ctx.with_store(|store| {
        let before = query_of(store);
        f(store);
        before != query_of(store)
    })
}

fn query_of(store: &ParameterStore) -> Option<String> {
    store.lookup("q").and_then(|p| p.val()).map(str::to_string)
}

impl Widget for TextWidget {
    fn id(&self) -> &str {
        &self.id
    }

    fn start(&self) -> Option<u64> {
        self.start
    }

    fn servlet(&self) -> Option<&str> {
        self.servlet.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Manager;
    use crate::transport::mock::MockTransport;
    use hicc_core::ManagerConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_set_and_clear() {
        let manager = Manager::builder(ManagerConfig::default())
            .transport(Arc::new(MockTransport::new()))
            .build();
        let widget = Arc::new(TextWidget::new("text"));
        let ctx = manager.add_widget(widget.clone()).unwrap();

        assert!(widget.set(&ctx, "error"));
        assert!(!widget.set(&ctx, "error"));
        assert_eq!(widget.query(&ctx), Some("error".to_string()));

        assert!(widget.clear(&ctx));
        assert!(!widget.clear(&ctx));
        assert_eq!(widget.query(&ctx), None);
    }

    #[tokio::test]
    async fn test_submit_resets_paging() {
        let transport = MockTransport::new();
        let manager = Manager::builder(ManagerConfig::default())
            .transport(Arc::new(transport.clone()))
            .build();
        let widget = Arc::new(TextWidget::new("text"));
        let ctx = manager.add_widget(widget.clone()).unwrap();
        manager.with_store(|store| store.get("start").set_val("40"));

        let handle = widget.submit(&ctx, "disk full").unwrap();
        assert!(handle.join().await.unwrap().is_completed());
        assert_eq!(
            transport.last_request().unwrap().params(),
            "start=0&q=disk+full&wt=json"
        );

        // Same query again: nothing to do
        assert!(widget.submit(&ctx, "disk full").is_none());
        assert_eq!(transport.request_count(), 1);
    }
}

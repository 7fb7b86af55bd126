//! Spellcheck widget.

use parking_lot::Mutex;

use crate::widget::{Widget, WidgetContext};

/// Asks the backend to spellcheck the main query and keeps the suggestions.
///
/// Spellchecking is on while the store has a non-empty `spellcheck`
/// parameter. Before each request the query is copied into `spellcheck.q`;
/// after it, the suggestions are collected.
pub struct SpellcheckWidget {
    id: String,
    suggestions: Mutex<Vec<(String, Vec<String>)>>,
}

impl SpellcheckWidget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            suggestions: Mutex::new(Vec::new()),
        }
    }

    /// Suggestions from the last response, per misspelled word.
    pub fn suggestions(&self) -> Vec<(String, Vec<String>)> {
        self.suggestions.lock().clone()
    }

    /// The spellchecked query with every misspelled word replaced by its first
    /// suggestion. `None` if nothing was misspelled.
    pub fn suggestion(&self, ctx: &WidgetContext) -> Option<String> {
        let suggestions = self.suggestions.lock();
        if suggestions.is_empty() {
            return None;
        }
        let response = ctx.response()?;
        let mut q = response.header_param("spellcheck.q")?.to_string();
        for (word, candidates) in suggestions.iter() {
            if let Some(first) = candidates.first() {
                q = q.replace(word.as_str(), first);
            }
        }
        Some(q)
    }
}

impl Widget for SpellcheckWidget {
    fn id(&self) -> &str {
        &self.id
    }

    fn before_request(&self, ctx: &WidgetContext) {
        ctx.with_store(|store| {
            let enabled = store
                .lookup("spellcheck")
                .and_then(|p| p.val())
                .is_some_and(|v| !v.is_empty());
            let q = store
                .lookup("q")
                .and_then(|p| p.val())
                .map(str::to_string)
                .filter(|q| !q.is_empty());

            match q {
                Some(q) if enabled => store.get("spellcheck.q").set_val(q),
                _ => {
                    store.remove("spellcheck.q");
                }
            }
        });
    }

    fn after_request(&self, ctx: &WidgetContext) {
        let found = ctx
            .response()
            .map(|r| r.spellcheck_suggestions())
            .unwrap_or_default();
        tracing::debug!("Spellcheck found {} misspelled words", found.len());
        *self.suggestions.lock() = found;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Manager;
    use crate::transport::mock::MockTransport;
    use hicc_core::ManagerConfig;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_copies_query_and_collects_suggestions() {
        let transport = MockTransport::new().with_reply(json!({
            "responseHeader": { "params": { "spellcheck.q": "eror levle" } },
            "spellcheck": {
                "suggestions": [
                    "eror", { "numFound": 1, "suggestion": ["error"] },
                    "levle", { "numFound": 2, "suggestion": ["level", "levee"] },
                    "collation", "error level"
                ]
            }
        }));
        let manager = Manager::builder(ManagerConfig::default())
            .transport(Arc::new(transport.clone()))
            .build();
        let widget = Arc::new(SpellcheckWidget::new("spell"));
        let ctx = manager.add_widget(widget.clone()).unwrap();

        manager.with_store(|store| {
            store.get("spellcheck").set_val("true");
            store.get("q").set_val("eror levle");
        });
        manager.do_request(None, None).await;

        assert_eq!(
            transport.last_request().unwrap().params(),
            "spellcheck=true&q=eror+levle&spellcheck.q=eror+levle&wt=json"
        );
        assert_eq!(
            widget.suggestions(),
            vec![
                ("eror".to_string(), vec!["error".to_string()]),
                (
                    "levle".to_string(),
                    vec!["level".to_string(), "levee".to_string()]
                ),
            ]
        );
        assert_eq!(widget.suggestion(&ctx), Some("error level".to_string()));
    }

    #[tokio::test]
    async fn test_disabled_removes_spellcheck_query() {
        let transport = MockTransport::new();
        let manager = Manager::builder(ManagerConfig::default())
            .transport(Arc::new(transport.clone()))
            .build();
        let widget = Arc::new(SpellcheckWidget::new("spell"));
        let ctx = manager.add_widget(widget.clone()).unwrap();

        manager.with_store(|store| {
            store.get("q").set_val("anything");
            store.get("spellcheck.q").set_val("stale");
        });
        manager.do_request(None, None).await;

        assert_eq!(
            transport.last_request().unwrap().params(),
            "q=anything&wt=json"
        );
        assert!(widget.suggestions().is_empty());
        assert_eq!(widget.suggestion(&ctx), None);
    }
}

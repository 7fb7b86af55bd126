//! Text summary of the latest response.

use parking_lot::Mutex;

use hicc_core::{FacetCount, Response};
use hicc_widget_api::{Widget, WidgetContext};

/// What the summary shows after a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub seq: u64,
    pub num_found: Option<u64>,
    pub facets: Vec<(String, Vec<FacetCount>)>,
}

impl Summary {
    fn from_response(response: &Response, fields: &[String]) -> Self {
        Self {
            seq: response.seq(),
            num_found: response.num_found(),
            facets: fields
                .iter()
                .map(|field| (field.clone(), response.facet_counts(field)))
                .collect(),
        }
    }

    /// Render as plain text, one facet field per block.
    pub fn render(&self) -> String {
        let mut out = match self.num_found {
            Some(n) => format!("{n} results\n"),
            None => "no result count\n".to_string(),
        };
        for (field, counts) in &self.facets {
            out.push_str(&format!("{field}:\n"));
            if counts.is_empty() {
                out.push_str("  (none)\n");
            }
            for count in counts {
                out.push_str(&format!("  {} ({})\n", count.value, count.count));
            }
        }
        out
    }
}

/// Requests facet counts for a few fields and summarizes each response.
pub struct SummaryWidget {
    id: String,
    facet_fields: Vec<String>,
    latest: Mutex<Option<Summary>>,
}

impl SummaryWidget {
    pub fn new(id: impl Into<String>, facet_fields: Vec<String>) -> Self {
        Self {
            id: id.into(),
            facet_fields,
            latest: Mutex::new(None),
        }
    }

    /// The summary of the most recent response.
    pub fn latest(&self) -> Option<Summary> {
        self.latest.lock().clone()
    }
}

impl Widget for SummaryWidget {
    fn id(&self) -> &str {
        &self.id
    }

    fn before_request(&self, ctx: &WidgetContext) {
        if self.facet_fields.is_empty() {
            return;
        }
        // Facet settings are internal: `get` does not expose them
        ctx.with_store(|store| {
            store.get("facet").set_val("true");
            let fields = store.get("facet.field");
            for field in &self.facet_fields {
                if fields.find(field).is_none() {
                    fields.add(field.clone());
                }
            }
        });
    }

    fn after_request(&self, ctx: &WidgetContext) {
        let Some(response) = ctx.response() else {
            return;
        };
        let summary = Summary::from_response(&response, &self.facet_fields);
        tracing::info!(
            "Response #{}: {} results",
            summary.seq,
            summary.num_found.unwrap_or(0)
        );
        *self.latest.lock() = Some(summary);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render() {
        let response = Response::new(
            3,
            json!({
                "response": { "numFound": 12, "docs": [] },
                "facet_counts": { "facet_fields": {
                    "host": ["web1", 8, "web2", 4],
                    "level": []
                }}
            }),
        );
        let summary =
            Summary::from_response(&response, &["host".to_string(), "level".to_string()]);
        assert_eq!(summary.seq, 3);

        insta::assert_snapshot!(summary.render().trim_end(), @r"
        12 results
        host:
          web1 (8)
          web2 (4)
        level:
          (none)
        ");
    }

    #[test]
    fn test_render_without_count() {
        let summary = Summary::default();
        assert_eq!(summary.render(), "no result count\n");
    }
}

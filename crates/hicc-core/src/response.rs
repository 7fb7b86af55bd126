//! Read-only view over a search response.

use serde_json::Value;

/// A parsed search response, tagged with the sequence number of the request
/// that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    seq: u64,
    body: Value,
}

/// One bucket of a facet field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

impl Response {
    pub fn new(seq: u64, body: Value) -> Self {
        Self { seq, body }
    }

    /// Sequence number of the request cycle this response answers.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The raw JSON payload.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// `response.numFound`, if present.
    pub fn num_found(&self) -> Option<u64> {
        self.body.pointer("/response/numFound")?.as_u64()
    }

    /// `response.docs`, empty if absent.
    pub fn docs(&self) -> &[Value] {
        self.body
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A request parameter echoed back in `responseHeader.params`.
    pub fn header_param(&self, name: &str) -> Option<&str> {
        self.body
            .get("responseHeader")?
            .get("params")?
            .get(name)?
            .as_str()
    }

    /// Counts for a facet field.
    ///
    /// Accepts both the `json.nl=map` form (`{"a": 3, "b": 1}`) and Solr's
    /// default flat form (`["a", 3, "b", 1]`).
    pub fn facet_counts(&self, field: &str) -> Vec<FacetCount> {
        let Some(node) = self
            .body
            .get("facet_counts")
            .and_then(|f| f.get("facet_fields"))
            .and_then(|f| f.get(field))
        else {
            return Vec::new();
        };

        match node {
            Value::Object(map) => map
                .iter()
                .filter_map(|(value, count)| {
                    Some(FacetCount {
                        value: value.clone(),
                        count: count.as_u64()?,
                    })
                })
                .collect(),
            Value::Array(flat) => flat
                .chunks(2)
                .filter_map(|pair| match pair {
                    [Value::String(value), count] => Some(FacetCount {
                        value: value.clone(),
                        count: count.as_u64()?,
                    }),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Spellcheck suggestions per misspelled word, in response order.
    ///
    /// Handles plain suggestion lists and `spellcheck.extendedResults`
    /// objects (`{"word": ..., "freq": ...}`). The `collation` and
    /// `correctlySpelled` entries are skipped.
    pub fn spellcheck_suggestions(&self) -> Vec<(String, Vec<String>)> {
        let Some(node) = self
            .body
            .get("spellcheck")
            .and_then(|s| s.get("suggestions"))
        else {
            return Vec::new();
        };

        let entries: Vec<(String, &Value)> = match node {
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
            Value::Array(flat) => flat
                .chunks(2)
                .filter_map(|pair| match pair {
                    [Value::String(word), detail] => Some((word.clone(), detail)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        entries
            .into_iter()
            .filter(|(word, _)| word != "collation" && word != "correctlySpelled")
            .filter_map(|(word, detail)| {
                let list = detail.get("suggestion")?.as_array()?;
                let words = list
                    .iter()
                    .filter_map(|s| match s {
                        Value::String(w) => Some(w.clone()),
                        other => other.get("word")?.as_str().map(str::to_string),
                    })
                    .collect();
                Some((word, words))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Response {
        Response::new(
            7,
            json!({
                "responseHeader": { "status": 0, "params": { "q": "error", "spellcheck.q": "eror" } },
                "response": { "numFound": 42, "docs": [{ "id": "1" }, { "id": "2" }] },
                "facet_counts": {
                    "facet_fields": {
                        "host": { "a": 30, "b": 12 },
                        "source": ["syslog", 40, "app", 2]
                    }
                },
                "spellcheck": {
                    "suggestions": [
                        "eror", { "numFound": 2, "suggestion": ["error", "eros"] },
                        "collation", "error"
                    ]
                }
            }),
        )
    }

    #[test]
    fn test_basic_accessors() {
        let response = sample();
        assert_eq!(response.seq(), 7);
        assert_eq!(response.num_found(), Some(42));
        assert_eq!(response.docs().len(), 2);
        assert_eq!(response.header_param("q"), Some("error"));
        assert_eq!(response.header_param("rows"), None);
    }

    #[test]
    fn test_facet_counts_both_forms() {
        let response = sample();
        let host = response.facet_counts("host");
        assert_eq!(host.len(), 2);
        assert!(host.contains(&FacetCount {
            value: "a".into(),
            count: 30
        }));

        let source = response.facet_counts("source");
        assert_eq!(
            source,
            vec![
                FacetCount {
                    value: "syslog".into(),
                    count: 40
                },
                FacetCount {
                    value: "app".into(),
                    count: 2
                },
            ]
        );

        assert!(response.facet_counts("missing").is_empty());
    }

    #[test]
    fn test_spellcheck_suggestions() {
        let response = sample();
        let suggestions = response.spellcheck_suggestions();
        assert_eq!(
            suggestions,
            vec![("eror".to_string(), vec!["error".to_string(), "eros".to_string()])]
        );

        let extended = Response::new(
            1,
            json!({
                "spellcheck": { "suggestions": {
                    "hsot": { "suggestion": [{ "word": "host", "freq": 3 }] },
                    "correctlySpelled": false
                }}
            }),
        );
        assert_eq!(
            extended.spellcheck_suggestions(),
            vec![("hsot".to_string(), vec!["host".to_string()])]
        );
    }

    #[test]
    fn test_empty_body() {
        let response = Response::new(0, json!({}));
        assert_eq!(response.num_found(), None);
        assert!(response.docs().is_empty());
        assert!(response.spellcheck_suggestions().is_empty());
    }
}

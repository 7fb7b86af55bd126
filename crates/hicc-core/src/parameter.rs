//! A single named query parameter.

use crate::codec::{decode, encode};
use crate::error::StateError;

/// A named query parameter with ordered values and local parameters.
///
/// Local parameters are Solr query modifiers rendered as a `{!k=v,...}` block
/// in front of every value, e.g. `q={!type=spatial,lat=5}hello`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    values: Vec<String>,
    locals: Vec<(String, String)>,
}

impl Parameter {
    /// Create a parameter with no values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            locals: Vec::new(),
        }
    }

    /// Create a parameter holding a single value.
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut param = Self::new(name);
        param.values.push(value.into());
        param
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first value, if any.
    pub fn val(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Replace every value with a single one.
    pub fn set_val(&mut self, value: impl Into<String>) {
        self.values.clear();
        self.values.push(value.into());
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Append a value.
    pub fn add(&mut self, value: impl Into<String>) {
        self.values.push(value.into());
    }

    /// Remove the first occurrence of `value`. Returns false if it was absent.
    pub fn remove(&mut self, value: &str) -> bool {
        match self.find(value) {
            Some(index) => {
                self.values.remove(index);
                true
            }
            None => false,
        }
    }

    /// Index of `value` among the values.
    pub fn find(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Get a local parameter.
    pub fn local(&self, key: &str) -> Option<&str> {
        self.locals
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a local parameter, keeping its position if it already exists.
    pub fn set_local(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.locals.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.locals.push((key, value)),
        }
    }

    /// Remove a local parameter, returning its value.
    pub fn remove_local(&mut self, key: &str) -> Option<String> {
        let index = self.locals.iter().position(|(k, _)| k == key)?;
        Some(self.locals.remove(index).1)
    }

    pub fn locals(&self) -> &[(String, String)] {
        &self.locals
    }

    /// True when the parameter would serialize to nothing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.locals.is_empty()
    }

    /// Serialize to `name=value` pairs joined by `&`.
    ///
    /// A parameter with locals but no values still emits one pair carrying the
    /// locals block, since Solr accepts a bare `q={!...}`.
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        self.push_pairs(&mut pairs);
        pairs.join("&")
    }

    pub(crate) fn push_pairs(&self, out: &mut Vec<String>) {
        if self.is_empty() {
            return;
        }
        let name = encode(&self.name);
        let prefix = self.locals_block();
        if self.values.is_empty() {
            out.push(format!("{name}={prefix}"));
            return;
        }
        for value in &self.values {
            out.push(format!("{name}={prefix}{}", encode(value)));
        }
    }

    fn locals_block(&self) -> String {
        if self.locals.is_empty() {
            return String::new();
        }
        let entries: Vec<String> = self
            .locals
            .iter()
            .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
            .collect();
        format!("{{!{}}}", entries.join(","))
    }

    /// Parse one raw `name=value` pair, with an optional locals block.
    pub fn parse_pair(raw: &str) -> Result<Self, StateError> {
        let (name, rest) = raw
            .split_once('=')
            .ok_or_else(|| StateError::MalformedPair(raw.to_string()))?;
        let name = decode(name);
        if name.is_empty() {
            return Err(StateError::MalformedPair(raw.to_string()));
        }

        let mut param = Self::new(name);
        let value = match rest.strip_prefix("{!") {
            Some(block) => {
                let (inner, value) = block
                    .split_once('}')
                    .ok_or_else(|| StateError::MalformedLocals(raw.to_string()))?;
                for entry in inner.split(',').filter(|e| !e.is_empty()) {
                    let (k, v) = entry
                        .split_once('=')
                        .ok_or_else(|| StateError::MalformedLocals(raw.to_string()))?;
                    param.set_local(decode(k), decode(v));
                }
                value
            }
            None => rest,
        };

        // `q={!type=spatial}` carries locals only.
        if !(value.is_empty() && !param.locals.is_empty()) {
            param.values.push(decode(value));
        }
        Ok(param)
    }

    /// Quote a field value for use in a Solr filter query.
    ///
    /// Values containing a space, colon, slash or quote are wrapped in quotes
    /// with `\` and `"` escaped, unless they are range queries
    /// (`[a TO b]`) or already quoted or grouped.
    pub fn escape_value(value: &str) -> String {
        let needs_quotes = value.contains([' ', ':', '/', '"']);
        if needs_quotes && !is_range(value) && !is_grouped(value) {
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            return format!("\"{escaped}\"");
        }
        value.to_string()
    }
}

fn is_range(value: &str) -> bool {
    value
        .char_indices()
        .filter(|(_, c)| *c == '[' || *c == '{')
        .any(|(open, _)| {
            let rest = &value[open + 1..];
            let Some(close) = rest.find([']', '}']) else {
                return false;
            };
            match rest[..close].split_once(" TO ") {
                Some((lo, hi)) => {
                    !lo.is_empty()
                        && !hi.is_empty()
                        && !lo.contains(char::is_whitespace)
                        && !hi.contains(char::is_whitespace)
                }
                None => false,
            }
        })
}

fn is_grouped(value: &str) -> bool {
    value.len() >= 2 && value.starts_with(['"', '(']) && value.ends_with(['"', ')'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_val_replaces_all_values() {
        let mut param = Parameter::new("fq");
        param.add("a");
        param.add("b");
        param.set_val("c");
        assert_eq!(param.values(), ["c"]);
        assert_eq!(param.val(), Some("c"));
    }

    #[test]
    fn test_multi_value_order() {
        let mut param = Parameter::new("fq");
        param.add("a");
        param.add("b");
        param.add("c");
        assert_eq!(param.values(), ["a", "b", "c"]);

        assert!(param.remove("b"));
        assert_eq!(param.values(), ["a", "c"]);

        // Removing an absent value is a no-op
        assert!(!param.remove("zzz"));
        assert_eq!(param.values(), ["a", "c"]);
    }

    #[test]
    fn test_locals_prefix_every_pair() {
        let mut param = Parameter::with_value("q", "hello");
        param.set_local("type", "spatial");
        param.set_local("lat", "5");
        assert_eq!(param.to_query_string(), "q={!type=spatial,lat=5}hello");

        param.add("world");
        assert_eq!(
            param.to_query_string(),
            "q={!type=spatial,lat=5}hello&q={!type=spatial,lat=5}world"
        );
    }

    #[test]
    fn test_set_local_keeps_position() {
        let mut param = Parameter::with_value("q", "x");
        param.set_local("a", "1");
        param.set_local("b", "2");
        param.set_local("a", "3");
        assert_eq!(param.local("a"), Some("3"));
        assert_eq!(param.to_query_string(), "q={!a=3,b=2}x");

        assert_eq!(param.remove_local("a"), Some("3".to_string()));
        assert_eq!(param.local("a"), None);
    }

    #[test]
    fn test_empty_parameter_serializes_to_nothing() {
        assert_eq!(Parameter::new("q").to_query_string(), "");

        let mut locals_only = Parameter::new("q");
        locals_only.set_local("type", "spatial");
        assert_eq!(locals_only.to_query_string(), "q={!type=spatial}");
    }

    #[test]
    fn test_parse_pair() {
        let param = Parameter::parse_pair("fq=host%3Aa+b").unwrap();
        assert_eq!(param.name(), "fq");
        assert_eq!(param.values(), ["host:a b"]);

        let param = Parameter::parse_pair("q={!type=spatial,lat=5}hello").unwrap();
        assert_eq!(param.local("type"), Some("spatial"));
        assert_eq!(param.local("lat"), Some("5"));
        assert_eq!(param.values(), ["hello"]);

        let param = Parameter::parse_pair("q={!type=spatial}").unwrap();
        assert!(param.values().is_empty());
        assert_eq!(param.local("type"), Some("spatial"));

        let param = Parameter::parse_pair("q=").unwrap();
        assert_eq!(param.values(), [""]);
    }

    #[test]
    fn test_parse_pair_rejects_malformed() {
        assert!(matches!(
            Parameter::parse_pair("novalue"),
            Err(StateError::MalformedPair(_))
        ));
        assert!(matches!(
            Parameter::parse_pair("=x"),
            Err(StateError::MalformedPair(_))
        ));
        assert!(matches!(
            Parameter::parse_pair("q={!type=spatial"),
            Err(StateError::MalformedLocals(_))
        ));
        assert!(matches!(
            Parameter::parse_pair("q={!type}x"),
            Err(StateError::MalformedLocals(_))
        ));
    }

    #[test]
    fn test_escape_value() {
        assert_eq!(Parameter::escape_value("plain"), "plain");
        assert_eq!(Parameter::escape_value("host:a"), "\"host:a\"");
        assert_eq!(Parameter::escape_value("a \"b\""), "\"a \\\"b\\\"\"");
        assert_eq!(Parameter::escape_value("[1 TO 5]"), "[1 TO 5]");
        assert_eq!(
            Parameter::escape_value("{* TO NOW}"),
            "{* TO NOW}"
        );
        assert_eq!(Parameter::escape_value("\"already quoted\""), "\"already quoted\"");
        assert_eq!(Parameter::escape_value("(a OR b)"), "(a OR b)");
    }
}

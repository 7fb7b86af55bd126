//! The parameter store shared by every widget of a dashboard.
//!
//! The store is an insertion-ordered set of parameters. A subset of names is
//! "exposed": those are persisted in the URL and restored on navigation, the
//! rest only live for the session.
//!
//! ## Change Detection
//!
//! Mutators that report a change (`add`, `add_by_value`, `remove_by_value`)
//! compare the exposed serialization before and after the mutation. There is
//! no structural diff.

use crate::change::{has_changed, ChangeStrategy};
use crate::error::StateError;
use crate::parameter::Parameter;

/// Names exposed by a store built with [`ParameterStore::new`].
pub const DEFAULT_EXPOSED: [&str; 3] = ["fq", "q", "start"];

/// Solr parameters that may be repeated in a single request.
const MULTIPLE: &[&str] = &[
    "bf",
    "bq",
    "facet.date",
    "facet.date.include",
    "facet.date.other",
    "facet.field",
    "facet.pivot",
    "facet.query",
    "facet.range",
    "facet.range.include",
    "facet.range.other",
    "fq",
    "group.field",
    "group.func",
    "group.query",
    "pf",
    "qf",
];

/// Whether `name` may carry several values.
pub fn is_multiple(name: &str) -> bool {
    MULTIPLE.contains(&name)
}

/// Ordered mapping of parameter name to [`Parameter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStore {
    params: Vec<Parameter>,
    exposed: Vec<String>,
}

impl ParameterStore {
    /// Create an empty store exposing [`DEFAULT_EXPOSED`].
    pub fn new() -> Self {
        Self::with_exposed(DEFAULT_EXPOSED)
    }

    /// Create an empty store exposing the given names.
    pub fn with_exposed<I, S>(exposed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut store = Self {
            params: Vec::new(),
            exposed: Vec::new(),
        };
        for name in exposed {
            store.expose(name);
        }
        store
    }

    // =========================================================================
    // Exposure
    // =========================================================================

    /// Mark a name as exposed. Returns true if it was not exposed before.
    pub fn expose(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.is_exposed(&name) {
            return false;
        }
        tracing::debug!("Exposing parameter '{}'", name);
        self.exposed.push(name);
        true
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.exposed.iter().any(|n| n == name)
    }

    pub fn exposed(&self) -> &[String] {
        &self.exposed
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Get a parameter, inserting an empty one if it is absent.
    ///
    /// This is not side-effect free: the empty parameter stays in the store
    /// (it serializes to nothing until a value is set).
    pub fn get(&mut self, name: &str) -> &mut Parameter {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                tracing::trace!("Creating parameter '{}' on access", name);
                self.params.push(Parameter::new(name));
                self.params.len() - 1
            }
        };
        &mut self.params[index]
    }

    /// Look a parameter up without creating it.
    pub fn lookup(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The values of `name`, empty if it is absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.lookup(name).map(Parameter::values).unwrap_or(&[])
    }

    /// Index of `value` among the values of `name`.
    pub fn find(&self, name: &str, value: &str) -> Option<usize> {
        self.lookup(name).and_then(|p| p.find(value))
    }

    /// Iterate over every parameter in insertion order.
    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert or replace a parameter and expose its name.
    ///
    /// A replaced parameter keeps its position. Returns whether the exposed
    /// state changed.
    pub fn add(&mut self, param: Parameter) -> bool {
        self.track_change(|store| {
            store.expose(param.name());
            match store.position(param.name()) {
                Some(index) => store.params[index] = param,
                None => store.params.push(param),
            }
        })
    }

    /// Set a value on `name` and expose it.
    ///
    /// Multi-valued names get the value appended unless it is already
    /// present; other names are replaced by a fresh single-valued parameter.
    /// Returns whether the exposed state changed.
    pub fn add_by_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if is_multiple(name) {
            self.track_change(|store| {
                store.expose(name);
                let param = store.get(name);
                if param.find(&value).is_none() {
                    param.add(value);
                }
            })
        } else {
            self.add(Parameter::with_value(name, value))
        }
    }

    /// Remove a parameter entirely. Returns true if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(index) => {
                self.params.remove(index);
                tracing::debug!("Removed parameter '{}'", name);
                true
            }
            None => false,
        }
    }

    /// Remove one value of `name`; the parameter goes away with its last value.
    ///
    /// Returns whether the exposed state changed.
    pub fn remove_by_value(&mut self, name: &str, value: &str) -> bool {
        self.track_change(|store| {
            let Some(index) = store.position(name) else {
                return;
            };
            let param = &mut store.params[index];
            if param.remove(value) && param.values().is_empty() {
                store.params.remove(index);
            }
        })
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serialize every parameter, exposed or not, in insertion order.
    pub fn string(&self) -> String {
        self.serialize(|_| true)
    }

    /// Serialize only the exposed parameters.
    pub fn exposed_string(&self) -> String {
        self.serialize(|p| self.is_exposed(p.name()))
    }

    fn serialize<F>(&self, include: F) -> String
    where
        F: Fn(&Parameter) -> bool,
    {
        let mut pairs = Vec::new();
        for param in self.params.iter().filter(|p| include(p)) {
            param.push_pairs(&mut pairs);
        }
        pairs.join("&")
    }

    /// Parse an encoded string into parameters.
    ///
    /// Repeated names are merged into one parameter in order of appearance.
    /// Empty segments (a trailing `&`, an empty string) are skipped.
    pub fn parse_string(encoded: &str) -> Result<Vec<Parameter>, StateError> {
        let mut parsed: Vec<Parameter> = Vec::new();
        for raw in encoded.split('&').filter(|s| !s.is_empty()) {
            let pair = Parameter::parse_pair(raw)?;
            match parsed.iter_mut().find(|p| p.name() == pair.name()) {
                Some(existing) => {
                    for (k, v) in pair.locals() {
                        existing.set_local(k.clone(), v.clone());
                    }
                    for value in pair.values() {
                        existing.add(value.clone());
                    }
                }
                None => parsed.push(pair),
            }
        }
        Ok(parsed)
    }

    /// Replace the exposed parameters with the ones encoded in `encoded`.
    ///
    /// Internal parameters are left untouched. Returns whether the exposed
    /// state changed.
    pub fn load(&mut self, encoded: &str) -> bool {
        self.apply(encoded, true)
    }

    /// Like [`load`](Self::load) but keeps exposed parameters that the
    /// encoded string does not mention.
    pub fn merge(&mut self, encoded: &str) -> bool {
        self.apply(encoded, false)
    }

    fn apply(&mut self, encoded: &str, reset: bool) -> bool {
        let parsed = match Self::parse_string(encoded) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Ignoring malformed external state: {}", e);
                Vec::new()
            }
        };

        self.track_change(|store| {
            if reset {
                let exposed = &store.exposed;
                store
                    .params
                    .retain(|p| !exposed.iter().any(|name| name == p.name()));
            }
            for param in parsed {
                if !store.is_exposed(param.name()) {
                    tracing::debug!("Skipping unexposed parameter '{}' in state", param.name());
                    continue;
                }
                match store.position(param.name()) {
                    Some(index) => store.params[index] = param,
                    None => store.params.push(param),
                }
            }
        })
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    fn track_change<F>(&mut self, mutate: F) -> bool
    where
        F: FnOnce(&mut Self),
    {
        let before = self.exposed_string();
        mutate(self);
        has_changed(ChangeStrategy::Raw, &before, &self.exposed_string())
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_auto_vivifies() {
        let mut store = ParameterStore::new();
        assert!(!store.contains("rows"));

        assert_eq!(store.get("rows").val(), None);
        assert!(store.contains("rows"));
        assert_eq!(store.string(), "");

        store.get("rows").set_val("10");
        assert_eq!(store.values("rows"), ["10"]);
        assert_eq!(store.string(), "rows=10");
    }

    #[test]
    fn test_values_of_absent_parameter_is_empty() {
        let store = ParameterStore::new();
        assert!(store.values("fq").is_empty());
    }

    #[test]
    fn test_add_by_value_reports_changes() {
        let mut store = ParameterStore::new();
        assert!(store.add_by_value("q", "foo"));
        assert!(!store.add_by_value("q", "foo"));
        assert!(store.add_by_value("q", "bar"));
        assert_eq!(store.values("q"), ["bar"]);
    }

    #[test]
    fn test_add_by_value_appends_multi_valued() {
        let mut store = ParameterStore::new();
        assert!(store.add_by_value("fq", "host:a"));
        assert!(store.add_by_value("fq", "host:b"));
        assert!(!store.add_by_value("fq", "host:a"));
        assert_eq!(store.values("fq"), ["host:a", "host:b"]);
    }

    #[test]
    fn test_add_by_value_exposes_name() {
        let mut store = ParameterStore::new();
        store.get("rows").set_val("10");
        assert_eq!(store.exposed_string(), "");

        // Same value, but now exposed: the exposed state changed
        assert!(store.add_by_value("rows", "10"));
        assert!(store.is_exposed("rows"));
        assert_eq!(store.exposed_string(), "rows=10");
    }

    #[test]
    fn test_remove_by_value() {
        let mut store = ParameterStore::new();
        store.add_by_value("fq", "a");
        store.add_by_value("fq", "b");

        assert!(store.remove_by_value("fq", "a"));
        assert!(!store.remove_by_value("fq", "a"));
        assert_eq!(store.values("fq"), ["b"]);

        assert!(store.remove_by_value("fq", "b"));
        assert!(!store.contains("fq"));
        assert!(!store.remove_by_value("missing", "x"));
    }

    #[test]
    fn test_remove_absent_is_not_an_error() {
        let mut store = ParameterStore::new();
        assert!(!store.remove("q"));
        store.add_by_value("q", "x");
        assert!(store.remove("q"));
        assert!(store.values("q").is_empty());
    }

    #[test]
    fn test_add_replaces_in_place() {
        let mut store = ParameterStore::new();
        store.add_by_value("q", "a");
        store.add_by_value("fq", "b");
        store.add(Parameter::with_value("q", "c"));
        insta::assert_snapshot!(store.string(), @"q=c&fq=b");
    }

    #[test]
    fn test_string_preserves_insertion_order() {
        let mut store = ParameterStore::new();
        store.get("rows").set_val("0");
        store.add_by_value("q", "error level");
        store.add_by_value("fq", "host:a");
        store.add_by_value("fq", "source:b/c");
        store.get("facet").set_val("true");

        insta::assert_snapshot!(
            store.string(),
            @"rows=0&q=error+level&fq=host%3Aa&fq=source%3Ab%2Fc&facet=true"
        );
        insta::assert_snapshot!(
            store.exposed_string(),
            @"q=error+level&fq=host%3Aa&fq=source%3Ab%2Fc"
        );
    }

    #[test]
    fn test_local_parameters_in_store_string() {
        let mut store = ParameterStore::new();
        let q = store.get("q");
        q.set_val("hello");
        q.set_local("type", "spatial");
        q.set_local("lat", "5");
        assert!(store.string().contains("{!type=spatial,lat=5}hello"));
    }

    #[test]
    fn test_load_round_trip() {
        let mut store = ParameterStore::new();
        store.add_by_value("q", "a b");
        store.add_by_value("fq", "host:a");
        store.add_by_value("fq", "host:b");
        store.get("q").set_local("type", "spatial");
        store.get("start").set_val("20");
        store.get("rows").set_val("10");

        let mut fresh = ParameterStore::new();
        fresh.load(&store.exposed_string());

        assert_eq!(fresh.exposed_string(), store.exposed_string());
        for name in DEFAULT_EXPOSED {
            assert_eq!(fresh.lookup(name), store.lookup(name));
        }
        assert!(!fresh.contains("rows"));
    }

    #[test]
    fn test_load_keeps_internal_parameters() {
        let mut store = ParameterStore::new();
        store.get("rows").set_val("10");
        store.add_by_value("q", "old");
        store.add_by_value("fq", "stale");

        assert!(store.load("q=new"));
        assert_eq!(store.values("q"), ["new"]);
        assert!(store.values("fq").is_empty());
        assert_eq!(store.values("rows"), ["10"]);
    }

    #[test]
    fn test_load_ignores_unexposed_names() {
        let mut store = ParameterStore::new();
        store.get("rows").set_val("10");
        store.load("q=x&rows=99");
        assert_eq!(store.values("rows"), ["10"]);
        assert_eq!(store.values("q"), ["x"]);
    }

    #[test]
    fn test_merge_keeps_unmentioned_exposed() {
        let mut store = ParameterStore::new();
        store.add_by_value("q", "*:*");
        store.add_by_value("fq", "host:a");

        store.merge("fq=host%3Ab");
        assert_eq!(store.values("q"), ["*:*"]);
        assert_eq!(store.values("fq"), ["host:b"]);
    }

    #[test]
    fn test_malformed_state_loads_as_empty() {
        let mut store = ParameterStore::new();
        store.add_by_value("q", "x");
        store.get("rows").set_val("10");

        assert!(store.load("q={!broken"));
        assert_eq!(store.exposed_string(), "");
        assert_eq!(store.values("rows"), ["10"]);
    }

    #[test]
    fn test_parse_string_merges_repeated_names() {
        let parsed = ParameterStore::parse_string("fq=a&q=x&fq=b&").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].values(), ["a", "b"]);
        assert_eq!(parsed[1].values(), ["x"]);
        assert!(ParameterStore::parse_string("").unwrap().is_empty());
    }

    #[test]
    fn test_is_multiple() {
        assert!(is_multiple("fq"));
        assert!(is_multiple("facet.field"));
        assert!(!is_multiple("q"));
        assert!(!is_multiple("start"));
    }
}

//! Percent-encoding for query-string components.

use url::form_urlencoded;

/// Percent-encode a single query-string component.
///
/// Spaces become `+`; every reserved delimiter (`&`, `=`, `,`, `{`, `}`, `!`)
/// is escaped so the result can sit inside a pair or a local-parameter block.
pub fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// Decode a single query-string component, treating `+` as a space.
///
/// The component must already be split on `&`. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn decode(component: &str) -> String {
    // form_urlencoded splits a pair on its first `=` only, so everything after
    // the leading `=` comes back as one decoded value.
    form_urlencoded::parse(format!("={component}").as_bytes())
        .next()
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

/// Decode a whole `&`-joined string into its name/value pairs.
pub(crate) fn decode_pairs(encoded: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(encoded.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

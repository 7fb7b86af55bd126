//! String-based change detection.
//!
//! Every "did the state change" decision in HICC compares serialized forms.
//! Two structures that serialize identically are indistinguishable; that is a
//! known limitation of the approach, not something to paper over here.

use serde::{Deserialize, Serialize};

use crate::codec::decode_pairs;

/// How two serialized states are compared.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStrategy {
    /// Byte-for-byte comparison.
    #[default]
    Raw,
    /// Changed only if the strings differ raw AND after decoding.
    ///
    /// Hosts that re-escape or unescape the URL on their own would otherwise
    /// make every self-written value look like an external change.
    DecodedTolerant,
}

/// Compare two serialized states under the given strategy.
pub fn has_changed(strategy: ChangeStrategy, before: &str, after: &str) -> bool {
    match strategy {
        ChangeStrategy::Raw => before != after,
        ChangeStrategy::DecodedTolerant => {
            before != after && decode_pairs(before) != decode_pairs(after)
        }
    }
}

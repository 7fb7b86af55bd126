//! Reusable widget bases.
//!
//! These carry the store logic of common dashboard widgets; rendering is left
//! to the embedding application.

mod spatial;
mod spellcheck;
mod text;

pub use spatial::{SpatialQuery, SpatialWidget};
pub use spellcheck::SpellcheckWidget;
pub use text::TextWidget;

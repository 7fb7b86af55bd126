//! Headless runner for the HICC dashboard.
//!
//! This crate provides:
//! - `Dashboard` - a manager wired to an in-memory navigation log
//! - `SummaryWidget` - facet and hit-count summary of each response

pub mod app;
pub mod summary;

pub use app::{build_sync, AppError, Dashboard};
pub use summary::{Summary, SummaryWidget};

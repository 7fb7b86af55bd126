//! Widget API for the HICC dashboard.
//!
//! This crate provides:
//! - `Widget` - the contract every dashboard participant implements
//! - `WidgetContext` - a widget's handle on the store, the last response and
//!   the request cycle
//! - `Manager` - owns the store and the widgets and runs request cycles
//! - `Transport` - the seam to the search backend (HTTP or fixture)
//! - Reusable widget bases in [`widgets`]
//!
//! ## Request Cycle
//!
//! A cycle runs every widget's `before_request` hook, serializes the store,
//! sends exactly one request and, on success, stores the response and runs
//! every `after_request` hook. Hooks run in registration order. Failures go
//! to error hooks registered with [`Manager::on_error`]; they are never
//! returned as `Err`.

mod hooks;
mod manager;
mod registry;
mod transport;
mod widget;
pub mod widgets;

pub use hooks::{ErrorHookFn, ErrorHooks};
pub use manager::{CyclePhase, Manager, ManagerBuilder, RequestHandle, RequestOutcome, SyncCheck};
pub use registry::WidgetRegistry;
pub use transport::{FixtureTransport, HttpTransport, SearchRequest, Transport};
pub use widget::{Widget, WidgetContext};

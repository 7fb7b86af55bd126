//! Core types for the HICC dashboard.
//!
//! This crate contains the data model shared by every HICC crate:
//! - Parameter and ParameterStore (the query state widgets cooperate on)
//! - Query-string encoding and change detection
//! - A typed view over search responses
//! - Configuration types
//! - Error types

mod change;
mod codec;
mod config;
mod error;
mod parameter;
mod response;
mod store;

pub use change::{has_changed, ChangeStrategy};
pub use codec::{decode, encode};
pub use config::{
    config_dir, config_path, load_config, load_config_from, DashboardConfig, ManagerConfig,
    RequestPolicy, ResponsePolicy, SyncConfig, SyncMode, MIN_POLL_INTERVAL,
};
pub use error::{ConfigError, RequestError, SetupError, StateError};
pub use parameter::Parameter;
pub use response::{FacetCount, Response};
pub use store::{is_multiple, ParameterStore, DEFAULT_EXPOSED};

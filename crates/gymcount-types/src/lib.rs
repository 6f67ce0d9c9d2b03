//! Shared domain types for gymcount.
//!
//! Presence counting values, broker configuration, connector state and the
//! error enums used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, chrono, secrecy, thiserror.

pub mod bus;
pub mod config;
pub mod error;
pub mod presence;

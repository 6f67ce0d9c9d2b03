//! HTTP layer for gymcount.
//!
//! Axum router under `/api/` for triggers and status queries, with the
//! dashboard's static files served for every other path.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;

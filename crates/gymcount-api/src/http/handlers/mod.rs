//! Request handlers, one module per resource.

pub mod bus;
pub mod entry;
pub mod health;
pub mod occupancy;

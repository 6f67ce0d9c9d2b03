//! Presence counting and bus connector logic for gymcount.
//!
//! This crate defines the transport port (`bus::BusTransport`) that the
//! infrastructure layer implements. It depends only on `gymcount-types`,
//! never on `gymcount-infra` or any network crate.

pub mod bus;
pub mod clock;
pub mod presence;

//! Request authentication helpers.

pub mod api_key;

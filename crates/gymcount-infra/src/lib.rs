//! Infrastructure layer for gymcount.
//!
//! Implements the transport port defined in `gymcount-core` on top of MQTT
//! (rumqttc + rustls) and loads configuration from TOML and the environment.

pub mod config;
pub mod mqtt;

//! Configuration schema for gymcount.
//!
//! `GymcountConfig` mirrors `gymcount.toml`. Every field has a default, and
//! broker values stay as raw strings here so that a malformed value only
//! disables the bus connector instead of failing the whole file.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::presence::PresenceSettings;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GymcountConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub presence: PresenceSection,

    #[serde(default)]
    pub mqtt: MqttSection,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Directory served for non-API paths.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Shared secret for `POST /api/entry`. Empty or absent disables the check.
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_bind() -> String {
    "0.0.0.0:5168".to_string()
}

fn default_static_dir() -> String {
    "wwwroot".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            api_key: None,
        }
    }
}

/// Counter windows, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSection {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,
}

fn default_window_secs() -> u64 {
    3600
}

fn default_debounce_secs() -> u64 {
    3
}

impl Default for PresenceSection {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            debounce_secs: default_debounce_secs(),
        }
    }
}

impl PresenceSection {
    pub fn to_settings(&self) -> PresenceSettings {
        PresenceSettings {
            presence_window: Duration::from_secs(self.window_secs),
            debounce_window: Duration::from_secs(self.debounce_secs),
        }
    }
}

/// Raw broker section. Validated by `BrokerConfig::resolve`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MqttSection {
    #[serde(default)]
    pub host: Option<String>,

    /// Accepts `port = 8883` as well as `port = "8883"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub port: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// `trust-all`, `verified` or `none`.
    #[serde(default)]
    pub tls: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub qos: Option<String>,

    #[serde(default)]
    pub inbound_topic: Option<String>,

    #[serde(default)]
    pub ack_topic: Option<String>,

    #[serde(default)]
    pub client_id_prefix: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(i64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    }))
}

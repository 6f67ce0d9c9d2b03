//! Configuration loader for gymcount.
//!
//! Reads `gymcount.toml` (or the path given with `--config`) into
//! [`GymcountConfig`], then layers environment overrides on top. Falls back
//! to defaults when the file is missing or malformed; a bad file never stops
//! the process.

use std::path::Path;

use gymcount_types::config::GymcountConfig;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "gymcount.toml";

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`GymcountConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
pub async fn load_config(path: &Path) -> GymcountConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return GymcountConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return GymcountConfig::default();
        }
    };

    match toml::from_str::<GymcountConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            GymcountConfig::default()
        }
    }
}

/// Load `path` and apply overrides from the process environment.
pub async fn load_resolved(path: &Path) -> GymcountConfig {
    let mut config = load_config(path).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Apply environment overrides through `lookup`.
///
/// Blank values are treated as unset. Broker values are copied verbatim and
/// validated later, so a bad `MQTT_PORT` only disables the connector. A
/// presence override that is not a whole number of seconds is ignored.
pub fn apply_env_overrides(config: &mut GymcountConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let mqtt = &mut config.mqtt;
    for (key, slot) in [
        ("MQTT_HOST", &mut mqtt.host),
        ("MQTT_PORT", &mut mqtt.port),
        ("MQTT_USER", &mut mqtt.username),
        ("MQTT_PASS", &mut mqtt.password),
        ("MQTT_TOPIC_OUT", &mut mqtt.inbound_topic),
        ("MQTT_TOPIC_ACK", &mut mqtt.ack_topic),
        ("MQTT_TLS", &mut mqtt.tls),
        ("MQTT_QOS", &mut mqtt.qos),
    ] {
        if let Some(value) = get(key) {
            *slot = Some(value);
        }
    }

    if let Some(key) = get("API_KEY") {
        config.server.api_key = Some(key);
    }
    if let Some(bind) = get("GYMCOUNT_BIND") {
        config.server.bind = bind;
    }
    if let Some(dir) = get("GYMCOUNT_STATIC_DIR") {
        config.server.static_dir = dir;
    }

    for (key, slot) in [
        ("PRESENCE_WINDOW_SECS", &mut config.presence.window_secs),
        ("DEBOUNCE_WINDOW_SECS", &mut config.presence.debounce_secs),
    ] {
        if let Some(raw) = get(key) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => *slot = secs,
                Err(err) => tracing::warn!(
                    variable = key,
                    value = %raw,
                    "Ignoring override: {err}"
                ),
            }
        }
    }
}

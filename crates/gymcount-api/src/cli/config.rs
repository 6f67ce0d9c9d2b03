//! `gymcount config`: show the configuration the server would run with.

use std::path::Path;

use anyhow::Result;
use console::style;

use gymcount_infra::config::load_resolved;
use gymcount_types::bus::BrokerConfig;
use gymcount_types::config::{GymcountConfig, MqttSection};

const REDACTED: &str = "********";

/// What the MQTT listener would do with this section.
#[derive(Debug, PartialEq, Eq)]
pub enum BusSummary {
    Enabled { host: String, port: u16, topic: String },
    Disabled,
    Invalid(String),
}

impl BusSummary {
    pub fn from_section(section: &MqttSection) -> Self {
        match BrokerConfig::resolve(section) {
            Ok(Some(config)) => BusSummary::Enabled {
                host: config.host,
                port: config.port,
                topic: config.inbound_topic,
            },
            Ok(None) => BusSummary::Disabled,
            Err(err) => BusSummary::Invalid(err.to_string()),
        }
    }

    fn label(&self) -> String {
        match self {
            BusSummary::Enabled { host, port, topic } => {
                format!("enabled ({host}:{port}, topic '{topic}')")
            }
            BusSummary::Disabled => "disabled (no host/port)".to_string(),
            BusSummary::Invalid(reason) => format!("disabled ({reason})"),
        }
    }
}

/// Copy of `config` safe to print. The broker password is never serialized.
pub fn redacted(config: &GymcountConfig) -> GymcountConfig {
    let mut config = config.clone();
    if config.server.api_key.is_some() {
        config.server.api_key = Some(REDACTED.to_string());
    }
    config
}

pub async fn show_config(path: &Path, json: bool) -> Result<()> {
    let config = load_resolved(path).await;
    let bus = BusSummary::from_section(&config.mqtt);
    let shown = redacted(&config);

    if json {
        let mut value = serde_json::to_value(&shown)?;
        value["bus"] = serde_json::json!(bus.label());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let or_unset = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    println!();
    println!("  {} gymcount v{}", style("⚡").bold(), env!("CARGO_PKG_VERSION"));
    println!("  {}", style(format!("config file: {}", path.display())).dim());
    println!();

    println!("  {}", style("── Server ──").dim());
    println!("  Bind:       {}", style(&shown.server.bind).cyan());
    println!("  Static dir: {}", shown.server.static_dir);
    println!("  API key:    {}", or_unset(&shown.server.api_key));
    println!();

    println!("  {}", style("── Presence ──").dim());
    println!("  Window:     {}s", shown.presence.window_secs);
    println!("  Debounce:   {}s", shown.presence.debounce_secs);
    println!();

    println!("  {}", style("── MQTT ──").dim());
    let status = match &bus {
        BusSummary::Enabled { .. } => style(bus.label()).green(),
        BusSummary::Disabled => style(bus.label()).yellow(),
        BusSummary::Invalid(_) => style(bus.label()).red(),
    };
    println!("  Listener:   {status}");
    println!("  TLS:        {}", or_unset(&shown.mqtt.tls));
    println!("  User:       {}", or_unset(&shown.mqtt.username));
    println!(
        "  Password:   {}",
        if config.mqtt.password.is_some() { REDACTED } else { "-" }
    );
    println!("  Ack topic:  {}", or_unset(&shown.mqtt.ack_topic));
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_is_redacted() {
        let mut config = GymcountConfig::default();
        config.server.api_key = Some("door-secret".to_string());
        let shown = redacted(&config);
        assert_eq!(shown.server.api_key.as_deref(), Some(REDACTED));
        assert_eq!(config.server.api_key.as_deref(), Some("door-secret"));
    }

    #[test]
    fn password_never_serialized() {
        let mut config = GymcountConfig::default();
        config.mqtt.password = Some("hunter2".to_string());
        let json = serde_json::to_string(&redacted(&config)).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn bus_summary_disabled_without_host() {
        assert_eq!(
            BusSummary::from_section(&MqttSection::default()),
            BusSummary::Disabled
        );
    }

    #[test]
    fn bus_summary_enabled_with_defaults() {
        let section = MqttSection {
            host: Some("broker.local".to_string()),
            port: Some("8883".to_string()),
            ..MqttSection::default()
        };
        assert_eq!(
            BusSummary::from_section(&section),
            BusSummary::Enabled {
                host: "broker.local".to_string(),
                port: 8883,
                topic: "esp32DataChannel".to_string(),
            }
        );
    }

    #[test]
    fn bus_summary_invalid_port() {
        let section = MqttSection {
            host: Some("broker.local".to_string()),
            port: Some("99999".to_string()),
            ..MqttSection::default()
        };
        assert!(matches!(
            BusSummary::from_section(&section),
            BusSummary::Invalid(reason) if reason.contains("99999")
        ));
    }
}

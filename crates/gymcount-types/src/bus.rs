//! Broker configuration, connector state and the acknowledgment payload.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::config::MqttSection;
use crate::error::ConfigError;

/// Default inbound topic used by the door sensors.
pub const DEFAULT_INBOUND_TOPIC: &str = "esp32DataChannel";

/// Default client id prefix; a UUID suffix is appended per process.
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "backend";

/// How the transport secures the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TlsMode {
    /// TLS without certificate verification. Insecure; accepted for brokers
    /// with self-signed certificates.
    TrustAll,
    /// TLS verified against the webpki root store.
    Verified,
    /// Plain TCP.
    None,
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsMode::TrustAll => write!(f, "trust-all"),
            TlsMode::Verified => write!(f, "verified"),
            TlsMode::None => write!(f, "none"),
        }
    }
}

impl FromStr for TlsMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trust-all" | "trust_all" | "insecure" => Ok(TlsMode::TrustAll),
            "verified" | "verify" => Ok(TlsMode::Verified),
            "none" | "plain" | "off" => Ok(TlsMode::None),
            _ => Err(ConfigError::InvalidTlsMode(s.to_string())),
        }
    }
}

/// Delivery guarantee requested for the inbound subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryQos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl DeliveryQos {
    /// Parse the numeric MQTT QoS level.
    pub fn from_level(level: &str) -> Result<Self, ConfigError> {
        match level.trim() {
            "0" => Ok(DeliveryQos::AtMostOnce),
            "1" => Ok(DeliveryQos::AtLeastOnce),
            "2" => Ok(DeliveryQos::ExactlyOnce),
            other => Err(ConfigError::InvalidQos(other.to_string())),
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            DeliveryQos::AtMostOnce => 0,
            DeliveryQos::AtLeastOnce => 1,
            DeliveryQos::ExactlyOnce => 2,
        }
    }
}

/// Broker login.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Validated broker configuration.
///
/// Built from the raw `[mqtt]` section by [`BrokerConfig::resolve`].
#[derive(Debug)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<Credentials>,
    pub tls: TlsMode,
    pub inbound_topic: String,
    pub ack_topic: Option<String>,
    pub qos: DeliveryQos,
    pub client_id_prefix: String,
}

impl BrokerConfig {
    /// Validate the raw section.
    ///
    /// - `Ok(None)`: host or port missing, the connector is not configured.
    /// - `Err(_)`: a value is present but unusable.
    pub fn resolve(raw: &MqttSection) -> Result<Option<Self>, ConfigError> {
        let host = match non_blank(raw.host.as_deref()) {
            Some(host) => host.to_string(),
            None => return Ok(None),
        };
        let port_str = match non_blank(raw.port.as_deref()) {
            Some(port) => port,
            None => return Ok(None),
        };
        let port = port_str
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::InvalidPort(port_str.to_string()))?;

        let tls = match non_blank(raw.tls.as_deref()) {
            Some(mode) => mode.parse()?,
            None => TlsMode::TrustAll,
        };
        let qos = match non_blank(raw.qos.as_deref()) {
            Some(level) => DeliveryQos::from_level(level)?,
            None => DeliveryQos::AtLeastOnce,
        };

        let inbound_topic = match raw.inbound_topic.as_deref() {
            Some(topic) if topic.trim().is_empty() => return Err(ConfigError::EmptyTopic),
            Some(topic) => topic.to_string(),
            None => DEFAULT_INBOUND_TOPIC.to_string(),
        };

        let credentials = non_blank(raw.username.as_deref()).map(|username| Credentials {
            username: username.to_string(),
            password: SecretString::from(raw.password.clone().unwrap_or_default()),
        });

        Ok(Some(Self {
            host,
            port,
            credentials,
            tls,
            inbound_topic,
            ack_topic: non_blank(raw.ack_topic.as_deref()).map(str::to_string),
            qos,
            client_id_prefix: non_blank(raw.client_id_prefix.as_deref())
                .unwrap_or(DEFAULT_CLIENT_ID_PREFIX)
                .to_string(),
        }))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Lifecycle of the bus connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorState {
    /// Not configured; the connector never ran.
    Disabled,
    Disconnected,
    Connecting,
    Connected,
    Subscribing,
    Subscribed,
    /// Cancelled. Terminal.
    Shutdown,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorState::Disabled => "disabled",
            ConnectorState::Disconnected => "disconnected",
            ConnectorState::Connecting => "connecting",
            ConnectorState::Connected => "connected",
            ConnectorState::Subscribing => "subscribing",
            ConnectorState::Subscribed => "subscribed",
            ConnectorState::Shutdown => "shutdown",
        };
        write!(f, "{s}")
    }
}

/// Acknowledgment published on the ack topic after each processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub accepted: bool,
    pub active_count: usize,
    /// Always serialized as RFC 3339 in UTC.
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    fn section(host: Option<&str>, port: Option<&str>) -> MqttSection {
        MqttSection {
            host: host.map(str::to_string),
            port: port.map(str::to_string),
            ..MqttSection::default()
        }
    }

    #[test]
    fn test_resolve_missing_host_is_not_configured() {
        let resolved = BrokerConfig::resolve(&section(None, Some("8883"))).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_resolve_blank_port_is_not_configured() {
        let resolved = BrokerConfig::resolve(&section(Some("broker"), Some("  "))).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn test_resolve_non_numeric_port_is_invalid() {
        let err = BrokerConfig::resolve(&section(Some("broker"), Some("eighty"))).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("eighty".to_string()));
    }

    #[test]
    fn test_resolve_zero_port_is_invalid() {
        let err = BrokerConfig::resolve(&section(Some("broker"), Some("0"))).unwrap_err();
        assert_eq!(err, ConfigError::InvalidPort("0".to_string()));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = BrokerConfig::resolve(&section(Some("broker"), Some("8883")))
            .unwrap()
            .unwrap();
        assert_eq!(config.host, "broker");
        assert_eq!(config.port, 8883);
        assert_eq!(config.tls, TlsMode::TrustAll);
        assert_eq!(config.qos, DeliveryQos::AtLeastOnce);
        assert_eq!(config.inbound_topic, DEFAULT_INBOUND_TOPIC);
        assert_eq!(config.client_id_prefix, DEFAULT_CLIENT_ID_PREFIX);
        assert!(config.ack_topic.is_none());
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_resolve_full_section() {
        let raw = MqttSection {
            host: Some("mqtt.example.com".to_string()),
            port: Some("1883".to_string()),
            username: Some("sensor".to_string()),
            password: Some("hunter2".to_string()),
            tls: Some("none".to_string()),
            qos: Some("0".to_string()),
            inbound_topic: Some("doors/front".to_string()),
            ack_topic: Some("doors/ack".to_string()),
            client_id_prefix: Some("gym".to_string()),
        };
        let config = BrokerConfig::resolve(&raw).unwrap().unwrap();
        assert_eq!(config.tls, TlsMode::None);
        assert_eq!(config.qos, DeliveryQos::AtMostOnce);
        assert_eq!(config.inbound_topic, "doors/front");
        assert_eq!(config.ack_topic.as_deref(), Some("doors/ack"));
        assert_eq!(config.client_id_prefix, "gym");
        let creds = config.credentials.unwrap();
        assert_eq!(creds.username, "sensor");
        assert_eq!(creds.password.expose_secret(), "hunter2");
    }

    #[test]
    fn test_resolve_rejects_unknown_tls_mode() {
        let raw = MqttSection {
            tls: Some("maybe".to_string()),
            ..section(Some("broker"), Some("8883"))
        };
        assert_eq!(
            BrokerConfig::resolve(&raw).unwrap_err(),
            ConfigError::InvalidTlsMode("maybe".to_string())
        );
    }

    #[test]
    fn test_resolve_rejects_empty_topic() {
        let raw = MqttSection {
            inbound_topic: Some(" ".to_string()),
            ..section(Some("broker"), Some("8883"))
        };
        assert_eq!(BrokerConfig::resolve(&raw).unwrap_err(), ConfigError::EmptyTopic);
    }

    #[test]
    fn test_tls_mode_parse_and_display() {
        assert_eq!("Trust-All".parse::<TlsMode>().unwrap(), TlsMode::TrustAll);
        assert_eq!("verified".parse::<TlsMode>().unwrap(), TlsMode::Verified);
        assert_eq!(TlsMode::TrustAll.to_string(), "trust-all");
    }

    #[test]
    fn test_qos_levels() {
        assert_eq!(DeliveryQos::from_level("1").unwrap(), DeliveryQos::AtLeastOnce);
        assert_eq!(DeliveryQos::ExactlyOnce.level(), 2);
        assert!(DeliveryQos::from_level("3").is_err());
    }

    #[test]
    fn test_ack_payload_serializes_camel_case_utc() {
        let ack = AckPayload {
            accepted: true,
            active_count: 4,
            timestamp: DateTime::parse_from_rfc3339("2026-10-16T08:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
            source: "mqtt:esp32DataChannel".to_string(),
        };
        let json = serde_json::to_value(&ack).unwrap();
        assert_eq!(json["accepted"], true);
        assert_eq!(json["activeCount"], 4);
        assert_eq!(json["timestamp"], "2026-10-16T08:30:00Z");
        assert_eq!(json["source"], "mqtt:esp32DataChannel");
    }

    #[test]
    fn test_connector_state_display() {
        assert_eq!(ConnectorState::Subscribed.to_string(), "subscribed");
        assert_eq!(
            serde_json::to_string(&ConnectorState::Disabled).unwrap(),
            "\"disabled\""
        );
    }
}

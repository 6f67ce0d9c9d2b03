use thiserror::Error;

/// Errors raised while resolving configuration values.
///
/// None of these are fatal to the process: an invalid broker section only
/// disables the bus connector.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("MQTT port '{0}' is not a valid port number")]
    InvalidPort(String),

    #[error("unknown TLS mode '{0}' (expected trust-all, verified or none)")]
    InvalidTlsMode(String),

    #[error("invalid QoS level '{0}' (expected 0, 1 or 2)")]
    InvalidQos(String),

    #[error("inbound topic must not be empty")]
    EmptyTopic,
}

/// Errors reported by a bus transport.
///
/// Every variant is recoverable; the connector logs it and retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("disconnect failed: {0}")]
    Disconnect(String),
}

/// Errors for a single inbound bus message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("payload on '{topic}' is not valid UTF-8 ({len} bytes)")]
    InvalidUtf8 { topic: String, len: usize },

    #[error("message has an empty topic")]
    EmptyTopic,
}

//! Background MQTT listener service.
//!
//! Resolves the broker section, then hands an [`MqttTransport`] to the
//! generic [`BusConnector`]. A missing host or port disables the listener; an
//! invalid value disables it too, with an error log. Neither case touches the
//! network or affects the rest of the process.

use std::sync::Arc;

use gymcount_core::bus::{
    BusConnector, ConnectorHandle, ReconnectPolicy, StatusReporter, SubscriptionOptions,
    status_channel,
};
use gymcount_core::presence::WindowedCounter;
use gymcount_types::bus::BrokerConfig;
use gymcount_types::config::MqttSection;
use tokio_util::sync::CancellationToken;

use super::transport::MqttTransport;

pub struct MqttListener {
    section: MqttSection,
    counter: Arc<WindowedCounter>,
    policy: ReconnectPolicy,
    status: StatusReporter,
}

impl MqttListener {
    /// Create a listener and the handle used to observe it.
    pub fn new(section: MqttSection, counter: Arc<WindowedCounter>) -> (Self, ConnectorHandle) {
        let (status, handle) = status_channel();
        (
            Self {
                section,
                counter,
                policy: ReconnectPolicy::default(),
                status,
            },
            handle,
        )
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run until `cancel` fires, or return at once when disabled.
    pub async fn run(self, cancel: CancellationToken) {
        let config = match BrokerConfig::resolve(&self.section) {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::info!("MQTT host or port not configured, bus listener disabled");
                return;
            }
            Err(err) => {
                tracing::error!(error = %err, "Invalid MQTT configuration, bus listener disabled");
                return;
            }
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            tls = %config.tls,
            topic = %config.inbound_topic,
            "Starting MQTT listener"
        );

        let transport = MqttTransport::new(&config);
        tracing::debug!(client_id = %transport.client_id(), "MQTT client id");

        BusConnector::new(
            transport,
            self.counter,
            SubscriptionOptions::from_broker(&config),
            self.status,
        )
        .with_policy(self.policy)
        .run(cancel)
        .await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gymcount_types::bus::ConnectorState;
    use gymcount_types::presence::PresenceSettings;

    use super::*;

    fn counter() -> Arc<WindowedCounter> {
        Arc::new(WindowedCounter::new(PresenceSettings::default()))
    }

    #[tokio::test]
    async fn missing_host_returns_immediately() {
        let (listener, handle) = MqttListener::new(MqttSection::default(), counter());

        tokio::time::timeout(Duration::from_secs(1), listener.run(CancellationToken::new()))
            .await
            .expect("disabled listener should return at once");

        assert_eq!(handle.state(), ConnectorState::Disabled);
        assert_eq!(handle.stats().connect_attempts, 0);
    }

    #[tokio::test]
    async fn missing_port_returns_immediately() {
        let section = MqttSection {
            host: Some("broker.local".to_string()),
            ..MqttSection::default()
        };
        let (listener, handle) = MqttListener::new(section, counter());

        tokio::time::timeout(Duration::from_secs(1), listener.run(CancellationToken::new()))
            .await
            .expect("disabled listener should return at once");

        assert_eq!(handle.state(), ConnectorState::Disabled);
    }

    #[tokio::test]
    async fn invalid_port_disables_listener() {
        let section = MqttSection {
            host: Some("broker.local".to_string()),
            port: Some("eighty".to_string()),
            ..MqttSection::default()
        };
        let (listener, handle) = MqttListener::new(section, counter());

        tokio::time::timeout(Duration::from_secs(1), listener.run(CancellationToken::new()))
            .await
            .expect("misconfigured listener should return at once");

        assert_eq!(handle.state(), ConnectorState::Disabled);
        assert_eq!(handle.stats().connect_attempts, 0);
    }

    #[tokio::test]
    async fn unreachable_broker_retries_until_cancelled() {
        let section = MqttSection {
            host: Some("127.0.0.1".to_string()),
            port: Some("1".to_string()),
            tls: Some("none".to_string()),
            ..MqttSection::default()
        };
        let (listener, handle) = MqttListener::new(section, counter());
        let listener = listener.with_policy(ReconnectPolicy {
            backoff: Duration::from_millis(20),
            ..ReconnectPolicy::default()
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listener.run(cancel.clone()));

        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while handle.stats().backoff_waits < 2 {
            assert!(tokio::time::Instant::now() < deadline, "no retries observed");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("listener did not stop")
            .unwrap();

        assert_eq!(handle.state(), ConnectorState::Shutdown);
        assert!(handle.stats().last_error.unwrap().starts_with("connect failed"));
    }
}

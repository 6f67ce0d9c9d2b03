//! `BusTransport` over MQTT 3.1.1 using rumqttc.
//!
//! rumqttc splits a connection into an `AsyncClient` (requests) and an
//! `EventLoop` (network I/O). Nothing moves on the wire unless the event loop
//! is polled, so every operation here that waits for the broker drives
//! `EventLoop::poll` itself. A fresh client/event-loop pair is built on every
//! `connect`, so a reconnect never resumes a half-dead session.

use std::collections::VecDeque;
use std::time::Duration;

use gymcount_core::bus::{BusTransport, InboundMessage};
use gymcount_types::bus::{BrokerConfig, DeliveryQos};
use gymcount_types::error::BusError;
use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    SubscribeReasonCode, TlsConfiguration, Transport,
};
use secrecy::ExposeSecret;
use uuid::Uuid;

use super::tls;

const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Bounded request queue between `AsyncClient` and `EventLoop`.
const REQUEST_CAPACITY: usize = 64;

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
}

/// MQTT session manager implementing [`BusTransport`].
pub struct MqttTransport {
    client_id: String,
    options: MqttOptions,
    publish_qos: QoS,
    session: Option<Session>,
    /// Publishes that arrived while waiting for a SubAck.
    pending: VecDeque<InboundMessage>,
}

impl MqttTransport {
    pub fn new(config: &BrokerConfig) -> Self {
        let client_id = format!("{}-{}", config.client_id_prefix, Uuid::now_v7().simple());
        let mut options = MqttOptions::new(client_id.clone(), config.host.clone(), config.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        if let Some(credentials) = &config.credentials {
            options.set_credentials(
                credentials.username.clone(),
                credentials.password.expose_secret(),
            );
        }
        if let Some(tls_config) = tls::client_config(config.tls) {
            options.set_transport(Transport::tls_with_config(TlsConfiguration::Rustls(
                tls_config,
            )));
        }

        Self {
            client_id,
            options,
            publish_qos: to_qos(config.qos),
            session: None,
            pending: VecDeque::new(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    fn session(&mut self) -> Result<&mut Session, BusError> {
        self.session
            .as_mut()
            .ok_or_else(|| BusError::ConnectionLost("no active session".to_string()))
    }
}

impl BusTransport for MqttTransport {
    async fn connect(&mut self) -> Result<(), BusError> {
        self.session = None;
        self.pending.clear();

        let (client, mut eventloop) = AsyncClient::new(self.options.clone(), REQUEST_CAPACITY);
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        return Err(BusError::Connect(format!("broker refused: {:?}", ack.code)));
                    }
                    break;
                }
                Ok(_) => continue,
                Err(err) => return Err(BusError::Connect(err.to_string())),
            }
        }

        tracing::debug!(client_id = %self.client_id, "mqtt session established");
        self.session = Some(Session { client, eventloop });
        Ok(())
    }

    async fn subscribe(&mut self, topic: &str, qos: DeliveryQos) -> Result<(), BusError> {
        let subscribe_err = |reason: String| BusError::Subscribe {
            topic: topic.to_string(),
            reason,
        };

        let session = self.session()?;
        session
            .client
            .subscribe(topic, to_qos(qos))
            .await
            .map_err(|e| subscribe_err(e.to_string()))?;

        loop {
            let polled = self.session()?.eventloop.poll().await;
            let event = match polled {
                Ok(event) => event,
                Err(err) => {
                    self.session = None;
                    return Err(subscribe_err(err.to_string()));
                }
            };
            match event {
                Event::Incoming(Packet::SubAck(ack)) => {
                    if ack
                        .return_codes
                        .iter()
                        .any(|code| matches!(code, SubscribeReasonCode::Failure))
                    {
                        return Err(subscribe_err("broker rejected subscription".to_string()));
                    }
                    return Ok(());
                }
                Event::Incoming(Packet::Publish(publish)) => {
                    self.pending
                        .push_back(InboundMessage::new(publish.topic, publish.payload.to_vec()));
                }
                _ => {}
            }
        }
    }

    async fn next_message(&mut self) -> Result<InboundMessage, BusError> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(message);
        }

        loop {
            let polled = self.session()?.eventloop.poll().await;
            let event = match polled {
                Ok(event) => event,
                Err(err) => {
                    self.session = None;
                    return Err(BusError::ConnectionLost(err.to_string()));
                }
            };
            match event {
                Event::Incoming(Packet::Publish(publish)) => {
                    return Ok(InboundMessage::new(publish.topic, publish.payload.to_vec()));
                }
                Event::Incoming(Packet::Disconnect) => {
                    self.session = None;
                    return Err(BusError::ConnectionLost(
                        "broker closed the session".to_string(),
                    ));
                }
                _ => {}
            }
        }
    }

    fn try_publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let qos = self.publish_qos;
        self.session()?
            .client
            .try_publish(topic, qos, false, payload)
            .map_err(|e| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    async fn disconnect(&mut self) -> Result<(), BusError> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };
        session
            .client
            .disconnect()
            .await
            .map_err(|e| BusError::Disconnect(e.to_string()))?;

        // Drive the loop until DISCONNECT is written; callers bound the wait.
        loop {
            match session.eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                Ok(_) => continue,
                Err(err) => return Err(BusError::Disconnect(err.to_string())),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

fn to_qos(qos: DeliveryQos) -> QoS {
    match qos {
        DeliveryQos::AtMostOnce => QoS::AtMostOnce,
        DeliveryQos::AtLeastOnce => QoS::AtLeastOnce,
        DeliveryQos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

#[cfg(test)]
mod tests {
    use gymcount_types::bus::{Credentials, TlsMode};
    use secrecy::SecretString;

    use super::*;

    fn broker(tls: TlsMode) -> BrokerConfig {
        BrokerConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            credentials: Some(Credentials {
                username: "gym".to_string(),
                password: SecretString::from("hunter2".to_string()),
            }),
            tls,
            inbound_topic: "esp32DataChannel".to_string(),
            ack_topic: None,
            qos: DeliveryQos::AtLeastOnce,
            client_id_prefix: "backend".to_string(),
        }
    }

    #[test]
    fn client_id_uses_prefix_and_is_unique() {
        let a = MqttTransport::new(&broker(TlsMode::None));
        let b = MqttTransport::new(&broker(TlsMode::None));
        assert!(a.client_id().starts_with("backend-"));
        assert_ne!(a.client_id(), b.client_id());
    }

    #[test]
    fn options_carry_session_settings() {
        let transport = MqttTransport::new(&broker(TlsMode::TrustAll));
        assert_eq!(transport.options.keep_alive(), KEEP_ALIVE);
        assert!(transport.options.clean_session());
        assert_eq!(
            transport.options.broker_address(),
            ("127.0.0.1".to_string(), 1)
        );
        assert!(!transport.is_connected());
    }

    #[test]
    fn qos_levels_map_one_to_one() {
        assert_eq!(to_qos(DeliveryQos::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(to_qos(DeliveryQos::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(to_qos(DeliveryQos::ExactlyOnce), QoS::ExactlyOnce);
    }

    #[test]
    fn publish_without_session_fails() {
        let mut transport = MqttTransport::new(&broker(TlsMode::None));
        let err = transport.try_publish("acks", b"{}".to_vec()).unwrap_err();
        assert!(matches!(err, BusError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn next_message_without_session_fails() {
        let mut transport = MqttTransport::new(&broker(TlsMode::None));
        let err = transport.next_message().await.unwrap_err();
        assert!(matches!(err, BusError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn disconnect_without_session_is_noop() {
        let mut transport = MqttTransport::new(&broker(TlsMode::None));
        assert!(transport.disconnect().await.is_ok());
    }

    #[tokio::test]
    async fn connect_to_closed_port_reports_connect_error() {
        let mut transport = MqttTransport::new(&broker(TlsMode::None));
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, BusError::Connect(_)));
        assert!(!transport.is_connected());
    }
}

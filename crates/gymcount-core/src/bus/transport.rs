//! Bus transport port.
//!
//! The connector drives a transport through this trait; implementations live
//! in gymcount-infra (e.g. `MqttTransport`). Uses native async fn in traits
//! (Rust 2024 edition, no async_trait macro).

use gymcount_types::bus::DeliveryQos;
use gymcount_types::error::BusError;

/// One message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// A publish/subscribe session that can be re-established after loss.
pub trait BusTransport: Send {
    /// Establish a session (network connect, credentials, TLS).
    ///
    /// May be called again after any error to reconnect.
    fn connect(&mut self) -> impl std::future::Future<Output = Result<(), BusError>> + Send;

    /// Request delivery of `topic`; resolves once the broker acknowledged.
    fn subscribe(
        &mut self,
        topic: &str,
        qos: DeliveryQos,
    ) -> impl std::future::Future<Output = Result<(), BusError>> + Send;

    /// Wait for the next inbound message.
    ///
    /// An error means the session is gone and must be re-established.
    fn next_message(
        &mut self,
    ) -> impl std::future::Future<Output = Result<InboundMessage, BusError>> + Send;

    /// Queue an outbound publish without waiting for I/O.
    fn try_publish(&mut self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Close the session gracefully.
    fn disconnect(&mut self) -> impl std::future::Future<Output = Result<(), BusError>> + Send;

    fn is_connected(&self) -> bool;
}

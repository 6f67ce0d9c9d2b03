//! MQTT adapter: rumqttc transport, rustls setup and the listener service.

pub mod listener;
pub mod tls;
pub mod transport;

pub use listener::MqttListener;
pub use transport::MqttTransport;

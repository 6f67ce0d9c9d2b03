//! Message-bus side of the engine: the transport port, the reconnecting
//! connector and its status channel.

pub mod connector;
pub mod message;
pub mod status;
pub mod transport;

pub use connector::{BusConnector, ReconnectPolicy, SubscriptionOptions};
pub use status::{ConnectorHandle, StatsSnapshot, StatusReporter, status_channel};
pub use transport::{BusTransport, InboundMessage};

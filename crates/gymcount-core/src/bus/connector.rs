//! Long-lived bus connector.
//!
//! Drives a [`BusTransport`] through
//! `Disconnected -> Connecting -> Connected -> Subscribing -> Subscribed`,
//! feeds every inbound message into the [`WindowedCounter`] and recovers from
//! any broker failure:
//! - connect or subscribe failure: wait `backoff`, then start over
//! - session lost while subscribed: wait `health_interval`, then start over
//! - cancellation: leave any wait immediately, close the session with a
//!   bounded timeout, report `Shutdown`
//!
//! Retries are unbounded. Nothing is escalated to the caller.

use std::sync::Arc;
use std::time::Duration;

use gymcount_types::bus::{BrokerConfig, ConnectorState, DeliveryQos};
use gymcount_types::error::BusError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::message::{HandledMessage, handle_message};
use crate::bus::status::StatusReporter;
use crate::bus::transport::{BusTransport, InboundMessage};
use crate::presence::WindowedCounter;

/// Fixed retry timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait after a failed connect or subscribe.
    pub backoff: Duration,
    /// Wait after an established session drops.
    pub health_interval: Duration,
    /// Upper bound for the graceful disconnect on shutdown.
    pub disconnect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(3),
            health_interval: Duration::from_secs(1),
            disconnect_timeout: Duration::from_secs(2),
        }
    }
}

/// What to subscribe to and where to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionOptions {
    pub inbound_topic: String,
    pub ack_topic: Option<String>,
    pub qos: DeliveryQos,
}

impl SubscriptionOptions {
    pub fn from_broker(config: &BrokerConfig) -> Self {
        Self {
            inbound_topic: config.inbound_topic.clone(),
            ack_topic: config.ack_topic.clone(),
            qos: config.qos,
        }
    }
}

enum Setup {
    Ready,
    Failed(BusError),
    Cancelled,
}

enum SessionEnd {
    Lost(BusError),
    Cancelled,
}

/// Keeps one subscription alive and forwards its messages to the counter.
pub struct BusConnector<T: BusTransport> {
    transport: T,
    counter: Arc<WindowedCounter>,
    options: SubscriptionOptions,
    policy: ReconnectPolicy,
    status: StatusReporter,
}

impl<T: BusTransport> BusConnector<T> {
    pub fn new(
        transport: T,
        counter: Arc<WindowedCounter>,
        options: SubscriptionOptions,
        status: StatusReporter,
    ) -> Self {
        Self {
            transport,
            counter,
            options,
            policy: ReconnectPolicy::default(),
            status,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            topic = %self.options.inbound_topic,
            ack_topic = ?self.options.ack_topic,
            "bus connector starting"
        );
        self.status.set_state(ConnectorState::Disconnected);

        loop {
            match self.establish(&cancel).await {
                Setup::Ready => {}
                Setup::Cancelled => break,
                Setup::Failed(err) => {
                    warn!(
                        error = %err,
                        retry_in_secs = self.policy.backoff.as_secs_f64(),
                        "bus connect/subscribe failed, retrying"
                    );
                    self.status.error(err.to_string());
                    self.close_session().await;
                    self.status.set_state(ConnectorState::Disconnected);
                    self.status.backoff_wait();
                    if !pause(self.policy.backoff, &cancel).await {
                        break;
                    }
                    continue;
                }
            }

            match self.pump(&cancel).await {
                SessionEnd::Cancelled => break,
                SessionEnd::Lost(err) => {
                    warn!(error = %err, "bus session lost, reconnecting");
                    self.status.error(err.to_string());
                    self.status.set_state(ConnectorState::Disconnected);
                    if !pause(self.policy.health_interval, &cancel).await {
                        break;
                    }
                }
            }
        }

        self.close_session().await;
        self.status.set_state(ConnectorState::Shutdown);
        info!("bus connector stopped");
    }

    async fn establish(&mut self, cancel: &CancellationToken) -> Setup {
        self.status.set_state(ConnectorState::Connecting);
        self.status.connect_attempt();
        debug!("connecting to bus");

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Setup::Cancelled,
            result = self.transport.connect() => result,
        };
        if let Err(err) = connected {
            return Setup::Failed(err);
        }
        self.status.set_state(ConnectorState::Connected);

        self.status.set_state(ConnectorState::Subscribing);
        let topic = self.options.inbound_topic.clone();
        let subscribed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Setup::Cancelled,
            result = self.transport.subscribe(&topic, self.options.qos) => result,
        };
        if let Err(err) = subscribed {
            return Setup::Failed(err);
        }

        self.status.set_state(ConnectorState::Subscribed);
        info!(topic = %topic, qos = self.options.qos.level(), "subscribed to bus topic");
        Setup::Ready
    }

    async fn pump(&mut self, cancel: &CancellationToken) -> SessionEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionEnd::Cancelled,
                next = self.transport.next_message() => next,
            };
            match next {
                Ok(message) => self.dispatch(&message),
                Err(err) => return SessionEnd::Lost(err),
            }
        }
    }

    /// Record one message. Errors stay at message granularity.
    fn dispatch(&mut self, message: &InboundMessage) {
        match handle_message(&self.counter, message) {
            Ok(handled) => {
                self.status.message_processed();
                info!(
                    topic = %message.topic,
                    accepted = handled.outcome.accepted,
                    active = handled.outcome.active_count,
                    payload = %handled.payload,
                    "bus message recorded"
                );
                self.publish_ack(&handled);
            }
            Err(err) => {
                warn!(
                    topic = %message.topic,
                    bytes = message.payload.len(),
                    error = %err,
                    "dropping malformed bus message"
                );
                self.status.message_malformed(err.to_string());
            }
        }
    }

    /// Fire-and-forget acknowledgment; failures are only logged.
    fn publish_ack(&mut self, handled: &HandledMessage) {
        let Some(ack_topic) = self.options.ack_topic.as_deref() else {
            return;
        };
        let payload = match serde_json::to_vec(&handled.ack()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize bus ack");
                return;
            }
        };
        match self.transport.try_publish(ack_topic, payload) {
            Ok(()) => self.status.ack_published(),
            Err(err) => {
                warn!(topic = %ack_topic, error = %err, "bus ack publish failed");
                self.status.ack_failed(err.to_string());
            }
        }
    }

    /// Best-effort disconnect, bounded by `disconnect_timeout`.
    async fn close_session(&mut self) {
        if !self.transport.is_connected() {
            return;
        }
        match tokio::time::timeout(self.policy.disconnect_timeout, self.transport.disconnect())
            .await
        {
            Ok(Ok(())) => debug!("bus session closed"),
            Ok(Err(err)) => warn!(error = %err, "bus disconnect failed"),
            Err(_) => warn!(
                timeout_secs = self.policy.disconnect_timeout.as_secs_f64(),
                "bus disconnect timed out"
            ),
        }
    }
}

/// Sleep unless cancelled first. Returns `false` on cancellation.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

//! Translation of inbound bus messages into counter calls.

use gymcount_types::bus::AckPayload;
use gymcount_types::error::MessageError;
use gymcount_types::presence::RecordOutcome;

use crate::bus::transport::InboundMessage;
use crate::presence::WindowedCounter;

/// Prefix of source tags derived from bus topics.
pub const BUS_SOURCE_PREFIX: &str = "mqtt";

/// A message that reached the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledMessage {
    pub source: String,
    pub payload: String,
    pub outcome: RecordOutcome,
}

impl HandledMessage {
    pub fn ack(&self) -> AckPayload {
        AckPayload {
            accepted: self.outcome.accepted,
            active_count: self.outcome.active_count,
            timestamp: self.outcome.observed_at,
            source: self.source.clone(),
        }
    }
}

/// Normalized source tag for a topic: `mqtt:{topic}`.
pub fn source_tag(topic: &str) -> String {
    format!("{BUS_SOURCE_PREFIX}:{topic}")
}

/// Decode the payload as UTF-8 and record it.
///
/// Malformed messages are rejected before touching the counter, so they
/// neither count nor replace the latest activity.
pub fn handle_message(
    counter: &WindowedCounter,
    message: &InboundMessage,
) -> Result<HandledMessage, MessageError> {
    if message.topic.is_empty() {
        return Err(MessageError::EmptyTopic);
    }
    let payload =
        std::str::from_utf8(&message.payload).map_err(|_| MessageError::InvalidUtf8 {
            topic: message.topic.clone(),
            len: message.payload.len(),
        })?;

    let source = source_tag(&message.topic);
    let outcome = counter.record_entry(&source, payload);

    Ok(HandledMessage {
        source,
        payload: payload.to_string(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use gymcount_types::presence::PresenceSettings;

    use super::*;
    use crate::clock::ManualClock;

    fn counter() -> (WindowedCounter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            WindowedCounter::with_clock(PresenceSettings::default(), clock.clone()),
            clock,
        )
    }

    #[test]
    fn source_tag_prefixes_topic() {
        assert_eq!(source_tag("esp32DataChannel"), "mqtt:esp32DataChannel");
    }

    #[test]
    fn handle_records_text_payload() {
        let (counter, _clock) = counter();
        let msg = InboundMessage::new("esp32DataChannel", "door 1 open");

        let handled = handle_message(&counter, &msg).unwrap();

        assert_eq!(handled.source, "mqtt:esp32DataChannel");
        assert_eq!(handled.payload, "door 1 open");
        assert!(handled.outcome.accepted);
        assert_eq!(handled.outcome.active_count, 1);

        let latest = counter.latest().unwrap();
        assert_eq!(latest.source, "mqtt:esp32DataChannel");
        assert_eq!(latest.message, "door 1 open");
    }

    #[test]
    fn handle_reports_debounced_message() {
        let (counter, clock) = counter();
        handle_message(&counter, &InboundMessage::new("t", "1")).unwrap();
        clock.advance(Duration::from_millis(500));
        let handled = handle_message(&counter, &InboundMessage::new("t", "2")).unwrap();
        assert!(!handled.outcome.accepted);
        assert_eq!(handled.outcome.active_count, 1);
    }

    #[test]
    fn invalid_utf8_is_rejected_without_recording() {
        let (counter, _clock) = counter();
        let msg = InboundMessage::new("esp32DataChannel", vec![0xffu8, 0xfe, 0x00]);

        let err = handle_message(&counter, &msg).unwrap_err();

        assert_eq!(
            err,
            MessageError::InvalidUtf8 {
                topic: "esp32DataChannel".to_string(),
                len: 3
            }
        );
        assert_eq!(counter.active_count(), 0);
        assert!(counter.latest().is_none());
    }

    #[test]
    fn empty_topic_is_rejected() {
        let (counter, _clock) = counter();
        let err = handle_message(&counter, &InboundMessage::new("", "x")).unwrap_err();
        assert_eq!(err, MessageError::EmptyTopic);
    }

    #[test]
    fn empty_payload_is_a_valid_trigger() {
        let (counter, _clock) = counter();
        let handled = handle_message(&counter, &InboundMessage::new("t", Vec::<u8>::new())).unwrap();
        assert!(handled.outcome.accepted);
        assert_eq!(handled.payload, "");
    }

    #[test]
    fn ack_mirrors_outcome() {
        let (counter, _clock) = counter();
        let handled = handle_message(&counter, &InboundMessage::new("t", "x")).unwrap();
        let ack = handled.ack();
        assert!(ack.accepted);
        assert_eq!(ack.active_count, 1);
        assert_eq!(ack.timestamp, handled.outcome.observed_at);
        assert_eq!(ack.source, "mqtt:t");
    }
}

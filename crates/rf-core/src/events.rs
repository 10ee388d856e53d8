//! Conversion event system.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel. Subscribers only
//! see events sent after they subscribed; the progress registry is the
//! record of what a job has already done.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::JobId;
use crate::media::RatioTag;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload describing what happened to a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    JobSubmitted {
        job_id: JobId,
        total_units: u32,
    },
    UnitStarted {
        job_id: JobId,
        label: String,
    },
    UnitSucceeded {
        job_id: JobId,
        output_name: String,
        ratio: RatioTag,
    },
    UnitFailed {
        job_id: JobId,
        source_name: String,
        ratio: RatioTag,
        error: String,
    },
    JobDone {
        job_id: JobId,
        succeeded: u32,
        failed: u32,
    },
}

impl EventPayload {
    /// The job this event belongs to.
    pub fn job_id(&self) -> JobId {
        match self {
            EventPayload::JobSubmitted { job_id, .. }
            | EventPayload::UnitStarted { job_id, .. }
            | EventPayload::UnitSucceeded { job_id, .. }
            | EventPayload::UnitFailed { job_id, .. }
            | EventPayload::JobDone { job_id, .. } => *job_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Fan-out of job events to any number of subscribers.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is how many events a slow subscriber may fall behind
    /// before it starts missing them.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Timestamp `payload` and send it to all current subscribers.
    pub fn broadcast(&self, payload: EventPayload) {
        // No subscribers is fine.
        let _ = self.tx.send(Event::new(payload));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let job_id = JobId::new();
        bus.broadcast(EventPayload::JobSubmitted {
            job_id,
            total_units: 4,
        });

        let event = rx.try_recv().unwrap();
        match &event.payload {
            EventPayload::JobSubmitted {
                job_id: received,
                total_units,
            } => {
                assert_eq!(*received, job_id);
                assert_eq!(*total_units, 4);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn late_subscriber_sees_only_new_events() {
        let bus = EventBus::new(16);
        let job_id = JobId::new();
        bus.broadcast(EventPayload::JobSubmitted {
            job_id,
            total_units: 1,
        });

        let mut rx = bus.subscribe();
        bus.broadcast(EventPayload::JobDone {
            job_id,
            succeeded: 1,
            failed: 0,
        });

        let event = rx.try_recv().unwrap();
        assert!(matches!(event.payload, EventPayload::JobDone { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.broadcast(EventPayload::UnitFailed {
            job_id: JobId::new(),
            source_name: "a.mp4".into(),
            ratio: RatioTag::Square,
            error: "Transcode error: invalid codec".into(),
        });
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = EventPayload::UnitSucceeded {
            job_id: JobId::new(),
            output_name: "clip_竖.mp4".into(),
            ratio: RatioTag::Portrait,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "unit_succeeded");
        assert_eq!(json["ratio"], "9:16");
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = Event::new(EventPayload::JobDone {
            job_id: JobId::new(),
            succeeded: 2,
            failed: 1,
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.payload.job_id(), event.payload.job_id());
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for a committed event, the unit handed to the event sink.
///
/// Notes:
/// - `partition_key` preserves ordering on partitioned transports: all
///   events for the same key land on the same partition. For stock events
///   the key is the product id.
/// - `record_version` is the aggregate version the write committed at,
///   usable by consumers to discard stale duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    /// Ordering key on partitioned transports (product id for stock).
    partition_key: String,

    /// Type of the emitting aggregate (e.g. "inventory.stock").
    source: String,

    /// Aggregate version at which the event was committed.
    record_version: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        partition_key: impl Into<String>,
        source: impl Into<String>,
        record_version: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            partition_key: partition_key.into(),
            source: source.into(),
            record_version,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn record_version(&self) -> u64 {
        self.record_version
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

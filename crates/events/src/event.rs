use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are immutable facts: once emitted they are never edited, only
/// appended. The schema version exists so payloads can evolve without
/// breaking consumers of older shapes.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "stock.reserved").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn schema_version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}

//! `stockroom-events` — domain-agnostic event machinery.
//!
//! Defines what an event is, the envelope it travels in, and the pub/sub
//! contract used to hand committed events to downstream consumers.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;

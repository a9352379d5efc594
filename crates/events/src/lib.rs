//! Ledger event plumbing: the event contract, the envelope that carries events to
//! observers and the publish/subscribe bus.
//!
//! Events are append-only facts. The ledger emits them after a commit and never reads
//! them back.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};

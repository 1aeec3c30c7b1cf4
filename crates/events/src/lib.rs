//! Authentication events and their in-order delivery.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::{AuthEvent, AuthEventKind};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};

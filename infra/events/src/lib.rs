//! # Event Bus
//!
//! A small, type-safe, asynchronous event bus connecting the progression engine to the
//! passive observers around it (presentation layers, loggers, the host daemon).
//!
//! ## Channel kinds
//!
//! * **Broadcast**: fan-out of discrete events such as milestones and engine notices.
//! * **Watch**: the latest value of a piece of state, such as the current profile view.
//!
//! Events are keyed by their Rust type; each type owns exactly one channel.
//!
//! # Example
//!
//! ```rust
//! use evo_event_bus::{EventBus, EventBusError, EventReceiverExt};
//!
//! #[derive(Debug, PartialEq)]
//! struct CeilingReached { domain: &'static str }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EventBusError> {
//!     let bus = EventBus::new();
//!     let mut rx = bus.subscribe::<CeilingReached>()?;
//!     bus.publish(CeilingReached { domain: "power" })?;
//!
//!     let event = rx.recv_event().await.expect("bus is open");
//!     assert_eq!(event.domain, "power");
//!     Ok(())
//! }
//! ```

mod bus;
mod error;
mod receiver;

pub use bus::{ChannelKind, Event, EventBus};
pub use error::{EventBusError, EventBusErrorExt};
pub use receiver::EventReceiverExt;

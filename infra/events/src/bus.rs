use crate::error::EventBusError;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::trace;

/// Default broadcast buffer. Milestones are rare; notices rarer.
const DEFAULT_CAPACITY: usize = 128;

/// Marker trait for types that can be sent across the [`EventBus`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

/// Channel kinds a type can be registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Fan-out: every subscriber sees every event.
    Broadcast { capacity: usize },
    /// Latest value: subscribers observe only the most recent state.
    Watch,
}

#[derive(Debug)]
struct Slot {
    kind: ChannelKind,
    sender: Box<dyn Any + Send + Sync>,
}

impl Slot {
    fn broadcast<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        if !matches!(self.kind, ChannelKind::Broadcast { .. }) {
            return Err(kind_mismatch::<T>(
                ChannelKind::Broadcast { capacity: DEFAULT_CAPACITY },
                self.kind,
            ));
        }
        self.sender
            .downcast_ref::<broadcast::Sender<Arc<T>>>()
            .cloned()
            .ok_or_else(type_mismatch::<T>)
    }

    fn watch<T: Event>(&self) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        if self.kind != ChannelKind::Watch {
            return Err(kind_mismatch::<T>(ChannelKind::Watch, self.kind));
        }
        self.sender.downcast_ref::<watch::Sender<Arc<T>>>().cloned().ok_or_else(type_mismatch::<T>)
    }
}

/// A thread-safe, type-indexed event bus.
///
/// Every event type owns exactly one channel, created lazily on first use. Cloning the
/// bus is cheap and every clone shares the same channels, so a host can subscribe before
/// handing a clone to the engine.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    channels: Arc<RwLock<FxHashMap<TypeId, Slot>>>,
}

impl EventBus {
    /// Creates a new, empty `EventBus`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to broadcast events of type `T`.
    ///
    /// Each broadcast channel buffers 128 events; a slower receiver skips
    /// ahead to the oldest retained event.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a watch channel.
    ///
    /// # Examples
    /// ```rust
    /// use evo_event_bus::{EventBus, EventReceiverExt};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct LevelReached(u32);
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), evo_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe::<LevelReached>()?;
    /// bus.publish(LevelReached(2))?;
    /// assert_eq!(rx.recv_event().await.unwrap().0, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T: Event>(&self) -> Result<broadcast::Receiver<Arc<T>>, EventBusError> {
        Ok(self.broadcast_sender::<T>()?.subscribe())
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Returns the number of receivers reached; zero when nobody listens.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a watch channel.
    pub fn publish<T: Event>(&self, event: T) -> Result<usize, EventBusError> {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes a shared event instance without re-wrapping.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a watch channel.
    pub fn publish_arc<T: Event>(&self, event: Arc<T>) -> Result<usize, EventBusError> {
        let sender = self.broadcast_sender::<T>()?;
        let count = sender.send(event).unwrap_or_default();
        trace!(event = type_name::<T>(), count, "Event dispatched");
        Ok(count)
    }

    /// Subscribes to the latest-value channel of `T`, seeding it with `initial` if absent.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a broadcast channel.
    ///
    /// # Examples
    /// ```rust
    /// use evo_event_bus::EventBus;
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Level(u32);
    ///
    /// # fn main() -> Result<(), evo_event_bus::EventBusError> {
    /// let bus = EventBus::new();
    /// let rx = bus.watch(Level(1))?;
    /// bus.publish_watch(Level(3))?;
    /// assert_eq!(rx.borrow().0, 3);
    /// # Ok(())
    /// # }
    /// ```
    pub fn watch<T: Event>(&self, initial: T) -> Result<watch::Receiver<Arc<T>>, EventBusError> {
        Ok(self.watch_sender::<T>(Arc::new(initial), false)?.subscribe())
    }

    /// Replaces the latest value of `T`, creating the channel if missing.
    ///
    /// # Errors
    /// Returns [`EventBusError::ChannelKindMismatch`] if `T` is registered as a broadcast channel.
    pub fn publish_watch<T: Event>(&self, value: T) -> Result<(), EventBusError> {
        self.watch_sender::<T>(Arc::new(value), true).map(|_| ())
    }

    /// Returns the current value of the watch channel for `T`, if one exists.
    #[must_use]
    pub fn latest<T: Event>(&self) -> Option<Arc<T>> {
        let channels = self.channels.read();
        let sender = channels.get(&TypeId::of::<T>())?.watch::<T>().ok()?;
        drop(channels);
        let value = sender.borrow().clone();
        Some(value)
    }

    fn broadcast_sender<T: Event>(&self) -> Result<broadcast::Sender<Arc<T>>, EventBusError> {
        let id = TypeId::of::<T>();
        if let Some(slot) = self.channels.read().get(&id) {
            return slot.broadcast::<T>();
        }

        let mut channels = self.channels.write();
        let slot = channels.entry(id).or_insert_with(|| {
            let capacity = DEFAULT_CAPACITY;
            trace!(event = type_name::<T>(), capacity, "Initializing broadcast channel");
            let (tx, _) = broadcast::channel::<Arc<T>>(capacity);
            Slot { kind: ChannelKind::Broadcast { capacity }, sender: Box::new(tx) }
        });
        slot.broadcast::<T>()
    }

    fn watch_sender<T: Event>(
        &self,
        value: Arc<T>,
        replace: bool,
    ) -> Result<watch::Sender<Arc<T>>, EventBusError> {
        let id = TypeId::of::<T>();
        let existing = self.channels.read().get(&id).map(Slot::watch::<T>);

        let sender = match existing {
            Some(sender) => {
                let sender = sender?;
                if replace {
                    sender.send_replace(value);
                }
                sender
            },
            None => {
                let mut created = false;
                let sender = {
                    let mut channels = self.channels.write();
                    let slot = channels.entry(id).or_insert_with(|| {
                        trace!(event = type_name::<T>(), "Initializing watch channel");
                        created = true;
                        let (tx, _) = watch::channel::<Arc<T>>(Arc::clone(&value));
                        Slot { kind: ChannelKind::Watch, sender: Box::new(tx) }
                    });
                    slot.watch::<T>()?
                };
                // Another caller may have won the race to create the channel.
                if replace && !created {
                    sender.send_replace(value);
                }
                sender
            },
        };

        Ok(sender)
    }
}

fn type_mismatch<T>() -> EventBusError {
    EventBusError::TypeMismatch {
        message: type_name::<T>().into(),
        context: Some("Unexpected event type".into()),
    }
}

fn kind_mismatch<T>(expected: ChannelKind, found: ChannelKind) -> EventBusError {
    EventBusError::ChannelKindMismatch {
        message: format!("Expected {expected:?} but found {found:?} for {}", type_name::<T>())
            .into(),
        context: None,
    }
}

use crate::bus::Event;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Ergonomic receive for bus receivers.
///
/// Broadcast receivers skip over lag instead of failing, so a slow observer loses old
/// events but never stalls. Watch receivers wait for a change and yield the latest value.
pub trait EventReceiverExt<T> {
    /// Receive the next event, returning `None` once the channel is closed.
    fn recv_event(&mut self) -> impl Future<Output = Option<Arc<T>>> + Send;
}

impl<T: Event> EventReceiverExt<T> for broadcast::Receiver<Arc<T>> {
    async fn recv_event(&mut self) -> Option<Arc<T>> {
        let mut skipped = 0u64;

        loop {
            match self.recv().await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(
                            event = std::any::type_name::<T>(),
                            skipped, "EventBus receiver lagged; continuing from latest message"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl<T: Event> EventReceiverExt<T> for watch::Receiver<Arc<T>> {
    async fn recv_event(&mut self) -> Option<Arc<T>> {
        match self.changed().await {
            Ok(()) => Some(self.borrow_and_update().clone()),
            Err(_) => None,
        }
    }
}

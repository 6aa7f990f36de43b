//! Connectivity observation with a single owned OS registration.

use crate::classifier::classify_active;
use crate::error::Result;
use bridge_traits::network::{
    ConnectionClass, ConnectivityProvider, NetworkChange, NetworkRegistration,
};
use core_runtime::events::{ConnectivityEvent, CoreEvent, EventBus};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Identifies one logical subscription on a [`ConnectivityObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct ActiveSink {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<ConnectionClass>,
}

struct Shared {
    provider: Arc<dyn ConnectivityProvider>,
    event_bus: Option<EventBus>,
    // Lock order: registration, then sink. OS callbacks only take `sink`.
    registration: Mutex<Option<Box<dyn NetworkRegistration>>>,
    sink: Mutex<Option<ActiveSink>>,
    next_id: AtomicU64,
}

impl Shared {
    fn current_class(&self) -> ConnectionClass {
        classify_active(self.provider.active_snapshot().as_ref())
    }

    fn registration(&self) -> MutexGuard<'_, Option<Box<dyn NetworkRegistration>>> {
        self.registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sink(&self) -> MutexGuard<'_, Option<ActiveSink>> {
        self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn on_change(&self, change: NetworkChange) {
        let class = self.current_class();
        trace!(?change, network_type = %class, "Default network callback");

        if let Some(sink) = self.sink().as_ref() {
            if sink.sender.send(class).is_err() {
                trace!(subscription = %sink.id, "Subscriber receiver already closed");
            }
        }

        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Connectivity(ConnectivityEvent::Changed {
                network_type: class,
            }));
        }
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut registration = self.registration();
        let mut sink = self.sink();

        if sink.as_ref().map(|active| active.id) != Some(id) {
            return;
        }
        *sink = None;
        drop(sink);

        // Unregistering does not wait for in-flight callbacks, so holding the
        // lock here cannot deadlock with `on_change`.
        if let Some(registration) = registration.take() {
            registration.unregister();
            debug!(subscription = %id, "Released default network callback");
        }
    }
}

/// Observes the device's default network.
///
/// At most one OS callback registration is live per observer. It is created
/// by the first [`subscribe`](Self::subscribe) and released when the active
/// subscription is cancelled or the observer is dropped.
///
/// Only one subscription receives events at a time: subscribing again
/// replaces the previous sink, whose stream then ends.
///
/// Every raw OS notification produces an event, even when the class did not
/// change. Consumers that want distinct values must de-duplicate.
pub struct ConnectivityObserver {
    shared: Arc<Shared>,
}

impl ConnectivityObserver {
    pub fn new(provider: Arc<dyn ConnectivityProvider>) -> Self {
        Self::build(provider, None)
    }

    /// Observer that also publishes [`ConnectivityEvent::Changed`] on `event_bus`.
    pub fn with_event_bus(provider: Arc<dyn ConnectivityProvider>, event_bus: EventBus) -> Self {
        Self::build(provider, Some(event_bus))
    }

    fn build(provider: Arc<dyn ConnectivityProvider>, event_bus: Option<EventBus>) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                event_bus,
                registration: Mutex::new(None),
                sink: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Classify the current default network.
    ///
    /// Bounded only by the platform query itself.
    pub fn current_class(&self) -> ConnectionClass {
        self.shared.current_class()
    }

    /// Start streaming connection classes.
    ///
    /// The returned subscription immediately yields the class at subscribe
    /// time, then one value per OS change notification.
    ///
    /// # Errors
    ///
    /// Fails when the platform refuses the callback registration.
    pub fn subscribe(&self) -> Result<Subscription> {
        let mut registration = self.shared.registration();

        if registration.is_none() {
            let weak = Arc::downgrade(&self.shared);
            let callback = Arc::new(move |change: NetworkChange| {
                if let Some(shared) = weak.upgrade() {
                    shared.on_change(change);
                }
            });
            *registration = Some(
                self.shared
                    .provider
                    .register_default_network_callback(callback)?,
            );
            debug!("Registered default network callback");
        }

        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::unbounded_channel();

        // Synthetic first event; queued before the sink is visible to callbacks
        let _ = sender.send(self.shared.current_class());

        let previous = self.shared.sink().replace(ActiveSink { id, sender });
        if let Some(previous) = previous {
            debug!(replaced = %previous.id, subscription = %id, "Replaced active subscriber");
        }

        Ok(Subscription {
            id,
            receiver,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Cancel a subscription by id.
    ///
    /// Unknown, replaced, or already cancelled ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.unsubscribe(id);
    }

    /// Whether an OS callback registration is currently held.
    pub fn is_registered(&self) -> bool {
        self.shared.registration().is_some()
    }
}

impl Drop for ConnectivityObserver {
    fn drop(&mut self) {
        let mut registration = self.shared.registration();
        self.shared.sink().take();
        if let Some(registration) = registration.take() {
            registration.unregister();
        }
    }
}

impl fmt::Debug for ConnectivityObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectivityObserver")
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Live handle on the connectivity stream.
///
/// Dropping the handle cancels it.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<ConnectionClass>,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next connection class; `None` once cancelled, replaced, or the
    /// observer is gone.
    pub async fn next(&mut self) -> Option<ConnectionClass> {
        self.receiver.recv().await
    }

    /// Next buffered connection class without waiting.
    pub fn try_next(&mut self) -> Option<ConnectionClass> {
        self.receiver.try_recv().ok()
    }

    /// Stop receiving events. Calling it more than once is harmless.
    pub fn cancel(&mut self) {
        self.receiver.close();
        if let Some(shared) = self.shared.upgrade() {
            shared.unsubscribe(self.id);
        }
        self.shared = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

//! Event system for failover routing.
//!
//! Routers and dispatchers report what they did through events so callers
//! can observe degradation and recovery without reaching into router state.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// An event emitted by a failover router or dispatcher.
pub trait RouterEvent: Send + Sync + fmt::Debug {
    /// Short machine-readable event name (e.g. `"degraded"`).
    fn event_type(&self) -> &'static str;

    /// When the event happened.
    fn timestamp(&self) -> Instant;

    /// Name of the router instance that emitted the event.
    fn router_name(&self) -> &str;
}

/// Receives events of type `E`.
pub trait EventListener<E: RouterEvent>: Send + Sync {
    /// Called once per emitted event.
    fn on_event(&self, event: &E);
}

/// One registered listener, optionally limited to a single event type.
struct Subscription<E: RouterEvent> {
    only: Option<&'static str>,
    listener: Arc<dyn EventListener<E>>,
}

impl<E: RouterEvent> Subscription<E> {
    fn wants(&self, event: &E) -> bool {
        match self.only {
            Some(kind) => kind == event.event_type(),
            None => true,
        }
    }
}

impl<E: RouterEvent> Clone for Subscription<E> {
    fn clone(&self) -> Self {
        Self {
            only: self.only,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// The listeners of one router, in registration order.
///
/// A listener either sees every event or only those whose
/// [`RouterEvent::event_type`] matches the name it subscribed with.
/// Clones share the registered callbacks.
pub struct EventListeners<E: RouterEvent> {
    subscriptions: Vec<Subscription<E>>,
}

impl<E: RouterEvent> EventListeners<E> {
    /// Creates an empty listener set.
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Registers a listener for every event.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(None, listener);
    }

    /// Registers a listener for events of type `event_type` only.
    pub fn add_for<L>(&mut self, event_type: &'static str, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribe(Some(event_type), listener);
    }

    fn subscribe<L>(&mut self, only: Option<&'static str>, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscriptions.push(Subscription {
            only,
            listener: Arc::new(listener),
        });
    }

    /// Delivers `event` to each interested listener.
    ///
    /// Returns how many listeners handled it. A listener that panics is
    /// not counted and does not stop delivery to the rest.
    pub fn emit(&self, event: &E) -> usize {
        self.subscriptions
            .iter()
            .filter(|sub| sub.wants(event))
            .filter(|sub| {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    sub.listener.on_event(event)
                }))
                .is_ok()
            })
            .count()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Number of registered listeners, filtered or not.
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }
}

impl<E: RouterEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            subscriptions: self.subscriptions.clone(),
        }
    }
}

impl<E: RouterEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RouterEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filtered: Vec<_> = self.subscriptions.iter().filter_map(|s| s.only).collect();
        f.debug_struct("EventListeners")
            .field("len", &self.subscriptions.len())
            .field("filtered", &filtered)
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _event: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: RouterEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

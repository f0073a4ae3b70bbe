//! Named publish/subscribe delivery of navigation events.
//!
//! The navigation stack never talks to a concrete bus: it publishes through
//! the [`Publish`] trait it is handed. Three sinks ship with the crate:
//!
//! - [`EventChannel`]: synchronous, name-keyed subscriptions. Every handler
//!   subscribed to a name runs before `publish` returns.
//! - [`Hub`]: forwards the event to the application-wide `mpsc` channel.
//! - [`Bus`]: queues the event locally, to be bubbled up by the caller.
//!
//! # Example
//!
//! ```
//! use quire_core::view::{Event, EventChannel, ID_FEEDER};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let mut channel = EventChannel::new();
//! let subscriber = ID_FEEDER.next();
//!
//! let sink = Rc::clone(&seen);
//! channel.subscribe(subscriber, "view_switched_back", move |evt: &Event| {
//!     sink.borrow_mut().push(evt.clone());
//! });
//!
//! let evt = Event::SwitchedBack { from: "Book".to_string(), to: 3 };
//! channel.publish("view_switched_back", &evt);
//! assert_eq!(seen.borrow().as_slice(), &[evt]);
//! ```

use super::{Bus, Event, Hub, Id};
use indexmap::IndexMap;
use std::fmt;

/// Identity under which a handler is registered.
pub type SubscriberId = Id;

type Handler = Box<dyn FnMut(&Event)>;

/// Capability to announce an event under a name.
pub trait Publish {
    fn publish(&mut self, name: &str, evt: &Event);
}

impl Publish for Hub {
    fn publish(&mut self, _name: &str, evt: &Event) {
        self.send(evt.clone()).ok();
    }
}

impl Publish for Bus {
    fn publish(&mut self, _name: &str, evt: &Event) {
        self.push_back(evt.clone());
    }
}

/// Synchronous event bus keyed by event name.
///
/// Handlers of a given name run in registration order. A subscriber holds at
/// most one handler per name; subscribing again replaces the previous handler
/// and keeps its position.
#[derive(Default)]
pub struct EventChannel {
    subscriptions: IndexMap<String, IndexMap<SubscriberId, Handler>>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events published under `name`.
    ///
    /// Returns `true` if an earlier handler of `subscriber` was replaced.
    pub fn subscribe<F>(&mut self, subscriber: SubscriberId, name: &str, handler: F) -> bool
    where
        F: FnMut(&Event) + 'static,
    {
        self.subscriptions
            .entry(name.to_string())
            .or_default()
            .insert(subscriber, Box::new(handler))
            .is_some()
    }

    /// Removes the handler `subscriber` registered for `name`.
    ///
    /// Returns `false` if there was none.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId, name: &str) -> bool {
        let Some(handlers) = self.subscriptions.get_mut(name) else {
            return false;
        };

        let removed = handlers.shift_remove(&subscriber).is_some();
        if handlers.is_empty() {
            self.subscriptions.shift_remove(name);
        }

        removed
    }

    /// Removes every handler of `subscriber` and returns how many there were.
    pub fn unsubscribe_all(&mut self, subscriber: SubscriberId) -> usize {
        let mut removed = 0;
        self.subscriptions.retain(|_, handlers| {
            if handlers.shift_remove(&subscriber).is_some() {
                removed += 1;
            }
            !handlers.is_empty()
        });

        removed
    }

    pub fn is_subscribed(&self, subscriber: SubscriberId, name: &str) -> bool {
        self.subscriptions
            .get(name)
            .is_some_and(|handlers| handlers.contains_key(&subscriber))
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscriptions.get(name).map_or(0, IndexMap::len)
    }

    /// Delivers `evt` to every handler registered for `name`.
    ///
    /// Returns the number of handlers that ran.
    pub fn publish(&mut self, name: &str, evt: &Event) -> usize {
        let Some(handlers) = self.subscriptions.get_mut(name) else {
            tracing::trace!(name, "no subscribers");
            return 0;
        };

        for handler in handlers.values_mut() {
            handler(evt);
        }

        tracing::trace!(name, count = handlers.len(), "event delivered");
        handlers.len()
    }
}

impl Publish for EventChannel {
    fn publish(&mut self, name: &str, evt: &Event) {
        EventChannel::publish(self, name, evt);
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, handlers) in &self.subscriptions {
            map.entry(name, &handlers.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}

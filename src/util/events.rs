// Copyright (c) 2024 Mike Tsao

//! A small observer interface. Each component owns an [Emitter] for its own
//! event enum, and consumers register plain callbacks with it.

use core::fmt::Debug;
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Returned by [Emitter::subscribe()]; hand it back to
/// [Emitter::unsubscribe()] to stop receiving events.
#[derive(Synonym, Serialize, Deserialize)]
pub struct SubscriptionId(pub usize);

type Handler<E> = Box<dyn FnMut(&E)>;

/// Keeps a list of callbacks and calls each of them, in subscription order,
/// for every emitted event.
///
/// Events are emitted only after the state they describe has been committed,
/// so a handler can look at its source and see consistent data. Handlers are
/// not allowed to reach back into the emitting component mutably; the borrow
/// checker enforces this for the components in this crate.
pub struct Emitter<E> {
    next_id: usize,
    handlers: Vec<(SubscriptionId, Handler<E>)>,
}
impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self {
            next_id: 1,
            handlers: Default::default(),
        }
    }
}
impl<E> Debug for Emitter<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}
impl<E: 'static> Emitter<E> {
    /// Registers a handler that receives every event.
    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Registers a handler that receives only events of the given kind. `K`
    /// is usually the discriminant enum that strum generates for `E`.
    pub fn subscribe_kind<K>(
        &mut self,
        kind: K,
        mut handler: impl FnMut(&E) + 'static,
    ) -> SubscriptionId
    where
        K: for<'a> From<&'a E> + PartialEq + 'static,
    {
        self.subscribe(move |event| {
            if K::from(event) == kind {
                handler(event);
            }
        })
    }

    /// Removes a handler. Returns false if the id wasn't subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        before != self.handlers.len()
    }

    /// Sends the event to every handler.
    pub fn emit(&mut self, event: &E) {
        for (_, handler) in self.handlers.iter_mut() {
            handler(event);
        }
    }

    /// Builds the event only if someone is listening, then sends it.
    pub fn emit_with(&mut self, event_fn: impl FnOnce() -> E) {
        if !self.handlers.is_empty() {
            let event = event_fn();
            self.emit(&event);
        }
    }

    /// The number of registered handlers.
    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

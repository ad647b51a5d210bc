// Copyright (c) 2024 Mike Tsao

//! The "has unsaved changes" flag shared by an automaton and everything it
//! owns.

use super::{Emitter, SubscriptionId};
use core::cell::{Cell, RefCell};
use core::fmt::Debug;
use std::rc::Rc;

#[derive(Default)]
struct SaveTrackerInner {
    should_save: Cell<bool>,
    emitter: RefCell<Emitter<bool>>,
}

/// A cloneable handle to a dirty flag. Curves and channels hold a clone and
/// mark it on every mutation; the owner of the automaton subscribes to learn
/// when the flag flips.
#[derive(Clone, Default)]
pub struct SaveTracker(Rc<SaveTrackerInner>);
impl Debug for SaveTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("SaveTracker")
            .field(&self.0.should_save.get())
            .finish()
    }
}
impl SaveTracker {
    /// Whether there are changes that have not been saved yet.
    pub fn should_save(&self) -> bool {
        self.0.should_save.get()
    }

    /// Sets the flag. Subscribers hear about it only if the value changed.
    pub fn set_should_save(&self, should_save: bool) {
        if self.0.should_save.replace(should_save) == should_save {
            return;
        }
        match self.0.emitter.try_borrow_mut() {
            Ok(mut emitter) => emitter.emit(&should_save),
            Err(_) => {
                log::warn!("SaveTracker changed from inside one of its own handlers; not notifying")
            }
        }
    }

    /// Records that something changed.
    pub fn mark(&self) {
        self.set_should_save(true);
    }

    /// Registers a handler that receives the new flag value.
    pub fn subscribe(&self, handler: impl FnMut(&bool) + 'static) -> SubscriptionId {
        self.0.emitter.borrow_mut().subscribe(handler)
    }

    /// Removes a handler.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.0.emitter.borrow_mut().unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifies_only_on_flip() {
        let tracker = SaveTracker::default();
        let seen = Rc::new(RefCell::new(Vec::default()));
        let s = Rc::clone(&seen);
        tracker.subscribe(move |v| s.borrow_mut().push(*v));

        let clone = tracker.clone();
        clone.mark();
        clone.mark();
        assert!(tracker.should_save(), "clones should share the flag");
        tracker.set_should_save(false);
        tracker.set_should_save(false);

        assert_eq!(*seen.borrow(), vec![true, false]);
    }
}

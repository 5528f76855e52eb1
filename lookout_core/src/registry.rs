// Copyright 2026 the Lookout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The insertion-ordered set of active listeners.

use core::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::listener::{Handler, Listener, ListenerId, ListenerOptions};

/// Owns every active [`Listener`].
///
/// Mutation goes through `&self` so handlers can subscribe and unsubscribe
/// while a dispatch is iterating a [`snapshot`](Self::snapshot). No borrow of
/// the inner list is ever held while user code runs.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    listeners: RefCell<Vec<Rc<Listener>>>,
    next_id: Cell<u64>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a listener for `handler`, returning its id.
    ///
    /// If `handler` is already registered, the existing id is returned and
    /// `options` is dropped.
    pub fn add(&self, handler: Handler, options: ListenerOptions) -> ListenerId {
        if let Some(existing) = self.find(&handler) {
            return existing.id();
        }
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners
            .borrow_mut()
            .push(Rc::new(Listener::new(id, handler, options)));
        id
    }

    /// Removes the listener for `handler`, returning it if it was present.
    ///
    /// The removed listener is marked inactive, so a dispatch that already
    /// holds it in a snapshot skips its remaining steps.
    pub fn remove(&self, handler: &Handler) -> Option<Rc<Listener>> {
        let mut listeners = self.listeners.borrow_mut();
        let idx = listeners.iter().position(|l| l.handler() == handler)?;
        let removed = listeners.remove(idx);
        removed.deactivate();
        Some(removed)
    }

    /// Returns the listener registered for `handler`.
    #[must_use]
    pub fn find(&self, handler: &Handler) -> Option<Rc<Listener>> {
        self.listeners
            .borrow()
            .iter()
            .find(|l| l.handler() == handler)
            .cloned()
    }

    /// Returns the listener with the given id.
    #[must_use]
    pub fn get(&self, id: ListenerId) -> Option<Rc<Listener>> {
        self.listeners
            .borrow()
            .iter()
            .find(|l| l.id() == id)
            .cloned()
    }

    /// A copy of the current listener list, in insertion order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<Listener>> {
        self.listeners.borrow().clone()
    }

    /// Number of active listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Handler::from_viewport(|_| {})
    }

    #[test]
    fn ids_are_unique_and_order_is_insertion() {
        let reg = ListenerRegistry::new();
        let a = reg.add(noop(), ListenerOptions::viewport());
        let b = reg.add(noop(), ListenerOptions::scroll());
        let c = reg.add(noop(), ListenerOptions::dimensions());
        assert_ne!(a, b);
        let ids: Vec<_> = reg.snapshot().iter().map(|l| l.id()).collect();
        assert_eq!(ids, [a, b, c]);
    }

    #[test]
    fn duplicate_handler_returns_existing_id() {
        let reg = ListenerRegistry::new();
        let h = noop();
        let a = reg.add(h.clone(), ListenerOptions::viewport());
        let b = reg.add(h, ListenerOptions::scroll());
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let reg = ListenerRegistry::new();
        reg.add(noop(), ListenerOptions::viewport());
        assert!(reg.remove(&noop()).is_none());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn removed_listener_is_inactive_in_old_snapshot() {
        let reg = ListenerRegistry::new();
        let h = noop();
        let id = reg.add(h.clone(), ListenerOptions::viewport());
        let snap = reg.snapshot();
        assert!(reg.remove(&h).is_some());
        assert!(reg.is_empty());
        assert!(reg.get(id).is_none());
        assert!(!snap[0].is_active());
    }

    #[test]
    fn handler_can_be_reused_after_removal() {
        let reg = ListenerRegistry::new();
        let h = noop();
        let a = reg.add(h.clone(), ListenerOptions::viewport());
        reg.remove(&h);
        let b = reg.add(h, ListenerOptions::viewport());
        assert_ne!(a, b);
    }
}

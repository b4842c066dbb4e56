//! View lifecycle event bus.
//!
//! The factory announces two events per view: `creating: <name>` when a view
//! is constructed and `composing: <name>` immediately before it renders.
//! Listeners register under an exact event name or a `*` wildcard pattern
//! and receive the view mutably, so composers can reshape its data.

use std::cell::RefCell;
use std::rc::Rc;

use regex::Regex;
use tracing::trace;

use crate::factory::View;
use crate::pattern;

/// A listener invoked with the view a matching event is about.
pub type Listener = Rc<dyn Fn(&mut View)>;

struct ListenerEntry {
    event: String,
    matcher: Regex,
    callback: Listener,
}

/// In-process dispatcher for view lifecycle events.
///
/// Listeners fire in registration order and are never removed; both follow
/// the hook registries this replaces. Not thread-safe — one dispatcher
/// belongs to one rendering pipeline.
pub struct Dispatcher {
    listeners: RefCell<Vec<ListenerEntry>>,
}

impl Dispatcher {
    /// Creates a dispatcher with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Registers `callback` for every event matching `event` (exact or `*`
    /// wildcard).
    pub fn listen(&self, event: impl Into<String>, callback: Listener) {
        let event = event.into();
        let matcher = pattern::wildcard(&event);
        trace!(event = %event, "listener registered");
        self.listeners.borrow_mut().push(ListenerEntry {
            event,
            matcher,
            callback,
        });
    }

    /// Returns true if at least one listener matches `event`.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listeners
            .borrow()
            .iter()
            .any(|entry| entry.event == event || entry.matcher.is_match(event))
    }

    /// Fires all listeners matching `event`, in registration order.
    ///
    /// Matching callbacks are collected before any of them runs, so a
    /// listener may register further listeners without re-entrancy issues.
    pub fn dispatch(&self, event: &str, view: &mut View) {
        let callbacks: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == event || entry.matcher.is_match(event))
            .map(|entry| entry.callback.clone())
            .collect();

        if callbacks.is_empty() {
            return;
        }
        trace!(event, listeners = callbacks.len(), "dispatching view event");
        for callback in callbacks {
            callback(view);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

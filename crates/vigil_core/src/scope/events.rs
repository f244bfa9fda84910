//! Scope events: `on`, `emit` and `broadcast`.
//!
//! Listeners are kept per scope and per event name in registration order.
//! Deregistering leaves a tombstone in place; tombstones are compacted the
//! next time the event fires on that scope, so removal during firing never
//! skips or repeats a neighbour.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::{Scope, ScopeInner, TreeState};
use crate::error::VigilResult;
use crate::objects::value::Value;

/// Name of the event broadcast by [`Scope::destroy`].
pub const DESTROY_EVENT: &str = "destroy";

type EventListener = Rc<dyn Fn(&Event, &[Value]) -> VigilResult<()>>;

/// A listener slot: `None` once deregistered.
pub(super) type ListenerEntry = Option<(u64, EventListener)>;

/// The record handed to every listener of one `emit` or `broadcast`.
pub struct Event {
    name: String,
    target_scope: Scope,
    current_scope: RefCell<Option<Scope>>,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
    stoppable: bool,
}

impl Event {
    fn new(name: &str, target_scope: Scope, stoppable: bool) -> Self {
        Self {
            name: name.to_string(),
            target_scope,
            current_scope: RefCell::new(None),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
            stoppable,
        }
    }

    /// The event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope `emit` / `broadcast` was called on.
    pub fn target_scope(&self) -> &Scope {
        &self.target_scope
    }

    /// The scope whose listeners are running.  `None` once traversal ends.
    pub fn current_scope(&self) -> Option<Scope> {
        self.current_scope.borrow().clone()
    }

    /// Flags the event; traversal is unaffected.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Returns `true` once any listener called [`prevent_default`](Self::prevent_default).
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stops an emitted event from reaching further ancestors.  Listeners on
    /// the current scope still run.  Broadcast events ignore this.
    pub fn stop_propagation(&self) {
        if self.stoppable {
            self.propagation_stopped.set(true);
        }
    }

    /// Returns `true` if propagation was stopped.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("target_scope", &self.target_scope.id())
            .field("default_prevented", &self.default_prevented.get())
            .field("propagation_stopped", &self.propagation_stopped.get())
            .finish()
    }
}

/// Removes an event listener registered with [`Scope::on`].
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    scope: Weak<ScopeInner>,
    name: String,
    id: u64,
}

impl ListenerHandle {
    /// Tombstones the listener.  Returns `false` if it was already removed.
    pub fn deregister(&self) -> bool {
        let Some(scope) = self.scope.upgrade() else {
            return false;
        };
        let mut listeners = scope.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(&self.name) else {
            return false;
        };
        match entries
            .iter_mut()
            .find(|entry| matches!(entry, Some((id, _)) if *id == self.id))
        {
            Some(entry) => {
                *entry = None;
                true
            }
            None => false,
        }
    }
}

impl Scope {
    /// Registers `listener` for events named `name` reaching this scope.
    /// Listeners receive the event record and the extra arguments.
    pub fn on<F>(&self, name: &str, listener: F) -> ListenerHandle
    where
        F: Fn(&Event, &[Value]) -> VigilResult<()> + 'static,
    {
        let id = TreeState::bump(&self.0.tree.next_listener_id);
        self.0
            .listeners
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .push(Some((id, Rc::new(listener))));
        ListenerHandle {
            scope: Rc::downgrade(&self.0),
            name: name.to_string(),
            id,
        }
    }

    /// Fires `name` on this scope, then on each ancestor in turn, until the
    /// root is reached or a listener stops propagation.
    pub fn emit(&self, name: &str, args: &[Value]) -> Event {
        let event = Event::new(name, self.clone(), true);
        let mut next = Some(self.clone());
        while let Some(scope) = next {
            *event.current_scope.borrow_mut() = Some(scope.clone());
            scope.fire_event(&event, args);
            if event.propagation_stopped() {
                break;
            }
            next = scope.parent();
        }
        *event.current_scope.borrow_mut() = None;
        trace!(event = name, scope = self.id(), "emitted");
        event
    }

    /// Fires `name` on this scope and every descendant, pre-order.
    pub fn broadcast(&self, name: &str, args: &[Value]) -> Event {
        let event = Event::new(name, self.clone(), false);
        self.every_scope(&mut |scope| {
            *event.current_scope.borrow_mut() = Some(scope.clone());
            scope.fire_event(&event, args);
            true
        });
        *event.current_scope.borrow_mut() = None;
        trace!(event = name, scope = self.id(), "broadcast");
        event
    }

    /// Runs this scope's listeners for `event`, compacting tombstones.
    fn fire_event(&self, event: &Event, args: &[Value]) {
        let mut index = 0;
        loop {
            let slot = {
                let mut listeners = self.0.listeners.borrow_mut();
                let Some(entries) = listeners.get_mut(event.name()) else {
                    return;
                };
                if index >= entries.len() {
                    return;
                }
                let live = entries[index]
                    .as_ref()
                    .map(|(_, listener)| Rc::clone(listener));
                if live.is_none() {
                    entries.remove(index);
                }
                live
            };
            let Some(listener) = slot else {
                continue;
            };
            if let Err(err) = listener(event, args) {
                self.0.tree.report("event listener", &err);
            }
            index += 1;
        }
    }

    /// Number of live and tombstoned listener slots for `name`.
    #[cfg(test)]
    fn listener_slots(&self, name: &str) -> usize {
        self.0
            .listeners
            .borrow()
            .get(name)
            .map_or(0, Vec::len)
    }
}

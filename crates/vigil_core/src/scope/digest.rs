//! Watch registration and the digest loop.
//!
//! A digest repeats passes over the subtree it was started on until a pass
//! finds nothing dirty and no async work is queued.  Each pass visits scopes
//! pre-order and each scope's watchers oldest-first.  The id of the last
//! watcher found dirty is recorded tree-wide; meeting that watcher clean
//! again means a full round produced no change, so the pass stops early.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use super::{Evaluable, Evaluator, Phase, Scope, ScopeInner, TreeState};
use crate::error::{VigilError, VigilResult};
use crate::objects::value::Value;

/// A watch listener: `(new_value, old_value, scope)`.
pub(super) type WatchListener = Rc<dyn Fn(&Value, &Value, &Scope) -> VigilResult<()>>;

pub(super) struct Watcher {
    id: u64,
    watch_fn: Evaluator,
    listener: Option<WatchListener>,
    value_eq: bool,
    /// Deregister after the first listener call (constant expressions).
    once: bool,
    /// `None` until the first evaluation.
    last: RefCell<Option<Value>>,
    removed: Cell<bool>,
}

impl Watcher {
    pub(super) fn mark_removed(&self) {
        self.removed.set(true);
    }
}

/// Removes a registered watch.
///
/// Dropping the handle does not deregister the watch.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    scope: Weak<ScopeInner>,
    watcher: Weak<Watcher>,
}

impl WatchHandle {
    /// Removes the watch.  Safe to call during a digest, including from the
    /// watch's own listener.  Returns `false` if it was already removed.
    pub fn deregister(&self) -> bool {
        match (self.scope.upgrade(), self.watcher.upgrade()) {
            (Some(scope), Some(watcher)) => Scope(scope).remove_watcher(&watcher),
            _ => false,
        }
    }
}

fn are_equal(new_value: &Value, old_value: &Value, value_eq: bool) -> bool {
    if value_eq {
        new_value.deep_equals(old_value)
    } else {
        new_value.identical(old_value)
    }
}

impl Scope {
    /// Registers a watch on this scope.
    ///
    /// `listener` runs with `(new, old, scope)` whenever the value of
    /// `watch_fn` differs from the previous digest's, and once on the first
    /// digest with `old` equal to `new`.  With `value_eq` the comparison is
    /// structural and the stored value is a deep copy; otherwise values are
    /// compared by identity with `NaN` equal to itself.
    ///
    /// A watch on a constant expression fires once and then removes itself.
    pub fn watch<F>(
        &self,
        watch_fn: impl Into<Evaluable>,
        listener: F,
        value_eq: bool,
    ) -> VigilResult<WatchHandle>
    where
        F: Fn(&Value, &Value, &Scope) -> VigilResult<()> + 'static,
    {
        self.register_watch(watch_fn.into(), Some(Rc::new(listener)), value_eq)
    }

    /// Registers a watch without a listener.  The watch function still runs
    /// on every pass.
    pub fn watch_silent(
        &self,
        watch_fn: impl Into<Evaluable>,
        value_eq: bool,
    ) -> VigilResult<WatchHandle> {
        self.register_watch(watch_fn.into(), None, value_eq)
    }

    pub(super) fn register_watch(
        &self,
        watch_fn: Evaluable,
        listener: Option<WatchListener>,
        value_eq: bool,
    ) -> VigilResult<WatchHandle> {
        let watch_fn = self.resolve(watch_fn)?;
        let tree = &self.0.tree;
        let once = watch_fn.is_constant();
        let watcher = Rc::new(Watcher {
            id: TreeState::bump(&tree.next_watcher_id),
            watch_fn,
            listener,
            value_eq,
            once,
            last: RefCell::new(None),
            removed: Cell::new(false),
        });
        self.0.watchers.borrow_mut().push(Rc::clone(&watcher));
        tree.last_dirty_watch.set(None);
        if tree.phase.get() == Some(Phase::Digest) {
            tree.watches_added.set(true);
        }
        trace!(scope = self.id(), watcher = watcher.id, once, "registered watch");
        Ok(WatchHandle {
            scope: Rc::downgrade(&self.0),
            watcher: Rc::downgrade(&watcher),
        })
    }

    fn remove_watcher(&self, watcher: &Rc<Watcher>) -> bool {
        let mut watchers = self.0.watchers.borrow_mut();
        let Some(index) = watchers.iter().position(|w| Rc::ptr_eq(w, watcher)) else {
            return false;
        };
        watchers.remove(index);
        watcher.mark_removed();
        self.0.tree.last_dirty_watch.set(None);
        true
    }

    /// Number of watches registered directly on this scope.
    pub fn watch_count(&self) -> usize {
        self.0.watchers.borrow().len()
    }

    /// Runs digest passes over this scope and its descendants until no
    /// watch is dirty and the async queue is empty, then drains the
    /// post-digest hooks.
    ///
    /// Watch functions, listeners and queued tasks that fail are logged and
    /// skipped.  Fails with [`VigilError::Phase`] if a phase is already
    /// active and with [`VigilError::UnstableDigest`] if the tree is still
    /// dirty after `digest_ttl` passes.
    pub fn digest(&self) -> VigilResult<()> {
        let tree = &self.0.tree;
        tree.last_dirty_watch.set(None);
        tree.begin_phase(Phase::Digest)?;

        // The id stays set while flushing so thunks that queue more work
        // join this flush instead of scheduling a fresh task.
        if let Some(task) = tree.apply_async_task.get() {
            tree.tasks.cancel(task);
            self.flush_apply_async();
        }

        let ttl = tree.config.digest_ttl;
        let mut iterations = 0;
        loop {
            self.drain_async_queue();
            let dirty = self.digest_once();
            iterations += 1;
            let pending = !tree.async_queue.borrow().is_empty();
            debug!(scope = self.id(), iteration = iterations, dirty, pending, "digest pass");
            if !dirty && !pending {
                break;
            }
            if iterations >= ttl {
                tree.clear_phase();
                return Err(VigilError::UnstableDigest { ttl });
            }
        }

        self.drain_post_digest();
        tree.clear_phase();
        Ok(())
    }

    /// One pass over the subtree.  Returns `true` if anything was dirty.
    fn digest_once(&self) -> bool {
        let tree = &self.0.tree;
        let mut dirty = false;
        self.every_scope(&mut |scope| {
            let watchers: Vec<Rc<Watcher>> = scope.0.watchers.borrow().clone();
            for watcher in watchers {
                if watcher.removed.get() {
                    continue;
                }
                let new_value = match watcher.watch_fn.call(scope, None) {
                    Ok(value) => value,
                    Err(err) => {
                        tree.report("watch function", &err);
                        continue;
                    }
                };
                let unchanged = watcher
                    .last
                    .borrow()
                    .as_ref()
                    .is_some_and(|last| are_equal(&new_value, last, watcher.value_eq));
                if unchanged {
                    if tree.last_dirty_watch.get() == Some(watcher.id) {
                        return false;
                    }
                    continue;
                }

                tree.last_dirty_watch.set(Some(watcher.id));
                let stored = if watcher.value_eq {
                    new_value.deep_clone()
                } else {
                    new_value.clone()
                };
                let old_value = watcher
                    .last
                    .replace(Some(stored))
                    .unwrap_or_else(|| new_value.clone());
                trace!(scope = scope.id(), watcher = watcher.id, "dirty watch");
                if let Some(listener) = &watcher.listener {
                    if let Err(err) = listener(&new_value, &old_value, scope) {
                        tree.report("watch listener", &err);
                    }
                }
                if watcher.once {
                    scope.remove_watcher(&watcher);
                }
                dirty = true;
            }
            true
        });
        tree.watches_added.replace(false) || dirty
    }
}

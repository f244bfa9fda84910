//! Shallow collection watches.
//!
//! A collection watch is an ordinary watch whose watch function compares the
//! evaluated value against a private shallow copy and returns a change
//! counter.  The listener then sees the real value.  Arrays are compared by
//! length and per-index identity, objects by own key set and per-key
//! identity, anything else by identity alone.
//!
//! An object whose `length` is a non-negative integer is array-like, and is
//! compared as an array, when it is empty or its last index is present.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::digest::WatchListener;
use super::{Evaluable, Scope, WatchHandle};
use crate::error::VigilResult;
use crate::objects::js_array::MAX_ARRAY_LENGTH;
use crate::objects::value::Value;

/// Last observed shape of the watched value.
enum Shadow {
    Scalar(Value),
    Array(Vec<Value>),
    Object(IndexMap<Rc<str>, Value>),
}

struct CollectionState {
    shadow: RefCell<Option<Shadow>>,
    change_count: Cell<u64>,
    new_value: RefCell<Value>,
    old_value: RefCell<Value>,
    first_run: Cell<bool>,
}

impl CollectionState {
    fn new() -> Self {
        Self {
            shadow: RefCell::new(None),
            change_count: Cell::new(0),
            new_value: RefCell::new(Value::Undefined),
            old_value: RefCell::new(Value::Undefined),
            first_run: Cell::new(true),
        }
    }

    fn bump(&self) {
        self.change_count.set(self.change_count.get() + 1);
    }

    /// Folds `value` into the shadow copy, counting every difference.
    fn observe(&self, value: &Value) {
        let mut shadow = self.shadow.borrow_mut();
        if let Some(items) = array_like_items(value) {
            if !matches!(*shadow, Some(Shadow::Array(_))) {
                self.bump();
                *shadow = Some(Shadow::Array(Vec::new()));
            }
            let Some(Shadow::Array(old)) = shadow.as_mut() else {
                return;
            };
            if old.len() != items.len() {
                self.bump();
                old.resize(items.len(), Value::Undefined);
            }
            for (slot, item) in old.iter_mut().zip(items) {
                if !item.identical(slot) {
                    self.bump();
                    *slot = item;
                }
            }
            return;
        }
        match value {
            Value::Object(obj) => {
                let entries = obj.borrow().entries();
                if !matches!(*shadow, Some(Shadow::Object(_))) {
                    self.bump();
                    *shadow = Some(Shadow::Object(IndexMap::new()));
                }
                let Some(Shadow::Object(old)) = shadow.as_mut() else {
                    return;
                };
                for (key, item) in &entries {
                    match old.get_mut(key) {
                        Some(slot) if item.identical(slot) => {}
                        Some(slot) => {
                            self.bump();
                            *slot = item.clone();
                        }
                        None => {
                            self.bump();
                            old.insert(Rc::clone(key), item.clone());
                        }
                    }
                }
                if old.len() > entries.len() {
                    self.bump();
                    old.retain(|key, _| entries.iter().any(|(k, _)| k == key));
                }
            }
            scalar => {
                let changed = match shadow.as_ref() {
                    Some(Shadow::Scalar(old)) => !scalar.identical(old),
                    _ => true,
                };
                if changed {
                    self.bump();
                }
                *shadow = Some(Shadow::Scalar(scalar.clone()));
            }
        }
    }
}

/// Elements of an array, or of an array-like object read index by index.
fn array_like_items(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(arr) => Some(arr.borrow().elements().to_vec()),
        Value::Object(_) => {
            let Value::Number(len) = value.get_member("length") else {
                return None;
            };
            if !(0.0..=MAX_ARRAY_LENGTH as f64).contains(&len) || len.fract() != 0.0 {
                return None;
            }
            let len = len as usize;
            if len > 0 && !value.has_member(&(len - 1).to_string()) {
                return None;
            }
            Some((0..len).map(|i| value.get_member(&i.to_string())).collect())
        }
        _ => None,
    }
}

impl Scope {
    /// Watches the shallow structure of an array or object.
    ///
    /// `listener` receives the current value and the scope whenever an
    /// element or own property is added, removed or replaced.
    pub fn watch_collection<F>(
        &self,
        watch_fn: impl Into<Evaluable>,
        listener: F,
    ) -> VigilResult<WatchHandle>
    where
        F: Fn(&Value, &Scope) -> VigilResult<()> + 'static,
    {
        self.register_collection_watch(
            watch_fn.into(),
            Rc::new(move |new: &Value, _: &Value, scope: &Scope| listener(new, scope)),
            false,
        )
    }

    /// Like [`watch_collection`](Self::watch_collection), but the listener
    /// also receives a deep copy of the value seen on the previous change
    /// (the current value on the first call).
    pub fn watch_collection_with_old<F>(
        &self,
        watch_fn: impl Into<Evaluable>,
        listener: F,
    ) -> VigilResult<WatchHandle>
    where
        F: Fn(&Value, &Value, &Scope) -> VigilResult<()> + 'static,
    {
        self.register_collection_watch(watch_fn.into(), Rc::new(listener), true)
    }

    fn register_collection_watch(
        &self,
        watch_fn: Evaluable,
        listener: WatchListener,
        track_old: bool,
    ) -> VigilResult<WatchHandle> {
        let evaluator = self.resolve(watch_fn)?;
        let state = Rc::new(CollectionState::new());

        let watch_state = Rc::clone(&state);
        let counter = Evaluable::native(move |scope, _| {
            let value = evaluator.call(scope, None)?;
            watch_state.observe(&value);
            *watch_state.new_value.borrow_mut() = value;
            Ok(Value::Number(watch_state.change_count.get() as f64))
        });

        let internal_listener: WatchListener = Rc::new(move |_: &Value, _: &Value, scope: &Scope| {
            let new_value = state.new_value.borrow().clone();
            let result = if state.first_run.replace(false) {
                listener(&new_value, &new_value, scope)
            } else {
                let old_value = state.old_value.borrow().clone();
                listener(&new_value, &old_value, scope)
            };
            if track_old {
                *state.old_value.borrow_mut() = new_value.deep_clone();
            }
            result
        });

        self.register_watch(counter, Some(internal_listener), false)
    }
}

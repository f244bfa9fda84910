//! Ordinary objects with fast/slow named-property storage.
//!
//! # Storage model
//!
//! A [`JsObject`] starts life in **fast mode**: named properties live in a
//! [`SmallVec`] of `(key, value)` pairs scanned linearly.  When the number of
//! named properties exceeds [`MAX_FAST_PROPERTIES`], or a property is deleted,
//! the object is *normalised* into **slow (dictionary) mode** backed by an
//! [`IndexMap`].  Both modes preserve insertion order, which is the order
//! [`JsObject::keys`] reports.
//!
//! # Prototype chain
//!
//! Each `JsObject` optionally holds a reference-counted pointer to a prototype
//! object.  [`get_property`][JsObject::get_property] and
//! [`has_property`][JsObject::has_property] walk the chain; writes through
//! [`set_property`][JsObject::set_property] always land on the receiver.
//! Scope models use exactly this to delegate reads to their parent scope.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::objects::value::Value;

/// Number of named-property slots stored inline before the property store
/// overflows to an [`IndexMap`] (slow / dictionary mode).
pub const MAX_FAST_PROPERTIES: usize = 8;

/// Shared, mutable handle to a [`JsObject`].
pub type ObjectRef = Rc<RefCell<JsObject>>;

/// Named-property backing store: fast (inline pairs) or slow (dictionary).
#[derive(Clone)]
enum NamedProperties {
    /// Fast mode: up to [`MAX_FAST_PROPERTIES`] pairs held inline.
    Fast(SmallVec<[(Rc<str>, Value); MAX_FAST_PROPERTIES]>),
    /// Slow (dictionary) mode, entered on overflow or deletion.
    Slow(IndexMap<Rc<str>, Value>),
}

/// A plain key/value object with an optional prototype link.
#[derive(Clone)]
pub struct JsObject {
    /// Backing store for named (string-keyed) properties.
    named_properties: NamedProperties,
    /// Prototype object, or `None` for base objects.
    prototype: Option<ObjectRef>,
}

impl JsObject {
    /// Creates an empty object with no prototype and no properties.
    pub fn new() -> Self {
        Self {
            named_properties: NamedProperties::Fast(SmallVec::new()),
            prototype: None,
        }
    }

    /// Creates an empty object with the given prototype.
    pub fn with_prototype(prototype: ObjectRef) -> Self {
        Self {
            named_properties: NamedProperties::Fast(SmallVec::new()),
            prototype: Some(prototype),
        }
    }

    /// Wraps this object in a shared handle.
    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Returns `true` if this object is in fast (inline) mode.
    pub fn is_fast_mode(&self) -> bool {
        matches!(self.named_properties, NamedProperties::Fast(_))
    }

    /// Returns the prototype of this object, if any.
    pub fn prototype(&self) -> Option<&ObjectRef> {
        self.prototype.as_ref()
    }

    /// Sets (or removes) the prototype of this object.
    pub fn set_prototype(&mut self, prototype: Option<ObjectRef>) {
        self.prototype = prototype;
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    /// Normalises this object from fast to slow mode, keeping key order.
    fn normalise_to_slow(&mut self) {
        if let NamedProperties::Fast(pairs) = &mut self.named_properties {
            let map: IndexMap<Rc<str>, Value> = pairs.drain(..).collect();
            self.named_properties = NamedProperties::Slow(map);
        }
    }

    // ── Own property operations ───────────────────────────────────────────────

    /// Returns the value of an own property, or `None` if it does not exist.
    pub fn get_own_property(&self, key: &str) -> Option<Value> {
        match &self.named_properties {
            NamedProperties::Fast(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_ref() == key)
                .map(|(_, v)| v.clone()),
            NamedProperties::Slow(map) => map.get(key).cloned(),
        }
    }

    /// Returns `true` if this object has an own property named `key`.
    pub fn has_own_property(&self, key: &str) -> bool {
        match &self.named_properties {
            NamedProperties::Fast(pairs) => pairs.iter().any(|(k, _)| k.as_ref() == key),
            NamedProperties::Slow(map) => map.contains_key(key),
        }
    }

    /// Returns the number of own properties.
    pub fn len(&self) -> usize {
        match &self.named_properties {
            NamedProperties::Fast(pairs) => pairs.len(),
            NamedProperties::Slow(map) => map.len(),
        }
    }

    /// Returns `true` if this object has no own properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the own property keys in insertion order.
    pub fn keys(&self) -> Vec<Rc<str>> {
        match &self.named_properties {
            NamedProperties::Fast(pairs) => pairs.iter().map(|(k, _)| Rc::clone(k)).collect(),
            NamedProperties::Slow(map) => map.keys().cloned().collect(),
        }
    }

    /// Returns the own `(key, value)` pairs in insertion order.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        match &self.named_properties {
            NamedProperties::Fast(pairs) => pairs.iter().cloned().collect(),
            NamedProperties::Slow(map) => map
                .iter()
                .map(|(k, v)| (Rc::clone(k), v.clone()))
                .collect(),
        }
    }

    // ── Prototype-chain traversal ─────────────────────────────────────────────

    /// Returns the value of property `key` found on this object or anywhere in
    /// its prototype chain, or [`Value::Undefined`] if not found.
    pub fn get_property(&self, key: &str) -> Value {
        if let Some(v) = self.get_own_property(key) {
            return v;
        }
        if let Some(proto) = &self.prototype {
            return proto.borrow().get_property(key);
        }
        Value::Undefined
    }

    /// Returns `true` if property `key` exists on this object or anywhere in
    /// its prototype chain (the `in` operator).
    pub fn has_property(&self, key: &str) -> bool {
        if self.has_own_property(key) {
            return true;
        }
        if let Some(proto) = &self.prototype {
            return proto.borrow().has_property(key);
        }
        false
    }

    /// Updates an existing own property or creates a new one.
    ///
    /// Never writes through to the prototype: a property inherited from the
    /// chain is shadowed by a new own property.
    pub fn set_property(&mut self, key: &str, value: Value) {
        match &mut self.named_properties {
            NamedProperties::Fast(pairs) => {
                if let Some(slot) = pairs.iter_mut().find(|(k, _)| k.as_ref() == key) {
                    slot.1 = value;
                    return;
                }
                if pairs.len() < MAX_FAST_PROPERTIES {
                    pairs.push((Rc::from(key), value));
                    return;
                }
            }
            NamedProperties::Slow(map) => {
                map.insert(Rc::from(key), value);
                return;
            }
        }
        // Exceeded fast-mode capacity: normalise then add.
        self.normalise_to_slow();
        if let NamedProperties::Slow(map) = &mut self.named_properties {
            map.insert(Rc::from(key), value);
        }
    }

    /// Deletes an own property.  Returns `true` if the property existed.
    pub fn delete_own_property(&mut self, key: &str) -> bool {
        if !self.has_own_property(key) {
            return false;
        }
        self.normalise_to_slow();
        match &mut self.named_properties {
            NamedProperties::Slow(map) => map.shift_remove(key).is_some(),
            NamedProperties::Fast(_) => false,
        }
    }
}

impl Default for JsObject {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(String, Value)> for JsObject {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut obj = JsObject::new();
        for (k, v) in iter {
            obj.set_property(&k, v);
        }
        obj
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────

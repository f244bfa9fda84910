//! Dense arrays with ECMAScript-style `length` semantics.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{VigilError, VigilResult};
use crate::objects::value::Value;

/// Shared, mutable handle to a [`JsArray`].
pub type ArrayRef = Rc<RefCell<JsArray>>;

/// Largest `length` an index or `length` write may grow an array to.
/// Storage is dense, so every slot below `length` is allocated.
pub const MAX_ARRAY_LENGTH: usize = 1 << 20;

fn length_error(requested: impl std::fmt::Display) -> VigilError {
    VigilError::Type(format!(
        "array length {requested} exceeds the limit of {MAX_ARRAY_LENGTH}"
    ))
}

/// An array of [`Value`]s.
///
/// `length` reflects the highest index assigned plus one; assigning past the
/// end fills the gap with [`Value::Undefined`] holes.
#[derive(Clone, Default)]
pub struct JsArray {
    elements: Vec<Value>,
}

impl JsArray {
    /// Creates an empty array.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array holding `elements`.
    pub fn from_vec(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    /// Wraps this array in a shared handle.
    pub fn into_ref(self) -> ArrayRef {
        Rc::new(RefCell::new(self))
    }

    /// Returns the number of elements (ECMAScript `length`).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the element at `index`, or [`Value::Undefined`] if out of
    /// bounds.
    pub fn get(&self, index: usize) -> Value {
        self.elements.get(index).cloned().unwrap_or(Value::Undefined)
    }

    /// Sets the element at `index`, extending with holes as needed.
    ///
    /// Fails with [`VigilError::Type`] when the array would grow past
    /// [`MAX_ARRAY_LENGTH`].
    pub fn set(&mut self, index: usize, value: Value) -> VigilResult<()> {
        if index >= self.elements.len() {
            let len = index
                .checked_add(1)
                .filter(|&len| len <= MAX_ARRAY_LENGTH)
                .ok_or_else(|| length_error(format_args!("{index} + 1")))?;
            self.elements.resize(len, Value::Undefined);
        }
        self.elements[index] = value;
        Ok(())
    }

    /// Appends `value` and returns the new length.
    pub fn push(&mut self, value: Value) -> usize {
        self.elements.push(value);
        self.elements.len()
    }

    /// Removes and returns the last element, or [`Value::Undefined`] if the
    /// array is empty.
    pub fn pop(&mut self) -> Value {
        self.elements.pop().unwrap_or(Value::Undefined)
    }

    /// Sets `length`: truncates, or pads with holes up to
    /// [`MAX_ARRAY_LENGTH`].
    pub fn set_length(&mut self, len: usize) -> VigilResult<()> {
        if len > MAX_ARRAY_LENGTH {
            return Err(length_error(len));
        }
        self.elements.resize(len, Value::Undefined);
        Ok(())
    }

    /// Returns the elements as a slice.
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

impl FromIterator<Value> for JsArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

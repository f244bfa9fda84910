//! Named filter registry.
//!
//! A [`FilterRegistry`] maps filter names to callables.  Registration runs a
//! factory once and stores its product; the compiler resolves names while
//! compiling a `| name:arg` segment, so an unknown name is a compile-time
//! error and later re-registrations do not affect already-compiled
//! expressions.
//!
//! Registries are ordinary values owned by whoever compiles expressions
//! (usually a [`Parser`](crate::parser::Parser)); there is no process-wide
//! table.

pub mod builtin;

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{VigilError, VigilResult};
use crate::objects::js_function::{FunctionRef, JsFunction};

/// A boxed filter factory, used by [`FilterRegistry::register_many`].
pub type FilterFactory = Box<dyn FnOnce() -> JsFunction>;

/// Name → filter function table.
pub struct FilterRegistry {
    filters: RefCell<HashMap<String, FunctionRef>>,
}

impl FilterRegistry {
    /// Creates a registry holding the built-in filters.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register("filter", builtin::filter_filter);
        registry
    }

    /// Creates a registry with no filters at all.
    pub fn empty() -> Self {
        Self {
            filters: RefCell::new(HashMap::new()),
        }
    }

    /// Runs `factory` and stores its product under `name`, replacing any
    /// previous filter of that name.  Returns the stored filter.
    pub fn register<F>(&self, name: &str, factory: F) -> FunctionRef
    where
        F: FnOnce() -> JsFunction,
    {
        let filter = factory().into_ref();
        debug!(name, "registered filter");
        self.filters
            .borrow_mut()
            .insert(name.to_string(), FunctionRef::clone(&filter));
        filter
    }

    /// Registers several filters at once.
    pub fn register_many<I, S>(&self, factories: I) -> Vec<FunctionRef>
    where
        I: IntoIterator<Item = (S, FilterFactory)>,
        S: AsRef<str>,
    {
        factories
            .into_iter()
            .map(|(name, factory)| self.register(name.as_ref(), factory))
            .collect()
    }

    /// Returns the filter registered under `name`.
    pub fn lookup(&self, name: &str) -> VigilResult<FunctionRef> {
        self.filters
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| VigilError::UnknownFilter(name.to_string()))
    }

    /// Returns `true` if a filter named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.borrow().contains_key(name)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::objects::value::Value;

    fn noop(name: &'static str) -> FilterFactory {
        Box::new(move || JsFunction::native(name, 1, |_, _| Ok(Value::Undefined)))
    }

    #[test]
    fn test_register_and_lookup_returns_same_function() {
        let registry = FilterRegistry::empty();
        let stored = registry.register("my", || {
            JsFunction::native("my", 1, |_, _| Ok(Value::Undefined))
        });
        let found = registry.lookup("my").unwrap();
        assert!(Rc::ptr_eq(&stored, &found));
    }

    #[test]
    fn test_register_many() {
        let registry = FilterRegistry::empty();
        let stored = registry.register_many([("my", noop("my")), ("myOther", noop("myOther"))]);
        assert_eq!(stored.len(), 2);
        assert!(registry.contains("my"));
        assert_eq!(registry.lookup("myOther").unwrap().name(), "myOther");
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::empty();
        assert_eq!(
            registry.lookup("missing").unwrap_err(),
            VigilError::UnknownFilter("missing".into())
        );
    }

    #[test]
    fn test_builtin_filter_is_preregistered() {
        assert!(FilterRegistry::new().contains("filter"));
        assert!(!FilterRegistry::empty().contains("filter"));
    }
}

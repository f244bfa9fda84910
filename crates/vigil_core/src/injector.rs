//! Module loader and dependency injector.
//!
//! A [`ModuleRegistry`] holds named [`Module`]s.  Each module lists the
//! modules it requires and queues recipes: constants (always applied first)
//! and factories with named dependencies.  An [`Injector`] loads a set of
//! modules depth-first, each at most once, then builds instances lazily on
//! [`Injector::get`] and memoises them.
//!
//! ```
//! use vigil_core::injector::{Injector, ModuleRegistry};
//! use vigil_core::objects::value::Value;
//!
//! let mut registry = ModuleRegistry::new();
//! registry
//!     .module("app", &[])
//!     .unwrap()
//!     .constant("base", Value::from(40))
//!     .factory("answer", &["base"], |deps| Ok(Value::from(deps[0].to_number() + 2.0)));
//! let injector = Injector::new(&registry, &["app"]).unwrap();
//! assert_eq!(injector.get("answer").unwrap().to_number(), 42.0);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use tracing::debug;

use crate::error::{VigilError, VigilResult};
use crate::objects::value::Value;

/// Name no module or constant may take.
const RESERVED_NAME: &str = "hasOwnProperty";

/// Builds an instance from its resolved dependencies, in declaration order.
pub type FactoryFn = Rc<dyn Fn(&[Value]) -> VigilResult<Value>>;

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum Recipe {
    Constant {
        name: String,
        value: Value,
    },
    Factory {
        name: String,
        deps: Vec<String>,
        factory: FactoryFn,
    },
}

/// A named bundle of recipes.
#[derive(Clone)]
pub struct Module {
    name: String,
    requires: Vec<String>,
    queue: VecDeque<Recipe>,
}

impl Module {
    fn new(name: &str, requires: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            requires: requires.iter().map(|r| r.to_string()).collect(),
            queue: VecDeque::new(),
        }
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the modules loaded before this one.
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Registers a ready-made value.  Constants are applied before every
    /// other recipe of the module regardless of declaration order.
    pub fn constant(&mut self, name: &str, value: Value) -> &mut Self {
        self.queue.push_front(Recipe::Constant {
            name: name.to_string(),
            value,
        });
        self
    }

    /// Registers `factory`, called once with the instances named by `deps`.
    pub fn factory<F>(&mut self, name: &str, deps: &[&str], factory: F) -> &mut Self
    where
        F: Fn(&[Value]) -> VigilResult<Value> + 'static,
    {
        self.queue.push_back(Recipe::Factory {
            name: name.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            factory: Rc::new(factory),
        });
        self
    }

    /// Number of queued recipes.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if no recipe is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("recipes", &self.queue.len())
            .finish()
    }
}

/// Name → module table.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or replaces) the module `name`.
    pub fn module(&mut self, name: &str, requires: &[&str]) -> VigilResult<&mut Module> {
        if name == RESERVED_NAME {
            return Err(VigilError::Type(format!(
                "{RESERVED_NAME} is not a valid module name"
            )));
        }
        debug!(module = name, ?requires, "registered module");
        self.modules
            .insert(name.to_string(), Module::new(name, requires));
        self.get_mut(name)
    }

    /// Returns the module `name`.
    pub fn get(&self, name: &str) -> VigilResult<&Module> {
        self.modules
            .get(name)
            .ok_or_else(|| VigilError::UnknownModule(name.to_string()))
    }

    /// Returns the module `name` for adding recipes.
    pub fn get_mut(&mut self, name: &str) -> VigilResult<&mut Module> {
        self.modules
            .get_mut(name)
            .ok_or_else(|| VigilError::UnknownModule(name.to_string()))
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Injector
// ─────────────────────────────────────────────────────────────────────────────

struct Provider {
    deps: Vec<String>,
    factory: FactoryFn,
}

enum Slot {
    Instantiating,
    Ready(Value),
}

/// Resolves names to memoised instances.
pub struct Injector {
    providers: HashMap<String, Provider>,
    instances: RefCell<HashMap<String, Slot>>,
    /// Names being instantiated, innermost first.
    path: RefCell<Vec<String>>,
}

impl Injector {
    /// Loads `modules` and everything they require.
    pub fn new(registry: &ModuleRegistry, modules: &[&str]) -> VigilResult<Self> {
        let mut injector = Self {
            providers: HashMap::new(),
            instances: RefCell::new(HashMap::new()),
            path: RefCell::new(Vec::new()),
        };
        let mut loaded = HashSet::new();
        for name in modules {
            injector.load_module(registry, name, &mut loaded)?;
        }
        Ok(injector)
    }

    fn load_module(
        &mut self,
        registry: &ModuleRegistry,
        name: &str,
        loaded: &mut HashSet<String>,
    ) -> VigilResult<()> {
        if !loaded.insert(name.to_string()) {
            return Ok(());
        }
        let module = registry.get(name)?;
        for required in &module.requires {
            self.load_module(registry, required, loaded)?;
        }
        for recipe in &module.queue {
            match recipe.clone() {
                Recipe::Constant { name, value } => {
                    if name == RESERVED_NAME {
                        return Err(VigilError::Type(format!(
                            "{RESERVED_NAME} is not a valid constant name"
                        )));
                    }
                    self.instances
                        .get_mut()
                        .insert(name, Slot::Ready(value));
                }
                Recipe::Factory {
                    name,
                    deps,
                    factory,
                } => {
                    self.providers.insert(name, Provider { deps, factory });
                }
            }
        }
        debug!(module = name, "loaded module");
        Ok(())
    }

    /// Returns `true` if `name` is a constant or has a provider.
    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
            || matches!(self.instances.borrow().get(name), Some(Slot::Ready(_)))
    }

    /// Returns the instance `name`, building it and its dependencies on
    /// first use.
    pub fn get(&self, name: &str) -> VigilResult<Value> {
        match self.instances.borrow().get(name) {
            Some(Slot::Ready(value)) => return Ok(value.clone()),
            Some(Slot::Instantiating) => {
                return Err(VigilError::CircularDependency(self.chain(name)));
            }
            None => {}
        }
        let Some(provider) = self.providers.get(name) else {
            return Err(VigilError::UnknownProvider(self.chain(name)));
        };

        self.instances
            .borrow_mut()
            .insert(name.to_string(), Slot::Instantiating);
        self.path.borrow_mut().insert(0, name.to_string());
        let factory = Rc::clone(&provider.factory);
        let result = self.invoke(&provider.deps, |args| factory(args), None);
        self.path.borrow_mut().remove(0);

        let mut instances = self.instances.borrow_mut();
        match result {
            Ok(value) => {
                debug!(name, "instantiated");
                instances.insert(name.to_string(), Slot::Ready(value.clone()));
                Ok(value)
            }
            Err(err) => {
                instances.remove(name);
                Err(err)
            }
        }
    }

    /// Calls `f` with the values of `deps`.  A dependency that is an own
    /// property of `locals` is taken from there instead of the injector.
    pub fn invoke<S, F>(&self, deps: &[S], f: F, locals: Option<&Value>) -> VigilResult<Value>
    where
        S: AsRef<str>,
        F: FnOnce(&[Value]) -> VigilResult<Value>,
    {
        let args = deps
            .iter()
            .map(|dep| {
                let dep = dep.as_ref();
                match locals {
                    Some(Value::Object(obj)) if obj.borrow().has_own_property(dep) => {
                        Ok(obj.borrow().get_property(dep))
                    }
                    _ => self.get(dep),
                }
            })
            .collect::<VigilResult<Vec<_>>>()?;
        f(&args)
    }

    /// `name` followed by the names being instantiated, joined with ` <- `.
    fn chain(&self, name: &str) -> String {
        std::iter::once(name)
            .chain(self.path.borrow().iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" <- ")
    }
}

impl std::fmt::Debug for Injector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injector")
            .field("providers", &self.providers.len())
            .field("instances", &self.instances.borrow().len())
            .finish()
    }
}

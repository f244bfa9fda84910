//! Dirty-checking scope graph.
//!
//! A [`Scope`] is a node in a tree of evaluation contexts.  Each scope owns a
//! model object, an ordered list of watches and a table of event listeners;
//! every scope of one tree shares a single [`TreeState`] holding the phase
//! guard, the async / apply-async / post-digest queues and the deferred
//! [`TaskQueue`].
//!
//! # Ownership
//!
//! Parents own their children (`Vec<Scope>`); children point back at their
//! parent and at the root through [`Weak`] links, so dropping the last handle
//! to a root tears down the whole tree.  Deferred tasks only hold weak links
//! to the root and become no-ops once it is gone.
//!
//! # Model inheritance
//!
//! A non-isolated child's model is a [`JsObject`] whose prototype is the
//! creating scope's model: reads fall through to ancestors, writes always land
//! on the child.  Isolated children get a model with no prototype.
//!
//! - [`digest`]: watch registration and the digest loop.
//! - [`watch_collection`]: shallow collection watches.
//! - [`events`]: `emit` / `broadcast` / `on`.
//! - [`task_queue`]: the deferred macrotask queue.

mod digest;
mod events;
pub mod task_queue;
mod watch_collection;

pub use digest::WatchHandle;
pub use events::{Event, ListenerHandle, DESTROY_EVENT};
pub use task_queue::{TaskId, TaskQueue};

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, error};

use crate::compiler::Expression;
use crate::config::RuntimeConfig;
use crate::error::{VigilError, VigilResult};
use crate::objects::js_object::{JsObject, ObjectRef};
use crate::objects::value::Value;
use crate::parser::Parser;

use digest::Watcher;
use events::ListenerEntry;

// ─────────────────────────────────────────────────────────────────────────────
// Phase
// ─────────────────────────────────────────────────────────────────────────────

/// The operation currently running on a scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Inside [`Scope::digest`].
    Digest,
    /// Evaluating the expression of [`Scope::apply`].
    Apply,
}

impl Phase {
    /// Name used in [`VigilError::Phase`] messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Digest => "$digest",
            Self::Apply => "$apply",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluable
// ─────────────────────────────────────────────────────────────────────────────

/// A host closure usable wherever an expression is accepted.
pub type NativeEval = Rc<dyn Fn(&Scope, Option<&Value>) -> VigilResult<Value>>;

/// Anything a scope can evaluate: source text (compiled with the tree's
/// [`Parser`]), an already compiled [`Expression`], or a host closure.
#[derive(Clone)]
pub enum Evaluable {
    /// Expression source text.
    Source(String),
    /// A compiled expression.
    Compiled(Expression),
    /// A host closure receiving the scope and optional locals.
    Native(NativeEval),
}

impl Evaluable {
    /// Wraps a host closure.
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&Scope, Option<&Value>) -> VigilResult<Value> + 'static,
    {
        Self::Native(Rc::new(f))
    }
}

impl From<&str> for Evaluable {
    fn from(source: &str) -> Self {
        Self::Source(source.to_string())
    }
}

impl From<String> for Evaluable {
    fn from(source: String) -> Self {
        Self::Source(source)
    }
}

impl From<Expression> for Evaluable {
    fn from(expr: Expression) -> Self {
        Self::Compiled(expr)
    }
}

impl From<&Expression> for Evaluable {
    fn from(expr: &Expression) -> Self {
        Self::Compiled(expr.clone())
    }
}

impl fmt::Debug for Evaluable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(source) => f.debug_tuple("Source").field(source).finish(),
            Self::Compiled(expr) => f.debug_tuple("Compiled").field(expr).finish(),
            Self::Native(_) => f.write_str("Native(..)"),
        }
    }
}

/// A resolved [`Evaluable`].
#[derive(Clone)]
enum Evaluator {
    Expression(Expression),
    Native(NativeEval),
}

impl Evaluator {
    fn call(&self, scope: &Scope, locals: Option<&Value>) -> VigilResult<Value> {
        match self {
            Self::Expression(expr) => expr.evaluate(&scope.model(), locals),
            Self::Native(f) => f(scope, locals),
        }
    }

    fn is_constant(&self) -> bool {
        matches!(self, Self::Expression(expr) if expr.is_constant())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree state
// ─────────────────────────────────────────────────────────────────────────────

type Thunk = Box<dyn FnOnce() -> VigilResult<()>>;
type PostDigestHook = Box<dyn FnOnce(&Scope) -> VigilResult<()>>;

struct AsyncTask {
    scope: Scope,
    evaluator: Evaluator,
}

/// State shared by every scope of one tree.
struct TreeState {
    config: RuntimeConfig,
    parser: Parser,
    tasks: TaskQueue,
    phase: Cell<Option<Phase>>,
    /// Id of the watcher that was last found dirty in the running digest.
    last_dirty_watch: Cell<Option<u64>>,
    /// Set when a watch is registered while a digest is running.
    watches_added: Cell<bool>,
    async_queue: RefCell<VecDeque<AsyncTask>>,
    apply_async_queue: RefCell<VecDeque<Thunk>>,
    apply_async_task: Cell<Option<TaskId>>,
    post_digest_queue: RefCell<VecDeque<(Scope, PostDigestHook)>>,
    next_scope_id: Cell<u64>,
    next_watcher_id: Cell<u64>,
    next_listener_id: Cell<u64>,
}

impl TreeState {
    fn new(config: RuntimeConfig, parser: Parser) -> Self {
        Self {
            config,
            parser,
            tasks: TaskQueue::new(),
            phase: Cell::new(None),
            last_dirty_watch: Cell::new(None),
            watches_added: Cell::new(false),
            async_queue: RefCell::new(VecDeque::new()),
            apply_async_queue: RefCell::new(VecDeque::new()),
            apply_async_task: Cell::new(None),
            post_digest_queue: RefCell::new(VecDeque::new()),
            next_scope_id: Cell::new(0),
            next_watcher_id: Cell::new(0),
            next_listener_id: Cell::new(0),
        }
    }

    fn bump(counter: &Cell<u64>) -> u64 {
        let id = counter.get();
        counter.set(id + 1);
        id
    }

    fn begin_phase(&self, phase: Phase) -> VigilResult<()> {
        if let Some(active) = self.phase.get() {
            return Err(VigilError::Phase(active.as_str()));
        }
        debug!(phase = phase.as_str(), "begin phase");
        self.phase.set(Some(phase));
        Ok(())
    }

    fn clear_phase(&self) {
        self.phase.set(None);
    }

    /// Logs a failure isolated inside a digest, event or queue loop.
    fn report(&self, context: &'static str, err: &VigilError) {
        if self.config.log_callback_errors {
            error!(context, %err, "callback failed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scope
// ─────────────────────────────────────────────────────────────────────────────

struct ScopeInner {
    id: u64,
    model: ObjectRef,
    isolated: bool,
    parent: RefCell<Weak<ScopeInner>>,
    root: Weak<ScopeInner>,
    children: RefCell<Vec<Scope>>,
    watchers: RefCell<Vec<Rc<Watcher>>>,
    listeners: RefCell<HashMap<String, Vec<ListenerEntry>>>,
    tree: Rc<TreeState>,
}

/// A handle to one node of a scope tree.  Cloning is cheap and yields
/// another handle to the same scope.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

impl Scope {
    /// Creates the root of a new tree with default configuration and the
    /// built-in filters.
    pub fn new_root() -> Self {
        Self::with_config(RuntimeConfig::default(), Parser::new())
    }

    /// Creates the root of a new tree.
    pub fn with_config(config: RuntimeConfig, parser: Parser) -> Self {
        let tree = Rc::new(TreeState::new(config, parser));
        let id = TreeState::bump(&tree.next_scope_id);
        let inner = Rc::new_cyclic(|weak| ScopeInner {
            id,
            model: JsObject::new().into_ref(),
            isolated: false,
            parent: RefCell::new(Weak::new()),
            root: weak.clone(),
            children: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
            tree,
        });
        debug!(scope = id, "created root scope");
        Self(inner)
    }

    /// Identifier unique within the tree.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The model object expressions evaluate against.
    pub fn model(&self) -> Value {
        Value::Object(ObjectRef::clone(&self.0.model))
    }

    /// Reads `key` from the model, falling through to ancestors.
    pub fn get(&self, key: &str) -> Value {
        self.0.model.borrow().get_property(key)
    }

    /// Writes `key` on this scope's own model.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.0.model.borrow_mut().set_property(key, value.into());
    }

    /// Returns `true` if `key` is an own property of this scope's model.
    pub fn has_own(&self, key: &str) -> bool {
        self.0.model.borrow().has_own_property(key)
    }

    /// The hierarchical parent, `None` for roots and destroyed scopes.
    pub fn parent(&self) -> Option<Scope> {
        self.0.parent.borrow().upgrade().map(Scope)
    }

    /// The root of this scope's tree.
    pub fn root(&self) -> Scope {
        self.0.root.upgrade().map(Scope).unwrap_or_else(|| self.clone())
    }

    /// Returns `true` for the root of a tree.
    pub fn is_root(&self) -> bool {
        self.0.root.as_ptr() == Rc::as_ptr(&self.0)
    }

    /// Returns `true` if this scope was created isolated.
    pub fn is_isolated(&self) -> bool {
        self.0.isolated
    }

    /// Snapshot of the direct children, in creation order.
    pub fn children(&self) -> Vec<Scope> {
        self.0.children.borrow().clone()
    }

    /// The phase currently active on this tree.
    pub fn phase(&self) -> Option<Phase> {
        self.0.tree.phase.get()
    }

    /// The tree's configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.0.tree.config
    }

    /// The parser source-text expressions are compiled with.
    pub fn parser(&self) -> &Parser {
        &self.0.tree.parser
    }

    /// The deferred task queue `eval_async` and `apply_async` schedule onto.
    pub fn tasks(&self) -> &TaskQueue {
        &self.0.tree.tasks
    }

    /// Creates a child scope.
    ///
    /// A non-isolated child's model inherits from this scope's model.  The
    /// child is registered under `parent` when given (it is then digested
    /// and reached by events as part of that scope's subtree), otherwise
    /// under `self`.
    pub fn new_scope(&self, isolated: bool, parent: Option<&Scope>) -> Scope {
        let hierarchy_parent = parent.unwrap_or(self);
        let tree = Rc::clone(&hierarchy_parent.0.tree);
        let id = TreeState::bump(&tree.next_scope_id);
        let model = if isolated {
            JsObject::new()
        } else {
            JsObject::with_prototype(ObjectRef::clone(&self.0.model))
        };
        let child = Scope(Rc::new(ScopeInner {
            id,
            model: model.into_ref(),
            isolated,
            parent: RefCell::new(Rc::downgrade(&hierarchy_parent.0)),
            root: hierarchy_parent.0.root.clone(),
            children: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
            listeners: RefCell::new(HashMap::new()),
            tree,
        }));
        hierarchy_parent
            .0
            .children
            .borrow_mut()
            .push(child.clone());
        debug!(scope = id, parent = hierarchy_parent.id(), isolated, "created child scope");
        child
    }

    /// Broadcasts [`DESTROY_EVENT`], unlinks this scope from its parent and
    /// drops its watches and listeners.  Children stay attached to the
    /// destroyed scope.
    pub fn destroy(&self) {
        self.broadcast(DESTROY_EVENT, &[]);
        if let Some(parent) = self.parent() {
            parent
                .0
                .children
                .borrow_mut()
                .retain(|child| !Rc::ptr_eq(&child.0, &self.0));
        }
        *self.0.parent.borrow_mut() = Weak::new();
        for watcher in self.0.watchers.borrow_mut().drain(..) {
            watcher.mark_removed();
        }
        self.0.listeners.borrow_mut().clear();
        debug!(scope = self.id(), "destroyed scope");
    }

    // ── Evaluation ──────────────────────────────────────────────────────────

    /// Evaluates `expr` against this scope once.  No digest runs.
    pub fn eval(&self, expr: impl Into<Evaluable>, locals: Option<&Value>) -> VigilResult<Value> {
        self.resolve(expr.into())?.call(self, locals)
    }

    /// Evaluates `expr` under the apply phase, then digests from the root.
    ///
    /// The digest runs even when evaluation fails.  A digest failure wins
    /// over an evaluation failure.
    pub fn apply(&self, expr: impl Into<Evaluable>, locals: Option<&Value>) -> VigilResult<Value> {
        let tree = &self.0.tree;
        tree.begin_phase(Phase::Apply)?;
        let result = self
            .resolve(expr.into())
            .and_then(|evaluator| evaluator.call(self, locals));
        tree.clear_phase();
        self.root().digest()?;
        result
    }

    /// Queues `expr` to run against this scope during the current or next
    /// digest.  Outside any phase, the first queued expression also defers a
    /// root digest onto the task queue.
    pub fn eval_async(&self, expr: impl Into<Evaluable>) -> VigilResult<()> {
        let evaluator = self.resolve(expr.into())?;
        let tree = &self.0.tree;
        if tree.phase.get().is_none() && tree.async_queue.borrow().is_empty() {
            let root = Rc::downgrade(&self.root().0);
            tree.tasks.defer(move || {
                let Some(root) = root.upgrade().map(Scope) else {
                    return Ok(());
                };
                if root.0.tree.async_queue.borrow().is_empty() {
                    return Ok(());
                }
                root.digest()
            });
        }
        tree.async_queue.borrow_mut().push_back(AsyncTask {
            scope: self.clone(),
            evaluator,
        });
        Ok(())
    }

    /// Queues `expr` for a batched apply.  All calls made before the
    /// deferred task runs share one apply and therefore one digest.
    pub fn apply_async(&self, expr: impl Into<Evaluable>) -> VigilResult<()> {
        let evaluator = self.resolve(expr.into())?;
        let tree = &self.0.tree;
        let scope = self.clone();
        tree.apply_async_queue
            .borrow_mut()
            .push_back(Box::new(move || evaluator.call(&scope, None).map(drop)));
        if tree.apply_async_task.get().is_some() {
            return Ok(());
        }
        let root = Rc::downgrade(&self.root().0);
        let id = tree.tasks.defer(move || {
            let Some(root) = root.upgrade().map(Scope) else {
                return Ok(());
            };
            root.apply(
                Evaluable::native(|scope, _| {
                    scope.flush_apply_async();
                    Ok(Value::Undefined)
                }),
                None,
            )
            .map(drop)
        });
        tree.apply_async_task.set(Some(id));
        Ok(())
    }

    /// Queues `hook` to run once after the next digest settles.
    pub fn post_digest<F>(&self, hook: F)
    where
        F: FnOnce(&Scope) -> VigilResult<()> + 'static,
    {
        self.0
            .tree
            .post_digest_queue
            .borrow_mut()
            .push_back((self.clone(), Box::new(hook)));
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn resolve(&self, expr: Evaluable) -> VigilResult<Evaluator> {
        Ok(match expr {
            Evaluable::Source(source) => Evaluator::Expression(self.parser().parse(&source)?),
            Evaluable::Compiled(expr) => Evaluator::Expression(expr),
            Evaluable::Native(f) => Evaluator::Native(f),
        })
    }

    /// Runs every queued apply-async thunk and clears the pending task.
    fn flush_apply_async(&self) {
        let tree = &self.0.tree;
        loop {
            let Some(thunk) = tree.apply_async_queue.borrow_mut().pop_front() else {
                break;
            };
            if let Err(err) = thunk() {
                tree.report("apply_async", &err);
            }
        }
        tree.apply_async_task.set(None);
    }

    fn drain_async_queue(&self) {
        let tree = &self.0.tree;
        loop {
            let Some(task) = tree.async_queue.borrow_mut().pop_front() else {
                break;
            };
            if let Err(err) = task.evaluator.call(&task.scope, None) {
                tree.report("eval_async", &err);
            }
        }
    }

    fn drain_post_digest(&self) {
        let tree = &self.0.tree;
        loop {
            let Some((scope, hook)) = tree.post_digest_queue.borrow_mut().pop_front() else {
                break;
            };
            if let Err(err) = hook(&scope) {
                tree.report("post_digest", &err);
            }
        }
    }

    /// Pre-order walk of the subtree rooted here.  Stops as soon as `f`
    /// returns `false`; the result says whether the walk completed.
    fn every_scope(&self, f: &mut dyn FnMut(&Scope) -> bool) -> bool {
        if !f(self) {
            return false;
        }
        let children = self.children();
        children.iter().all(|child| child.every_scope(f))
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Scope {}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.0.id)
            .field("isolated", &self.0.isolated)
            .field("children", &self.0.children.borrow().len())
            .field("watchers", &self.0.watchers.borrow().len())
            .finish()
    }
}

//! Single-threaded deferred task queue.
//!
//! Stands in for the host event loop's macrotask queue.  Nothing runs on its
//! own: the host pumps the queue with [`TaskQueue::run_pending`] or
//! [`TaskQueue::run_until_idle`].

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::{debug, error};

use crate::error::VigilResult;

/// Identifies a deferred task for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

type Task = Box<dyn FnOnce() -> VigilResult<()>>;

/// FIFO queue of deferred closures.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<(TaskId, Task)>>,
    next_id: Cell<u64>,
}

impl TaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run on a later pump.
    pub fn defer<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() -> VigilResult<()> + 'static,
    {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.tasks.borrow_mut().push_back((id, Box::new(task)));
        debug!(task = id.0, "deferred task");
        id
    }

    /// Removes a task that has not run yet.  Returns `false` if it already
    /// ran or was cancelled.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut tasks = self.tasks.borrow_mut();
        match tasks.iter().position(|(task_id, _)| *task_id == id) {
            Some(index) => {
                tasks.remove(index);
                debug!(task = id.0, "cancelled task");
                true
            }
            None => false,
        }
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    /// Returns `true` if no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs the tasks that were queued before this call, in order.  Tasks
    /// deferred while running wait for the next pump.  A failing task is
    /// logged and does not stop the others.  Returns the number run.
    pub fn run_pending(&self) -> usize {
        let batch = self.tasks.borrow().len();
        let mut ran = 0;
        for _ in 0..batch {
            let Some((id, task)) = self.tasks.borrow_mut().pop_front() else {
                break;
            };
            if let Err(err) = task() {
                error!(task = id.0, %err, "deferred task failed");
            }
            ran += 1;
        }
        ran
    }

    /// Pumps until the queue is empty.  Returns the total number run.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        while !self.is_empty() {
            total += self.run_pending();
        }
        total
    }
}

//! Single-threaded FIFO work queue.
//!
//! Destructive store transitions are split into an announce phase, run
//! immediately, and a commit phase submitted here. Anything a subscriber
//! defers while reacting to the announcement lands in the queue first, so it
//! runs before the commit detaches the old store.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub type Job = Box<dyn FnOnce()>;

pub enum Task<T> {
    /// Work deferred by a subscriber.
    External(Job),
    /// A coordinator-owned transition step.
    Transition(T),
}

pub struct WorkQueue<T> {
    tasks: Rc<RefCell<VecDeque<Task<T>>>>,
}

impl<T: 'static> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            tasks: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn submit(&self, transition: T) {
        self.tasks.borrow_mut().push_back(Task::Transition(transition));
    }

    /// Takes the next task. The queue borrow is released before the caller
    /// runs it, so running tasks may enqueue more.
    pub fn pop(&self) -> Option<Task<T>> {
        self.tasks.borrow_mut().pop_front()
    }

    /// Drops every queued transition, keeping external jobs. Returns how
    /// many were dropped.
    pub fn discard_transitions(&self) -> usize {
        let mut tasks = self.tasks.borrow_mut();
        let before = tasks.len();
        tasks.retain(|task| matches!(task, Task::External(_)));
        before - tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    pub fn scheduler(&self) -> Scheduler {
        let tasks = Rc::clone(&self.tasks);
        Scheduler {
            push: Rc::new(move |job| tasks.borrow_mut().push_back(Task::External(job))),
        }
    }
}

impl<T: 'static> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle given to subscribers for deferring work onto the queue.
#[derive(Clone)]
pub struct Scheduler {
    push: Rc<dyn Fn(Job)>,
}

impl Scheduler {
    pub fn defer(&self, job: impl FnOnce() + 'static) {
        (self.push)(Box::new(job));
    }
}

// strix-core/src/scheduler.rs
//
// Cooperative single-threaded task queue. "Asynchronous" work is a closure
// deferred to a later turn of this queue, never another thread. The scheduler
// also tracks outstanding fibers and is the only component that triggers
// commits: the commit continuation registered via `add_fiber` runs exactly
// once, at settlement, and never against a half-rendered tree.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use strix_template::RenderError;
use tracing::trace;

use crate::fiber::Fiber;

#[derive(Default)]
pub struct Scheduler {
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    flushing: Cell<bool>,
    pending: RefCell<Vec<Weak<Fiber>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue work for a later turn.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Run a single task. Returns false when the queue is empty.
    pub fn tick(&self) -> bool {
        let task = self.queue.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue drains. Re-entrant flushes fold into the
    /// outer one, the same way a notification flood folds into one loop.
    pub fn flush(&self) {
        if self.flushing.replace(true) {
            return;
        }
        while self.tick() {}
        self.flushing.set(false);
    }

    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Track a fiber until settlement and register its commit continuation.
    pub fn add_fiber(
        &self,
        fiber: &Rc<Fiber>,
        commit: impl FnOnce(Result<(), RenderError>) + 'static,
    ) {
        trace!(target: "strix::scheduler", fiber = fiber.id(), "fiber added");
        self.pending
            .borrow_mut()
            .retain(|weak| weak.upgrade().is_some_and(|fiber| fiber.is_pending()));
        self.pending.borrow_mut().push(Rc::downgrade(fiber));
        fiber.on_settled(commit);
    }

    /// Number of tracked fibers that have not yet reached a terminal state.
    pub fn pending_fibers(&self) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|weak| weak.upgrade().is_some_and(|fiber| fiber.is_pending()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell as StdRefCell;

    #[test]
    fn tasks_run_in_fifo_order() {
        let scheduler = Scheduler::new();
        let order = Rc::new(StdRefCell::new(Vec::new()));
        for n in 1..=3 {
            let order = order.clone();
            scheduler.defer(move || order.borrow_mut().push(n));
        }
        scheduler.flush();
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn tasks_may_defer_more_tasks() {
        let scheduler = Rc::new(Scheduler::new());
        let order = Rc::new(StdRefCell::new(Vec::new()));
        {
            let scheduler2 = scheduler.clone();
            let order = order.clone();
            scheduler.defer(move || {
                order.borrow_mut().push("first");
                let order = order.clone();
                scheduler2.defer(move || order.borrow_mut().push("second"));
            });
        }
        scheduler.flush();
        assert_eq!(*order.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn commit_runs_once_at_settlement() {
        let scheduler = Scheduler::new();
        let fiber = Fiber::new(None);
        let commits = Rc::new(Cell::new(0));
        let seen = commits.clone();
        scheduler.add_fiber(&fiber, move |_| seen.set(seen.get() + 1));
        assert_eq!(scheduler.pending_fibers(), 1);

        fiber.release();
        assert_eq!(commits.get(), 1);
        assert_eq!(scheduler.pending_fibers(), 0);
    }
}

// strix-core/src/fiber.rs
//
// A fiber is one logical render in flight: a pending-work counter plus a
// settlement notification list. The counter starts at 1 for the render body
// itself; every nested asynchronous piece of work (a deferred setup, a child
// component render) retains the fiber and releases it on completion. The
// fiber settles the instant the counter returns to zero; a failed fiber never
// settles and fails its parent instead.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use strix_template::RenderError;
use tracing::trace;

thread_local! {
    static NEXT_FIBER_ID: Cell<u64> = const { Cell::new(1) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Settled,
    Failed,
}

pub struct Fiber {
    id: u64,
    counter: Cell<u32>,
    parent: Option<Rc<Fiber>>,
    state: Cell<State>,
    waiters: RefCell<Vec<Box<dyn FnOnce(Result<(), RenderError>)>>>,
    error: RefCell<Option<RenderError>>,
}

impl Fiber {
    /// Create a fiber with one unit of pending work. A parented fiber counts
    /// as pending work for its parent until it settles.
    pub fn new(parent: Option<&Rc<Fiber>>) -> Rc<Fiber> {
        if let Some(parent) = parent {
            parent.retain();
        }
        let id = NEXT_FIBER_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        trace!(target: "strix::fiber", id, parent = parent.map(|p| p.id), "fiber created");
        Rc::new(Fiber {
            id,
            counter: Cell::new(1),
            parent: parent.cloned(),
            state: Cell::new(State::Pending),
            waiters: RefCell::new(Vec::new()),
            error: RefCell::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn counter(&self) -> u32 {
        self.counter.get()
    }

    pub fn is_pending(&self) -> bool {
        self.state.get() == State::Pending
    }

    pub fn is_settled(&self) -> bool {
        self.state.get() == State::Settled
    }

    pub fn is_failed(&self) -> bool {
        self.state.get() == State::Failed
    }

    /// One more unit of pending work.
    pub fn retain(&self) {
        self.counter.set(self.counter.get() + 1);
    }

    /// One unit of work finished. Settles the fiber when the counter reaches
    /// zero; ignored once the fiber already failed.
    pub fn release(&self) {
        if self.state.get() != State::Pending {
            return;
        }
        let remaining = self.counter.get().saturating_sub(1);
        self.counter.set(remaining);
        if remaining == 0 {
            self.settle();
        }
    }

    fn settle(&self) {
        self.state.set(State::Settled);
        trace!(target: "strix::fiber", id = self.id, "fiber settled");
        let waiters: Vec<_> = self.waiters.borrow_mut().drain(..).collect();
        for waiter in waiters {
            waiter(Ok(()));
        }
        if let Some(parent) = &self.parent {
            parent.release();
        }
    }

    /// Mark the render as failed. The error reaches every waiter and cascades
    /// to the parent fiber; the fiber will never settle.
    pub fn fail(&self, error: RenderError) {
        if self.state.get() != State::Pending {
            return;
        }
        self.state.set(State::Failed);
        trace!(target: "strix::fiber", id = self.id, %error, "fiber failed");
        *self.error.borrow_mut() = Some(error.clone());
        let waiters: Vec<_> = self.waiters.borrow_mut().drain(..).collect();
        for waiter in waiters {
            waiter(Err(error.clone()));
        }
        if let Some(parent) = &self.parent {
            parent.fail(error);
        }
    }

    /// Register a settlement continuation. Fires immediately when the fiber
    /// already reached a terminal state.
    pub fn on_settled(&self, waiter: impl FnOnce(Result<(), RenderError>) + 'static) {
        match self.state.get() {
            State::Pending => self.waiters.borrow_mut().push(Box::new(waiter)),
            State::Settled => waiter(Ok(())),
            State::Failed => {
                let error = self.error.borrow().clone().unwrap_or(RenderError::Setup {
                    component: String::new(),
                    reason: "fiber failed".to_string(),
                });
                waiter(Err(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn settles_when_counter_returns_to_zero() {
        let fiber = Fiber::new(None);
        assert_eq!(fiber.counter(), 1);
        fiber.retain();
        fiber.release();
        assert!(fiber.is_pending());
        fiber.release();
        assert!(fiber.is_settled());
    }

    #[test]
    fn child_settlement_releases_the_parent() {
        let parent = Fiber::new(None);
        let child = Fiber::new(Some(&parent));
        assert_eq!(parent.counter(), 2);

        parent.release();
        assert!(parent.is_pending());

        child.release();
        assert!(child.is_settled());
        assert!(parent.is_settled());
    }

    #[test]
    fn child_failure_fails_the_parent() {
        let parent = Fiber::new(None);
        let child = Fiber::new(Some(&parent));
        parent.release();

        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();
        parent.on_settled(move |result| flag.set(result.is_err()));

        child.fail(RenderError::Setup {
            component: "child".to_string(),
            reason: "boom".to_string(),
        });
        assert!(child.is_failed());
        assert!(parent.is_failed());
        assert!(seen.get());

        // a failed fiber never settles
        child.release();
        assert!(!child.is_settled());
    }

    #[test]
    fn late_waiters_fire_immediately() {
        let fiber = Fiber::new(None);
        fiber.release();
        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();
        fiber.on_settled(move |result| flag.set(result.is_ok()));
        assert!(seen.get());
    }
}

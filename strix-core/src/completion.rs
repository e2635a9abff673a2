// strix-core/src/completion.rs
//
// The caller-visible settlement signal: a one-shot result cell with
// continuation registration. Mount and re-render hand one of these back
// instead of a future; callers attach continuations with `on_done`.

use std::cell::RefCell;
use std::rc::Rc;

use strix_template::RenderError;

pub struct Completion<T> {
    state: Rc<RefCell<State<T>>>,
}

enum State<T> {
    Pending(Vec<Box<dyn FnOnce(&Result<T, RenderError>)>>),
    Done(Result<T, RenderError>),
}

impl<T> Completion<T> {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Pending(Vec::new()))),
        }
    }

    /// A completion that already failed, for errors detected synchronously.
    pub fn rejected(error: RenderError) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::Done(Err(error)))),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(&*self.state.borrow(), State::Done(_))
    }

    /// Register a continuation; fires immediately when already resolved.
    pub fn on_done(&self, waiter: impl FnOnce(&Result<T, RenderError>) + 'static) {
        let mut state = self.state.borrow_mut();
        match &mut *state {
            State::Pending(waiters) => waiters.push(Box::new(waiter)),
            State::Done(result) => waiter(result),
        }
    }

    pub(crate) fn resolve(&self, result: Result<T, RenderError>) {
        let waiters = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                State::Done(_) => return,
                State::Pending(waiters) => {
                    let waiters = std::mem::take(waiters);
                    *state = State::Done(result);
                    waiters
                }
            }
        };
        let state = self.state.borrow();
        if let State::Done(result) = &*state {
            for waiter in waiters {
                waiter(result);
            }
        }
    }
}

impl<T: Clone> Completion<T> {
    /// Snapshot of the result, if settled.
    pub fn result(&self) -> Option<Result<T, RenderError>> {
        match &*self.state.borrow() {
            State::Pending(_) => None,
            State::Done(result) => Some(result.clone()),
        }
    }
}

impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Default for Completion<T> {
    fn default() -> Self {
        Self::new()
    }
}

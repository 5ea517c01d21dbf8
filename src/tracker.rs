//! The call tracker: a stack of currently-executing entries, used to record
//! caller edges as wrapped functions call each other.
use crate::entry::Entry;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static CALL_TRACKER: RefCell<Vec<Rc<Entry>>> = RefCell::new(Vec::new());
}

/// The entry currently at the top of the tracker, i.e. the immediate caller
/// for any dependency edge formed right now. `None` outside any wrapped
/// call.
pub(crate) fn current() -> Option<Rc<Entry>> {
    CALL_TRACKER.with(|t| t.borrow().last().cloned())
}

fn push(entry: Rc<Entry>) {
    CALL_TRACKER.with(|t| t.borrow_mut().push(entry));
}

fn pop() {
    CALL_TRACKER.with(|t| {
        t.borrow_mut().pop();
    });
}

/// RAII guard ensuring `pop` runs on every exit path of `Wrapper::call`,
/// including an early return through `?` from a failing user function.
#[must_use]
pub(crate) struct Guard;

impl Guard {
    pub(crate) fn push(entry: Rc<Entry>) -> Guard {
        push(entry);
        Guard
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        pop();
    }
}

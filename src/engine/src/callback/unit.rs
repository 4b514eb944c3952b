//! This module contains [`Unit`], the handle of an invocation in flight.
use std::fmt;
use std::rc::Rc;
use serde_json::Value;
use crate::callback::latch::{Handler, Latch};
use crate::callback::slot::Callback;
use crate::error::{Error, Outcome};

/// An asynchronous unit: one invocation of a wrapped coroutine that completes exactly once,
/// with either a value or an error.
///
/// A unit can be waited on by another computation ([`Co::wait`](crate::coroutine::Co::wait)),
/// observed with [`then`](Unit::then), or driven to completion with [`block_on`](crate::block_on).
/// If it fails and is dropped before anyone observed it, the error goes to the
/// [unobserved-failure sink](crate::utils::set_unobserved_hook).
pub struct Unit {
    latch: Rc<Latch>,
}

impl Unit {
    /// Creates a pending unit and the callback that completes it.
    pub(crate) fn pending() -> (Unit, Callback) {
        let latch = Rc::new(Latch::new(true));
        (Unit { latch: latch.clone() }, Callback::from_latch(latch))
    }

    /// Creates a unit that has already completed with `value`.
    pub fn ready(value: impl Into<Value>) -> Unit {
        let (unit, completion) = Unit::pending();
        completion.ok(value);
        unit
    }

    /// Creates a unit that has already failed with `error`.
    pub fn failed(error: impl Into<Error>) -> Unit {
        let (unit, completion) = Unit::pending();
        completion.err(error);
        unit
    }

    /// Whether the unit has completed.
    pub fn is_settled(&self) -> bool {
        self.latch.is_fired()
    }

    /// Attaches the continuation. It is called right away if the unit has already completed.
    pub fn then<F>(self, continuation: F)
    where
        F: FnOnce(Outcome) + 'static,
    {
        if let Some((handler, outcome)) = self.settle_or_register(Box::new(continuation)) {
            handler(outcome);
        }
    }

    pub(crate) fn settle_or_register(self, handler: Handler) -> Option<(Handler, Outcome)> {
        self.latch.settle_or_register(handler)
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit").field("settled", &self.is_settled()).finish()
    }
}

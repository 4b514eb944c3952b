//! This module contains [`Latch`], the single-use cell behind both [`CallbackSlot`](super::CallbackSlot)
//! and [`Unit`](super::Unit).
//!
//! A latch is fired at most once and observed at most once. The two events may come in any order:
//! an outcome fired before anyone waits is kept until a handler is registered,
//! and a handler registered before the outcome is called when it arrives.
use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use tracing::warn;
use crate::error::{Error, Outcome};
use crate::utils::sink::report_unobserved;

/// The continuation called with the outcome of a latch.
pub(crate) type Handler = Box<dyn FnOnce(Outcome)>;

enum LatchState {
    /// Neither fired nor observed.
    Empty,
    /// Fired, nobody is waiting yet.
    Fired(Outcome),
    /// Observed, the outcome has not arrived yet.
    Waiting(Handler),
    /// Fired and observed.
    Done,
}

pub(crate) struct Latch {
    state: RefCell<LatchState>,
    fired: Cell<bool>,
    /// Whether an error that nobody observed must be reported when the latch is dropped.
    report_unobserved: bool,
}

impl Latch {
    pub(crate) fn new(report_unobserved: bool) -> Self {
        Self {
            state: RefCell::new(LatchState::Empty),
            fired: Cell::new(false),
            report_unobserved,
        }
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.get()
    }

    /// Fires the latch. Returns `false` (and changes nothing) if it has already been fired.
    ///
    /// A registered handler is called synchronously, after the state has been released,
    /// so the handler may freely touch this latch again.
    pub(crate) fn fire(&self, outcome: Outcome) -> bool {
        if self.fired.replace(true) {
            warn!(outcome = ?outcome, "callback fired more than once, ignoring");
            return false;
        }

        let previous = mem::replace(&mut *self.state.borrow_mut(), LatchState::Done);
        match previous {
            LatchState::Empty => {
                *self.state.borrow_mut() = LatchState::Fired(outcome);
            }
            LatchState::Waiting(handler) => handler(outcome),
            // `fired` guards both of these
            LatchState::Fired(_) | LatchState::Done => unreachable!("latch fired twice"),
        }

        true
    }

    /// Registers `handler` to be called with the outcome.
    ///
    /// If the outcome is already there, nothing is registered: the handler is given back together with
    /// the outcome and the caller decides how to call it. A latch can be observed only once;
    /// a second observer gets [`Error::SlotReused`].
    pub(crate) fn settle_or_register(&self, handler: Handler) -> Option<(Handler, Outcome)> {
        let mut state = self.state.borrow_mut();
        match mem::replace(&mut *state, LatchState::Done) {
            LatchState::Empty => {
                *state = LatchState::Waiting(handler);
                None
            }
            LatchState::Fired(outcome) => Some((handler, outcome)),
            waiting @ LatchState::Waiting(_) => {
                *state = waiting;
                Some((handler, Err(Error::SlotReused)))
            }
            LatchState::Done => Some((handler, Err(Error::SlotReused))),
        }
    }
}

impl Drop for Latch {
    fn drop(&mut self) {
        if !self.report_unobserved {
            return;
        }
        if let LatchState::Fired(Err(err)) = self.state.get_mut() {
            report_unobserved(err);
        }
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            LatchState::Empty => "empty",
            LatchState::Fired(_) => "fired",
            LatchState::Waiting(_) => "waiting",
            LatchState::Done => "done",
        };
        f.debug_struct("Latch").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use serde_json::json;

    fn recorder() -> (Rc<RefCell<Vec<Outcome>>>, Handler) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_ref = seen.clone();
        (seen, Box::new(move |outcome| seen_ref.borrow_mut().push(outcome)))
    }

    #[test]
    fn test_fire_then_register() {
        let latch = Latch::new(false);
        assert!(latch.fire(Ok(json!(1))));
        assert!(latch.is_fired());

        let (seen, handler) = recorder();
        let (handler, outcome) = latch.settle_or_register(handler).expect("must be settled");
        assert_eq!(outcome, Ok(json!(1)));
        handler(outcome);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_register_then_fire() {
        let latch = Latch::new(false);
        let (seen, handler) = recorder();
        assert!(latch.settle_or_register(handler).is_none());
        assert!(seen.borrow().is_empty());

        assert!(latch.fire(Err(Error::raise("bad"))));
        assert_eq!(*seen.borrow(), vec![Err(Error::raise("bad"))]);
    }

    #[test]
    fn test_second_fire_is_ignored() {
        let latch = Latch::new(false);
        let (seen, handler) = recorder();
        latch.settle_or_register(handler);

        assert!(latch.fire(Ok(json!("first"))));
        assert!(!latch.fire(Ok(json!("second"))));
        assert_eq!(*seen.borrow(), vec![Ok(json!("first"))]);
    }

    #[test]
    fn test_second_fire_before_observer_keeps_first() {
        let latch = Latch::new(false);
        latch.fire(Ok(json!(1)));
        latch.fire(Ok(json!(2)));

        let (_, handler) = recorder();
        let (_, outcome) = latch.settle_or_register(handler).unwrap();
        assert_eq!(outcome, Ok(json!(1)));
    }

    #[test]
    fn test_second_observer_is_rejected() {
        let latch = Latch::new(false);
        let (_, first) = recorder();
        let (_, second) = recorder();
        assert!(latch.settle_or_register(first).is_none());

        let (_, outcome) = latch.settle_or_register(second).unwrap();
        assert_eq!(outcome, Err(Error::SlotReused));
    }
}

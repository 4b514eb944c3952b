//! This module contains the driver: the loop that steps one computation from suspension to suspension.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};
use crate::callback::latch::Handler;
use crate::callback::{Callback, Unit};
use crate::coroutine::{CoroutineImpl, Step, Suspend};
use crate::error::{Error, Outcome};
use crate::local::current;
use crate::local::Context;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Owns one computation until it finishes and completes its [`Unit`] exactly once.
///
/// A driver is kept alive only by the handler registered on the slot or unit it is waiting for,
/// so a computation whose suspension never completes is simply dropped with it.
struct Driver {
    id: u64,
    computation: RefCell<Option<CoroutineImpl>>,
    context: Context,
    completion: Callback,
}

/// Starts driving `computation` bound to `context`. The computation runs synchronously up to
/// its first suspension that is not settled yet; the returned unit completes when it finishes.
pub(crate) fn spawn(computation: CoroutineImpl, context: Context) -> Unit {
    let (unit, completion) = Unit::pending();
    let driver = Rc::new(Driver {
        id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        computation: RefCell::new(Some(computation)),
        context,
        completion,
    });

    trace!(id = driver.id, "coroutine started");
    driver.drive(None);

    unit
}

impl Driver {
    /// Steps the computation: starts it when `input` is `None`, resumes it with `input` otherwise.
    fn step(&self, input: Option<Outcome>) -> Step {
        let _entered = current::enter(self.context.clone());
        let mut slot = self.computation.borrow_mut();
        let Some(computation) = slot.as_mut() else {
            return Step::Complete(Err(Error::Finished));
        };

        match input {
            None => computation.start(),
            Some(_) if computation.is_finished() => Step::Complete(Err(Error::Finished)),
            Some(outcome) => computation.resume(outcome),
        }
    }

    fn resumer(self: &Rc<Self>) -> Handler {
        let driver = self.clone();
        Box::new(move |outcome| driver.drive(Some(outcome)))
    }

    /// Steps the computation until it finishes or waits on something that has not completed yet.
    ///
    /// An already completed slot or unit is handled by the next iteration, never by recursion.
    fn drive(self: Rc<Self>, mut input: Option<Outcome>) {
        loop {
            if let Some(outcome) = &input {
                trace!(id = self.id, ok = outcome.is_ok(), "coroutine resumed");
            }

            let token = match self.step(input.take()) {
                Step::Complete(outcome) => return self.finish(outcome),
                Step::Yielded(token) => token,
            };
            trace!(id = self.id, kind = token.kind(), "coroutine suspended");

            let settled = match token {
                Suspend::Return(value) => return self.finish(Ok(value)),
                Suspend::Callback(slot) => slot.settle_or_register(self.resumer()),
                Suspend::Nested(unit) => unit.settle_or_register(self.resumer()),
            };

            match settled {
                Some((_, outcome)) => input = Some(outcome),
                None => return,
            }
        }
    }

    /// Releases the computation, then completes the unit.
    fn finish(&self, outcome: Outcome) {
        let computation = self.computation.borrow_mut().take();
        drop(computation);

        match &outcome {
            Ok(_) => debug!(id = self.id, "coroutine completed"),
            Err(err) => debug!(id = self.id, error = %err, "coroutine failed"),
        }

        self.completion.complete(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use serde_json::{json, Value};
    use crate::callback::callback;
    use crate::coroutine::{Computation, Resumable};

    fn observe(unit: Unit) -> Rc<RefCell<Vec<Outcome>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_ref = seen.clone();
        unit.then(move |outcome| seen_ref.borrow_mut().push(outcome));
        seen
    }

    #[test]
    fn test_settled_suspensions_do_not_recurse() {
        let computation = Computation::new(Context::new(), |co| async move {
            let mut total = 0;
            for i in 0..100_000 {
                total += co.wait(Unit::ready(i)).await?.as_i64().unwrap_or_default();
            }
            Ok(Value::from(total))
        });

        let seen = observe(spawn(Box::new(computation), Context::new()));
        assert_eq!(*seen.borrow(), vec![Ok(json!(4_999_950_000_i64))]);
    }

    #[test]
    #[allow(unreachable_code)]
    fn test_early_return_releases_body() {
        struct Flag(Rc<Cell<bool>>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.set(true);
            }
        }

        let dropped = Rc::new(Cell::new(false));
        let after = Rc::new(Cell::new(false));
        let (dropped_ref, after_ref) = (dropped.clone(), after.clone());
        let computation = Computation::new(Context::new(), move |co| async move {
            let _flag = Flag(dropped_ref);
            co.ret(9).await;
            after_ref.set(true);
            Ok(Value::Null)
        });

        let seen = observe(spawn(Box::new(computation), Context::new()));
        assert_eq!(*seen.borrow(), vec![Ok(json!(9))]);
        assert!(dropped.get());
        assert!(!after.get());
    }

    #[test]
    fn test_completes_once_after_many_suspensions() {
        let slots: Rc<RefCell<Vec<Callback>>> = Rc::default();
        let slots_ref = slots.clone();
        let computation = Computation::new(Context::new(), move |co| async move {
            for _ in 0..3 {
                let slot = callback();
                slots_ref.borrow_mut().push(slot.callback());
                co.wait(slot).await?;
            }
            Ok(Value::from("done"))
        });

        let seen = observe(spawn(Box::new(computation), Context::new()));
        for _ in 0..3 {
            let next = slots.borrow_mut().pop().unwrap();
            next.ok(());
            assert!(!next.ok(()));
        }
        assert_eq!(*seen.borrow(), vec![Ok(json!("done"))]);
    }

    #[test]
    fn test_context_is_current_while_stepping() {
        let ctx = Context::new();
        let computation = Computation::new(ctx.clone(), |co| async move {
            Ok(Value::from(current::current_context().ptr_eq(co.this())))
        });

        let seen = observe(spawn(Box::new(computation), ctx));
        assert_eq!(*seen.borrow(), vec![Ok(json!(true))]);
    }

    #[test]
    fn test_hand_written_resumable() {
        struct Countdown {
            left: u32,
            finished: bool,
        }

        impl Resumable for Countdown {
            fn start(&mut self) -> Step {
                self.resume_with_value(Value::Null)
            }

            fn resume_with_value(&mut self, _value: Value) -> Step {
                if self.left == 0 {
                    self.finished = true;
                    return Step::Complete(Ok(Value::from("liftoff")));
                }
                self.left -= 1;
                Step::Yielded(Suspend::nested(Unit::ready(self.left)))
            }

            fn resume_with_error(&mut self, error: Error) -> Step {
                self.finished = true;
                Step::Complete(Err(error))
            }

            fn is_finished(&self) -> bool {
                self.finished
            }
        }

        let seen = observe(spawn(Box::new(Countdown { left: 3, finished: false }), Context::new()));
        assert_eq!(*seen.borrow(), vec![Ok(json!("liftoff"))]);
    }

    #[test]
    fn test_finished_resumable_is_not_resumed() {
        struct Eager {
            resumed: Rc<Cell<u32>>,
        }

        impl Resumable for Eager {
            fn start(&mut self) -> Step {
                Step::Yielded(Suspend::callback({
                    let slot = callback();
                    slot.callback().ok(());
                    slot
                }))
            }

            fn resume_with_value(&mut self, _value: Value) -> Step {
                self.resumed.set(self.resumed.get() + 1);
                Step::Yielded(Suspend::early_return("too late"))
            }

            fn resume_with_error(&mut self, error: Error) -> Step {
                self.resumed.set(self.resumed.get() + 1);
                Step::Complete(Err(error))
            }

            fn is_finished(&self) -> bool {
                true
            }
        }

        let resumed = Rc::new(Cell::new(0));
        let seen = observe(spawn(Box::new(Eager { resumed: resumed.clone() }), Context::new()));
        assert_eq!(*seen.borrow(), vec![Err(Error::Finished)]);
        assert_eq!(resumed.get(), 0);
    }
}

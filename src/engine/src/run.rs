use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use serde::Serialize;
use crate::args::Args;
use crate::callback::Unit;
use crate::coroutine::{Co, Computation, Resumable};
use crate::error::{Error, Outcome, Result};
use crate::local::{current_context, Context};
use crate::scheduler::driver;
use crate::utils::sink::report_unobserved;

type Body = Pin<Box<dyn Future<Output = Outcome>>>;
type Template = dyn Fn(Co, Args) -> Body;

/// A wrapped coroutine: every [`call`](Oroutine::call) starts a fresh, independent [`Computation`].
///
/// Cloning is cheap; clones share the template.
#[derive(Clone)]
pub struct Oroutine {
    template: Rc<Template>,
}

/// Wraps a coroutine template into an [`Oroutine`].
///
/// The template gets the [`Co`] of the new computation and its arguments,
/// and returns the body. Nothing is run until the oroutine is called.
///
/// # Examples
///
/// ```ignore
/// use monocle::{o0, block_on, args, Value};
///
/// let add = o0(|_co, args| async move {
///     let (a, b): (i64, i64) = (args.arg(0)?, args.arg(1)?);
///     Ok(Value::from(a + b))
/// });
///
/// assert_eq!(block_on(add.call(args![3, 6])), Ok(Value::from(9)));
/// ```
pub fn o0<F, Fut>(template: F) -> Oroutine
where
    F: Fn(Co, Args) -> Fut + 'static,
    Fut: Future<Output = Outcome> + 'static,
{
    Oroutine {
        template: Rc::new(move |co: Co, args: Args| Box::pin(template(co, args)) as Body),
    }
}

impl Oroutine {
    /// Starts a new invocation bound to the current context and returns its [`Unit`] right away.
    ///
    /// The body runs synchronously up to its first suspension point before this returns.
    pub fn call(&self, args: impl Into<Args>) -> Unit {
        self.call_with(current_context(), args)
    }

    /// Starts a new invocation bound to `context`.
    pub fn call_with(&self, context: Context, args: impl Into<Args>) -> Unit {
        let computation = self.instantiate(context.clone(), args);
        driver::spawn(Box::new(computation), context)
    }

    /// Creates the computation of an invocation without driving it.
    ///
    /// The template itself runs on the first step, so calls made before its `async` block
    /// are bound to `context` as well.
    pub fn instantiate(&self, context: Context, args: impl Into<Args>) -> Computation {
        let template = self.template.clone();
        let args = args.into();
        Computation::new(context, move |co| async move { template(co, args).await })
    }
}

impl fmt::Debug for Oroutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Oroutine").finish_non_exhaustive()
    }
}

/// Runs the body as a new computation bound to the current context.
///
/// # Examples
///
/// ```ignore
/// use monocle::{run, sleep, block_on, Value};
/// use std::time::Duration;
///
/// let unit = run(|co| async move {
///     co.wait(sleep(Duration::from_millis(500))).await?;
///     Ok(Value::from("slept"))
/// });
///
/// assert_eq!(block_on(unit), Ok(Value::from("slept")));
/// ```
pub fn run<F, Fut>(body: F) -> Unit
where
    F: FnOnce(Co) -> Fut,
    Fut: Future<Output = Outcome> + 'static,
{
    run_with(current_context(), body)
}

/// Runs the body as a new computation bound to `context`.
pub fn run_with<F, Fut>(context: Context, body: F) -> Unit
where
    F: FnOnce(Co) -> Fut,
    Fut: Future<Output = Outcome> + 'static,
{
    spawn(Computation::new(context.clone(), body), context)
}

/// Drives any [`Resumable`] bound to `context`, hand-written state machines included.
pub fn spawn(computation: impl Resumable + 'static, context: Context) -> Unit {
    driver::spawn(Box::new(computation), context)
}

/// Calls `oroutine` and forgets the unit. A failure is reported to the
/// [unobserved-failure sink](crate::utils::set_unobserved_hook).
pub fn launch(oroutine: &Oroutine, args: impl Into<Args>) {
    oroutine.call(args).then(|outcome| {
        if let Err(err) = outcome {
            report_unobserved(&err);
        }
    });
}

/// Converts what a typed body returns into the [`Outcome`] of a computation.
///
/// It is used by [`oroutine`](crate::oroutine) so that bodies can return any serializable value.
pub trait IntoCompletion {
    fn into_completion(self) -> Outcome;
}

impl<T: Serialize> IntoCompletion for Result<T> {
    fn into_completion(self) -> Outcome {
        let value = self?;
        serde_json::to_value(value).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use serde_json::{json, Value};
    use crate::callback::callback;

    fn observe(unit: Unit) -> Rc<RefCell<Option<Outcome>>> {
        let seen = Rc::new(RefCell::new(None));
        let seen_ref = seen.clone();
        unit.then(move |outcome| *seen_ref.borrow_mut() = Some(outcome));
        seen
    }

    #[test]
    fn test_call_runs_to_first_suspension() {
        let slot = Rc::new(RefCell::new(None));
        let slot_ref = slot.clone();
        let waiter = o0(move |co, _| {
            let slot_ref = slot_ref.clone();
            async move {
                let pending = callback();
                *slot_ref.borrow_mut() = Some(pending.callback());
                let value = co.wait(pending).await?;
                Ok(json!({ "got": value }))
            }
        });

        let seen = observe(waiter.call(()));
        assert!(seen.borrow().is_none());

        let completion = slot.borrow_mut().take().expect("body must reach the suspension");
        completion.ok("late");
        assert_eq!(*seen.borrow(), Some(Ok(json!({ "got": "late" }))));
    }

    #[test]
    fn test_calls_are_independent() {
        let double = o0(|_co, args| async move {
            let x: i64 = args.arg(0)?;
            Ok(Value::from(x * 2))
        });

        let first = observe(double.call(crate::args![2]));
        let second = observe(double.call(crate::args![5]));
        assert_eq!(*first.borrow(), Some(Ok(json!(4))));
        assert_eq!(*second.borrow(), Some(Ok(json!(10))));
    }

    #[test]
    fn test_nested_call_inherits_context() {
        let read_foo = o0(|co, _| async move { Ok(co.this().get("foo").unwrap_or(Value::Null)) });
        let outer = o0(move |co, _| {
            let read_foo = read_foo.clone();
            async move { co.wait(read_foo.call(())).await }
        });

        let ctx = Context::from_value(json!({ "foo": "bar" })).unwrap();
        let seen = observe(outer.call_with(ctx, ()));
        assert_eq!(*seen.borrow(), Some(Ok(json!("bar"))));
    }

    #[test]
    fn test_call_before_body_inherits_context() {
        let read_foo = o0(|co, _| async move { Ok(co.this().get("foo").unwrap_or(Value::Null)) });
        let outer = o0(move |co, _| {
            let early = read_foo.call(());
            async move { co.wait(early).await }
        });

        let ctx = Context::from_value(json!({ "foo": "bar" })).unwrap();
        let seen = observe(outer.call_with(ctx, ()));
        assert_eq!(*seen.borrow(), Some(Ok(json!("bar"))));
    }

    #[test]
    fn test_instantiate_runs_nothing() {
        let ran = Rc::new(std::cell::Cell::new(false));
        let ran_ref = ran.clone();
        let eager = o0(move |_co, _| {
            ran_ref.set(true);
            async move { Ok(Value::Null) }
        });

        let mut computation = eager.instantiate(Context::new(), ());
        assert!(!ran.get());
        assert!(matches!(computation.start(), crate::coroutine::Step::Complete(Ok(Value::Null))));
        assert!(ran.get());
    }

    #[test]
    fn test_into_completion() {
        assert_eq!(Ok::<_, Error>(vec![1, 2]).into_completion(), Ok(json!([1, 2])));
        assert_eq!(Err::<u8, _>(Error::raise("bad")).into_completion(), Err(Error::raise("bad")));
    }
}

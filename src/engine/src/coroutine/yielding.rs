//! This module contains [`Co`], the handle a computation body uses to suspend, return early,
//! reach its calling context and call other coroutines.
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll};
use serde_json::Value;
use crate::args::Args;
use crate::callback::Unit;
use crate::coroutine::yield_status::Suspend;
use crate::error::{Error, Outcome};
use crate::local::Context;
use crate::run::Oroutine;
use crate::scheduler::next_turn;

/// The mailbox between a body and its [`Computation`](super::Computation):
/// the body leaves a token on the way out and finds the outcome on the way back in.
#[derive(Default)]
pub(crate) struct Channel {
    yielded: RefCell<Option<Suspend>>,
    input: RefCell<Option<Outcome>>,
    overlapped: Cell<bool>,
}

impl Channel {
    /// Leaves `token` for the driver. A second token in the same step is dropped and marks the step as overlapped.
    pub(crate) fn offer(&self, token: Suspend) {
        let mut yielded = self.yielded.borrow_mut();
        if yielded.is_some() {
            self.overlapped.set(true);
            return;
        }
        *yielded = Some(token);
    }

    /// Whether the body suspended more than once in the last step. Resets the mark.
    pub(crate) fn take_overlapped(&self) -> bool {
        self.overlapped.replace(false)
    }

    pub(crate) fn take_yielded(&self) -> Option<Suspend> {
        self.yielded.borrow_mut().take()
    }

    pub(crate) fn put_input(&self, outcome: Outcome) {
        *self.input.borrow_mut() = Some(outcome);
    }

    fn take_input(&self) -> Option<Outcome> {
        self.input.borrow_mut().take()
    }
}

/// The handle a computation body gets.
///
/// # Example
///
/// ```ignore
/// use monocle::{o0, Co, Args, Value};
///
/// let cube = o0(move |co: Co, args: Args| {
///     let square = square.clone();
///     async move {
///         let x: f64 = args.arg(0)?;
///         let squared = co.wait(square.call(monocle::args![x])).await?;
///         Ok(Value::from(x * squared.as_f64().unwrap_or_default()))
///     }
/// });
/// ```
#[derive(Clone)]
pub struct Co {
    channel: Rc<Channel>,
    context: Context,
}

impl Co {
    pub(crate) fn new(channel: Rc<Channel>, context: Context) -> Self {
        Self { channel, context }
    }

    /// The calling context the computation is bound to. It is the same object at every resumption point.
    pub fn this(&self) -> &Context {
        &self.context
    }

    /// Suspends on a [`CallbackSlot`](crate::CallbackSlot) or a [`Unit`].
    ///
    /// Evaluates to the value it completed with, or to the error it failed with,
    /// so `?` and `match` handle a failure of arbitrarily deep nesting like a local one.
    pub fn wait(&self, token: impl Into<Suspend>) -> Suspension {
        Suspension {
            token: Some(token.into()),
            channel: self.channel.clone(),
        }
    }

    /// Completes the computation with `value` right away. The code after this `.await` never runs.
    pub fn ret(&self, value: impl Into<Value>) -> EarlyReturn {
        EarlyReturn {
            token: Some(Suspend::Return(value.into())),
            channel: self.channel.clone(),
        }
    }

    /// Suspends until the next turn of the event loop, letting other coroutines run.
    pub fn yield_now(&self) -> Suspension {
        self.wait(next_turn())
    }

    /// Calls `oroutine` bound to this computation's context.
    pub fn call(&self, oroutine: &Oroutine, args: impl Into<Args>) -> Unit {
        oroutine.call_with(self.context.clone(), args)
    }

    /// Calls the method stored on the context under `name`, bound to that same context.
    pub fn invoke(&self, name: &str, args: impl Into<Args>) -> Unit {
        match self.context.method(name) {
            Some(method) => method.call_with(self.context.clone(), args),
            None => Unit::failed(Error::UnknownMethod(name.to_string())),
        }
    }
}

impl fmt::Debug for Co {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Co").field("context", &self.context).finish()
    }
}

/// The future returned by [`Co::wait`].
#[must_use = "a suspension does nothing unless awaited"]
pub struct Suspension {
    token: Option<Suspend>,
    channel: Rc<Channel>,
}

impl Future for Suspension {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Outcome> {
        if let Some(token) = self.token.take() {
            self.channel.offer(token);
            return Poll::Pending;
        }

        match self.channel.take_input() {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

/// The future returned by [`Co::ret`]. It never completes: the driver drops the body instead.
#[must_use = "an early return does nothing unless awaited"]
pub struct EarlyReturn {
    token: Option<Suspend>,
    channel: Rc<Channel>,
}

impl Future for EarlyReturn {
    type Output = Infallible;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<Infallible> {
        if let Some(token) = self.token.take() {
            self.channel.offer(token);
        }
        Poll::Pending
    }
}

//! This module contains a description of [`Resumable`], [`Step`] and [`Computation`] for working with the driver.
//! This module is used for low-level work with the driver.
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll, Waker};
use serde_json::Value;
use crate::coroutine::yield_status::Suspend;
use crate::coroutine::yielding::{Channel, Co};
use crate::error::{Error, Outcome};
use crate::local::Context;

/// What a [`Resumable`] reports after each resumption.
#[derive(Debug)]
pub enum Step {
    /// The computation stopped at a suspension point.
    Yielded(Suspend),
    /// The computation finished, successfully or not. It must not be resumed again.
    Complete(Outcome),
}

/// One in-progress run of a coroutine body.
///
/// The driver calls [`start`](Resumable::start) once, then one of the `resume_*` methods per suspension,
/// until a [`Step::Complete`] is reported.
/// Implement it by hand for explicit state machines, or use [`Computation`] for `async` bodies.
pub trait Resumable {
    /// Runs the computation up to its first suspension point.
    fn start(&mut self) -> Step;

    /// Resumes the computation with the value the pending suspension produced.
    fn resume_with_value(&mut self, value: Value) -> Step;

    /// Resumes the computation by raising `error` at the pending suspension point.
    fn resume_with_error(&mut self, error: Error) -> Step;

    /// Whether the computation has reached its terminal state.
    fn is_finished(&self) -> bool;

    /// Resumes the computation with the outcome of the pending suspension.
    fn resume(&mut self, outcome: Outcome) -> Step {
        match outcome {
            Ok(value) => self.resume_with_value(value),
            Err(error) => self.resume_with_error(error),
        }
    }
}

/// The alias for [`Box`]<dyn [`Resumable`]>.
/// The driver works only with this type of the computations.
pub type CoroutineImpl = Box<dyn Resumable>;

/// A [`Resumable`] backed by an `async` body.
///
/// The body gets a [`Co`] and suspends with `co.wait(token).await`. The computation polls the body
/// with a no-op waker: whenever the body is pending, it must have deposited a token through its [`Co`],
/// otherwise it awaited a foreign future and fails with [`Error::ForeignAwait`].
pub struct Computation {
    body: Option<Pin<Box<dyn Future<Output = Outcome>>>>,
    channel: Rc<Channel>,
    context: Context,
    started: bool,
}

impl Computation {
    /// Creates a computation bound to `context`. Nothing of the body runs until [`start`](Resumable::start).
    pub fn new<F, Fut>(context: Context, body: F) -> Self
    where
        F: FnOnce(Co) -> Fut,
        Fut: Future<Output = Outcome> + 'static,
    {
        let channel = Rc::new(Channel::default());
        let co = Co::new(channel.clone(), context.clone());

        Self {
            body: Some(Box::pin(body(co))),
            channel,
            context,
            started: false,
        }
    }

    /// The context the computation is bound to.
    pub fn context(&self) -> &Context {
        &self.context
    }

    fn finish(&mut self, outcome: Outcome) -> Step {
        self.body = None;
        Step::Complete(outcome)
    }

    fn poll_body(&mut self) -> Step {
        let Some(body) = self.body.as_mut() else {
            return Step::Complete(Err(Error::Finished));
        };

        let mut cx = TaskContext::from_waker(Waker::noop());
        let polled = body.as_mut().poll(&mut cx);
        if self.channel.take_overlapped() {
            self.channel.take_yielded();
            return self.finish(Err(Error::OverlappingSuspension));
        }

        match polled {
            Poll::Ready(outcome) => self.finish(outcome),
            Poll::Pending => match self.channel.take_yielded() {
                Some(token) => Step::Yielded(token),
                None => self.finish(Err(Error::ForeignAwait)),
            },
        }
    }

    fn resume_with(&mut self, outcome: Outcome) -> Step {
        if self.body.is_none() {
            return Step::Complete(Err(Error::Finished));
        }
        if !self.started {
            return self.finish(Err(Error::NotSuspended));
        }
        self.channel.put_input(outcome);
        self.poll_body()
    }
}

impl Resumable for Computation {
    fn start(&mut self) -> Step {
        if self.started {
            return self.finish(Err(Error::NotSuspended));
        }
        self.started = true;
        self.poll_body()
    }

    fn resume_with_value(&mut self, value: Value) -> Step {
        self.resume_with(Ok(value))
    }

    fn resume_with_error(&mut self, error: Error) -> Step {
        self.resume_with(Err(error))
    }

    fn is_finished(&self) -> bool {
        self.body.is_none()
    }
}

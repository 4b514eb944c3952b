//! This module contains [`CallbackSlot`] and [`Callback`]: the bridge from callback-style
//! asynchronous APIs into the suspension protocol.
use std::rc::Rc;
use serde_json::Value;
use crate::callback::latch::{Handler, Latch};
use crate::error::{Error, Outcome};

/// A single-use slot a computation can suspend on.
///
/// Hand [`callback`](CallbackSlot::callback) to the asynchronous API, then wait on the slot itself:
///
/// ```ignore
/// let slot = monocle::callback();
/// monocle::set_timeout(Duration::from_millis(500), {
///     let cb = slot.callback();
///     move || { cb.ok(()); }
/// });
/// co.wait(slot).await?;
/// ```
///
/// The callback may fire before the computation reaches the suspension point; the outcome is kept until then.
#[derive(Debug)]
pub struct CallbackSlot {
    latch: Rc<Latch>,
}

/// Creates a new [`CallbackSlot`].
pub fn callback() -> CallbackSlot {
    CallbackSlot::new()
}

impl CallbackSlot {
    /// Creates a new [`CallbackSlot`].
    pub fn new() -> Self {
        Self {
            latch: Rc::new(Latch::new(false)),
        }
    }

    /// Returns the firing side of the slot. It can be called (and cloned) any number of times,
    /// but only the first firing takes effect.
    pub fn callback(&self) -> Callback {
        Callback {
            latch: self.latch.clone(),
        }
    }

    /// Whether the callback has already fired.
    pub fn is_fired(&self) -> bool {
        self.latch.is_fired()
    }

    pub(crate) fn settle_or_register(self, handler: Handler) -> Option<(Handler, Outcome)> {
        self.latch.settle_or_register(handler)
    }
}

impl Default for CallbackSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The firing side of a [`CallbackSlot`] or of a [`Unit`](super::Unit).
///
/// Every method returns whether the firing took effect: `false` means the callback had already fired
/// and this outcome was dropped.
#[derive(Debug, Clone)]
pub struct Callback {
    latch: Rc<Latch>,
}

impl Callback {
    pub(crate) fn from_latch(latch: Rc<Latch>) -> Self {
        Self { latch }
    }

    /// Fires with the outcome.
    pub fn complete(&self, outcome: Outcome) -> bool {
        self.latch.fire(outcome)
    }

    /// Fires with a success value.
    pub fn ok(&self, value: impl Into<Value>) -> bool {
        self.complete(Ok(value.into()))
    }

    /// Fires with an error.
    pub fn err(&self, error: impl Into<Error>) -> bool {
        self.complete(Err(error.into()))
    }

    /// Fires node-style: an error, if present, wins over the value.
    pub fn call(&self, error: Option<Error>, value: Value) -> bool {
        match error {
            Some(error) => self.complete(Err(error)),
            None => self.complete(Ok(value)),
        }
    }

    /// Whether the callback has already fired.
    pub fn is_fired(&self) -> bool {
        self.latch.is_fired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_fired_before_wait_is_kept() {
        let slot = callback();
        assert!(slot.callback().ok("yay!"));
        assert!(slot.is_fired());

        let (_, outcome) = slot.settle_or_register(Box::new(|_| {})).unwrap();
        assert_eq!(outcome, Ok(json!("yay!")));
    }

    #[test]
    fn test_node_style_error_wins() {
        let slot = callback();
        slot.callback().call(Some(Error::raise("bad")), json!("ignored"));

        let (_, outcome) = slot.settle_or_register(Box::new(|_| {})).unwrap();
        assert_eq!(outcome, Err(Error::raise("bad")));
    }

    #[test]
    fn test_only_first_clone_fires() {
        let slot = callback();
        let first = slot.callback();
        let second = first.clone();

        let seen = Rc::new(RefCell::new(None));
        let seen_ref = seen.clone();
        assert!(slot.settle_or_register(Box::new(move |o| *seen_ref.borrow_mut() = Some(o))).is_none());

        assert!(second.ok(2));
        assert!(!first.ok(1));
        assert!(first.is_fired());
        assert_eq!(*seen.borrow(), Some(Ok(json!(2))));
    }
}

//! This module contains a description of [`Suspend`], the token a computation produces at each suspension point.
//! Please use [`Co`](crate::coroutine::Co) for working with the scheduler if it is possible.
use serde_json::Value;
use crate::callback::{CallbackSlot, Unit};

/// The status of a coroutine suspension. This is the only way a computation communicates with the driver.
#[derive(Debug)]
pub enum Suspend {
    /// [`Callback`](Suspend::Callback) takes a [`CallbackSlot`].
    ///
    /// If produced, the computation is resumed when the slot's callback fires:
    /// with the value on success, or with the error raised at the suspension point.
    Callback(CallbackSlot),

    /// [`Nested`](Suspend::Nested) takes a [`Unit`], another invocation in flight.
    ///
    /// If produced, the computation is resumed with the outcome of that unit once it completes.
    Nested(Unit),

    /// [`Return`](Suspend::Return) takes the result of the computation.
    ///
    /// If produced, the computation completes with the value right away.
    /// Nothing after the suspension point is ever executed.
    Return(Value),
}

impl Suspend {
    /// Create a Suspend variant [`Callback`](Suspend::Callback).
    pub fn callback(slot: CallbackSlot) -> Self {
        Suspend::Callback(slot)
    }

    /// Create a Suspend variant [`Nested`](Suspend::Nested).
    pub fn nested(unit: Unit) -> Self {
        Suspend::Nested(unit)
    }

    /// Create a Suspend variant [`Return`](Suspend::Return).
    pub fn early_return(value: impl Into<Value>) -> Self {
        Suspend::Return(value.into())
    }

    /// The name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Suspend::Callback(_) => "callback",
            Suspend::Nested(_) => "nested",
            Suspend::Return(_) => "return",
        }
    }
}

impl From<CallbackSlot> for Suspend {
    fn from(slot: CallbackSlot) -> Self {
        Suspend::Callback(slot)
    }
}

impl From<Unit> for Suspend {
    fn from(unit: Unit) -> Self {
        Suspend::Nested(unit)
    }
}

//! # [`slot`]
//!
//! This module contains [`CallbackSlot`] and [`Callback`] for bridging callback-style APIs into the scheduler.
//!
//! # [`unit`]
//!
//! This module contains [`Unit`], the handle every invocation of a wrapped coroutine returns.

pub(crate) mod latch;
pub mod slot;
pub mod unit;

pub use slot::*;
pub use unit::*;

//! # [`coroutine`]
//!
//! This module contains a description of [`Resumable`], [`Step`] and [`Computation`] for working with the driver.
//! This module is used for low-level work with the driver.
//!
//! # [`yielding`]
//! This module contains [`Co`], the handle for the high-level working with the driver. For example, [`Co::wait`].
//!
//! # [`yield_status`]
//! This module contains a description of [`Suspend`] for low-level work with the driver.
//! Please use [`Co`] for working with the driver if it is possible.

pub mod coroutine;
pub mod yielding;
pub mod yield_status;

pub use coroutine::*;
pub use yielding::*;
pub use yield_status::*;

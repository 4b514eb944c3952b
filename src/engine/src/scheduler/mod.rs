//! # [`scheduler`]
//!
//! This module contains the event loop of the current thread: [`defer`], [`set_timeout`], [`spawn_blocking`],
//! [`run_until_idle`] and [`block_on`].
//!
//! # [`driver`]
//!
//! This module contains the driver that steps computations and completes their units.
//! It is used by [`Oroutine`](crate::Oroutine), [`run`](crate::run()) and [`spawn`](crate::spawn).

pub(crate) mod blocking_pool;
pub(crate) mod driver;
pub mod scheduler;

pub use scheduler::{block_on, defer, run_until_idle, set_timeout, spawn_blocking};
pub(crate) use scheduler::{next_turn, Task};

//! # monocle
//!
//! Write asynchronous code as a linear sequence of suspension points, driven on a single-threaded event loop.
//!
//! A coroutine body is an `async` block that suspends with [`Co::wait`] on a [`CallbackSlot`]
//! (the bridge to callback-style APIs) or on the [`Unit`] of another coroutine. Every invocation
//! returns a [`Unit`] that completes exactly once, errors travel through the same channel as values,
//! [`Co::ret`] returns early and [`Co::this`] gives the calling [`Context`] at every resumption point.
//!
//! ```ignore
//! use monocle::{o0, args, block_on, sleep, Value};
//! use std::time::Duration;
//!
//! let square = o0(|co, args| async move {
//!     let x: f64 = args.arg(0)?;
//!     co.wait(sleep(Duration::from_millis(500))).await?;
//!     Ok(Value::from(x * x))
//! });
//!
//! assert_eq!(block_on(square.call(args![4])), Ok(Value::from(16.0)));
//! ```

extern crate self as monocle;

pub mod args;
pub mod callback;
pub mod cfg;
pub mod coroutine;
pub mod error;
pub mod local;
pub mod macros;
pub mod run;
pub mod scheduler;
pub mod sleep;
pub mod utils;

pub use serde_json::{json, Value};
pub use args::Args;
pub use callback::{callback, Callback, CallbackSlot, Unit};
pub use coroutine::{Co, Computation, EarlyReturn, Resumable, Step, Suspend, Suspension};
pub use error::{Error, Outcome, Result};
pub use local::{current_context, Context};
pub use run::*;
pub use scheduler::{block_on, defer, run_until_idle, set_timeout, spawn_blocking};
pub use sleep::sleep;
pub use utils::{reset_unobserved_hook, set_unobserved_hook};
pub use monocle_proc::{oroutine, oroutine_test};

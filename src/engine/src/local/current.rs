use std::cell::RefCell;
use crate::local::context::Context;

thread_local! {
    /// Contexts of the computations being stepped on this thread, innermost last.
    ///
    /// A computation step can start another computation synchronously (a nested call), so this is a stack.
    static CURRENT_CONTEXT: RefCell<Vec<Context>> = const { RefCell::new(Vec::new()) };
}

/// Returns the context of the computation being stepped right now,
/// or [`Context::global`] outside of any computation.
pub fn current_context() -> Context {
    CURRENT_CONTEXT
        .with(|stack| stack.borrow().last().cloned())
        .unwrap_or_else(Context::global)
}

/// Makes `context` current until the guard is dropped.
pub(crate) fn enter(context: Context) -> Entered {
    CURRENT_CONTEXT.with(|stack| stack.borrow_mut().push(context));
    Entered { _private: () }
}

pub(crate) struct Entered {
    _private: (),
}

impl Drop for Entered {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

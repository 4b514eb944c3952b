use std::sync::{PoisonError, RwLock};
use tracing::error;
use crate::error::Error;

type Hook = Box<dyn Fn(&Error) + Send + Sync>;

static UNOBSERVED_HOOK: RwLock<Option<Hook>> = RwLock::new(None);

/// Sets the process-wide sink for failures nobody observed: a failed [`launch`](crate::launch),
/// or a failed [`Unit`](crate::Unit) dropped before anyone waited on it.
///
/// The hook must not call [`set_unobserved_hook`] itself.
///
/// # Example
///
/// ```ignore
/// set_unobserved_hook(|err| eprintln!("background coroutine failed: {err}"));
/// ```
pub fn set_unobserved_hook(hook: impl Fn(&Error) + Send + Sync + 'static) {
    *UNOBSERVED_HOOK.write().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(hook));
}

/// Restores the default sink, which logs with `tracing::error!`.
pub fn reset_unobserved_hook() {
    *UNOBSERVED_HOOK.write().unwrap_or_else(PoisonError::into_inner) = None;
}

pub(crate) fn report_unobserved(err: &Error) {
    let hook = UNOBSERVED_HOOK.read().unwrap_or_else(PoisonError::into_inner);
    match hook.as_ref() {
        Some(hook) => hook(err),
        None => error!(error = %err, "unobserved coroutine failure"),
    }
}

//! This module contains [`Error`] and [`Result`] shared by computation bodies, the driver and the event loop.
use serde_json::Value;
use thiserror::Error;

/// Everything that can make a coroutine fail.
///
/// Errors travel through the same channel as values: a failed suspension is fed back into the
/// suspended body as an `Err`, indistinguishable from one raised locally at that point.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Raised by a computation body (or by whatever fired the callback it waited on).
    #[error("{0}")]
    Raised(String),

    /// The wrapped unit was called with fewer arguments than its body reads.
    #[error("argument {index} is missing")]
    MissingArgument { index: usize },

    /// The argument exists but does not deserialize into the requested type.
    #[error("argument {index} has an unexpected shape: {reason}")]
    BadArgument { index: usize, reason: String },

    /// A result or context field could not be converted to or from [`Value`].
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// [`Co::invoke`](crate::coroutine::Co::invoke) found no method with this name on the context.
    #[error("context has no method `{0}`")]
    UnknownMethod(String),

    /// The body awaited a future that is not a suspension point of its own [`Co`](crate::coroutine::Co).
    #[error("the computation awaited a future that is not a suspension point")]
    ForeignAwait,

    /// The body polled a second suspension while the first one was still pending.
    #[error("the computation suspended on two points at once")]
    OverlappingSuspension,

    /// The computation was resumed after it had already finished.
    #[error("the computation was resumed after it finished")]
    Finished,

    /// The computation was started twice, or resumed before it was started.
    #[error("the computation is not suspended")]
    NotSuspended,

    /// A callback slot or unit was waited on a second time.
    #[error("the callback slot has already been waited on")]
    SlotReused,

    /// A job on the blocking pool panicked.
    #[error("blocking operation panicked: {0}")]
    BlockingPanicked(String),

    /// [`block_on`](crate::block_on) found the event loop idle while the unit was still pending.
    #[error("the event loop went idle before the unit completed")]
    Stalled,
}

impl Error {
    /// Creates [`Error::Raised`] with the message.
    pub fn raise(message: impl Into<String>) -> Self {
        Error::Raised(message.into())
    }

    /// The human-readable message of the error.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Conversion(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Raised(err.to_string())
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Error::Raised(message.to_string())
    }
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Error::Raised(message)
    }
}

/// The alias for [`std::result::Result`] with [`Error`] as the default error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The outcome of a suspension or of a whole computation.
pub type Outcome = Result<Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raised_keeps_message() {
        let err = Error::raise("foo bar baz");
        assert_eq!(err.message(), "foo bar baz");
        assert_eq!(err, Error::from("foo bar baz"));
    }

    #[test]
    fn test_from_serde() {
        let err: Error = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::MissingArgument { index: 2 }.to_string(), "argument 2 is missing");
        assert_eq!(Error::UnknownMethod("gen".into()).to_string(), "context has no method `gen`");
    }
}

//! This module contains [`Args`], the argument list an [`Oroutine`](crate::Oroutine) is called with.
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::error::{Error, Result};

/// Positional arguments of one invocation.
///
/// Use [`args!`](crate::args) to build it from anything convertible to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw argument.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns the argument deserialized into `T`.
    ///
    /// A missing argument is read as `null`, so `Option<T>` parameters may be omitted;
    /// for any other `T` it is [`Error::MissingArgument`].
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T> {
        let value = self.0.get(index).cloned().unwrap_or(Value::Null);
        let missing = index >= self.0.len();

        serde_json::from_value(value).map_err(|err| {
            if missing {
                Error::MissingArgument { index }
            } else {
                Error::BadArgument {
                    index,
                    reason: err.to_string(),
                }
            }
        })
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Value> for Args {
    /// An array becomes the argument list, anything else a single argument.
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => Self(values),
            other => Self(vec![other]),
        }
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Args {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Into<Value>> FromIterator<T> for Args {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

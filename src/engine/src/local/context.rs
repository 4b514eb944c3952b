//! This module contains [`Context`], the receiver a computation is bound to.
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use crate::error::{Error, Result};
use crate::run::Oroutine;

thread_local! {
    /// The default [`Context`] of this thread. It exists from the first use and is never torn down.
    static GLOBAL_CONTEXT: Context = Context::new();
}

#[derive(Default)]
struct ContextInner {
    fields: Map<String, Value>,
    methods: HashMap<String, Oroutine>,
}

/// The calling context (the `this` of a computation).
///
/// Cloning is cheap and yields a handle to the same object, so writes made by one computation
/// are seen by every other computation bound to it. The scheduler never mutates a context itself.
#[derive(Clone, Default)]
pub struct Context {
    inner: Rc<RefCell<ContextInner>>,
}

impl Context {
    /// Creates an empty [`Context`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a [`Context`] whose fields are the entries of a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                inner: Rc::new(RefCell::new(ContextInner {
                    fields,
                    methods: HashMap::new(),
                })),
            }),
            other => Err(Error::Conversion(format!("a context must be an object, got {other}"))),
        }
    }

    /// Returns the default context of the current thread.
    pub fn global() -> Context {
        GLOBAL_CONTEXT.with(Context::clone)
    }

    /// Returns a copy of the field.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().fields.get(key).cloned()
    }

    /// Returns the field deserialized into `T`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .get(key)
            .ok_or_else(|| Error::Conversion(format!("context has no field `{key}`")))?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sets the field, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.borrow_mut().fields.insert(key.into(), value.into())
    }

    /// Removes the field, returning it.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.inner.borrow_mut().fields.remove(key)
    }

    /// Returns a snapshot of all fields as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.inner.borrow().fields.clone())
    }

    /// Stores a method on the context. Invoked with [`Co::invoke`](crate::coroutine::Co::invoke),
    /// it runs bound to this context.
    pub fn define(&self, name: impl Into<String>, method: Oroutine) -> Option<Oroutine> {
        self.inner.borrow_mut().methods.insert(name.into(), method)
    }

    /// Returns the method stored under `name`.
    pub fn method(&self, name: &str) -> Option<Oroutine> {
        self.inner.borrow().methods.get(name).cloned()
    }

    /// Whether both handles point to the same context.
    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        let mut methods: Vec<&String> = inner.methods.keys().collect();
        methods.sort();
        f.debug_struct("Context")
            .field("fields", &inner.fields)
            .field("methods", &methods)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let ctx = Context::from_value(json!({ "foo": "bar" })).unwrap();
        assert_eq!(ctx.get("foo"), Some(json!("bar")));
        assert_eq!(ctx.field::<String>("foo").unwrap(), "bar");
        assert!(Context::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_clones_share_fields() {
        let ctx = Context::new();
        let other = ctx.clone();
        assert!(ctx.set("count", 1).is_none());
        assert_eq!(other.set("count", 2), Some(json!(1)));
        assert_eq!(ctx.field::<u32>("count").unwrap(), 2);
        assert!(ctx.ptr_eq(&other));
        assert!(!ctx.ptr_eq(&Context::new()));
    }

    #[test]
    fn test_missing_field() {
        let ctx = Context::new();
        assert!(matches!(ctx.field::<u32>("nope"), Err(Error::Conversion(_))));
        assert_eq!(ctx.remove("nope"), None);
        assert_eq!(ctx.to_value(), json!({}));
    }

    #[test]
    fn test_global_is_stable() {
        let global = Context::global();
        global.set("seen", true);
        assert!(Context::global().ptr_eq(&global));
        assert_eq!(Context::global().get("seen"), Some(json!(true)));
    }
}

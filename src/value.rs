//! Parsed values and the named argument bag handed to handlers.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// A parsed command-line value of any type.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (*self.inner).downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        (*self.inner).is::<T>()
    }

    /// Full type name of the payload, as reported by [`std::any::type_name`].
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.downcast_ref::<String>() {
            return write!(f, "{s:?}");
        }
        if let Some(b) = self.downcast_ref::<bool>() {
            return write!(f, "{b}");
        }
        if let Some(n) = self.downcast_ref::<i64>() {
            return write!(f, "{n}");
        }
        write!(f, "<{}>", short_type_name(self.type_name))
    }
}

/// Failures when a handler reads its arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("no argument named '{0}' was bound")]
    Missing(String),

    #[error("argument '{name}' holds a {found}, not a {expected}")]
    Type {
        name: String,
        expected: String,
        found: String,
    },
}

/// Arguments bound for one command level, keyed by parameter name.
#[derive(Debug, Clone, Default)]
pub struct Args {
    entries: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, replacing any earlier binding of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Borrow the argument `name` as a `T`.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, ArgError> {
        let value = self
            .value(name)
            .ok_or_else(|| ArgError::Missing(name.to_string()))?;
        value.downcast_ref::<T>().ok_or_else(|| ArgError::Type {
            name: name.to_string(),
            expected: short_type_name(std::any::type_name::<T>()),
            found: short_type_name(value.type_name()),
        })
    }

    /// Clone the argument `name` out as a `T`.
    pub fn cloned<T: Any + Clone>(&self, name: &str) -> Result<T, ArgError> {
        self.get::<T>(name).cloned()
    }

    pub fn flag(&self, name: &str) -> Result<bool, ArgError> {
        self.get::<bool>(name).copied()
    }

    pub fn string(&self, name: &str) -> Result<&str, ArgError> {
        self.get::<String>(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.value(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip module paths from a type name: `alloc::vec::Vec<my::Money>` becomes `Vec<Money>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
        } else if ch.is_alphanumeric() || ch == '_' {
            segment.push(ch);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(&segment);
    out
}

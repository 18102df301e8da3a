//! Error kinds that catch handlers are keyed by.

use std::any::TypeId;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use crate::value::short_type_name;

/// One catchable error type.
///
/// A raised error matches when it is an `E`, wraps one through `anyhow`
/// context, or has one anywhere in its `source()` chain.
#[derive(Clone)]
pub struct ErrorKind {
    id: TypeId,
    name: String,
    matches: fn(&anyhow::Error) -> bool,
}

impl ErrorKind {
    pub fn of<E: StdError + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: short_type_name(std::any::type_name::<E>()),
            matches: raised::<E>,
        }
    }

    /// Matches every error.
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<anyhow::Error>(),
            name: "any error".to_string(),
            matches: anything,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, err: &anyhow::Error) -> bool {
        (self.matches)(err)
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorKind").field(&self.name).finish()
    }
}

fn raised<E: StdError + Send + Sync + 'static>(err: &anyhow::Error) -> bool {
    find::<E>(err).is_some()
}

fn anything(_: &anyhow::Error) -> bool {
    true
}

/// Locate the `E` inside `err`, looking through context layers and sources.
pub(crate) fn find<E: StdError + Send + Sync + 'static>(err: &anyhow::Error) -> Option<&E> {
    err.downcast_ref::<E>()
        .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<E>()))
}

/// A union of error kinds handled by the same catch handler.
#[derive(Debug, Clone, Default)]
pub struct ErrorKinds {
    kinds: Vec<ErrorKind>,
}

impl ErrorKinds {
    /// An empty union; registering a catch handler with it fails.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of<E: StdError + Send + Sync + 'static>() -> Self {
        Self::new().or::<E>()
    }

    pub fn any() -> Self {
        Self {
            kinds: vec![ErrorKind::any()],
        }
    }

    pub fn or<E: StdError + Send + Sync + 'static>(mut self) -> Self {
        self.kinds.push(ErrorKind::of::<E>());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorKind> {
        self.kinds.iter()
    }
}

pub(crate) type CatchFn<T> = dyn Fn(anyhow::Error) -> anyhow::Result<T>;

/// A catch handler registered on a command for one error kind.
pub struct Catch<T> {
    kind: ErrorKind,
    handler: Rc<CatchFn<T>>,
}

impl<T> Catch<T> {
    pub(crate) fn new(kind: ErrorKind, handler: Rc<CatchFn<T>>) -> Self {
        Self { kind, handler }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn matches(&self, err: &anyhow::Error) -> bool {
        self.kind.matches(err)
    }

    pub(crate) fn handle(&self, err: anyhow::Error) -> anyhow::Result<T> {
        (self.handler)(err)
    }
}

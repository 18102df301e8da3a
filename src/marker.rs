//! Argument-kind markers: how a handler parameter shows up on the command line.
//!
//! ```
//! use mints::Marker;
//!
//! # fn main() -> Result<(), mints::ConfigError> {
//! let times = Marker::option().of::<u32>()?.describe("How many times.").short("t");
//! let loud = Marker::flag().describe("Shout it.");
//! let words = Marker::argument().list_of::<String>()?;
//! # let _ = (times, loud, words);
//! # Ok(())
//! # }
//! ```

use std::any::{Any, TypeId};
use std::fmt;

use crate::error::ConfigError;
use crate::value::{Value, short_type_name};

/// The three ways a parameter can appear on a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A positional slot, e.g. `1.txt` in `mv 1.txt 2.txt`.
    Argument,
    /// A named option carrying a value, e.g. `--times 3`.
    Option,
    /// A named boolean switch, e.g. `--short`.
    Flag,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Argument => "Argument",
            Kind::Option => "Option",
            Kind::Flag => "Flag",
        })
    }
}

/// Element type of an argument or option, and whether it takes a list of them.
#[derive(Debug, Clone)]
pub struct ValueType {
    id: TypeId,
    name: String,
    list: bool,
    collect: fn(Vec<Value>) -> Value,
}

impl ValueType {
    pub fn of<T: Any + Clone + Send + Sync>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
            list: false,
            collect: collect_vec::<T>,
        }
    }

    pub fn list_of<T: Any + Clone + Send + Sync>() -> Self {
        Self {
            list: true,
            ..Self::of::<T>()
        }
    }

    /// Type id of a single element.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Short name of a single element type, e.g. `i64` or `Money`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_list(&self) -> bool {
        self.list
    }

    /// Gather converted elements into a `Vec<T>` value.
    pub fn collect(&self, values: Vec<Value>) -> Value {
        (self.collect)(values)
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.list == other.list
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.list {
            write!(f, "Vec<{}>", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

fn collect_vec<T: Any + Clone + Send + Sync>(values: Vec<Value>) -> Value {
    let items: Vec<T> = values
        .iter()
        .filter_map(|value| value.downcast_ref::<T>().cloned())
        .collect();
    debug_assert_eq!(
        items.len(),
        values.len(),
        "list elements must all be {}",
        std::any::type_name::<T>()
    );
    Value::new(items)
}

/// Prefix setting of a marker. Validated when the grammar is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PrefixSpec {
    Default,
    Set(String),
    Unset,
}

/// Describes one handler parameter: its [`Kind`], help text, spelling and element type.
#[derive(Debug, Clone)]
pub struct Marker {
    kind: Kind,
    description: Option<String>,
    short: Option<String>,
    prefix: PrefixSpec,
    element: Option<ValueType>,
}

impl Marker {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            description: None,
            short: None,
            prefix: PrefixSpec::Default,
            element: None,
        }
    }

    pub fn argument() -> Self {
        Self::new(Kind::Argument)
    }

    pub fn option() -> Self {
        Self::new(Kind::Option)
    }

    pub fn flag() -> Self {
        Self::new(Kind::Flag)
    }

    /// Help text shown next to the parameter.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Short form, e.g. `"v"` for `-v`. Must be a single alphabetic character;
    /// this is checked when the grammar is compiled.
    pub fn short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    /// Prefix character replacing `-`, e.g. `"+"` for `+v` / `++verbose`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = PrefixSpec::Set(prefix.into());
        self
    }

    /// Explicitly clear the prefix. Such a marker never compiles.
    pub fn unset_prefix(mut self) -> Self {
        self.prefix = PrefixSpec::Unset;
        self
    }

    /// Convert values to `T`.
    pub fn of<T: Any + Clone + Send + Sync>(self) -> Result<Self, ConfigError> {
        self.typed(ValueType::of::<T>())
    }

    /// Accept zero or more values, each converted to `T`.
    pub fn list_of<T: Any + Clone + Send + Sync>(self) -> Result<Self, ConfigError> {
        self.typed(ValueType::list_of::<T>())
    }

    fn typed(mut self, element: ValueType) -> Result<Self, ConfigError> {
        if self.kind == Kind::Flag {
            return Err(ConfigError::TypedFlag);
        }
        if let Some(current) = &self.element {
            return Err(ConfigError::AlreadyTyped {
                kind: self.kind,
                current: current.to_string(),
            });
        }
        self.element = Some(element);
        Ok(self)
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn short_name(&self) -> Option<&str> {
        self.short.as_deref()
    }

    pub(crate) fn prefix_spec(&self) -> &PrefixSpec {
        &self.prefix
    }

    pub fn element(&self) -> Option<&ValueType> {
        self.element.as_ref()
    }

    /// The element type values convert to; `String` when untyped.
    pub fn value_type(&self) -> ValueType {
        self.element.clone().unwrap_or_else(ValueType::of::<String>)
    }
}

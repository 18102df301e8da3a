//! Registry of string-to-value converters for custom types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigError;
use crate::marker::ValueType;
use crate::value::{Value, short_type_name};

/// Turns one raw token into a value, or explains why it cannot.
pub type ConvertFn = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    type_name: String,
    name: String,
    convert: ConvertFn,
}

/// Maps a target type to the converter used for it.
///
/// ```
/// use mints::Converters;
///
/// #[derive(Clone, Debug, PartialEq)]
/// struct Money(u64);
///
/// fn dollars(raw: &str) -> Result<Money, String> {
///     raw.strip_prefix('$')
///         .and_then(|n| n.parse().ok())
///         .map(Money)
///         .ok_or_else(|| "expected $<amount>".to_string())
/// }
///
/// let mut converters = Converters::new();
/// converters.add(dollars).unwrap();
/// assert!(converters.add(dollars).is_err());
/// ```
#[derive(Clone, Default)]
pub struct Converters {
    entries: HashMap<TypeId, Entry>,
}

impl Converters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter function; its return type names the target type.
    pub fn add<V, E, F>(&mut self, convert: F) -> Result<&mut Self, ConfigError>
    where
        V: Any + Send + Sync,
        E: Display,
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    {
        let name = short_type_name(std::any::type_name::<F>());
        self.insert::<V>(name, move |raw| convert(raw).map(Value::new).map_err(|e| e.to_string()))
    }

    /// Register `V::from_str` as the converter for `V`.
    pub fn add_from_str<V>(&mut self) -> Result<&mut Self, ConfigError>
    where
        V: FromStr + Any + Send + Sync,
        V::Err: Display,
    {
        let name = short_type_name(std::any::type_name::<V>());
        self.insert::<V>(name, |raw| {
            raw.parse::<V>().map(Value::new).map_err(|e| e.to_string())
        })
    }

    fn insert<V: Any>(
        &mut self,
        name: String,
        convert: impl Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Result<&mut Self, ConfigError> {
        let type_name = short_type_name(std::any::type_name::<V>());
        if let Some(existing) = self.entries.get(&TypeId::of::<V>()) {
            return Err(ConfigError::DuplicateConverter {
                type_name,
                existing: existing.name.clone(),
            });
        }
        debug!(target_type = %type_name, converter = %name, "registered converter");
        self.entries.insert(
            TypeId::of::<V>(),
            Entry {
                type_name,
                name,
                convert: Arc::new(convert),
            },
        );
        Ok(self)
    }

    pub fn contains(&self, id: TypeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Name of the converter registered for `id`.
    pub fn converter_name(&self, id: TypeId) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The converter for one element of `kind`: a registered one first, then a
    /// built-in `FromStr` conversion. `None` when the type is unknown.
    pub fn resolve(&self, kind: &ValueType) -> Option<ConvertFn> {
        if let Some(entry) = self.entries.get(&kind.id()) {
            debug!(target_type = %entry.type_name, converter = %entry.name, "using registered converter");
            return Some(Arc::clone(&entry.convert));
        }
        builtin(kind.id())
    }
}

impl std::fmt::Debug for Converters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<(&str, &str)> = self
            .entries
            .values()
            .map(|entry| (entry.type_name.as_str(), entry.name.as_str()))
            .collect();
        names.sort();
        f.debug_struct("Converters").field("entries", &names).finish()
    }
}

fn builtin(id: TypeId) -> Option<ConvertFn> {
    macro_rules! from_str {
        ($($ty:ty),* $(,)?) => {
            $(
                if id == TypeId::of::<$ty>() {
                    let convert: ConvertFn = Arc::new(|raw: &str| {
                        raw.parse::<$ty>().map(Value::new).map_err(|e| e.to_string())
                    });
                    return Some(convert);
                }
            )*
        };
    }

    from_str!(
        String, PathBuf, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
        usize, f32, f64,
    );
    None
}

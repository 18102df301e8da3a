//! Handlers, their parameter descriptors, and the command tree built from them.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::catch::{Catch, CatchFn, ErrorKinds, find};
use crate::error::ConfigError;
use crate::marker::Marker;
use crate::value::{Args, Value};

/// Describes one handler parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    marker: Option<Marker>,
    default: Option<Value>,
}

impl Param {
    pub fn new(name: impl Into<String>, marker: Marker) -> Self {
        Self {
            name: name.into(),
            marker: Some(marker),
            default: None,
        }
    }

    pub fn argument(name: impl Into<String>) -> Self {
        Self::new(name, Marker::argument())
    }

    pub fn option(name: impl Into<String>) -> Self {
        Self::new(name, Marker::option())
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, Marker::flag())
    }

    /// A parameter without an argument kind. Compiling a grammar with it fails.
    pub fn unmarked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: None,
            default: None,
        }
    }

    /// Value used when the parameter is absent. Makes options optional;
    /// flags require a `bool`.
    pub fn default<V: Any + Send + Sync>(mut self, value: V) -> Self {
        self.default = Some(Value::new(value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marker(&self) -> Option<&Marker> {
        self.marker.as_ref()
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// What a handler receives when its command runs.
pub struct Call<T> {
    /// Arguments parsed for this command level.
    pub args: Args,
    /// The value returned by the parent command, if any.
    pub context: Option<T>,
}

type HandlerFn<T> = dyn Fn(Call<T>) -> anyhow::Result<T>;
type HelpFn<T> = dyn Fn(&Command<T>) -> String;

/// A named function together with its declared parameters.
pub struct Handler<T> {
    name: String,
    doc: Option<String>,
    params: Vec<Param>,
    func: Box<HandlerFn<T>>,
}

impl<T> Handler<T> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Call<T>) -> anyhow::Result<T> + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            params: Vec::new(),
            func: Box::new(func),
        }
    }

    /// Documentation text, used as the command description by default.
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn params_from(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documentation(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn call(&self, call: Call<T>) -> anyhow::Result<T> {
        (self.func)(call)
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// One level of the command tree.
///
/// ```
/// use mints::{Command, Handler, Param};
///
/// # fn main() -> Result<(), mints::ConfigError> {
/// let mut git = Command::new(Handler::new("git", |_| Ok(String::new())));
/// git.command(
///     Handler::new("fetch", |call| Ok(format!("fetching {}", call.args.string("remote")?)))
///         .param(Param::argument("remote")),
/// )?;
/// assert!(git.find_subcommand("fetch").is_some());
/// # Ok(())
/// # }
/// ```
pub struct Command<T> {
    handler: Handler<T>,
    name: String,
    description: Option<String>,
    subcommands: Vec<Command<T>>,
    help: Option<Box<HelpFn<T>>>,
    catches: Vec<Catch<T>>,
}

impl<T: 'static> Command<T> {
    pub fn new(handler: Handler<T>) -> Self {
        Self::with_name(handler, None, None)
    }

    /// Wrap `handler`, overriding the name and description it would provide.
    pub fn with_name(handler: Handler<T>, name: Option<String>, description: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| handler.name().to_string());
        let description = description.or_else(|| handler.documentation().map(str::to_string));
        Self {
            handler,
            name,
            description,
            subcommands: Vec::new(),
            help: None,
            catches: Vec::new(),
        }
    }

    /// Register a subcommand, executed right after this command.
    pub fn register_subcommand(
        &mut self,
        handler: Handler<T>,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<&mut Command<T>, ConfigError> {
        let command = Command::with_name(handler, name, description);
        if self.find_subcommand(&command.name).is_some() {
            return Err(ConfigError::DuplicateCommand {
                name: command.name,
                parent: self.name.clone(),
            });
        }
        debug!(parent = %self.name, command = %command.name, "registered subcommand");
        self.subcommands.push(command);
        let last = self.subcommands.len() - 1;
        Ok(&mut self.subcommands[last])
    }

    /// Register a subcommand named and described by its handler.
    pub fn command(&mut self, handler: Handler<T>) -> Result<&mut Command<T>, ConfigError> {
        self.register_subcommand(handler, None, None)
    }

    /// Replace the generated `--help` text of this command.
    pub fn set_help<F>(&mut self, renderer: F) -> &mut Self
    where
        F: Fn(&Command<T>) -> String + 'static,
    {
        self.help = Some(Box::new(renderer));
        self
    }

    /// Recover from any error in `kinds` raised by this command or its descendants.
    pub fn register_catch<F>(&mut self, kinds: ErrorKinds, handler: F) -> Result<&mut Self, ConfigError>
    where
        F: Fn(&anyhow::Error) -> anyhow::Result<T> + 'static,
    {
        self.insert_catch(kinds, Rc::new(move |err: anyhow::Error| handler(&err)))
    }

    /// Recover from an `E` raised by this command or its descendants.
    pub fn catch<E, F>(&mut self, handler: F) -> Result<&mut Self, ConfigError>
    where
        E: StdError + Send + Sync + 'static,
        F: Fn(&E) -> anyhow::Result<T> + 'static,
    {
        let wrapped = move |err: anyhow::Error| {
            if let Some(cause) = find::<E>(&err) {
                return handler(cause);
            }
            Err(err)
        };
        self.insert_catch(ErrorKinds::of::<E>(), Rc::new(wrapped))
    }

    fn insert_catch(&mut self, kinds: ErrorKinds, handler: Rc<CatchFn<T>>) -> Result<&mut Self, ConfigError> {
        if kinds.is_empty() {
            return Err(ConfigError::UntypedCatch {
                command: self.name.clone(),
            });
        }
        let mut seen = Vec::new();
        for kind in kinds.iter() {
            let taken = self.catches.iter().any(|catch| catch.kind().id() == kind.id());
            if taken || seen.contains(&kind.id()) {
                return Err(ConfigError::DuplicateCatch {
                    command: self.name.clone(),
                    error_type: kind.name().to_string(),
                });
            }
            seen.push(kind.id());
        }
        for kind in kinds.iter() {
            debug!(command = %self.name, error = kind.name(), "registered catch handler");
            self.catches.push(Catch::new(kind.clone(), Rc::clone(&handler)));
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn handler(&self) -> &Handler<T> {
        &self.handler
    }

    pub fn params(&self) -> &[Param] {
        self.handler.params()
    }

    pub fn subcommands(&self) -> impl Iterator<Item = &Command<T>> {
        self.subcommands.iter()
    }

    pub fn has_subcommands(&self) -> bool {
        !self.subcommands.is_empty()
    }

    pub fn find_subcommand(&self, name: &str) -> Option<&Command<T>> {
        self.subcommands.iter().find(|command| command.name == name)
    }

    pub fn find_subcommand_mut(&mut self, name: &str) -> Option<&mut Command<T>> {
        self.subcommands.iter_mut().find(|command| command.name == name)
    }

    /// The custom help text for this command, if a renderer is installed.
    pub fn custom_help(&self) -> Option<String> {
        self.help.as_ref().map(|render| render(self))
    }

    /// First catch handler on this command that takes `err`.
    pub fn catch_for(&self, err: &anyhow::Error) -> Option<&Catch<T>> {
        self.catches.iter().find(|catch| catch.matches(err))
    }

    pub(crate) fn invoke(&self, args: Args, context: Option<T>) -> anyhow::Result<T> {
        debug!(command = %self.name, args = args.len(), "invoking command");
        self.handler.call(Call { args, context })
    }
}

impl<T> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("handler", &self.handler)
            .field("subcommands", &self.subcommands)
            .field("catches", &self.catches.len())
            .finish()
    }
}

//! The `Cli` facade: owns the command tree and converters, parses tokens and
//! drives the handlers they select.

use std::any::Any;
use std::fmt::Display;
use std::str::FromStr;

use tracing::debug;

use crate::command::{Command, Handler};
use crate::convert::Converters;
use crate::error::{ConfigError, Error};
use crate::grammar::Grammar;
use crate::parser::{Invocation, Parser, StandardParser};

/// A command-line program built from handlers.
///
/// ```
/// use mints::{Cli, Handler, Marker, Param};
///
/// # fn main() -> Result<(), mints::Error> {
/// let cli = Cli::new(Handler::new("greet", |call| {
///     let name = call.args.string("name")?;
///     let times = call.args.get::<u32>("times")?;
///     let greeting = format!("hello {name}");
///     Ok(vec![greeting; *times as usize].join(" "))
/// })
/// .param(Param::argument("name"))
/// .param(Param::new("times", Marker::option().of::<u32>()?.short("t")).default(1u32)));
///
/// assert_eq!(cli.run(["bob", "-t", "2"])?, "hello bob hello bob");
/// assert_eq!(cli.run(["bob"])?, "hello bob");
/// assert_eq!(cli.run(["--times", "x", "bob"]).unwrap_err().abort().unwrap().code, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cli<T> {
    main: Command<T>,
    converters: Converters,
}

impl<T: 'static> Cli<T> {
    /// A CLI whose main command is `handler`.
    pub fn new(handler: Handler<T>) -> Self {
        Self::from_command(Command::new(handler))
    }

    /// A CLI around an already configured main command.
    pub fn from_command(main: Command<T>) -> Self {
        Self {
            main,
            converters: Converters::new(),
        }
    }

    pub fn main(&self) -> &Command<T> {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Command<T> {
        &mut self.main
    }

    /// Register a subcommand of the main command.
    pub fn command(&mut self, handler: Handler<T>) -> Result<&mut Command<T>, ConfigError> {
        self.main.command(handler)
    }

    /// Register a converter function for the type it returns.
    pub fn add_converter<V, E, F>(&mut self, convert: F) -> Result<&mut Self, ConfigError>
    where
        V: Any + Send + Sync,
        E: Display,
        F: Fn(&str) -> Result<V, E> + Send + Sync + 'static,
    {
        self.converters.add(convert)?;
        Ok(self)
    }

    /// Convert values of type `V` with its `FromStr` implementation.
    pub fn add_from_str<V>(&mut self) -> Result<&mut Self, ConfigError>
    where
        V: FromStr + Any + Send + Sync,
        V::Err: Display,
    {
        self.converters.add_from_str::<V>()?;
        Ok(self)
    }

    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    /// The default clap-backed parser for this CLI.
    pub fn parser(&self) -> StandardParser<'_, T> {
        StandardParser::new(&self.main, &self.converters)
    }

    /// Generated help text of the main command.
    pub fn render_help(&self) -> Result<String, ConfigError> {
        Ok(Grammar::compile(&self.main, &self.converters)?.render_help())
    }

    /// Parse `tokens` without running anything.
    pub fn parse<I, S>(&self, tokens: I) -> Result<Vec<Invocation>, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parser().parse(&collect(tokens))
    }

    /// Parse `tokens` (program name excluded) and run the selected commands.
    pub fn run<I, S>(&self, tokens: I) -> Result<T, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run_with(&self.parser(), tokens)
    }

    /// Like [`Cli::run`], with a custom parser producing the invocations.
    pub fn run_with<I, S>(&self, parser: &dyn Parser, tokens: I) -> Result<T, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocations = parser.parse(&collect(tokens))?;
        drive(&self.main, invocations)
    }

    /// Run against the arguments of the current process.
    pub fn run_env(&self) -> Result<T, Error> {
        let tokens = std::env::args_os()
            .skip(1)
            .map(|arg| arg.to_string_lossy().into_owned());
        self.run(tokens)
    }

    /// Run against the process arguments, exiting on any failure: help and
    /// usage errors with their own exit code, everything else with 1.
    pub fn execute(&self) -> T {
        match self.run_env() {
            Ok(value) => value,
            Err(err) => err.exit(),
        }
    }
}

fn collect<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tokens.into_iter().map(Into::into).collect()
}

/// Run each invocation's command in turn, feeding every return value to the
/// next command as its context. The last command's value is the result.
pub(crate) fn drive<T: 'static>(main: &Command<T>, invocations: Vec<Invocation>) -> Result<T, Error> {
    let mut invocations = invocations.into_iter();
    let mut invocation = invocations.next().ok_or(Error::NothingInvoked)?;
    let mut command = main;
    let mut chain = vec![main];
    let mut context = None;

    loop {
        let value = match command.invoke(invocation.args, context.take()) {
            Ok(value) => value,
            Err(err) => return recover(&chain, err),
        };
        let Some(name) = invocation.next else {
            return Ok(value);
        };
        command = command
            .find_subcommand(&name)
            .ok_or_else(|| Error::UnknownSubcommand {
                parent: command.name().to_string(),
                name: name.clone(),
            })?;
        chain.push(command);
        context = Some(value);
        invocation = invocations.next().ok_or(Error::MissingInvocation { command: name })?;
    }
}

/// Hand `err` to the nearest catch handler, from the failing command up to the root.
fn recover<T: 'static>(chain: &[&Command<T>], err: anyhow::Error) -> Result<T, Error> {
    for command in chain.iter().rev() {
        if let Some(catch) = command.catch_for(&err) {
            debug!(command = command.name(), error = catch.kind().name(), "caught handler error");
            return catch.handle(err).map_err(Error::Runtime);
        }
    }
    debug!(error = %err, "no catch handler matched");
    Err(Error::Runtime(err))
}

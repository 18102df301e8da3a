//! Error taxonomy: configuration mistakes, parser aborts, and handler failures.

use std::io::{self, Write};

use thiserror::Error;

use crate::marker::Kind;

/// Mistakes in how a CLI was described. Raised while registering commands,
/// converters or catch handlers, and while compiling the grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the parameter '{param}' of command '{command}' must have an argument kind")]
    MissingMarker { command: String, param: String },

    #[error("the parameter '{param}' of command '{command}' has an invalid name")]
    InvalidParamName { command: String, param: String },

    #[error("the parameter '{param}' is declared twice in command '{command}'")]
    DuplicateParam { command: String, param: String },

    #[error("argument '{param}' has an invalid short name '{short}': {reason}")]
    InvalidShort {
        param: String,
        short: String,
        reason: &'static str,
    },

    #[error("argument '{param}' has an invalid prefix '{prefix}': {reason}")]
    InvalidPrefix {
        param: String,
        prefix: String,
        reason: &'static str,
    },

    #[error("argument '{param}' is positional and cannot have a short name or a prefix")]
    PositionalSpelling { param: String },

    #[error("argument '{param}' of command '{command}' cannot follow the list argument '{list}'")]
    PositionalAfterList {
        command: String,
        param: String,
        list: String,
    },

    #[error("expected a `bool` default value for the flag '{param}' but got {found}")]
    FlagDefault { param: String, found: &'static str },

    #[error("argument '{param}' of command '{command}': conflicting option string: {option}")]
    ConflictingOption {
        command: String,
        param: String,
        option: String,
    },

    #[error("a command '{name}' has already been defined under '{parent}'")]
    DuplicateCommand { name: String, parent: String },

    #[error("cannot instantiate {kind} twice: it is already typed as {current}")]
    AlreadyTyped { kind: Kind, current: String },

    #[error("a flag cannot be typed: it is always a bool")]
    TypedFlag,

    #[error("a catch handler of command '{command}' must name at least one error type")]
    UntypedCatch { command: String },

    #[error("a catch handler for '{error_type}' has already been registered on command '{command}'")]
    DuplicateCatch { command: String, error_type: String },

    #[error("a converter for the type '{type_name}' has already been added (namely '{existing}')")]
    DuplicateConverter { type_name: String, existing: String },
}

/// Where an [`Abort`] message belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// The parser gave up: help was requested, or the tokens did not fit the grammar.
///
/// Carries the fully rendered message and the exit code the process should
/// terminate with (0 for help, non-zero for usage errors).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct Abort {
    pub code: i32,
    pub message: String,
    pub stream: Stream,
}

impl Abort {
    /// Whether the abort is a successful help request rather than a failure.
    pub fn is_help(&self) -> bool {
        self.code == 0
    }

    /// Write the message to its stream and terminate the process.
    pub fn exit(&self) -> ! {
        match self.stream {
            Stream::Stdout => io::stdout().write_all(self.message.as_bytes()),
            Stream::Stderr => io::stderr().write_all(self.message.as_bytes()),
        }
        .ok();
        std::process::exit(self.code)
    }
}

/// Everything a CLI run can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Abort(#[from] Abort),

    #[error("command '{parent}' has no subcommand named '{name}'")]
    UnknownSubcommand { parent: String, name: String },

    #[error("the parser produced no invocations")]
    NothingInvoked,

    #[error("the parser selected subcommand '{command}' but produced no invocation for it")]
    MissingInvocation { command: String },

    /// A handler failed and no catch handler along the command chain took it.
    #[error(transparent)]
    Runtime(anyhow::Error),
}

impl Error {
    /// The error a handler raised, if that is what this is.
    pub fn runtime(&self) -> Option<&anyhow::Error> {
        match self {
            Error::Runtime(err) => Some(err),
            _ => None,
        }
    }

    /// The parser abort, if that is what this is.
    pub fn abort(&self) -> Option<&Abort> {
        match self {
            Error::Abort(abort) => Some(abort),
            _ => None,
        }
    }

    /// The configuration mistake, if that is what this is.
    pub fn config(&self) -> Option<&ConfigError> {
        match self {
            Error::Config(err) => Some(err),
            _ => None,
        }
    }

    /// Report the error the way a command-line program should and terminate.
    pub fn exit(self) -> ! {
        match self {
            Error::Abort(abort) => abort.exit(),
            other => {
                eprintln!("error: {other:#}");
                std::process::exit(1)
            }
        }
    }
}

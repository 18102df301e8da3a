//! Declarative command-line programs.
//!
//! Handlers declare their parameters with argument-kind markers; the command
//! tree built from them compiles into a clap grammar, and each parse yields one
//! invocation per command level, executed from the main command downwards.

mod catch;
mod cli;
mod command;
mod convert;
mod error;
mod grammar;
mod help;
mod marker;
mod parser;
mod prefix;
mod value;

pub use catch::{Catch, ErrorKind, ErrorKinds};
pub use cli::Cli;
pub use command::{Call, Command, Handler, Param};
pub use convert::{ConvertFn, Converters};
pub use error::{Abort, ConfigError, Error, Stream};
pub use grammar::{DELIMITER, Grammar, discriminator};
pub use marker::{Kind, Marker, ValueType};
pub use parser::{Invocation, Parser, StandardParser, invocations};
pub use prefix::{Charset, DEFAULT_PREFIX};
pub use value::{ArgError, Args, Value, short_type_name};

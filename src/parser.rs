//! Turning command-line tokens into a sequence of invocations.

use tracing::debug;

use crate::command::Command;
use crate::convert::Converters;
use crate::error::Error;
use crate::grammar::{DELIMITER, Grammar};
use crate::value::{Args, Value};

/// Arguments bound for one level of the command tree, and the subcommand to
/// run after it (`None` for the last level).
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub args: Args,
    pub next: Option<String>,
}

/// Produces the invocation sequence for a token vector (program name excluded).
pub trait Parser {
    fn parse(&self, tokens: &[String]) -> Result<Vec<Invocation>, Error>;
}

/// The clap-backed parser used unless another one is supplied.
#[derive(Debug)]
pub struct StandardParser<'a, T> {
    main: &'a Command<T>,
    converters: &'a Converters,
}

impl<'a, T: 'static> StandardParser<'a, T> {
    pub fn new(main: &'a Command<T>, converters: &'a Converters) -> Self {
        Self { main, converters }
    }
}

impl<T: 'static> Parser for StandardParser<'_, T> {
    fn parse(&self, tokens: &[String]) -> Result<Vec<Invocation>, Error> {
        let grammar = Grammar::compile(self.main, self.converters)?;
        let matches = grammar.matches(tokens.to_vec())?;
        let invocations = invocations(grammar.fields(&matches));
        debug!(
            command = self.main.name(),
            tokens = tokens.len(),
            levels = invocations.len(),
            "built invocations"
        );
        Ok(invocations)
    }
}

/// Split an ordered field list at its discriminator keys.
///
/// Every key starting with `.` closes the current level: a `None` value ends the
/// walk, a subcommand name opens the next level.
pub fn invocations(fields: impl IntoIterator<Item = (String, Option<Value>)>) -> Vec<Invocation> {
    let mut invocations = vec![Invocation::default()];
    for (key, value) in fields {
        if key.starts_with(DELIMITER) {
            let Some(value) = value else {
                break;
            };
            let next = value
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_default();
            if let Some(current) = invocations.last_mut() {
                current.next = Some(next);
            }
            invocations.push(Invocation::default());
        } else if let (Some(value), Some(current)) = (value, invocations.last_mut()) {
            current.args.insert(key, value);
        }
    }
    invocations
}

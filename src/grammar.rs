//! Compiles a command tree into a clap grammar.
//!
//! Every handler parameter becomes one clap argument, every subcommand one clap
//! subcommand. Alongside the clap command the grammar keeps per-level slot
//! metadata, which is what turns clap's matches back into an ordered list of
//! named values.

use std::collections::{HashMap, HashSet};

use clap::{Arg, ArgAction, ArgMatches, ColorChoice};
use tracing::debug;

use crate::command::{Command, Param};
use crate::convert::Converters;
use crate::error::{Abort, ConfigError, Stream};
use crate::help;
use crate::marker::{Kind, Marker, PrefixSpec, ValueType};
use crate::prefix::{self, Charset, DEFAULT_PREFIX, Spellings};
use crate::value::Value;

/// Leading character of subcommand discriminator keys.
pub const DELIMITER: char = '.';

const HELP_SPELLINGS: [&str; 2] = ["-h", "--help"];

/// The discriminator key for the subcommand chosen below a level at `depth`
/// (0 for the main command): `.command`, `..command`, ...
pub fn discriminator(depth: usize) -> String {
    format!("{}command", DELIMITER.to_string().repeat(depth + 1))
}

/// How a parameter shows up on the command line once compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SlotKind {
    Positional {
        list: bool,
    },
    Named {
        short: Option<char>,
        prefix: char,
    },
    Flag {
        short: Option<char>,
        prefix: char,
        default: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct Slot {
    name: String,
    kind: SlotKind,
    value_type: ValueType,
    default: Option<Value>,
    /// False for list positionals shadowed by an earlier greedy one.
    bound: bool,
}

impl Slot {
    /// How the slot is written on the command line, e.g. `+v/++verbose`.
    fn usage(&self) -> String {
        let named = |short: Option<char>, prefix: char| match short {
            Some(short) => format!("{prefix}{short}/{prefix}{prefix}{}", self.name),
            None => format!("{prefix}{prefix}{}", self.name),
        };
        match self.kind {
            SlotKind::Positional { list: false } => format!("<{}>", self.name),
            SlotKind::Positional { list: true } => format!("<{}>...", self.name),
            SlotKind::Named { short, prefix } => format!("{} <{}>", named(short, prefix), self.value_type),
            SlotKind::Flag { short, prefix, .. } => named(short, prefix),
        }
    }

    fn extract(&self, matches: &ArgMatches) -> Option<Value> {
        if let SlotKind::Flag { default, .. } = self.kind {
            return Some(Value::new(matches.get_flag(&self.name) || default));
        }
        if !self.bound {
            return Some(self.value_type.collect(Vec::new()));
        }
        if self.value_type.is_list() {
            let values = matches
                .get_many::<Value>(&self.name)
                .map(|values| values.cloned().collect::<Vec<_>>());
            return match values {
                Some(values) => Some(self.value_type.collect(values)),
                None => self
                    .default
                    .clone()
                    .or_else(|| Some(self.value_type.collect(Vec::new()))),
            };
        }
        matches
            .get_one::<Value>(&self.name)
            .cloned()
            .or_else(|| self.default.clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Level {
    name: String,
    slots: Vec<Slot>,
    depth: usize,
    subcommands: Vec<Level>,
    /// Custom prefix spellings declared at this level only.
    spellings: Spellings,
    /// Spellings of this level's options that take the following token as value.
    valued: HashSet<String>,
}

impl Level {
    /// Rewrite custom prefix spellings, each token with the table of the level
    /// it falls in. A subcommand name switches levels unless it is an option value.
    fn rewrite(&self, tokens: Vec<String>) -> Vec<String> {
        let mut level = self;
        let mut rewritten = Vec::with_capacity(tokens.len());
        let mut pending_value = false;
        let mut tokens = tokens.into_iter();
        while let Some(token) = tokens.next() {
            if token == "--" {
                rewritten.push(token);
                rewritten.extend(tokens.by_ref());
                break;
            }
            if pending_value {
                pending_value = false;
                rewritten.push(token);
                continue;
            }
            if let Some(sub) = level.subcommands.iter().find(|sub| sub.name == token) {
                level = sub;
                rewritten.push(token);
                continue;
            }
            pending_value = level.valued.contains(&token);
            match level.spellings.rewrite_token(&token) {
                Some(internal) => rewritten.push(internal),
                None => rewritten.push(token),
            }
        }
        rewritten
    }

    fn collect_spellings(&self, into: &mut Spellings) {
        into.extend(&self.spellings);
        for sub in &self.subcommands {
            sub.collect_spellings(into);
        }
    }

    fn flatten(&self, matches: &ArgMatches, fields: &mut Vec<(String, Option<Value>)>) {
        for slot in &self.slots {
            if let Some(value) = slot.extract(matches) {
                fields.push((slot.name.clone(), Some(value)));
            }
        }
        if self.subcommands.is_empty() {
            return;
        }
        let key = discriminator(self.depth);
        match matches.subcommand() {
            Some((name, sub_matches)) => {
                fields.push((key, Some(Value::new(name.to_string()))));
                if let Some(level) = self.subcommands.iter().find(|level| level.name == name) {
                    level.flatten(sub_matches, fields);
                }
            }
            None => fields.push((key, None)),
        }
    }
}

/// A compiled command tree, ready to match token vectors.
#[derive(Debug, Clone)]
pub struct Grammar {
    command: clap::Command,
    root: Level,
    /// Every custom spelling in the tree, for mapping rendered text back.
    spellings: Spellings,
}

impl Grammar {
    /// Validate `main` and its subcommands and build the clap grammar for them.
    pub fn compile<T: 'static>(main: &Command<T>, converters: &Converters) -> Result<Self, ConfigError> {
        let (command, root) = compile_level(main, converters, 0)?;
        let mut spellings = Spellings::default();
        root.collect_spellings(&mut spellings);
        let command = command.bin_name(main.name().to_string());
        let custom_prefixes = !spellings.is_empty();
        debug!(command = main.name(), custom_prefixes, "compiled grammar");
        Ok(Self {
            command,
            root,
            spellings,
        })
    }

    /// Match `tokens` (without the program name). Help requests and usage
    /// errors come back as an [`Abort`] carrying clap's rendered message.
    pub fn matches(&self, tokens: Vec<String>) -> Result<ArgMatches, Abort> {
        let tokens = self.root.rewrite(tokens);
        self.command
            .clone()
            .try_get_matches_from(tokens)
            .map_err(|err| self.abort(&err))
    }

    /// Ordered `(name, value)` fields for every matched level. Each level's
    /// parameters come first, then its discriminator key holding the chosen
    /// subcommand name (or `None`), then the chosen subcommand's fields.
    pub fn fields(&self, matches: &ArgMatches) -> Vec<(String, Option<Value>)> {
        let mut fields = Vec::new();
        self.root.flatten(matches, &mut fields);
        fields
    }

    /// Generated help for the main command.
    pub fn render_help(&self) -> String {
        let rendered = self.command.clone().render_help().to_string();
        self.spellings.restore(&rendered)
    }

    /// The underlying clap command.
    pub fn clap(&self) -> &clap::Command {
        &self.command
    }

    fn abort(&self, err: &clap::Error) -> Abort {
        let stream = if err.use_stderr() {
            Stream::Stderr
        } else {
            Stream::Stdout
        };
        let message = self.spellings.restore(&err.render().to_string());
        debug!(kind = ?err.kind(), code = err.exit_code(), "parser aborted");
        Abort {
            code: err.exit_code(),
            message,
            stream,
        }
    }
}

/// Option strings taken at one level, mapped to the parameter holding them.
struct Taken {
    command: String,
    owners: HashMap<String, String>,
}

impl Taken {
    fn new(command: &str) -> Self {
        let owners = HELP_SPELLINGS
            .iter()
            .map(|spelling| (spelling.to_string(), "help".to_string()))
            .collect();
        Self {
            command: command.to_string(),
            owners,
        }
    }

    fn claim(&mut self, param: &str, option: String) -> Result<(), ConfigError> {
        if self.owners.contains_key(&option) {
            return Err(ConfigError::ConflictingOption {
                command: self.command.clone(),
                param: param.to_string(),
                option,
            });
        }
        self.owners.insert(option, param.to_string());
        Ok(())
    }
}

fn compile_level<T: 'static>(
    command: &Command<T>,
    converters: &Converters,
    depth: usize,
) -> Result<(clap::Command, Level), ConfigError> {
    let charset = charset(command)?;
    let mut cmd = clap::Command::new(command.name().to_string())
        .color(ColorChoice::Never)
        .no_binary_name(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .args_override_self(true);
    cmd = help::describe(cmd, command);

    let mut taken = Taken::new(command.name());
    let mut names = HashSet::new();
    let mut greedy: Option<String> = None;
    let mut slots = Vec::with_capacity(command.params().len());
    let mut spellings = Spellings::default();
    let mut valued = HashSet::new();

    for param in command.params() {
        check_name(command, param, &mut names)?;
        let marker = param.marker().ok_or_else(|| ConfigError::MissingMarker {
            command: command.name().to_string(),
            param: param.name().to_string(),
        })?;
        let name = param.name().to_string();
        let mut arg = Arg::new(name.clone());
        if let Some(description) = marker.description() {
            arg = arg.help(help::param_help(description));
        }

        let slot = match marker.kind() {
            Kind::Argument => {
                check_positional(param, marker)?;
                let value_type = marker.value_type();
                let list = value_type.is_list();
                if let Some(first) = &greedy {
                    if !list {
                        return Err(ConfigError::PositionalAfterList {
                            command: command.name().to_string(),
                            param: name,
                            list: first.clone(),
                        });
                    }
                    slots.push(Slot {
                        name,
                        kind: SlotKind::Positional { list },
                        value_type,
                        default: param.default_value().cloned(),
                        bound: false,
                    });
                    continue;
                }
                arg = arg
                    .action(ArgAction::Set)
                    .allow_negative_numbers(true)
                    .value_parser(value_parser(&value_type, converters));
                arg = if list {
                    greedy = Some(name.clone());
                    arg.num_args(0..).required(false)
                } else {
                    arg.required(true)
                };
                if !charset.contains(DEFAULT_PREFIX) {
                    arg = arg.allow_hyphen_values(true);
                }
                Slot {
                    name,
                    kind: SlotKind::Positional { list },
                    value_type,
                    default: param.default_value().cloned(),
                    bound: true,
                }
            }
            Kind::Flag => {
                let short = prefix::short_of(param.name(), marker.short_name())?;
                let prefix = prefix::prefix_of(param.name(), marker.prefix_spec())?;
                let default = flag_default(param)?;
                arg = spell(
                    arg.action(ArgAction::SetTrue),
                    param.name(),
                    short,
                    prefix,
                    false,
                    &mut taken,
                    &mut spellings,
                )?;
                Slot {
                    name,
                    kind: SlotKind::Flag {
                        short,
                        prefix,
                        default,
                    },
                    value_type: ValueType::of::<bool>(),
                    default: Some(Value::new(default)),
                    bound: true,
                }
            }
            Kind::Option => {
                let short = prefix::short_of(param.name(), marker.short_name())?;
                let prefix = prefix::prefix_of(param.name(), marker.prefix_spec())?;
                let value_type = marker.value_type();
                arg = arg
                    .action(ArgAction::Set)
                    .value_name(name.to_uppercase())
                    .allow_negative_numbers(true)
                    .value_parser(value_parser(&value_type, converters))
                    .required(param.default_value().is_none());
                if value_type.is_list() {
                    arg = arg.num_args(0..);
                }
                arg = spell(arg, param.name(), short, prefix, true, &mut taken, &mut spellings)?;
                valued.insert(format!("{prefix}{prefix}{name}"));
                valued.extend(short.map(|short| format!("{prefix}{short}")));
                Slot {
                    name,
                    kind: SlotKind::Named { short, prefix },
                    value_type,
                    default: param.default_value().cloned(),
                    bound: true,
                }
            }
        };
        debug!(command = command.name(), slot = %slot.usage(), "compiled parameter");
        cmd = cmd.arg(arg);
        slots.push(slot);
    }

    let mut subcommands = Vec::new();
    for sub in command.subcommands() {
        let (sub_cmd, level) = compile_level(sub, converters, depth + 1)?;
        cmd = cmd.subcommand(sub_cmd);
        subcommands.push(level);
    }

    debug!(
        command = command.name(),
        depth,
        prefixes = %charset.as_string(),
        slots = slots.len(),
        subcommands = subcommands.len(),
        "compiled command level"
    );
    Ok((
        cmd,
        Level {
            name: command.name().to_string(),
            slots,
            depth,
            subcommands,
            spellings,
            valued,
        },
    ))
}

/// Prefix characters of all named parameters at this level, validated.
fn charset<T: 'static>(command: &Command<T>) -> Result<Charset, ConfigError> {
    let mut prefixes = Vec::new();
    for param in command.params() {
        match param.marker() {
            Some(marker) if marker.kind() != Kind::Argument => {
                prefixes.push(prefix::prefix_of(param.name(), marker.prefix_spec())?);
            }
            _ => prefixes.push(DEFAULT_PREFIX),
        }
    }
    Ok(Charset::new(prefixes))
}

fn check_name<T: 'static>(
    command: &Command<T>,
    param: &Param,
    names: &mut HashSet<String>,
) -> Result<(), ConfigError> {
    let name = param.name();
    if name.is_empty() || name.starts_with(DELIMITER) || name.starts_with('-') {
        return Err(ConfigError::InvalidParamName {
            command: command.name().to_string(),
            param: name.to_string(),
        });
    }
    if !names.insert(name.to_string()) {
        return Err(ConfigError::DuplicateParam {
            command: command.name().to_string(),
            param: name.to_string(),
        });
    }
    Ok(())
}

fn check_positional(param: &Param, marker: &Marker) -> Result<(), ConfigError> {
    let custom_prefix = match marker.prefix_spec() {
        PrefixSpec::Default => false,
        PrefixSpec::Set(prefix) => prefix.as_str() != "-",
        PrefixSpec::Unset => true,
    };
    if marker.short_name().is_some() || custom_prefix {
        return Err(ConfigError::PositionalSpelling {
            param: param.name().to_string(),
        });
    }
    Ok(())
}

fn flag_default(param: &Param) -> Result<bool, ConfigError> {
    match param.default_value() {
        None => Ok(false),
        Some(value) => value.downcast_ref::<bool>().copied().ok_or_else(|| ConfigError::FlagDefault {
            param: param.name().to_string(),
            found: value.type_name(),
        }),
    }
}

/// Register the long and short spellings of a named parameter.
fn spell(
    mut arg: Arg,
    param: &str,
    short: Option<char>,
    prefix: char,
    takes_value: bool,
    taken: &mut Taken,
    spellings: &mut Spellings,
) -> Result<Arg, ConfigError> {
    let long = format!("{prefix}{prefix}{param}");
    let short_form = short.map(|short| format!("{prefix}{short}"));

    if prefix == DEFAULT_PREFIX {
        taken.claim(param, long)?;
        arg = arg.long(param.to_string());
        if let (Some(short), Some(form)) = (short, short_form) {
            taken.claim(param, form)?;
            arg = arg.short(short);
        }
        return Ok(arg);
    }

    // clap sees `--{long}`; that spelling must not shadow a `-` prefixed option.
    taken.claim(param, long.clone())?;
    taken.claim(param, format!("--{long}"))?;
    arg = arg.long(long.clone());
    spellings.add(long.clone(), &long, false);
    if let Some(form) = short_form {
        taken.claim(param, form.clone())?;
        taken.claim(param, format!("--{form}"))?;
        arg = arg.visible_alias(form.clone());
        spellings.add(form.clone(), &form, takes_value);
    }
    Ok(arg)
}

fn value_parser(
    value_type: &ValueType,
    converters: &Converters,
) -> impl Fn(&str) -> Result<Value, String> + Clone + Send + Sync + 'static + use<> {
    let convert = converters.resolve(value_type);
    let type_name = value_type.name().to_string();
    move |raw: &str| {
        let invalid = format!("invalid {type_name} value: '{raw}'");
        let Some(convert) = &convert else {
            return Err(invalid);
        };
        convert(raw).map_err(|reason| {
            if reason.is_empty() {
                invalid
            } else {
                format!("{invalid} ({reason})")
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Handler;
    use pretty_assertions::assert_eq;

    fn main_with(params: Vec<Param>) -> Command<()> {
        Command::new(Handler::new("main", |_| Ok(())).params_from(params))
    }

    fn compile(command: &Command<()>) -> Result<Grammar, ConfigError> {
        Grammar::compile(command, &Converters::new())
    }

    fn tokens(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    fn field_names(grammar: &Grammar, raw: &str) -> Vec<String> {
        let matches = grammar.matches(tokens(raw)).unwrap();
        grammar.fields(&matches).into_iter().map(|(name, _)| name).collect()
    }

    #[test]
    fn discriminators_grow_with_depth() {
        assert_eq!(discriminator(0), ".command");
        assert_eq!(discriminator(2), "...command");
    }

    #[test]
    fn missing_marker_names_the_param() {
        let err = compile(&main_with(vec![Param::unmarked("a")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingMarker {
                command: "main".into(),
                param: "a".into(),
            }
        );
    }

    #[test]
    fn reserved_help_spellings_conflict() {
        let marker = Marker::flag().short("h");
        let err = compile(&main_with(vec![Param::new("hint", marker)])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ConflictingOption {
                command: "main".into(),
                param: "hint".into(),
                option: "-h".into(),
            }
        );
    }

    #[test]
    fn shared_first_letters_do_not_collide() {
        let command = main_with(vec![Param::flag("verbose"), Param::flag("version")]);
        assert!(compile(&command).is_ok());
    }

    #[test]
    fn duplicate_and_invalid_names_are_rejected() {
        let err = compile(&main_with(vec![Param::flag("a"), Param::option("a")])).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateParam { .. }), "{err}");

        let err = compile(&main_with(vec![Param::flag(".command")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParamName { .. }), "{err}");
    }

    #[test]
    fn flag_default_must_be_bool() {
        let err = compile(&main_with(vec![Param::flag("a").default(1i64)])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::FlagDefault {
                param: "a".into(),
                found: "i64",
            }
        );
    }

    #[test]
    fn positionals_reject_spelling() {
        let marker = Marker::argument().short("a");
        let err = compile(&main_with(vec![Param::new("a", marker)])).unwrap_err();
        assert_eq!(err, ConfigError::PositionalSpelling { param: "a".into() });
    }

    #[test]
    fn scalar_after_list_is_rejected() {
        let list = Marker::argument().list_of::<String>().unwrap();
        let err = compile(&main_with(vec![Param::new("xs", list), Param::argument("y")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PositionalAfterList {
                command: "main".into(),
                param: "y".into(),
                list: "xs".into(),
            }
        );
    }

    #[test]
    fn fields_follow_declaration_order_then_discriminators() {
        let mut main = main_with(vec![Param::flag("debug")]);
        main.command(Handler::new("first", |_| Ok(())).param(Param::argument("x")))
            .unwrap()
            .command(Handler::new("second", |_| Ok(())))
            .unwrap();
        let grammar = compile(&main).unwrap();

        assert_eq!(
            field_names(&grammar, "first 1"),
            vec!["debug", ".command", "x", "..command"]
        );
        assert_eq!(field_names(&grammar, ""), vec!["debug", ".command"]);
    }

    #[test]
    fn custom_prefix_round_trips_through_clap() {
        let marker = Marker::option().prefix("+").short("n");
        let grammar = compile(&main_with(vec![Param::new("name", marker)])).unwrap();

        for raw in ["++name bob", "+n bob", "+nbob", "++name=bob"] {
            let matches = grammar.matches(tokens(raw)).unwrap();
            let fields = grammar.fields(&matches);
            let value = fields[0].1.as_ref().unwrap();
            assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("bob"), "{raw}");
        }

        let abort = grammar.matches(tokens("--name bob")).unwrap_err();
        assert_eq!(abort.code, 2);
        assert!(abort.message.contains("unexpected argument '--name'"), "{}", abort.message);
        assert!(!abort.message.contains("--++"), "{}", abort.message);
    }

    #[test]
    fn custom_spellings_apply_only_at_their_level() {
        let mut main = main_with(vec![Param::argument("word")]);
        main.command(
            Handler::new("sub", |_| Ok(()))
                .param(Param::new("name", Marker::option().prefix("+").short("n"))),
        )
        .unwrap();
        let grammar = compile(&main).unwrap();

        assert_eq!(
            grammar.root.rewrite(tokens("+nothing sub +n bob")),
            tokens("+nothing sub --+n bob")
        );
        assert_eq!(
            grammar.root.rewrite(tokens("w sub ++name=x -- +n")),
            tokens("w sub --++name=x -- +n")
        );
    }

    #[test]
    fn option_values_do_not_switch_levels() {
        let mut main = main_with(vec![Param::option("mode")]);
        main.command(Handler::new("sub", |_| Ok(())).param(Param::new("x", Marker::flag().prefix("+"))))
            .unwrap();
        let grammar = compile(&main).unwrap();

        assert_eq!(
            grammar.root.rewrite(tokens("--mode sub ++x")),
            tokens("--mode sub ++x")
        );
        assert_eq!(
            grammar.root.rewrite(tokens("--mode=a sub ++x")),
            tokens("--mode=a sub --++x")
        );
    }

    #[test]
    fn help_is_an_abort_on_stdout() {
        let grammar = compile(&main_with(vec![Param::flag("debug")])).unwrap();
        let abort = grammar.matches(tokens("--help")).unwrap_err();
        assert_eq!(abort.code, 0);
        assert_eq!(abort.stream, Stream::Stdout);
        assert!(abort.message.contains("Usage: main [OPTIONS]"), "{}", abort.message);
    }
}

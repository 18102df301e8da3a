use mints::{Args, Cli, Error, Handler, Marker, Param};
use pretty_assertions::assert_eq;

fn echo(params: Vec<Param>) -> Cli<Args> {
    Cli::new(Handler::new("main", |call| Ok(call.args)).params_from(params))
}

fn run(cli: &Cli<Args>, line: &str) -> Result<Args, Error> {
    cli.run(line.split_whitespace())
}

fn value(cli: &Cli<Args>, line: &str, name: &str) -> String {
    run(cli, line).unwrap().string(name).unwrap().to_string()
}

fn usage_error(cli: &Cli<Args>, line: &str) -> String {
    let err = run(cli, line).unwrap_err();
    let abort = err.abort().unwrap_or_else(|| panic!("expected an abort, got {err:?}"));
    assert_eq!(abort.code, 2);
    abort.message.clone()
}

#[test]
fn one_opt() {
    assert_eq!(value(&echo(vec![Param::option("x")]), "--x 1", "x"), "1");
    assert_eq!(value(&echo(vec![Param::option("x")]), "--x=1", "x"), "1");
}

#[test]
fn one_opt_with_description() {
    let cli = echo(vec![Param::new("x", Marker::option().describe("Description."))]);
    assert_eq!(value(&cli, "--x 1", "x"), "1");
}

#[test]
fn default_is_used_only_when_absent() {
    let cli = echo(vec![Param::option("x").default(String::from("2"))]);
    assert_eq!(value(&cli, "--x 1", "x"), "1");
    assert_eq!(value(&cli, "", "x"), "2");
}

#[test]
fn required_when_no_default() {
    let message = usage_error(&echo(vec![Param::option("x")]), "");
    assert!(message.contains("--x <X>"), "{message}");
}

#[test]
fn unknown_option_is_rejected() {
    let cli = echo(vec![Param::option("x").default(String::from("2"))]);
    let message = usage_error(&cli, "--y 1");
    assert!(message.contains("unexpected argument '--y'"), "{message}");
}

#[test]
fn opt_without_value() {
    usage_error(&echo(vec![Param::option("x")]), "--x");
    usage_error(&echo(vec![Param::option("x")]), "--x --y");
}

#[test]
fn two_opts_in_any_order() {
    let cli = echo(vec![Param::option("x"), Param::option("y")]);
    for line in ["--x 1 --y 2", "--y 2 --x 1"] {
        let args = run(&cli, line).unwrap();
        assert_eq!((args.string("x").unwrap(), args.string("y").unwrap()), ("1", "2"));
    }
}

#[test]
fn opt_before_flag_and_arg() {
    let args = run(&echo(vec![Param::option("x"), Param::flag("y")]), "--x 1 --y").unwrap();
    assert_eq!((args.string("x").unwrap(), args.flag("y").unwrap()), ("1", true));

    let args = run(&echo(vec![Param::option("x"), Param::argument("y")]), "--x 1 2").unwrap();
    assert_eq!((args.string("x").unwrap(), args.string("y").unwrap()), ("1", "2"));
}

#[test]
fn explicit_short() {
    let cli = echo(vec![Param::new("x", Marker::option().short("y"))]);
    assert_eq!(value(&cli, "-y 1", "x"), "1");
    assert_eq!(value(&cli, "-y1", "x"), "1");
}

#[test]
fn no_implicit_short() {
    usage_error(&echo(vec![Param::option("xyz")]), "-x 1");
}

#[test]
fn last_value_wins() {
    assert_eq!(value(&echo(vec![Param::option("x")]), "--x 1 --x 2", "x"), "2");
}

#[test]
fn custom_prefix_with_short_and_attached_value() {
    let cli = echo(vec![Param::new("name", Marker::option().prefix("+").short("n"))]);
    for line in ["++name bob", "++name=bob", "+n bob", "+nbob"] {
        assert_eq!(value(&cli, line, "name"), "bob", "{line}");
    }
    let message = usage_error(&cli, "");
    assert!(message.contains("++name <NAME>"), "{message}");
    assert!(!message.contains("--++name"), "{message}");
}

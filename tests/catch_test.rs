use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use mints::{Cli, ConfigError, ErrorKinds, Handler};
use pretty_assertions::assert_eq;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("bad value {0}")]
struct BadValue(i64);

#[derive(Debug, Error)]
#[error("not found")]
struct NotFound;

fn failing(name: &str) -> Handler<String> {
    Handler::new(name, |_| Err(BadValue(7)).context("while loading"))
}

fn returning(name: &str) -> Handler<String> {
    let value = name.to_string();
    Handler::new(name, move |_| Ok(value.clone()))
}

#[test]
fn uncaught_error_surfaces_unchanged() {
    let cli = Cli::new(failing("main"));
    let err = cli.run(Vec::<String>::new()).unwrap_err();
    let runtime = err.runtime().expect("handler error");
    assert_eq!(runtime.to_string(), "while loading");
    assert!(runtime.downcast_ref::<BadValue>().is_some());
}

#[test]
fn catch_on_failing_command() {
    let mut cli = Cli::new(failing("main"));
    cli.main_mut()
        .catch::<BadValue, _>(|err| Ok(format!("recovered {}", err.0)))
        .unwrap();
    assert_eq!(cli.run(Vec::<String>::new()).unwrap(), "recovered 7");
}

#[test]
fn catch_on_ancestor_stops_the_chain() {
    let ran = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&ran);
    let mut cli = Cli::new(returning("main"));
    cli.main_mut()
        .catch::<BadValue, _>(|_| Ok("caught by main".into()))
        .unwrap();
    cli.command(failing("first"))
        .unwrap()
        .command(Handler::new("second", move |_| {
            log.borrow_mut().push("second");
            Ok("second".to_string())
        }))
        .unwrap();

    assert_eq!(cli.run(["first", "second"]).unwrap(), "caught by main");
    assert!(ran.borrow().is_empty());
}

#[test]
fn nearest_catch_wins() {
    let mut cli = Cli::new(returning("main"));
    cli.main_mut()
        .catch::<BadValue, _>(|_| Ok("main".into()))
        .unwrap();
    cli.command(returning("first"))
        .unwrap()
        .catch::<BadValue, _>(|_| Ok("first".into()))
        .unwrap()
        .command(failing("second"))
        .unwrap();

    assert_eq!(cli.run(["first", "second"]).unwrap(), "first");
}

#[test]
fn unrelated_catch_does_not_match() {
    let mut cli = Cli::new(failing("main"));
    cli.main_mut()
        .catch::<NotFound, _>(|_| Ok("not found".into()))
        .unwrap();
    assert!(cli.run(Vec::<String>::new()).unwrap_err().runtime().is_some());
}

#[test]
fn union_and_catch_all() {
    let mut cli = Cli::new(failing("main"));
    cli.main_mut()
        .register_catch(ErrorKinds::of::<NotFound>().or::<BadValue>(), |err| {
            Ok(format!("union: {err:#}"))
        })
        .unwrap();
    assert_eq!(
        cli.run(Vec::<String>::new()).unwrap(),
        "union: while loading: bad value 7"
    );

    let mut cli = Cli::new(Handler::new("main", |_| anyhow::bail!("plain message")));
    cli.main_mut()
        .register_catch(ErrorKinds::any(), |err| Ok(format!("any: {err}")))
        .unwrap();
    assert_eq!(cli.run(Vec::<String>::new()).unwrap(), "any: plain message");
}

#[test]
fn registration_errors() {
    let mut cli = Cli::new(returning("main"));
    let err = cli
        .main_mut()
        .register_catch(ErrorKinds::new(), |_| Ok(String::new()))
        .unwrap_err();
    assert_eq!(err, ConfigError::UntypedCatch { command: "main".into() });

    cli.main_mut()
        .catch::<BadValue, _>(|_| Ok(String::new()))
        .unwrap();
    let err = cli
        .main_mut()
        .catch::<BadValue, _>(|_| Ok(String::new()))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::DuplicateCatch {
            command: "main".into(),
            error_type: "BadValue".into(),
        }
    );
}

#[test]
fn usage_errors_are_never_caught() {
    let mut cli = Cli::new(returning("main"));
    cli.main_mut()
        .register_catch(ErrorKinds::any(), |_| Ok("caught".into()))
        .unwrap();
    assert!(cli.run(["--nope"]).unwrap_err().abort().is_some());
}

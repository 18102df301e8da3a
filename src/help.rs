//! Help text attached to compiled commands.

use tracing::debug;

use crate::command::Command;

/// Help text for a parameter. Whitespace-only descriptions render empty.
pub(crate) fn param_help(description: &str) -> String {
    if description.trim().is_empty() {
        String::new()
    } else {
        description.to_string()
    }
}

/// Attach the description and any custom help renderer of `command` to `cmd`.
pub(crate) fn describe<T: 'static>(mut cmd: clap::Command, command: &Command<T>) -> clap::Command {
    if let Some(description) = command.description() {
        cmd = cmd.about(description.to_string());
    }
    if let Some(text) = command.custom_help() {
        debug!(command = command.name(), "installed custom help");
        cmd = cmd.override_help(text);
    }
    cmd
}

//! Command events.

use crate::cause::Cause;
use crate::event::CancelFlag;
use crate::impl_cancellable_event;

/// Fired before a command line is executed.
///
/// Listeners may rewrite the command and its arguments; the originals stay
/// available for logging.
#[derive(Debug)]
pub struct ExecuteCommandEvent {
    cause: Cause,
    cancelled: CancelFlag,
    original_command: String,
    original_arguments: String,
    command: String,
    arguments: String,
}

impl_cancellable_event!(ExecuteCommandEvent);

impl ExecuteCommandEvent {
    pub fn new(cause: Cause, command: &str, arguments: &str) -> Self {
        Self {
            cause,
            cancelled: CancelFlag::default(),
            original_command: command.to_string(),
            original_arguments: arguments.to_string(),
            command: command.to_string(),
            arguments: arguments.to_string(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn set_command(&mut self, command: &str) {
        self.command = command.to_string();
    }

    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    pub fn set_arguments(&mut self, arguments: &str) {
        self.arguments = arguments.to_string();
    }

    pub fn original_command(&self) -> &str {
        &self.original_command
    }

    pub fn original_arguments(&self) -> &str {
        &self.original_arguments
    }
}

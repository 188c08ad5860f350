use lodestone_data::DataError;
use lodestone_event::{CauseError, CauseStackError, ContextError, EventError};
use thiserror::Error;

/// Any error raised through the [`Game`](crate::Game) handle.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("Event error: {0}")]
    Event(#[from] EventError),
    #[error("Cause error: {0}")]
    Cause(#[from] CauseError),
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
    #[error("Cause stack error: {0}")]
    CauseStack(#[from] CauseStackError),
    #[error("Configuration error: {0}")]
    Config(String),
}

//! Error types for causes, contexts, cause stacks and event dispatch.

use lodestone_data::ResourceKey;

/// Errors raised while building a [`Cause`](crate::Cause).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CauseError {
    /// A cause must contain at least one element
    #[error("Cannot create an empty cause")]
    EmptyCause,
}

/// Errors raised by [`EventContext`](crate::EventContext) access and construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// A builder was given the same key twice
    #[error("Duplicate context key: {0}")]
    DuplicateKey(ResourceKey),
    /// A required context entry was absent
    #[error("Missing context key: {0}")]
    MissingKey(ResourceKey),
}

/// Errors raised by the [`CauseStackManager`](crate::CauseStackManager).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CauseStackError {
    /// No cause has been pushed
    #[error("The cause stack is empty")]
    EmptyStack,
    /// A frame operation was attempted with no open frame
    #[error("No cause frame is open")]
    NoFrame,
    /// Frames must be popped in reverse push order
    #[error("Cause frame popped out of order: expected frame {expected}, got frame {actual}")]
    FrameOrderViolation {
        /// Id of the innermost open frame
        expected: u64,
        /// Id of the frame the caller tried to pop
        actual: u64,
    },
    /// The configured maximum number of nested frames was reached
    #[error("Cause frame depth limit of {limit} exceeded")]
    DepthExceeded {
        /// Configured limit
        limit: usize,
    },
    /// Context access failed
    #[error(transparent)]
    Context(#[from] ContextError),
    /// Cause construction failed
    #[error(transparent)]
    Cause(#[from] CauseError),
}

/// Errors raised by events, listeners and the event manager.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    /// Cancellation was requested on an event without the cancellation capability
    #[error("Event {event} cannot be cancelled")]
    NotCancellable {
        /// Name of the event type
        event: &'static str,
    },
    /// A listener failed while handling an event
    #[error("Listener execution error: {0}")]
    Listener(String),
    /// A listener registration was incomplete or invalid
    #[error("Listener registration error: {0}")]
    Registration(String),
    /// A damage modifier could not be applied
    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),
}

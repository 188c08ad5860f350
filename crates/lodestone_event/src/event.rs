//! # Events
//!
//! Every event carries the [`Cause`] that produced it. Cancellation is a
//! capability: an event that can be cancelled exposes it through
//! [`Event::as_cancellable_mut`], and asking a non-cancellable event to cancel
//! is an error rather than a silent no-op.
//!
//! Most events implement [`Event`] through [`impl_event!`](crate::impl_event)
//! or [`impl_cancellable_event!`](crate::impl_cancellable_event).

use crate::cause::Cause;
use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;

/// The cancellation capability.
pub trait Cancellable: Send + Sync {
    fn is_cancelled(&self) -> bool;

    fn set_cancelled(&mut self, cancelled: bool);
}

/// Cancellation state stored by cancellable events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelFlag(bool);

impl CancelFlag {
    pub fn new(cancelled: bool) -> Self {
        Self(cancelled)
    }
}

impl Cancellable for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.0
    }

    fn set_cancelled(&mut self, cancelled: bool) {
        self.0 = cancelled;
    }
}

/// Core trait implemented by every event.
pub trait Event: Any + Debug + Send + Sync {
    /// Provenance of the event.
    fn cause(&self) -> &Cause;

    /// Human-readable event type, used in logs and errors.
    fn event_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// The cancellation capability, if this event has one.
    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        None
    }

    fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> {
        None
    }

    /// Always `false` for events without the cancellation capability.
    fn is_cancelled(&self) -> bool {
        self.as_cancellable()
            .is_some_and(|cancellable| cancellable.is_cancelled())
    }

    /// Cancels or un-cancels the event.
    ///
    /// # Returns
    ///
    /// `Err(EventError::NotCancellable)` for events without the capability.
    fn set_cancelled(&mut self, cancelled: bool) -> Result<(), EventError> {
        let event = self.event_name();
        match self.as_cancellable_mut() {
            Some(cancellable) => {
                cancellable.set_cancelled(cancelled);
                Ok(())
            }
            None => Err(EventError::NotCancellable { event }),
        }
    }
}

/// Implements [`Event`] for a struct with a `cause: Cause` field.
///
/// ```rust
/// use lodestone_event::{impl_event, Cause, Event};
///
/// #[derive(Debug)]
/// struct WorldSavedEvent {
///     cause: Cause,
/// }
///
/// impl_event!(WorldSavedEvent);
/// ```
#[macro_export]
macro_rules! impl_event {
    ($event:ty) => {
        impl $crate::Event for $event {
            $crate::__event_body!($event);
        }
    };
}

/// Implements [`Event`] for a struct with `cause: Cause` and
/// `cancelled: CancelFlag` fields.
///
/// ```rust
/// use lodestone_event::{impl_cancellable_event, CancelFlag, Cause, Event, EventContext};
///
/// #[derive(Debug)]
/// struct ChatEvent {
///     cause: Cause,
///     cancelled: CancelFlag,
///     message: String,
/// }
///
/// impl_cancellable_event!(ChatEvent);
///
/// let mut event = ChatEvent {
///     cause: Cause::of(EventContext::empty(), "console"),
///     cancelled: CancelFlag::default(),
///     message: "hi".to_string(),
/// };
/// event.set_cancelled(true).unwrap();
/// assert!(event.is_cancelled());
/// ```
#[macro_export]
macro_rules! impl_cancellable_event {
    ($event:ty) => {
        impl $crate::Event for $event {
            $crate::__event_body!($event);

            fn as_cancellable(&self) -> Option<&dyn $crate::Cancellable> {
                Some(&self.cancelled)
            }

            fn as_cancellable_mut(&mut self) -> Option<&mut dyn $crate::Cancellable> {
                Some(&mut self.cancelled)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __event_body {
    ($event:ty) => {
        fn cause(&self) -> &$crate::Cause {
            &self.cause
        }

        fn event_name(&self) -> &'static str {
            stringify!($event)
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;

    #[derive(Debug)]
    struct Tick {
        cause: Cause,
    }

    impl_event!(Tick);

    #[derive(Debug)]
    struct Chat {
        cause: Cause,
        cancelled: CancelFlag,
    }

    impl_cancellable_event!(Chat);

    fn cause() -> Cause {
        Cause::of(EventContext::empty(), "test")
    }

    #[test]
    fn test_non_cancellable_event_rejects_cancel() {
        let mut tick = Tick { cause: cause() };
        assert!(!tick.is_cancelled());
        assert!(tick.as_cancellable().is_none());
        assert_eq!(
            tick.set_cancelled(true).unwrap_err(),
            EventError::NotCancellable { event: "Tick" }
        );
        assert!(!tick.is_cancelled());
    }

    #[test]
    fn test_cancellable_event_round_trip() {
        let mut chat = Chat {
            cause: cause(),
            cancelled: CancelFlag::default(),
        };
        chat.set_cancelled(true).unwrap();
        assert!(chat.is_cancelled());
        chat.set_cancelled(false).unwrap();
        assert!(!chat.is_cancelled());
        assert_eq!(chat.event_name(), "Chat");
    }

    #[test]
    fn test_dyn_event_downcast() {
        let mut chat = Chat {
            cause: cause(),
            cancelled: CancelFlag::new(true),
        };
        let event: &mut dyn Event = &mut chat;
        assert!(event.is_cancelled());
        assert!(event.as_any_mut().downcast_mut::<Chat>().is_some());
        assert!(event.as_any().downcast_ref::<Tick>().is_none());
    }
}

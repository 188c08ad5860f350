//! Events made of other events.

use crate::cause::Cause;
use crate::error::EventError;
use crate::event::{CancelFlag, Cancellable, Event};
use std::any::Any;
use tracing::debug;

/// A cancellable event wrapping child events that happen as one action.
///
/// Cancelling the composite marks it cancelled and then cancels every child
/// that can be cancelled. Children without the capability are skipped. There
/// is no atomicity across children: listeners may later un-cancel individual
/// children.
#[derive(Debug)]
pub struct CompositeEvent {
    cause: Cause,
    cancelled: CancelFlag,
    children: Vec<Box<dyn Event>>,
}

impl CompositeEvent {
    pub fn new(cause: Cause, children: Vec<Box<dyn Event>>) -> Self {
        Self {
            cause,
            cancelled: CancelFlag::default(),
            children,
        }
    }

    pub fn children(&self) -> &[Box<dyn Event>] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [Box<dyn Event>] {
        &mut self.children
    }

    pub fn push_child(&mut self, child: Box<dyn Event>) {
        self.children.push(child);
    }

    /// Typed view of every child of type `E`.
    pub fn children_of<E: Event>(&self) -> impl Iterator<Item = &E> {
        self.children
            .iter()
            .filter_map(|child| child.as_any().downcast_ref::<E>())
    }

    pub fn into_children(self) -> Vec<Box<dyn Event>> {
        self.children
    }
}

impl Event for CompositeEvent {
    fn cause(&self) -> &Cause {
        &self.cause
    }

    fn event_name(&self) -> &'static str {
        "CompositeEvent"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_cancellable(&self) -> Option<&dyn Cancellable> {
        Some(&self.cancelled)
    }

    fn as_cancellable_mut(&mut self) -> Option<&mut dyn Cancellable> {
        Some(&mut self.cancelled)
    }

    fn set_cancelled(&mut self, cancelled: bool) -> Result<(), EventError> {
        self.cancelled.set_cancelled(cancelled);
        for child in &mut self.children {
            if let Err(e) = child.set_cancelled(cancelled) {
                debug!("⏭️ Skipping child of composite event: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use crate::{impl_cancellable_event, impl_event};

    #[derive(Debug)]
    struct BlockBreak {
        cause: Cause,
        cancelled: CancelFlag,
        block: u32,
    }

    impl_cancellable_event!(BlockBreak);

    #[derive(Debug)]
    struct SoundPlayed {
        cause: Cause,
    }

    impl_event!(SoundPlayed);

    fn cause() -> Cause {
        Cause::of(EventContext::empty(), "explosion")
    }

    fn composite() -> CompositeEvent {
        CompositeEvent::new(
            cause(),
            vec![
                Box::new(BlockBreak {
                    cause: cause(),
                    cancelled: CancelFlag::default(),
                    block: 1,
                }),
                Box::new(SoundPlayed { cause: cause() }),
                Box::new(BlockBreak {
                    cause: cause(),
                    cancelled: CancelFlag::default(),
                    block: 2,
                }),
            ],
        )
    }

    #[test]
    fn test_cancel_propagates_to_cancellable_children() {
        let mut event = composite();
        event.set_cancelled(true).unwrap();

        assert!(event.is_cancelled());
        assert!(event.children_of::<BlockBreak>().all(|b| b.is_cancelled()));
        assert!(!event.children()[1].is_cancelled());

        event.set_cancelled(false).unwrap();
        assert!(!event.is_cancelled());
        assert!(event.children_of::<BlockBreak>().all(|b| !b.is_cancelled()));
    }

    #[test]
    fn test_children_can_be_uncancelled_individually() {
        let mut event = composite();
        event.set_cancelled(true).unwrap();
        event.children_mut()[2].set_cancelled(false).unwrap();

        let states: Vec<(u32, bool)> = event
            .children_of::<BlockBreak>()
            .map(|b| (b.block, b.is_cancelled()))
            .collect();
        assert_eq!(states, vec![(1, true), (2, false)]);
        assert!(event.is_cancelled());
    }

    #[test]
    fn test_push_and_into_children() {
        let mut event = CompositeEvent::new(cause(), Vec::new());
        event.push_child(Box::new(SoundPlayed { cause: cause() }));
        assert_eq!(event.children().len(), 1);
        assert_eq!(event.into_children()[0].event_name(), "SoundPlayed");
    }
}

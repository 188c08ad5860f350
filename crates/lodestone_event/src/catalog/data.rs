//! Value change events.

use crate::cause::Cause;
use crate::event::{CancelFlag, Event};
use crate::impl_cancellable_event;
use lodestone_data::DataTransactionResult;
use uuid::Uuid;

/// Fired when values of a data holder are about to change.
///
/// Listeners may narrow the change by proposing a different transaction
/// result, or cancel it altogether. The store that fired the event applies
/// [`end_result`](Self::end_result).
#[derive(Debug)]
pub struct ChangeValueEvent {
    cause: Cause,
    cancelled: CancelFlag,
    holder: Uuid,
    original: DataTransactionResult,
    proposed: Option<DataTransactionResult>,
}

impl_cancellable_event!(ChangeValueEvent);

impl ChangeValueEvent {
    pub fn new(cause: Cause, holder: Uuid, changes: DataTransactionResult) -> Self {
        Self {
            cause,
            cancelled: CancelFlag::default(),
            holder,
            original: changes,
            proposed: None,
        }
    }

    /// Id of the data holder whose values change.
    pub fn holder(&self) -> Uuid {
        self.holder
    }

    /// The changes as first reported by the store.
    pub fn original_changes(&self) -> &DataTransactionResult {
        &self.original
    }

    /// The changes currently proposed, the original ones unless a listener
    /// proposed others.
    pub fn proposed_changes(&self) -> &DataTransactionResult {
        self.proposed.as_ref().unwrap_or(&self.original)
    }

    pub fn propose_changes(&mut self, changes: DataTransactionResult) {
        self.proposed = Some(changes);
    }

    /// Whether a listener proposed changes of its own.
    pub fn has_proposed_changes(&self) -> bool {
        self.proposed.is_some()
    }

    /// The outcome to apply: the proposed changes, or the original ones
    /// marked cancelled when the event was cancelled.
    pub fn end_result(&self) -> DataTransactionResult {
        if self.is_cancelled() {
            self.original.clone().into_cancelled()
        } else {
            self.proposed_changes().clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use lodestone_data::{DataTransactionType, ImmutableValue, Key, ResourceKey};

    fn level_change() -> DataTransactionResult {
        let level: Key<u32> = Key::of(ResourceKey::lodestone("level"));
        DataTransactionResult::success_replace_result(
            ImmutableValue::new(&level, 5).into_shared(),
            ImmutableValue::new(&level, 1).into_shared(),
        )
    }

    fn event() -> ChangeValueEvent {
        ChangeValueEvent::new(
            Cause::of(EventContext::empty(), "command"),
            Uuid::new_v4(),
            level_change(),
        )
    }

    #[test]
    fn test_end_result_defaults_to_original() {
        let event = event();
        assert!(event.end_result().is_successful());
        assert_eq!(event.end_result().successful_data().len(), 1);
        assert_eq!(event.proposed_changes().replaced_data().len(), 1);
    }

    #[test]
    fn test_proposed_changes_replace_end_result() {
        let mut event = event();
        assert!(!event.has_proposed_changes());
        event.propose_changes(DataTransactionResult::success_no_data());
        assert!(event.has_proposed_changes());

        assert!(event.end_result().successful_data().is_empty());
        assert_eq!(event.original_changes().successful_data().len(), 1);
    }

    #[test]
    fn test_cancelled_end_result_rejects_everything() {
        let mut event = event();
        event.set_cancelled(true).unwrap();

        let end = event.end_result();
        assert_eq!(end.result_type(), DataTransactionType::Cancelled);
        assert!(end.successful_data().is_empty());
        assert_eq!(end.rejected_data().len(), 1);
    }
}

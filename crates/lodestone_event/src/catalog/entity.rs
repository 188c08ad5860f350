//! Entity events.

use crate::cause::Cause;
use crate::event::CancelFlag;
use crate::impl_cancellable_event;
use uuid::Uuid;

/// Fired when entities are about to enter a world.
#[derive(Debug)]
pub struct SpawnEntityEvent {
    cause: Cause,
    cancelled: CancelFlag,
    entities: Vec<Uuid>,
}

impl_cancellable_event!(SpawnEntityEvent);

impl SpawnEntityEvent {
    pub fn new(cause: Cause, entities: Vec<Uuid>) -> Self {
        Self {
            cause,
            cancelled: CancelFlag::default(),
            entities,
        }
    }

    pub fn entities(&self) -> &[Uuid] {
        &self.entities
    }

    /// Keeps only the entities matching `keep`.
    ///
    /// # Returns
    ///
    /// The entities that were filtered out, in their original order.
    pub fn filter_entities(&mut self, mut keep: impl FnMut(&Uuid) -> bool) -> Vec<Uuid> {
        let (kept, removed) = self.entities.drain(..).partition(|id| keep(id));
        self.entities = kept;
        removed
    }
}

/// Fired when an entity is about to regain health.
#[derive(Debug)]
pub struct HealEntityEvent {
    cause: Cause,
    cancelled: CancelFlag,
    target: Uuid,
    original_heal_amount: f64,
    heal_amount: f64,
}

impl_cancellable_event!(HealEntityEvent);

impl HealEntityEvent {
    pub fn new(cause: Cause, target: Uuid, heal_amount: f64) -> Self {
        Self {
            cause,
            cancelled: CancelFlag::default(),
            target,
            original_heal_amount: heal_amount,
            heal_amount,
        }
    }

    pub fn target(&self) -> Uuid {
        self.target
    }

    pub fn original_heal_amount(&self) -> f64 {
        self.original_heal_amount
    }

    pub fn base_heal_amount(&self) -> f64 {
        self.heal_amount
    }

    pub fn set_base_heal_amount(&mut self, heal_amount: f64) {
        self.heal_amount = heal_amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EventContext;
    use crate::event::Event;

    fn cause() -> Cause {
        Cause::of(EventContext::empty(), "spawner")
    }

    #[test]
    fn test_filter_entities_returns_removed() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut event = SpawnEntityEvent::new(cause(), ids.clone());

        let removed = event.filter_entities(|id| *id != ids[1] && *id != ids[3]);

        assert_eq!(removed, vec![ids[1], ids[3]]);
        assert_eq!(event.entities(), &[ids[0], ids[2]]);
    }

    #[test]
    fn test_heal_amount_changes_keep_original() {
        let target = Uuid::new_v4();
        let mut event = HealEntityEvent::new(cause(), target, 4.0);
        event.set_base_heal_amount(1.5);

        assert_eq!(event.target(), target);
        assert_eq!(event.base_heal_amount(), 1.5);
        assert_eq!(event.original_heal_amount(), 4.0);

        event.set_cancelled(true).unwrap();
        assert!(event.is_cancelled());
    }
}

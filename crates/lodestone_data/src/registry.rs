//! # Key registry and value factory
//!
//! The [`KeyRegistry`] is the table of every key known to a running game. It
//! is populated at startup and guarantees that one id always maps to one
//! element type. The [`ValueFactory`] builds values for registered keys and is
//! handed out by the game handle rather than looked up globally.

use crate::error::DataError;
use crate::key::{Key, KeyDescriptor, ResourceKey};
use crate::value::{Element, ImmutableValue, MutableValue};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Concurrent table of registered keys.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    keys: DashMap<ResourceKey, KeyDescriptor>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key.
    ///
    /// Registering the same id again with the same element type is a no-op.
    ///
    /// # Returns
    ///
    /// `Err(DataError::KeyConflict)` when the id is already taken by a key of
    /// a different element type.
    pub fn register<E: Element>(&self, key: &Key<E>) -> Result<(), DataError> {
        let descriptor = key.descriptor();
        match self.keys.entry(descriptor.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(existing) => {
                let existing = existing.get();
                if existing.element_type != descriptor.element_type {
                    warn!(
                        "⚠️ Key {} already registered as {}, refusing {}",
                        descriptor.id, existing.element_type_name, descriptor.element_type_name
                    );
                    return Err(DataError::KeyConflict {
                        key: descriptor.id,
                        existing: existing.element_type_name,
                        attempted: descriptor.element_type_name,
                    });
                }
                Ok(())
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                debug!("🔑 Registered key {} ({})", descriptor.id, descriptor.element_type_name);
                slot.insert(descriptor);
                Ok(())
            }
        }
    }

    /// Descriptor of a registered key.
    pub fn get(&self, id: &ResourceKey) -> Option<KeyDescriptor> {
        self.keys.get(id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, id: &ResourceKey) -> bool {
        self.keys.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Ids of all registered keys, sorted.
    pub fn ids(&self) -> Vec<ResourceKey> {
        let mut ids: Vec<ResourceKey> = self.keys.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}

/// Builds values for keys registered in a [`KeyRegistry`].
#[derive(Debug, Clone)]
pub struct ValueFactory {
    registry: Arc<KeyRegistry>,
}

impl ValueFactory {
    pub fn new(registry: Arc<KeyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    /// Mutable value for `key` holding `element`.
    pub fn mutable_of<E: Element>(&self, key: &Key<E>, element: E) -> Result<MutableValue<E>, DataError> {
        self.immutable_of(key, element).map(|value| value.as_mutable())
    }

    /// Immutable value for `key` holding `element`.
    ///
    /// The value's default is the key's default, or `element` when the key
    /// declares none.
    pub fn immutable_of<E: Element>(&self, key: &Key<E>, element: E) -> Result<ImmutableValue<E>, DataError> {
        self.ensure_registered(key)?;
        Ok(ImmutableValue::new(key, element))
    }

    /// Immutable value with an explicit default.
    pub fn create_value<E: Element>(&self, key: &Key<E>, element: E, default: E) -> Result<ImmutableValue<E>, DataError> {
        self.ensure_registered(key)?;
        Ok(ImmutableValue::with_default(key, Some(element), default))
    }

    /// Immutable value for a bounded key, refusing elements outside its bounds.
    pub fn create_bounded_value<E: Element>(&self, key: &Key<E>, element: E) -> Result<ImmutableValue<E>, DataError> {
        if !key.accepts(&element) {
            return Err(DataError::OutOfBounds { key: key.id().clone() });
        }
        self.immutable_of(key, element)
    }

    fn ensure_registered<E: Element>(&self, key: &Key<E>) -> Result<(), DataError> {
        match self.registry.get(key.id()) {
            Some(descriptor) if descriptor.element_type == key.descriptor().element_type => Ok(()),
            Some(descriptor) => Err(DataError::KeyConflict {
                key: descriptor.id,
                existing: descriptor.element_type_name,
                attempted: key.element_type_name(),
            }),
            None => Err(DataError::UnsupportedKey { key: key.id().clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent_per_type() {
        let registry = KeyRegistry::new();
        let level: Key<u32> = Key::of(ResourceKey::lodestone("level"));
        registry.register(&level).unwrap();
        registry.register(&level).unwrap();
        assert_eq!(registry.len(), 1);

        let clash: Key<String> = Key::of(ResourceKey::lodestone("level"));
        match registry.register(&clash) {
            Err(DataError::KeyConflict { existing, attempted, .. }) => {
                assert_eq!(existing, "u32");
                assert_eq!(attempted, "alloc::string::String");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_ids_are_sorted() {
        let registry = KeyRegistry::new();
        registry.register(&Key::<u32>::of(ResourceKey::lodestone("b"))).unwrap();
        registry.register(&Key::<u32>::of(ResourceKey::lodestone("a"))).unwrap();
        assert_eq!(registry.ids(), vec![ResourceKey::lodestone("a"), ResourceKey::lodestone("b")]);
        assert!(registry.contains(&ResourceKey::lodestone("a")));
        assert!(registry.get(&ResourceKey::lodestone("c")).is_none());
    }

    #[test]
    fn test_factory_requires_registration() {
        let registry = Arc::new(KeyRegistry::new());
        let factory = ValueFactory::new(Arc::clone(&registry));
        let level: Key<u32> = Key::builder(ResourceKey::lodestone("level")).default_value(1).build();

        assert!(matches!(factory.immutable_of(&level, 3), Err(DataError::UnsupportedKey { .. })));

        registry.register(&level).unwrap();
        let value = factory.immutable_of(&level, 3).unwrap();
        assert_eq!(*value.get(), 3);
        assert_eq!(*value.default_element(), 1);

        let mut mutable = factory.mutable_of(&level, 4).unwrap();
        mutable.set(5);
        assert_eq!(*mutable.get(), 5);

        let custom = factory.create_value(&level, 8, 2).unwrap();
        assert_eq!(*custom.default_element(), 2);
    }

    #[test]
    fn test_bounded_factory_rejects_out_of_range() {
        let registry = Arc::new(KeyRegistry::new());
        let factory = ValueFactory::new(Arc::clone(&registry));
        let food: Key<i32> = Key::builder(ResourceKey::lodestone("food")).min(0).max(20).build();
        registry.register(&food).unwrap();

        assert!(factory.create_bounded_value(&food, 12).is_ok());
        assert_eq!(
            factory.create_bounded_value(&food, 21).unwrap_err(),
            DataError::OutOfBounds { key: ResourceKey::lodestone("food") }
        );
    }
}

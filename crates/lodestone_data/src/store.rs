//! # Value stores
//!
//! Concrete containers backing game objects:
//!
//! - [`ValueStore`] is the mutable store. It optionally restricts itself to a
//!   set of supported keys and rejects out-of-bounds offers for bounded keys.
//! - [`FrozenValueStore`] is an immutable snapshot sharing its map through an
//!   `Arc`; every modification produces a new snapshot.

use crate::container::{ImmutableValueStore, MutableValueStore, ValueContainer};
use crate::error::DataError;
use crate::key::ResourceKey;
use crate::merge::MergeFunction;
use crate::transaction::{DataTransactionResult, DataTransactionType};
use crate::value::SharedValue;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Checks that `value` may be stored next to `values`: its key is supported,
/// it is within its key's bounds, and it has the element type of any value
/// already held under the same id.
fn validate(
    supported: Option<&HashSet<ResourceKey>>,
    values: &HashMap<ResourceKey, SharedValue>,
    value: &SharedValue,
) -> Result<(), DataError> {
    let id = value.key_id();
    if supported.is_some_and(|supported| !supported.contains(id)) {
        return Err(DataError::UnsupportedKey { key: id.clone() });
    }
    if !value.within_bounds() {
        return Err(DataError::OutOfBounds { key: id.clone() });
    }
    if let Some(held) = values.get(id) {
        if held.element_type() != value.element_type() {
            return Err(DataError::TypeMismatch {
                key: id.clone(),
                expected: value.element_type_name(),
                found: held.element_type_name(),
            });
        }
    }
    Ok(())
}

// ============================================================================
// Mutable store
// ============================================================================

/// Mutable, heterogeneous value store.
///
/// # Examples
///
/// ```rust
/// use lodestone_data::{Key, MutableValueStore, ResourceKey, ValueContainer, ValueStore};
///
/// let health: Key<f64> = Key::builder(ResourceKey::lodestone("health"))
///     .min(0.0)
///     .max(20.0)
///     .build();
/// let mut store = ValueStore::new();
///
/// assert!(store.offer(&health, 15.0).is_successful());
/// assert!(!store.offer(&health, 30.0).is_successful());
/// assert_eq!(store.get(&health), Some(15.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: HashMap<ResourceKey, SharedValue>,
    supported: Option<HashSet<ResourceKey>>,
}

impl ValueStore {
    /// Creates an empty store supporting every key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store supporting only `keys`.
    pub fn with_supported(keys: impl IntoIterator<Item = ResourceKey>) -> Self {
        Self {
            values: HashMap::new(),
            supported: Some(keys.into_iter().collect()),
        }
    }

    /// Creates a store holding `values`. Later values win on duplicate keys.
    pub fn of(values: impl IntoIterator<Item = SharedValue>) -> Self {
        let values = values
            .into_iter()
            .map(|value| (value.key_id().clone(), value))
            .collect();
        Self {
            values,
            supported: None,
        }
    }

    /// Creates a store holding every direct value of `container`.
    pub fn of_container<C>(container: &C) -> Self
    where
        C: ValueContainer + ?Sized,
    {
        Self::of(container.values())
    }

    /// Creates a store restricted to `keys`, seeded with their values from `container`.
    pub fn of_keys_from<C>(container: &C, keys: impl IntoIterator<Item = ResourceKey>) -> Self
    where
        C: ValueContainer + ?Sized,
    {
        let supported: HashSet<ResourceKey> = keys.into_iter().collect();
        let values = supported
            .iter()
            .filter_map(|id| container.raw_value(id).map(|value| (id.clone(), value)))
            .collect();
        Self {
            values,
            supported: Some(supported),
        }
    }

    /// Number of direct values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Immutable snapshot of the current contents.
    pub fn freeze(&self) -> FrozenValueStore {
        FrozenValueStore {
            values: Arc::new(self.values.clone()),
            supported: self.supported.clone().map(Arc::new),
        }
    }
}

impl ValueContainer for ValueStore {
    fn supports_id(&self, id: &ResourceKey) -> bool {
        self.supported
            .as_ref()
            .map_or(true, |supported| supported.contains(id))
    }

    fn raw_value(&self, id: &ResourceKey) -> Option<SharedValue> {
        self.values.get(id).cloned()
    }

    fn keys(&self) -> Vec<ResourceKey> {
        self.values.keys().cloned().collect()
    }

    fn values(&self) -> Vec<SharedValue> {
        self.values.values().cloned().collect()
    }
}

impl MutableValueStore for ValueStore {
    fn offer_shared(&mut self, value: SharedValue) -> DataTransactionResult {
        if let Err(e) = validate(self.supported.as_ref(), &self.values, &value) {
            debug!("🚫 Rejected offer: {}", e);
            return DataTransactionResult::fail_result(value);
        }

        let id = value.key_id().clone();
        match self.values.insert(id, Arc::clone(&value)) {
            Some(replaced) => DataTransactionResult::success_replace_result(value, replaced),
            None => DataTransactionResult::success_result(value),
        }
    }

    fn remove_id(&mut self, id: &ResourceKey) -> DataTransactionResult {
        if !self.supports_id(id) {
            return DataTransactionResult::fail_no_data();
        }
        match self.values.remove(id) {
            Some(removed) => DataTransactionResult::builder()
                .result(DataTransactionType::Success)
                .replace(removed)
                .build()
                .unwrap_or_else(|_| DataTransactionResult::success_no_data()),
            None => DataTransactionResult::fail_no_data(),
        }
    }

    fn copy(&self) -> Self {
        self.clone()
    }
}

// ============================================================================
// Immutable store
// ============================================================================

/// Immutable snapshot of a [`ValueStore`].
///
/// Cloning is cheap; the map is shared until a modification copies it.
#[derive(Debug, Clone, Default)]
pub struct FrozenValueStore {
    values: Arc<HashMap<ResourceKey, SharedValue>>,
    supported: Option<Arc<HashSet<ResourceKey>>>,
}

impl FrozenValueStore {
    /// Mutable copy of this snapshot.
    pub fn thaw(&self) -> ValueStore {
        ValueStore {
            values: self.values.as_ref().clone(),
            supported: self.supported.as_deref().cloned(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn with_map(&self, values: HashMap<ResourceKey, SharedValue>) -> Self {
        Self {
            values: Arc::new(values),
            supported: self.supported.clone(),
        }
    }
}

impl ValueContainer for FrozenValueStore {
    fn supports_id(&self, id: &ResourceKey) -> bool {
        self.supported
            .as_ref()
            .map_or(true, |supported| supported.contains(id))
    }

    fn raw_value(&self, id: &ResourceKey) -> Option<SharedValue> {
        self.values.get(id).cloned()
    }

    fn keys(&self) -> Vec<ResourceKey> {
        self.values.keys().cloned().collect()
    }

    fn values(&self) -> Vec<SharedValue> {
        self.values.values().cloned().collect()
    }
}

impl ImmutableValueStore for FrozenValueStore {
    fn with_shared(&self, value: SharedValue) -> Option<Self> {
        if let Err(e) = validate(self.supported.as_deref(), &self.values, &value) {
            debug!("🚫 Rejected value for frozen store: {}", e);
            return None;
        }
        let mut values = self.values.as_ref().clone();
        values.insert(value.key_id().clone(), value);
        Some(self.with_map(values))
    }

    fn without_id(&self, id: &ResourceKey) -> Option<Self> {
        if !self.supports_id(id) {
            return None;
        }
        let mut values = self.values.as_ref().clone();
        values.remove(id);
        Some(self.with_map(values))
    }

    /// Merges `that` into a copy of `self`.
    ///
    /// Keys this store does not support are skipped. A merged value that this
    /// store would refuse on offer fails the whole merge.
    fn merge_with(&self, that: &Self, merge: &MergeFunction) -> Result<Self, DataError> {
        let mut values = self.values.as_ref().clone();
        for (id, theirs) in that.values.iter() {
            if !self.supports_id(id) {
                continue;
            }
            let merged = merge.merge(values.get(id), Some(theirs))?;
            validate(self.supported.as_deref(), &values, &merged)?;
            values.insert(id.clone(), merged);
        }
        Ok(self.with_map(values))
    }
}

//! # Value containers
//!
//! [`ValueContainer`] gives typed property access over any holder without
//! static knowledge of the holder's concrete type. Mutable holders implement
//! [`MutableValueStore`] and report every change as a
//! [`DataTransactionResult`]; immutable holders implement
//! [`ImmutableValueStore`] and return new instances instead.
//!
//! ## Consistency rules
//!
//! - `get` is empty exactly when the key is unsupported, or nothing is set and
//!   the key declares no default.
//! - No access succeeds for a key that `supports` rejects.
//! - Offers never silently drop data: a refused value shows up as rejected.

use crate::error::DataError;
use crate::key::{Key, ResourceKey};
use crate::merge::MergeFunction;
use crate::transaction::{DataTransactionResult, DataTransactionType};
use crate::value::{Element, ImmutableValue, SharedValue};
use std::any::TypeId;

/// Read access to typed values.
pub trait ValueContainer {
    /// Whether the holder can carry a value for the key id at all.
    fn supports_id(&self, id: &ResourceKey) -> bool;

    /// The directly stored erased value for a key id.
    fn raw_value(&self, id: &ResourceKey) -> Option<SharedValue>;

    /// Ids of all keys holding a direct value.
    fn keys(&self) -> Vec<ResourceKey>;

    /// All directly stored values.
    fn values(&self) -> Vec<SharedValue>;

    /// Typed value for `key`, including the key's default when nothing is set.
    ///
    /// Empty when the value stored under the key id has another element type;
    /// [`try_get_value`](Self::try_get_value) reports that case.
    fn get_value<E: Element>(&self, key: &Key<E>) -> Option<ImmutableValue<E>> {
        self.try_get_value(key).ok().flatten()
    }

    /// Like [`get_value`](Self::get_value), but a stored value of another
    /// element type is `DataError::TypeMismatch`.
    fn try_get_value<E: Element>(&self, key: &Key<E>) -> Result<Option<ImmutableValue<E>>, DataError> {
        if !self.supports(key) {
            return Ok(None);
        }
        if let Some(raw) = self.raw_value(key.id()) {
            return match ImmutableValue::<E>::from_shared(&raw) {
                Some(value) => Ok(Some(value.clone())),
                None => Err(DataError::TypeMismatch {
                    key: key.id().clone(),
                    expected: std::any::type_name::<E>(),
                    found: raw.element_type_name(),
                }),
            };
        }
        Ok(key
            .default_value()
            .map(|default| ImmutableValue::default_only(key, default.clone())))
    }

    /// Typed element for `key`.
    fn get<E: Element>(&self, key: &Key<E>) -> Option<E> {
        self.get_value(key).map(|value| value.get().clone())
    }

    fn supports<E: Element>(&self, key: &Key<E>) -> bool {
        self.supports_id(key.id())
    }

    /// Typed element for `key`, or `DataError::NoSuchValue`.
    fn require<E: Element>(&self, key: &Key<E>) -> Result<E, DataError> {
        self.try_get_value(key)?
            .map(|value| value.get().clone())
            .ok_or_else(|| DataError::NoSuchValue {
                key: key.id().clone(),
            })
    }

    fn get_or_else<E: Element>(&self, key: &Key<E>, default: E) -> E {
        self.get(key).unwrap_or(default)
    }

    /// `Ok(None)` for a supported key without a value, an error for an unsupported key.
    fn get_or_none<E: Element>(&self, key: &Key<E>) -> Result<Option<E>, DataError> {
        match self.get(key) {
            Some(value) => Ok(Some(value)),
            None if self.supports(key) => Ok(None),
            None => Err(DataError::UnsupportedKey {
                key: key.id().clone(),
            }),
        }
    }
}

/// A container whose values can be offered, removed and rolled back in place.
pub trait MutableValueStore: ValueContainer {
    /// Offers an erased value. All typed offers funnel through here.
    fn offer_shared(&mut self, value: SharedValue) -> DataTransactionResult;

    /// Removes the direct value for a key id.
    fn remove_id(&mut self, id: &ResourceKey) -> DataTransactionResult;

    /// Independent copy of this store.
    fn copy(&self) -> Self
    where
        Self: Sized;

    /// Offers `value` for `key`.
    fn offer<E: Element>(&mut self, key: &Key<E>, value: E) -> DataTransactionResult {
        self.offer_shared(ImmutableValue::new(key, value).into_shared())
    }

    fn offer_value<E: Element>(&mut self, value: &ImmutableValue<E>) -> DataTransactionResult {
        self.offer_shared(value.clone().into_shared())
    }

    /// Like [`offer`](Self::offer), but a failed transaction is an error.
    fn try_offer<E: Element>(&mut self, key: &Key<E>, value: E) -> Result<DataTransactionResult, DataError> {
        let result = self.offer(key, value);
        if result.is_successful() {
            Ok(result)
        } else {
            Err(DataError::OfferRejected {
                key: key.id().clone(),
            })
        }
    }

    fn try_offer_value<E: Element>(&mut self, value: &ImmutableValue<E>) -> Result<DataTransactionResult, DataError> {
        self.try_offer(value.key(), value.get().clone())
    }

    /// Offers `f(current)` where current falls back to the key default.
    fn transform<E, F>(&mut self, key: &Key<E>, f: F) -> DataTransactionResult
    where
        E: Element,
        F: FnOnce(E) -> E,
    {
        if !self.supports(key) {
            return DataTransactionResult::fail_no_data();
        }
        match self.get(key) {
            Some(current) => self.offer(key, f(current)),
            None => DataTransactionResult::fail_no_data(),
        }
    }

    fn remove<E: Element>(&mut self, key: &Key<E>) -> DataTransactionResult {
        self.remove_id(key.id())
    }

    /// Reverts a successful transaction produced by this store.
    ///
    /// Replaced values are restored and values that were added without
    /// replacing anything are removed. Non-successful results changed nothing,
    /// so undoing them yields `fail_no_data`. The undo is a failure when any
    /// value could not be restored or removed.
    fn undo(&mut self, result: &DataTransactionResult) -> DataTransactionResult {
        if !result.is_successful() {
            return DataTransactionResult::fail_no_data();
        }
        let mut builder = DataTransactionResult::builder().result(DataTransactionType::Success);
        let mut failed = false;
        for replaced in result.replaced_data() {
            let restored = self.offer_shared(replaced.clone());
            failed |= !restored.is_successful();
            builder = builder.absorb_result(&restored);
        }
        for added in result.successful_data() {
            let was_replacement = result
                .replaced_data()
                .iter()
                .any(|replaced| replaced.key_id() == added.key_id());
            if !was_replacement {
                let removed = self.remove_id(added.key_id());
                failed |= !removed.is_successful();
                builder = builder.absorb_result(&removed);
            }
        }
        if failed {
            builder = builder.result(DataTransactionType::Failure);
        }
        builder
            .build()
            .unwrap_or_else(|_| DataTransactionResult::success_no_data())
    }

    /// Copies every value of `that` this store supports, keeping existing data.
    fn copy_from<C>(&mut self, that: &C) -> DataTransactionResult
    where
        C: ValueContainer + ?Sized,
    {
        self.copy_from_with(that, &MergeFunction::ignore_all())
    }

    /// Copies every value of `that` this store supports, resolving clashes with `merge`.
    fn copy_from_with<C>(&mut self, that: &C, merge: &MergeFunction) -> DataTransactionResult
    where
        C: ValueContainer + ?Sized,
    {
        let mut builder = DataTransactionResult::builder();
        let mut touched = false;
        for theirs in that.values() {
            let id = theirs.key_id().clone();
            if !self.supports_id(&id) {
                continue;
            }
            let own = self.raw_value(&id);
            let merged = match merge.merge(own.as_ref(), Some(&theirs)) {
                Ok(merged) => merged,
                Err(_) => {
                    builder = builder.reject(theirs);
                    continue;
                }
            };
            if own.as_ref().is_some_and(|own| own.value_eq(merged.as_ref())) {
                continue;
            }
            let result = self.offer_shared(merged);
            builder = builder.absorb_result(&result);
            touched = true;
        }
        if !touched {
            builder = builder.result(DataTransactionType::Success);
        }
        builder
            .build()
            .unwrap_or_else(|_| DataTransactionResult::success_no_data())
    }
}

/// A container that is changed by producing new instances.
pub trait ImmutableValueStore: ValueContainer + Sized {
    /// A copy holding `value`, or `None` when the value is unsupported or out of bounds.
    fn with_shared(&self, value: SharedValue) -> Option<Self>;

    /// A copy without the value for `id`, or `None` when the key is unsupported.
    fn without_id(&self, id: &ResourceKey) -> Option<Self>;

    /// Merges `that` into a copy of `self`.
    fn merge_with(&self, that: &Self, merge: &MergeFunction) -> Result<Self, DataError>;

    fn with<E: Element>(&self, key: &Key<E>, value: E) -> Option<Self> {
        self.with_shared(ImmutableValue::new(key, value).into_shared())
    }

    fn with_value<E: Element>(&self, value: &ImmutableValue<E>) -> Option<Self> {
        self.with_shared(value.clone().into_shared())
    }

    fn without<E: Element>(&self, key: &Key<E>) -> Option<Self> {
        self.without_id(key.id())
    }

    fn transform<E, F>(&self, key: &Key<E>, f: F) -> Option<Self>
    where
        E: Element,
        F: FnOnce(E) -> E,
    {
        let current = self.get(key)?;
        self.with(key, f(current))
    }

    /// Merges with the replacement preferred.
    fn merge(&self, that: &Self) -> Result<Self, DataError> {
        self.merge_with(that, &MergeFunction::replacement_preferred())
    }
}

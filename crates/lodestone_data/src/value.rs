//! # Values
//!
//! A value wraps a single datum addressed by a [`Key`]. Values come in two
//! concrete flavours that mirror each other:
//!
//! - [`ImmutableValue`] never changes; "modifying" it produces a new value.
//! - [`MutableValue`] is changed in place and can be copied or frozen.
//!
//! Both carry a default and an optional *direct* value. [`get`](ImmutableValue::get)
//! never fails: it returns the direct value when one is set and falls back to
//! the default otherwise.
//!
//! Conversions between the two are self-inverse by content:
//! `v.as_mutable().as_immutable() == v`.
//!
//! Heterogeneous code (transaction results, stores, merge functions) handles
//! immutable values through the object-safe [`AnyValue`] trait and the
//! [`SharedValue`] alias.

use crate::key::{Key, ResourceKey};
use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Requirements for anything stored as a value element.
///
/// Implemented automatically for every type meeting the bounds.
pub trait Element: Clone + Debug + PartialEq + Send + Sync + 'static {}

impl<T> Element for T where T: Clone + Debug + PartialEq + Send + Sync + 'static {}

// ============================================================================
// Immutable values
// ============================================================================

/// An immutable value snapshot.
///
/// # Examples
///
/// ```rust
/// use lodestone_data::{ImmutableValue, Key, ResourceKey};
///
/// let key: Key<u32> = Key::builder(ResourceKey::lodestone("level")).default_value(1).build();
/// let value = ImmutableValue::new(&key, 5);
///
/// assert_eq!(*value.get(), 5);
/// let raised = value.with(6);
/// assert_eq!(*value.get(), 5);
/// assert_eq!(*raised.get(), 6);
/// ```
#[derive(Clone)]
pub struct ImmutableValue<E> {
    key: Key<E>,
    direct: Option<E>,
    default: E,
}

impl<E: Element> ImmutableValue<E> {
    /// Creates a value with `element` as its direct value.
    ///
    /// The default is the key's default when it declares one, otherwise the
    /// element itself.
    pub fn new(key: &Key<E>, element: E) -> Self {
        let default = key.default_value().cloned().unwrap_or_else(|| element.clone());
        Self {
            key: key.clone(),
            direct: Some(element),
            default,
        }
    }

    /// Creates a value with an explicit direct value (possibly none) and default.
    pub fn with_default(key: &Key<E>, direct: Option<E>, default: E) -> Self {
        Self {
            key: key.clone(),
            direct,
            default,
        }
    }

    /// Creates a value holding only the default, with no direct value.
    pub fn default_only(key: &Key<E>, default: E) -> Self {
        Self::with_default(key, None, default)
    }

    /// The key addressing this value.
    pub fn key(&self) -> &Key<E> {
        &self.key
    }

    /// The direct value if set, otherwise the default.
    pub fn get(&self) -> &E {
        self.direct.as_ref().unwrap_or(&self.default)
    }

    /// The direct value, if one is set.
    pub fn direct(&self) -> Option<&E> {
        self.direct.as_ref()
    }

    /// The fallback returned when no direct value is set.
    pub fn default_element(&self) -> &E {
        &self.default
    }

    /// Returns a new value with `element` as its direct value.
    pub fn with(&self, element: E) -> Self {
        Self {
            key: self.key.clone(),
            direct: Some(element),
            default: self.default.clone(),
        }
    }

    /// Returns a new value holding `f(get())`.
    pub fn transform(&self, f: impl FnOnce(E) -> E) -> Self {
        self.with(f(self.get().clone()))
    }

    /// Returns an independent mutable copy.
    pub fn as_mutable(&self) -> MutableValue<E> {
        MutableValue {
            key: self.key.clone(),
            direct: self.direct.clone(),
            default: self.default.clone(),
        }
    }

    /// Same as [`as_mutable`](Self::as_mutable); immutable values are never shared mutably.
    pub fn as_mutable_copy(&self) -> MutableValue<E> {
        self.as_mutable()
    }

    /// Returns `true` when the current element satisfies the key's bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.key.accepts(self.get())
    }

    /// Lower bound declared by a bounded key.
    pub fn minimum(&self) -> Option<&E> {
        self.key.bounds().and_then(|bounds| bounds.min())
    }

    /// Upper bound declared by a bounded key.
    pub fn maximum(&self) -> Option<&E> {
        self.key.bounds().and_then(|bounds| bounds.max())
    }

    /// Erases the element type.
    pub fn into_shared(self) -> SharedValue {
        Arc::new(self)
    }

    /// Recovers a typed view of an erased value, if the element type matches.
    pub fn from_shared(value: &SharedValue) -> Option<&ImmutableValue<E>> {
        value.as_any().downcast_ref::<ImmutableValue<E>>()
    }
}

impl<E: Element> PartialEq for ImmutableValue<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.direct == other.direct && self.default == other.default
    }
}

impl<E: Element> Debug for ImmutableValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmutableValue")
            .field("key", self.key.id())
            .field("value", self.get())
            .field("direct", &self.direct.is_some())
            .finish()
    }
}

// ============================================================================
// Mutable values
// ============================================================================

/// A value that can be changed in place.
#[derive(Clone)]
pub struct MutableValue<E> {
    key: Key<E>,
    direct: Option<E>,
    default: E,
}

impl<E: Element> MutableValue<E> {
    /// Creates a mutable value with `element` as its direct value.
    pub fn new(key: &Key<E>, element: E) -> Self {
        ImmutableValue::new(key, element).as_mutable()
    }

    /// The key addressing this value.
    pub fn key(&self) -> &Key<E> {
        &self.key
    }

    /// The direct value if set, otherwise the default.
    pub fn get(&self) -> &E {
        self.direct.as_ref().unwrap_or(&self.default)
    }

    /// The direct value, if one is set.
    pub fn direct(&self) -> Option<&E> {
        self.direct.as_ref()
    }

    /// The fallback returned when no direct value is set.
    pub fn default_element(&self) -> &E {
        &self.default
    }

    /// Replaces the direct value.
    pub fn set(&mut self, element: E) -> &mut Self {
        self.direct = Some(element);
        self
    }

    /// Replaces the direct value with `f(get())`.
    pub fn transform(&mut self, f: impl FnOnce(E) -> E) -> &mut Self {
        let next = f(self.get().clone());
        self.set(next)
    }

    /// Deep copy; later changes to either side are not observed by the other.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Same as [`copy`](Self::copy).
    pub fn as_mutable_copy(&self) -> Self {
        self.copy()
    }

    /// Snapshot of the current state.
    pub fn as_immutable(&self) -> ImmutableValue<E> {
        ImmutableValue {
            key: self.key.clone(),
            direct: self.direct.clone(),
            default: self.default.clone(),
        }
    }

    /// Returns `true` when the current element satisfies the key's bounds.
    pub fn is_within_bounds(&self) -> bool {
        self.key.accepts(self.get())
    }

    /// Lower bound declared by a bounded key.
    pub fn minimum(&self) -> Option<&E> {
        self.key.bounds().and_then(|bounds| bounds.min())
    }

    /// Upper bound declared by a bounded key.
    pub fn maximum(&self) -> Option<&E> {
        self.key.bounds().and_then(|bounds| bounds.max())
    }

    /// Mutable access to the direct value, materialising it from the default.
    pub(crate) fn direct_mut(&mut self) -> &mut E {
        let default = &self.default;
        self.direct.get_or_insert_with(|| default.clone())
    }
}

impl<E: Element> PartialEq for MutableValue<E> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.direct == other.direct && self.default == other.default
    }
}

impl<E: Element> Debug for MutableValue<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableValue")
            .field("key", self.key.id())
            .field("value", self.get())
            .field("direct", &self.direct.is_some())
            .finish()
    }
}

// ============================================================================
// Type-erased values
// ============================================================================

/// Object-safe view of an [`ImmutableValue`] of any element type.
pub trait AnyValue: Any + Debug + Send + Sync {
    /// Identifier of the value's key.
    fn key_id(&self) -> &ResourceKey;

    /// Rust type name of the element type.
    fn element_type_name(&self) -> &'static str;

    /// `TypeId` of the element type.
    fn element_type(&self) -> TypeId;

    /// Returns `true` when the value satisfies its key's bounds.
    fn within_bounds(&self) -> bool;

    /// Content equality against another erased value.
    fn value_eq(&self, other: &dyn AnyValue) -> bool;

    /// Access for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A shared, type-erased immutable value.
pub type SharedValue = Arc<dyn AnyValue>;

impl<E: Element> AnyValue for ImmutableValue<E> {
    fn key_id(&self) -> &ResourceKey {
        self.key.id()
    }

    fn element_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn element_type(&self) -> TypeId {
        TypeId::of::<E>()
    }

    fn within_bounds(&self) -> bool {
        self.is_within_bounds()
    }

    fn value_eq(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<ImmutableValue<E>>()
            .is_some_and(|other| other == self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ResourceKey;
    use proptest::prelude::*;

    fn level_key() -> Key<u32> {
        Key::builder(ResourceKey::lodestone("level")).default_value(1).build()
    }

    #[test]
    fn test_get_falls_back_to_default() {
        let key = level_key();
        let value = ImmutableValue::default_only(&key, 1);
        assert_eq!(value.direct(), None);
        assert_eq!(*value.get(), 1);

        let set = value.with(7);
        assert_eq!(set.direct(), Some(&7));
        assert_eq!(*set.get(), 7);
        assert_eq!(*set.default_element(), 1);
    }

    #[test]
    fn test_new_uses_key_default_or_element() {
        let with_default = ImmutableValue::new(&level_key(), 5);
        assert_eq!(*with_default.default_element(), 1);

        let plain: Key<String> = Key::of(ResourceKey::lodestone("name"));
        let without_default = ImmutableValue::new(&plain, "Steve".to_string());
        assert_eq!(without_default.default_element(), "Steve");
    }

    #[test]
    fn test_mutable_copy_does_not_alias() {
        let key: Key<Vec<u8>> = Key::of(ResourceKey::lodestone("bytes"));
        let mut original = MutableValue::new(&key, vec![1, 2]);
        let mut copy = original.copy();

        copy.transform(|mut v| {
            v.push(3);
            v
        });
        original.set(vec![9]);

        assert_eq!(original.get(), &vec![9]);
        assert_eq!(copy.get(), &vec![1, 2, 3]);
    }

    #[test]
    fn test_bounded_value_accessors() {
        let key: Key<f64> = Key::builder(ResourceKey::lodestone("health"))
            .min(0.0)
            .max(20.0)
            .build();
        let value = ImmutableValue::new(&key, 25.0);
        assert!(!value.is_within_bounds());
        assert_eq!(value.minimum(), Some(&0.0));
        assert_eq!(value.maximum(), Some(&20.0));
        assert!(value.with(10.0).is_within_bounds());
    }

    #[test]
    fn test_shared_roundtrip_and_equality() {
        let key = level_key();
        let shared = ImmutableValue::new(&key, 3).into_shared();
        assert_eq!(shared.key_id(), key.id());

        let typed = ImmutableValue::<u32>::from_shared(&shared).unwrap();
        assert_eq!(*typed.get(), 3);
        assert!(ImmutableValue::<String>::from_shared(&shared).is_none());

        let same = ImmutableValue::new(&key, 3).into_shared();
        let other = ImmutableValue::new(&key, 4).into_shared();
        assert!(shared.value_eq(same.as_ref()));
        assert!(!shared.value_eq(other.as_ref()));
    }

    proptest! {
        #[test]
        fn prop_mutable_immutable_roundtrip(direct in proptest::option::of(any::<u32>()), default in any::<u32>()) {
            let key = level_key();
            let value = ImmutableValue::with_default(&key, direct, default);
            prop_assert_eq!(value.as_mutable().as_immutable(), value.clone());
            prop_assert_eq!(value.as_mutable_copy().as_immutable(), value);
        }
    }
}

//! Collection-flavoured values.
//!
//! Lists, sets, maps, optionals and weighted tables are ordinary
//! [`ImmutableValue`]/[`MutableValue`] instances whose element type is the
//! collection. The operations below are inherent impls on those concrete
//! types, so `ListValue<T>` is simply `ImmutableValue<Vec<T>>`.

use crate::value::{Element, ImmutableValue, MutableValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Immutable list value.
pub type ListValue<T> = ImmutableValue<Vec<T>>;
/// Mutable list value.
pub type MutableListValue<T> = MutableValue<Vec<T>>;
/// Immutable set value.
pub type SetValue<T> = ImmutableValue<BTreeSet<T>>;
/// Mutable set value.
pub type MutableSetValue<T> = MutableValue<BTreeSet<T>>;
/// Immutable map value.
pub type MapValue<K, V> = ImmutableValue<BTreeMap<K, V>>;
/// Mutable map value.
pub type MutableMapValue<K, V> = MutableValue<BTreeMap<K, V>>;
/// Immutable optional value.
pub type OptionalValue<T> = ImmutableValue<Option<T>>;
/// Mutable optional value.
pub type MutableOptionalValue<T> = MutableValue<Option<T>>;
/// Immutable weighted collection value.
pub type WeightedCollectionValue<T> = ImmutableValue<WeightedTable<T>>;
/// Mutable weighted collection value.
pub type MutableWeightedCollectionValue<T> = MutableValue<WeightedTable<T>>;

// ============================================================================
// Lists
// ============================================================================

impl<T: Element> ImmutableValue<Vec<T>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.get().contains(element)
    }

    pub fn contains_all<'a>(&self, elements: impl IntoIterator<Item = &'a T>) -> bool {
        elements.into_iter().all(|e| self.get().contains(e))
    }

    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.get().get(index)
    }

    pub fn index_of(&self, element: &T) -> Option<usize> {
        self.get().iter().position(|e| e == element)
    }

    pub fn with_element(&self, element: T) -> Self {
        self.transform(|mut list| {
            list.push(element);
            list
        })
    }

    pub fn with_all(&self, elements: impl IntoIterator<Item = T>) -> Self {
        self.transform(|mut list| {
            list.extend(elements);
            list
        })
    }

    /// Returns a copy with every occurrence of `element` removed.
    pub fn without(&self, element: &T) -> Self {
        self.transform(|mut list| {
            list.retain(|e| e != element);
            list
        })
    }

    /// Returns a copy without the element at `index`; out-of-range indices leave the list as is.
    pub fn without_index(&self, index: usize) -> Self {
        self.transform(|mut list| {
            if index < list.len() {
                list.remove(index);
            }
            list
        })
    }

    /// Returns a copy with `element` inserted at `index` (clamped to the end).
    pub fn with_index(&self, index: usize, element: T) -> Self {
        self.transform(|mut list| {
            let index = index.min(list.len());
            list.insert(index, element);
            list
        })
    }
}

impl<T: Element> MutableValue<Vec<T>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.get().contains(element)
    }

    pub fn add(&mut self, element: T) -> &mut Self {
        self.direct_mut().push(element);
        self
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.direct_mut().extend(elements);
        self
    }

    /// Inserts at `index`, clamped to the end of the list.
    pub fn insert(&mut self, index: usize, element: T) -> &mut Self {
        let list = self.direct_mut();
        let index = index.min(list.len());
        list.insert(index, element);
        self
    }

    pub fn remove_element(&mut self, element: &T) -> &mut Self {
        self.direct_mut().retain(|e| e != element);
        self
    }

    pub fn remove_index(&mut self, index: usize) -> Option<T> {
        let list = self.direct_mut();
        (index < list.len()).then(|| list.remove(index))
    }

    pub fn remove_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a T>) -> &mut Self {
        let doomed: Vec<&T> = elements.into_iter().collect();
        self.direct_mut().retain(|e| !doomed.contains(&e));
        self
    }

    pub fn retain(&mut self, predicate: impl FnMut(&T) -> bool) -> &mut Self {
        self.direct_mut().retain(predicate);
        self
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set_index(&mut self, index: usize, element: T) -> Option<T> {
        self.direct_mut()
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, element))
    }
}

// ============================================================================
// Sets
// ============================================================================

impl<T: Element + Ord> ImmutableValue<BTreeSet<T>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.get().contains(element)
    }

    pub fn contains_all<'a>(&self, elements: impl IntoIterator<Item = &'a T>) -> bool {
        elements.into_iter().all(|e| self.get().contains(e))
    }

    pub fn with_element(&self, element: T) -> Self {
        self.transform(|mut set| {
            set.insert(element);
            set
        })
    }

    pub fn with_all(&self, elements: impl IntoIterator<Item = T>) -> Self {
        self.transform(|mut set| {
            set.extend(elements);
            set
        })
    }

    pub fn without(&self, element: &T) -> Self {
        self.transform(|mut set| {
            set.remove(element);
            set
        })
    }

    pub fn without_all<'a>(&self, elements: impl IntoIterator<Item = &'a T>) -> Self {
        self.transform(|mut set| {
            for element in elements {
                set.remove(element);
            }
            set
        })
    }
}

impl<T: Element + Ord> MutableValue<BTreeSet<T>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn contains(&self, element: &T) -> bool {
        self.get().contains(element)
    }

    pub fn add(&mut self, element: T) -> &mut Self {
        self.direct_mut().insert(element);
        self
    }

    pub fn add_all(&mut self, elements: impl IntoIterator<Item = T>) -> &mut Self {
        self.direct_mut().extend(elements);
        self
    }

    pub fn remove_element(&mut self, element: &T) -> &mut Self {
        self.direct_mut().remove(element);
        self
    }

    pub fn remove_all<'a>(&mut self, elements: impl IntoIterator<Item = &'a T>) -> &mut Self {
        let set = self.direct_mut();
        for element in elements {
            set.remove(element);
        }
        self
    }

    pub fn retain(&mut self, predicate: impl FnMut(&T) -> bool) -> &mut Self {
        self.direct_mut().retain(predicate);
        self
    }
}

// ============================================================================
// Maps
// ============================================================================

impl<K: Element + Ord, V: Element> ImmutableValue<BTreeMap<K, V>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn get_entry(&self, key: &K) -> Option<&V> {
        self.get().get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get().contains_key(key)
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.get().values().any(|v| v == value)
    }

    pub fn keys(&self) -> Vec<&K> {
        self.get().keys().collect()
    }

    pub fn values(&self) -> Vec<&V> {
        self.get().values().collect()
    }

    pub fn with_entry(&self, key: K, value: V) -> Self {
        self.transform(|mut map| {
            map.insert(key, value);
            map
        })
    }

    pub fn with_all_entries(&self, entries: impl IntoIterator<Item = (K, V)>) -> Self {
        self.transform(|mut map| {
            map.extend(entries);
            map
        })
    }

    pub fn without_key(&self, key: &K) -> Self {
        self.transform(|mut map| {
            map.remove(key);
            map
        })
    }
}

impl<K: Element + Ord, V: Element> MutableValue<BTreeMap<K, V>> {
    pub fn len(&self) -> usize {
        self.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_empty()
    }

    pub fn get_entry(&self, key: &K) -> Option<&V> {
        self.get().get(key)
    }

    /// Inserts an entry, returning the value it replaced.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        self.direct_mut().insert(key, value)
    }

    pub fn put_all(&mut self, entries: impl IntoIterator<Item = (K, V)>) -> &mut Self {
        self.direct_mut().extend(entries);
        self
    }

    pub fn remove_key(&mut self, key: &K) -> Option<V> {
        self.direct_mut().remove(key)
    }

    pub fn remove_all_keys<'a>(&mut self, keys: impl IntoIterator<Item = &'a K>) -> &mut Self {
        let map = self.direct_mut();
        for key in keys {
            map.remove(key);
        }
        self
    }

    pub fn retain(&mut self, mut predicate: impl FnMut(&K, &V) -> bool) -> &mut Self {
        self.direct_mut().retain(|k, v| predicate(k, v));
        self
    }
}

// ============================================================================
// Optionals
// ============================================================================

impl<T: Element> ImmutableValue<Option<T>> {
    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    /// The present element, or `fallback` when empty.
    pub fn or_else(&self, fallback: T) -> T {
        self.get().clone().unwrap_or(fallback)
    }

    pub fn with_element(&self, element: Option<T>) -> Self {
        self.with(element)
    }
}

impl<T: Element> MutableValue<Option<T>> {
    pub fn is_present(&self) -> bool {
        self.get().is_some()
    }

    pub fn or_else(&self, fallback: T) -> T {
        self.get().clone().unwrap_or(fallback)
    }

    pub fn set_element(&mut self, element: Option<T>) -> &mut Self {
        self.set(element)
    }
}

// ============================================================================
// Weighted tables
// ============================================================================

/// An ordered table of entries with relative weights.
///
/// Selection is deterministic for a given roll, which keeps the table usable
/// from tests and from whatever randomness source the runtime prefers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTable<T> {
    entries: Vec<(T, f64)>,
}

impl<T> Default for WeightedTable<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> WeightedTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Non-positive or non-finite weights are ignored.
    pub fn add(&mut self, entry: T, weight: f64) -> bool {
        if weight.is_finite() && weight > 0.0 {
            self.entries.push((entry, weight));
            true
        } else {
            false
        }
    }

    pub fn entries(&self) -> &[(T, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// Picks the entry covering `roll * total_weight`, for `roll` in `[0, 1)`.
    pub fn select(&self, roll: f64) -> Option<&T> {
        if self.entries.is_empty() || !(0.0..1.0).contains(&roll) {
            return None;
        }
        let target = roll * self.total_weight();
        let mut cumulative = 0.0;
        for (entry, weight) in &self.entries {
            cumulative += weight;
            if target < cumulative {
                return Some(entry);
            }
        }
        self.entries.last().map(|(entry, _)| entry)
    }
}

impl<T: Element> ImmutableValue<WeightedTable<T>> {
    /// Entries and their weights, in insertion order.
    pub fn entries(&self) -> &[(T, f64)] {
        self.get().entries()
    }

    pub fn total_weight(&self) -> f64 {
        self.get().total_weight()
    }

    pub fn select(&self, roll: f64) -> Option<&T> {
        self.get().select(roll)
    }

    pub fn with_weighted(&self, entry: T, weight: f64) -> Self {
        self.transform(|mut table| {
            table.add(entry, weight);
            table
        })
    }
}

impl<T: Element> MutableValue<WeightedTable<T>> {
    /// Entries and their weights, in insertion order.
    pub fn entries(&self) -> &[(T, f64)] {
        self.get().entries()
    }

    pub fn total_weight(&self) -> f64 {
        self.get().total_weight()
    }

    pub fn select(&self, roll: f64) -> Option<&T> {
        self.get().select(roll)
    }

    pub fn add_weighted(&mut self, entry: T, weight: f64) -> &mut Self {
        self.direct_mut().add(entry, weight);
        self
    }
}

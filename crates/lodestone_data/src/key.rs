//! # Keys
//!
//! Keys are the typed identifiers used to address values inside a
//! [`ValueContainer`](crate::ValueContainer). A key carries its element type
//! in the type system, so a lookup through `Key<u32>` can only ever produce a
//! `u32`, without any casting at the call site.
//!
//! Every key is identified by a [`ResourceKey`] (`namespace:value`). Two keys
//! with the same id are the same key; the [`KeyRegistry`](crate::KeyRegistry)
//! makes sure one id is never reused for a different element type.

use crate::error::DataError;
use crate::value::Element;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Namespace used by [`ResourceKey::lodestone`].
pub const DEFAULT_NAMESPACE: &str = "lodestone";

// ============================================================================
// Resource keys
// ============================================================================

/// A `namespace:value` identifier for keys, context keys and catalog entries.
///
/// # Examples
///
/// ```rust
/// use lodestone_data::ResourceKey;
///
/// let key = ResourceKey::parse("lodestone:health").unwrap();
/// assert_eq!(key, ResourceKey::lodestone("health"));
/// assert_eq!(key.to_string(), "lodestone:health");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceKey {
    namespace: CompactString,
    value: CompactString,
}

impl ResourceKey {
    /// Creates a resource key from its two halves.
    pub fn new(namespace: &str, value: &str) -> Self {
        Self {
            namespace: CompactString::new(namespace),
            value: CompactString::new(value),
        }
    }

    /// Creates a resource key in the default `lodestone` namespace.
    pub fn lodestone(value: &str) -> Self {
        Self::new(DEFAULT_NAMESPACE, value)
    }

    /// Parses a `namespace:value` string.
    ///
    /// # Returns
    ///
    /// Returns `Err(DataError::MalformedKey)` unless the string contains exactly
    /// one `:` with non-empty text on both sides.
    pub fn parse(s: &str) -> Result<Self, DataError> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(value), None) if !ns.is_empty() && !value.is_empty() => {
                Ok(Self::new(ns, value))
            }
            _ => Err(DataError::MalformedKey(s.to_string())),
        }
    }

    /// The namespace half.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The value half.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.value)
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.to_string()
    }
}

// ============================================================================
// Typed keys
// ============================================================================

type BoundsCheck<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Inclusive bounds declared by a bounded key.
///
/// Either end may be open. The check closure is captured when the key is
/// built, which is where the `PartialOrd` requirement is enforced.
#[derive(Clone)]
pub struct Bounds<E> {
    min: Option<E>,
    max: Option<E>,
    check: BoundsCheck<E>,
}

impl<E> Bounds<E> {
    /// Lower bound, if any.
    pub fn min(&self) -> Option<&E> {
        self.min.as_ref()
    }

    /// Upper bound, if any.
    pub fn max(&self) -> Option<&E> {
        self.max.as_ref()
    }

    /// Returns `true` when `value` lies within the bounds.
    pub fn contains(&self, value: &E) -> bool {
        (self.check)(value)
    }
}

impl<E: fmt::Debug> fmt::Debug for Bounds<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bounds")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

struct KeyInner<E> {
    id: ResourceKey,
    default_value: Option<E>,
    bounds: Option<Bounds<E>>,
}

/// A typed identifier addressing a value of element type `E`.
///
/// Keys are cheap to clone and compare by id only.
///
/// # Examples
///
/// ```rust
/// use lodestone_data::{Key, ResourceKey};
///
/// let health: Key<f64> = Key::builder(ResourceKey::lodestone("health"))
///     .default_value(20.0)
///     .min(0.0)
///     .max(20.0)
///     .build();
///
/// assert!(health.is_bounded());
/// assert_eq!(health.default_value(), Some(&20.0));
/// ```
pub struct Key<E> {
    inner: Arc<KeyInner<E>>,
}

impl<E: Element> Key<E> {
    /// Starts building a key with the given id.
    pub fn builder(id: ResourceKey) -> KeyBuilder<E> {
        KeyBuilder {
            id,
            default_value: None,
            min: None,
            max: None,
            check: None,
        }
    }

    /// Shorthand for an unbounded key without a default.
    pub fn of(id: ResourceKey) -> Self {
        Self::builder(id).build()
    }

    /// The key's identifier.
    pub fn id(&self) -> &ResourceKey {
        &self.inner.id
    }

    /// Value reported by containers that support this key but hold no direct value.
    pub fn default_value(&self) -> Option<&E> {
        self.inner.default_value.as_ref()
    }

    /// Bounds of a bounded key.
    pub fn bounds(&self) -> Option<&Bounds<E>> {
        self.inner.bounds.as_ref()
    }

    /// Returns `true` when the key was built with a minimum or maximum.
    pub fn is_bounded(&self) -> bool {
        self.inner.bounds.is_some()
    }

    /// Returns `true` when `value` is acceptable for this key.
    pub fn accepts(&self, value: &E) -> bool {
        self.inner
            .bounds
            .as_ref()
            .map_or(true, |bounds| bounds.contains(value))
    }

    /// Rust type name of the element type.
    pub fn element_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    /// Type-erased description of this key, used by the key registry.
    pub fn descriptor(&self) -> KeyDescriptor {
        KeyDescriptor {
            id: self.inner.id.clone(),
            element_type: TypeId::of::<E>(),
            element_type_name: self.element_type_name(),
            bounded: self.is_bounded(),
        }
    }
}

impl<E> Clone for Key<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> PartialEq for Key<E> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<E> Eq for Key<E> {}

impl<E> Hash for Key<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl<E> fmt::Debug for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.inner.id)
    }
}

impl<E> fmt::Display for Key<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.id)
    }
}

/// Builder for [`Key`].
pub struct KeyBuilder<E> {
    id: ResourceKey,
    default_value: Option<E>,
    min: Option<E>,
    max: Option<E>,
    check: Option<BoundsCheck<E>>,
}

impl<E: Element> KeyBuilder<E> {
    /// Sets the value containers report when the key is supported but unset.
    pub fn default_value(mut self, value: E) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Builds the key.
    pub fn build(self) -> Key<E> {
        let bounds = self.check.map(|check| Bounds {
            min: self.min,
            max: self.max,
            check,
        });
        Key {
            inner: Arc::new(KeyInner {
                id: self.id,
                default_value: self.default_value,
                bounds,
            }),
        }
    }
}

impl<E: Element + PartialOrd> KeyBuilder<E> {
    /// Declares an inclusive lower bound, turning this into a bounded key.
    pub fn min(mut self, min: E) -> Self {
        self.min = Some(min);
        self.refresh_check();
        self
    }

    /// Declares an inclusive upper bound, turning this into a bounded key.
    pub fn max(mut self, max: E) -> Self {
        self.max = Some(max);
        self.refresh_check();
        self
    }

    fn refresh_check(&mut self) {
        let min = self.min.clone();
        let max = self.max.clone();
        self.check = Some(Arc::new(move |value: &E| {
            min.as_ref().map_or(true, |min| value >= min)
                && max.as_ref().map_or(true, |max| value <= max)
        }));
    }
}

/// Type-erased description of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// Key identifier
    pub id: ResourceKey,
    /// `TypeId` of the element type
    pub element_type: TypeId,
    /// Human-readable element type
    pub element_type_name: &'static str,
    /// Whether the key declares bounds
    pub bounded: bool,
}

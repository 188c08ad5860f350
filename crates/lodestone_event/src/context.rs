//! # Event contexts
//!
//! An [`EventContext`] is an immutable, typed side table attached to every
//! [`Cause`](crate::Cause). Entries are addressed by [`EventContextKey`]s,
//! which carry the entry type in the type system so lookups never need a cast
//! at the call site.
//!
//! Standard keys live in [`event_context_keys`]; plugins create their own with
//! [`event_context_keys::key`].

use crate::cause::{downcast_ref, same_object, CauseObject};
use crate::error::ContextError;
use lodestone_data::ResourceKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Context keys
// ============================================================================

/// Typed key for an [`EventContext`] entry.
///
/// Keys compare by id only.
pub struct EventContextKey<T> {
    id: ResourceKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: CauseObject> EventContextKey<T> {
    pub fn new(id: ResourceKey) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &ResourceKey {
        &self.id
    }
}

impl<T> Clone for EventContextKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for EventContextKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for EventContextKey<T> {}

impl<T> Hash for EventContextKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for EventContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventContextKey({})", self.id)
    }
}

impl<T> fmt::Display for EventContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A position in a world, used by the [`event_context_keys::LOCATION`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// World the position belongs to
    pub world: ResourceKey,
    /// Block or entity coordinates
    pub position: [f64; 3],
}

/// Standard context keys.
///
/// ```rust
/// use lodestone_event::{event_context_keys, EventContext};
/// use uuid::Uuid;
///
/// let player = Uuid::new_v4();
/// let context = EventContext::builder()
///     .add(&event_context_keys::PLAYER, player)
///     .unwrap()
///     .build();
/// assert_eq!(context.get(&event_context_keys::PLAYER), Some(&player));
/// ```
pub mod event_context_keys {
    use super::{EventContextKey, Location};
    use crate::cause::CauseObject;
    use crate::plugin::PluginContainer;
    use lodestone_data::ResourceKey;
    use uuid::Uuid;

    lazy_static::lazy_static! {
        /// The plugin responsible for the action.
        pub static ref PLUGIN: EventContextKey<PluginContainer> = key(ResourceKey::lodestone("plugin"));
        /// The player who performed the action.
        pub static ref PLAYER: EventContextKey<Uuid> = key(ResourceKey::lodestone("player"));
        /// The player who created the affected object.
        pub static ref CREATOR: EventContextKey<Uuid> = key(ResourceKey::lodestone("creator"));
        /// The player who last notified the affected object.
        pub static ref NOTIFIER: EventContextKey<Uuid> = key(ResourceKey::lodestone("notifier"));
        /// The raw command line being processed.
        pub static ref COMMAND: EventContextKey<String> = key(ResourceKey::lodestone("command"));
        pub static ref DAMAGE_TYPE: EventContextKey<ResourceKey> = key(ResourceKey::lodestone("damage_type"));
        pub static ref SPAWN_TYPE: EventContextKey<ResourceKey> = key(ResourceKey::lodestone("spawn_type"));
        pub static ref MOVEMENT_TYPE: EventContextKey<ResourceKey> = key(ResourceKey::lodestone("movement_type"));
        /// Item type used to perform the action.
        pub static ref USED_ITEM: EventContextKey<ResourceKey> = key(ResourceKey::lodestone("used_item"));
        pub static ref LOCATION: EventContextKey<Location> = key(ResourceKey::lodestone("location"));
        /// A player simulated by a plugin or fake-player mechanism.
        pub static ref SIMULATED_PLAYER: EventContextKey<Uuid> = key(ResourceKey::lodestone("simulated_player"));
    }

    /// Creates a custom context key.
    pub fn key<T: CauseObject>(id: ResourceKey) -> EventContextKey<T> {
        EventContextKey::new(id)
    }
}

// ============================================================================
// Context
// ============================================================================

type Entries = BTreeMap<ResourceKey, Arc<dyn CauseObject>>;

/// Immutable map of typed context entries.
///
/// Cloning shares the underlying map. Two contexts are equal when they hold
/// the same keys mapped to equal objects.
///
/// # Examples
///
/// ```rust
/// use lodestone_event::{event_context_keys, EventContext};
///
/// let context = EventContext::builder()
///     .add(&event_context_keys::COMMAND, "say hello".to_string())
///     .unwrap()
///     .build();
///
/// assert_eq!(context.get(&event_context_keys::COMMAND).map(String::as_str), Some("say hello"));
/// assert!(context.get(&event_context_keys::PLAYER).is_none());
/// ```
#[derive(Clone, Default)]
pub struct EventContext {
    entries: Arc<Entries>,
}

impl EventContext {
    /// The empty context.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> EventContextBuilder {
        EventContextBuilder::default()
    }

    pub(crate) fn from_entries(entries: Entries) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub(crate) fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Typed entry for `key`.
    pub fn get<T: CauseObject>(&self, key: &EventContextKey<T>) -> Option<&T> {
        self.entries
            .get(key.id())
            .and_then(downcast_ref::<T>)
    }

    /// Typed entry for `key`, or `ContextError::MissingKey`.
    pub fn require<T: CauseObject>(&self, key: &EventContextKey<T>) -> Result<&T, ContextError> {
        self.get(key)
            .ok_or_else(|| ContextError::MissingKey(key.id().clone()))
    }

    pub fn contains_key<T>(&self, key: &EventContextKey<T>) -> bool {
        self.entries.contains_key(&key.id)
    }

    /// Ids of all entries, sorted.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for EventContext {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.entries, &other.entries) {
            return true;
        }
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(id, value)| {
                other
                    .entries
                    .get(id)
                    .is_some_and(|theirs| same_object(value, theirs))
            })
    }
}

impl fmt::Debug for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context[")?;
        for (index, (id, value)) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "\"{}\"={:?}", id, value)?;
        }
        write!(f, "]")
    }
}

/// Builder for [`EventContext`].
#[derive(Default)]
pub struct EventContextBuilder {
    entries: Entries,
}

impl EventContextBuilder {
    /// Adds an entry.
    ///
    /// # Returns
    ///
    /// `Err(ContextError::DuplicateKey)` when `key` was already added.
    pub fn add<T: CauseObject>(self, key: &EventContextKey<T>, value: T) -> Result<Self, ContextError> {
        self.add_shared(key.id().clone(), Arc::new(value))
    }

    pub(crate) fn add_shared(mut self, id: ResourceKey, value: Arc<dyn CauseObject>) -> Result<Self, ContextError> {
        if self.entries.contains_key(&id) {
            return Err(ContextError::DuplicateKey(id));
        }
        self.entries.insert(id, value);
        Ok(self)
    }

    /// Copies every entry of `context`, replacing entries already held.
    pub fn from(mut self, context: &EventContext) -> Self {
        for (id, value) in context.entries.iter() {
            self.entries.insert(id.clone(), Arc::clone(value));
        }
        self
    }

    pub fn reset(mut self) -> Self {
        self.entries.clear();
        self
    }

    pub fn build(self) -> EventContext {
        EventContext::from_entries(self.entries)
    }
}

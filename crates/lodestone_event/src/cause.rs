//! # Causes
//!
//! A [`Cause`] is the ordered provenance chain of an event: the objects that
//! directly or indirectly led to it, most immediate first, together with an
//! [`EventContext`]. A cause always holds at least one element.
//!
//! Elements are arbitrary shared objects ([`CauseObject`]) compared by value:
//! the builder collapses an element equal to the element it would follow, and
//! two causes are equal when they hold equal objects in the same order.

use crate::context::EventContext;
use crate::error::CauseError;
use std::any::{Any, TypeId};
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Anything that can appear in a cause or an event context.
///
/// Implemented automatically for every `'static` type that is `Debug`,
/// `PartialEq`, `Send` and `Sync`.
pub trait CauseObject: Any + Debug + Send + Sync {
    /// Access for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Value equality across erased objects. Objects of different types are
    /// never equal.
    fn dyn_eq(&self, other: &dyn CauseObject) -> bool;

    /// Rust type name of the object.
    fn type_name(&self) -> &'static str;

    /// Converts a shared object for `Arc::downcast`.
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Debug + PartialEq + Send + Sync> CauseObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CauseObject) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A shared cause element.
pub type SharedCause = Arc<dyn CauseObject>;

/// Typed view of a shared cause element.
///
/// Use this rather than calling `as_any` on the `Arc` itself, which would
/// resolve to the `Arc` and never match.
pub fn downcast_ref<T: Any>(object: &SharedCause) -> Option<&T> {
    let object: &dyn CauseObject = object.as_ref();
    object.as_any().downcast_ref::<T>()
}

/// Whether two shared elements hold equal objects.
pub(crate) fn same_object(a: &SharedCause, b: &SharedCause) -> bool {
    Arc::ptr_eq(a, b) || (**a).dyn_eq(&**b)
}

fn is_a<T: Any>(object: &SharedCause) -> bool {
    let object: &dyn CauseObject = object.as_ref();
    object.as_any().type_id() == TypeId::of::<T>()
}

// ============================================================================
// Cause
// ============================================================================

/// Ordered, non-empty provenance chain of an event.
///
/// # Examples
///
/// ```rust
/// use lodestone_event::{downcast_ref, Cause, EventContext};
///
/// let cause = Cause::of_all(EventContext::empty(), ["A", "B", "A"]).unwrap();
///
/// assert_eq!(cause.len(), 3);
/// assert_eq!(cause.first::<&str>(), Some(&"A"));
/// assert_eq!(cause.element_before(2).and_then(downcast_ref::<&str>), Some(&"B"));
/// ```
#[derive(Clone)]
pub struct Cause {
    context: EventContext,
    elements: Arc<[SharedCause]>,
}

impl Cause {
    pub fn builder() -> CauseBuilder {
        CauseBuilder::default()
    }

    /// A cause with a single element.
    pub fn of<T: CauseObject>(context: EventContext, object: T) -> Self {
        Self::of_shared(context, Arc::new(object))
    }

    /// A cause with a single, already shared element.
    pub fn of_shared(context: EventContext, object: SharedCause) -> Self {
        Self {
            context,
            elements: Arc::from(vec![object]),
        }
    }

    /// A cause holding every object of `objects`, in order.
    ///
    /// # Returns
    ///
    /// `Err(CauseError::EmptyCause)` when `objects` is empty.
    pub fn of_all<T, I>(context: EventContext, objects: I) -> Result<Self, CauseError>
    where
        T: CauseObject,
        I: IntoIterator<Item = T>,
    {
        objects
            .into_iter()
            .fold(Self::builder(), |builder, object| builder.append(object))
            .build(context)
    }

    pub fn context(&self) -> &EventContext {
        &self.context
    }

    /// The most immediate element.
    pub fn root(&self) -> &SharedCause {
        &self.elements[0]
    }

    /// First element of type `T`.
    pub fn first<T: Any>(&self) -> Option<&T> {
        self.elements.iter().find_map(downcast_ref::<T>)
    }

    /// Last element of type `T`.
    pub fn last<T: Any>(&self) -> Option<&T> {
        self.elements.iter().rev().find_map(downcast_ref::<T>)
    }

    /// Element preceding the first `T` that has a predecessor.
    pub fn before<T: Any>(&self) -> Option<&SharedCause> {
        self.elements
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, element)| is_a::<T>(element))
            .map(|(index, _)| &self.elements[index - 1])
    }

    /// Element following the first `T` that has a successor.
    pub fn after<T: Any>(&self) -> Option<&SharedCause> {
        let last = self.elements.len() - 1;
        self.elements
            .iter()
            .enumerate()
            .take(last)
            .find(|(_, element)| is_a::<T>(element))
            .map(|(index, _)| &self.elements[index + 1])
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<&SharedCause> {
        self.elements.get(index)
    }

    /// Element directly preceding position `index`.
    pub fn element_before(&self, index: usize) -> Option<&SharedCause> {
        index.checked_sub(1).and_then(|previous| self.elements.get(previous))
    }

    /// Element directly following position `index`.
    pub fn element_after(&self, index: usize) -> Option<&SharedCause> {
        if index >= self.elements.len() {
            return None;
        }
        self.elements.get(index + 1)
    }

    pub fn contains_type<T: Any>(&self) -> bool {
        self.elements.iter().any(is_a::<T>)
    }

    /// Whether any element of type `T` equals `value`.
    pub fn contains<T: Any + PartialEq>(&self, value: &T) -> bool {
        self.elements
            .iter()
            .filter_map(downcast_ref::<T>)
            .any(|element| element == value)
    }

    /// Every element of type `T`, in order.
    pub fn all_of<T: Any>(&self) -> Vec<&T> {
        self.elements.iter().filter_map(downcast_ref::<T>).collect()
    }

    /// Every element that is not a `T`, in order.
    pub fn none_of<T: Any>(&self) -> Vec<&SharedCause> {
        self.elements
            .iter()
            .filter(|element| !is_a::<T>(element))
            .collect()
    }

    pub fn all(&self) -> &[SharedCause] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SharedCause> {
        self.elements.iter()
    }

    /// Always at least 1.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// A new cause with `object` appended. The context is kept.
    pub fn with<T: CauseObject>(&self, object: T) -> Self {
        self.with_shared(Arc::new(object))
    }

    pub fn with_shared(&self, object: SharedCause) -> Self {
        self.extend(std::iter::once(object))
    }

    /// A new cause with every object of `objects` appended.
    pub fn with_all<T, I>(&self, objects: I) -> Self
    where
        T: CauseObject,
        I: IntoIterator<Item = T>,
    {
        self.extend(objects.into_iter().map(|object| Arc::new(object) as SharedCause))
    }

    /// A new cause with the elements of `other` appended. Only this cause's context is kept.
    pub fn with_cause(&self, other: &Cause) -> Self {
        self.extend(other.elements.iter().cloned())
    }

    fn extend(&self, objects: impl IntoIterator<Item = SharedCause>) -> Self {
        let builder = objects
            .into_iter()
            .fold(Self::builder().from(self), |builder, object| builder.append_shared(object));
        Self {
            context: self.context.clone(),
            elements: Arc::from(builder.elements),
        }
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        self.elements.len() == other.elements.len()
            && self
                .elements
                .iter()
                .zip(other.elements.iter())
                .all(|(a, b)| same_object(a, b))
    }
}

impl<'a> IntoIterator for &'a Cause {
    type Item = &'a SharedCause;
    type IntoIter = std::slice::Iter<'a, SharedCause>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cause")
            .field("context", &self.context)
            .field("elements", &self.elements)
            .finish()
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cause[Context={}, Stack={{", self.context)?;
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", element)?;
        }
        write!(f, "}}]")
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Cause`].
#[derive(Debug, Default)]
pub struct CauseBuilder {
    elements: Vec<SharedCause>,
}

impl CauseBuilder {
    /// Appends `object`.
    pub fn append<T: CauseObject>(self, object: T) -> Self {
        self.append_shared(Arc::new(object))
    }

    /// Appends a shared object unless it equals the object currently last.
    pub fn append_shared(mut self, object: SharedCause) -> Self {
        if self
            .elements
            .last()
            .is_some_and(|last| same_object(last, &object))
        {
            return self;
        }
        self.elements.push(object);
        self
    }

    /// Appends every shared object, applying the same rule as [`append_shared`](Self::append_shared).
    pub fn append_all(self, objects: impl IntoIterator<Item = SharedCause>) -> Self {
        objects
            .into_iter()
            .fold(self, |builder, object| builder.append_shared(object))
    }

    /// Inserts `object` at `position`, clamped to the current length.
    pub fn insert<T: CauseObject>(self, position: usize, object: T) -> Self {
        self.insert_shared(position, Arc::new(object))
    }

    pub fn insert_shared(mut self, position: usize, object: SharedCause) -> Self {
        let position = position.min(self.elements.len());
        self.elements.insert(position, object);
        self
    }

    /// Appends every element of `cause` as-is.
    pub fn from(mut self, cause: &Cause) -> Self {
        self.elements.extend(cause.elements.iter().cloned());
        self
    }

    pub fn reset(mut self) -> Self {
        self.elements.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Builds the cause.
    ///
    /// # Returns
    ///
    /// `Err(CauseError::EmptyCause)` when nothing was appended.
    pub fn build(self, context: EventContext) -> Result<Cause, CauseError> {
        if self.elements.is_empty() {
            return Err(CauseError::EmptyCause);
        }
        Ok(Cause {
            context,
            elements: Arc::from(self.elements),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{event_context_keys, EventContext};
    use proptest::prelude::*;

    fn text(element: &SharedCause) -> Option<&'static str> {
        downcast_ref::<&'static str>(element).copied()
    }

    #[test]
    fn test_chain_keeps_non_adjacent_repeats() {
        let cause = Cause::of_all(EventContext::empty(), ["A", "B", "A"]).unwrap();

        assert_eq!(cause.len(), 3);
        assert_eq!(text(cause.root()), Some("A"));
        assert_eq!(cause.first::<&str>(), Some(&"A"));
        assert_eq!(cause.last::<&str>(), Some(&"A"));
        assert!(std::ptr::eq(cause.last::<&str>().unwrap(), downcast_ref::<&str>(&cause.all()[2]).unwrap()));
        assert_eq!(cause.element_before(2).and_then(text), Some("B"));
        assert_eq!(cause.element_after(0).and_then(text), Some("B"));
        assert!(cause.element_before(0).is_none());
        assert!(cause.element_after(2).is_none());

        // The type scan skips the match at index 0.
        assert_eq!(cause.before::<&str>().and_then(text), Some("A"));
        assert_eq!(cause.after::<&str>().and_then(text), Some("B"));
    }

    #[test]
    fn test_type_queries() {
        let player = uuid::Uuid::new_v4();
        let cause = Cause::builder()
            .append(player)
            .append("plugin:guilds")
            .append(42u32)
            .build(EventContext::empty())
            .unwrap();

        assert!(cause.contains_type::<u32>());
        assert!(!cause.contains_type::<i64>());
        assert!(cause.contains(&player));
        assert!(!cause.contains(&7u32));
        assert_eq!(cause.all_of::<u32>(), vec![&42]);
        assert_eq!(cause.none_of::<u32>().len(), 2);
        assert_eq!(cause.before::<u32>().and_then(text), Some("plugin:guilds"));
        assert!(cause.after::<u32>().is_none());
        assert!(cause.before::<uuid::Uuid>().is_none());
    }

    #[test]
    fn test_empty_cause_is_rejected() {
        assert_eq!(Cause::builder().build(EventContext::empty()).unwrap_err(), CauseError::EmptyCause);
        let none: [&str; 0] = [];
        assert!(Cause::of_all(EventContext::empty(), none).is_err());
    }

    #[test]
    fn test_with_applies_adjacent_suppression() {
        let shared: SharedCause = Arc::new("block");
        let cause = Cause::of_shared(EventContext::empty(), Arc::clone(&shared));

        let same = cause.with_shared(Arc::clone(&shared));
        assert_eq!(same.len(), 1);

        let extended = cause.with("entity").with_cause(&same);
        assert_eq!(extended.len(), 3);
        assert_eq!(extended.context(), cause.context());
    }

    #[test]
    fn test_insert_and_reset() {
        let cause = Cause::builder()
            .append("b")
            .insert(0, "a")
            .insert(99, "c")
            .build(EventContext::empty())
            .unwrap();
        let texts: Vec<_> = cause.iter().filter_map(text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert!(Cause::builder().from(&cause).reset().is_empty());
    }

    #[test]
    fn test_equality_is_by_value() {
        let shared: SharedCause = Arc::new("A");
        let a = Cause::of_shared(EventContext::empty(), Arc::clone(&shared));
        let b = Cause::of_shared(EventContext::empty(), shared);
        assert_eq!(a, b);

        assert_eq!(Cause::of(EventContext::empty(), 7u64), Cause::of(EventContext::empty(), 7u64));
        assert_ne!(Cause::of(EventContext::empty(), 7u64), Cause::of(EventContext::empty(), 8u64));
        // Same printed value, different types
        assert_ne!(Cause::of(EventContext::empty(), 7u64), Cause::of(EventContext::empty(), 7u32));
        assert_ne!(
            Cause::of(EventContext::empty(), "A"),
            Cause::of_all(EventContext::empty(), ["A", "B"]).unwrap()
        );
    }

    #[test]
    fn test_appending_equal_values_keeps_one() {
        let cause = Cause::builder()
            .append(5u64)
            .append(5u64)
            .append("x")
            .append(5u64)
            .build(EventContext::empty())
            .unwrap();
        assert_eq!(cause.len(), 3);
        assert_eq!(cause.all_of::<u64>(), vec![&5, &5]);

        let extended = cause.with(5u64).with(6u64);
        assert_eq!(extended.len(), 4);
    }

    #[test]
    fn test_display() {
        let context = EventContext::builder()
            .add(&event_context_keys::COMMAND, "kill".to_string())
            .unwrap()
            .build();
        let cause = Cause::of_all(context, ["A", "B"]).unwrap();
        assert_eq!(
            cause.to_string(),
            "Cause[Context=Context[\"lodestone:command\"=\"kill\"], Stack={\"A\", \"B\"}]"
        );
    }

    proptest! {
        #[test]
        fn prop_root_is_first_element(values in proptest::collection::vec(any::<u32>(), 1..16)) {
            let cause = Cause::of_all(EventContext::empty(), values.clone()).unwrap();
            prop_assert!(cause.len() >= 1);
            prop_assert!(Arc::ptr_eq(cause.root(), &cause.all()[0]));

            let mut collapsed = values;
            collapsed.dedup();
            prop_assert_eq!(cause.all_of::<u32>(), collapsed.iter().collect::<Vec<_>>());
        }

        #[test]
        fn prop_appending_equal_value_twice_keeps_one(value in any::<u64>()) {
            let cause = Cause::builder()
                .append(value)
                .append(value)
                .build(EventContext::empty())
                .unwrap();
            prop_assert_eq!(cause.len(), 1);
        }

        #[test]
        fn prop_appending_same_object_twice_keeps_one(value in any::<u64>()) {
            let shared: SharedCause = Arc::new(value);
            let cause = Cause::builder()
                .append_shared(Arc::clone(&shared))
                .append_shared(Arc::clone(&shared))
                .build(EventContext::empty())
                .unwrap();
            prop_assert_eq!(cause.len(), 1);
        }
    }
}

//! Merge policies used when two containers disagree about a key.

use crate::error::DataError;
use crate::value::SharedValue;
use std::fmt;
use std::sync::Arc;

type MergeFn =
    dyn Fn(Option<&SharedValue>, Option<&SharedValue>) -> Result<SharedValue, DataError> + Send + Sync;

/// Resolves an `(original, replacement)` pair into the value to keep.
///
/// Either side may be absent, but not both: merging two absent values is
/// [`DataError::NothingToMerge`]. A merge never yields an absent value.
///
/// # Examples
///
/// ```rust
/// use lodestone_data::{ImmutableValue, Key, MergeFunction, ResourceKey};
///
/// let key: Key<u32> = Key::of(ResourceKey::lodestone("level"));
/// let old = ImmutableValue::new(&key, 1).into_shared();
/// let new = ImmutableValue::new(&key, 2).into_shared();
///
/// let kept = MergeFunction::replacement_preferred().merge(Some(&old), Some(&new)).unwrap();
/// assert!(kept.value_eq(new.as_ref()));
/// ```
#[derive(Clone)]
pub struct MergeFunction {
    name: &'static str,
    func: Arc<MergeFn>,
}

impl MergeFunction {
    /// Builds a custom policy.
    pub fn from_fn<F>(name: &'static str, func: F) -> Self
    where
        F: Fn(Option<&SharedValue>, Option<&SharedValue>) -> Result<SharedValue, DataError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            func: Arc::new(func),
        }
    }

    /// Keeps the replacement whenever it is present.
    pub fn replacement_preferred() -> Self {
        Self::from_fn("replacement_preferred", |original, replacement| {
            replacement
                .or(original)
                .cloned()
                .ok_or(DataError::NothingToMerge)
        })
    }

    /// Keeps the original whenever it is present.
    pub fn original_preferred() -> Self {
        Self::from_fn("original_preferred", |original, replacement| {
            original
                .or(replacement)
                .cloned()
                .ok_or(DataError::NothingToMerge)
        })
    }

    /// Policy used by `copy_from` when none is given: existing data is left alone.
    pub fn ignore_all() -> Self {
        Self {
            name: "ignore_all",
            ..Self::original_preferred()
        }
    }

    /// Applies the policy.
    pub fn merge(
        &self,
        original: Option<&SharedValue>,
        replacement: Option<&SharedValue>,
    ) -> Result<SharedValue, DataError> {
        if original.is_none() && replacement.is_none() {
            return Err(DataError::NothingToMerge);
        }
        (self.func)(original, replacement)
    }

    /// Chains two policies: `self` runs first, then `next` receives its result
    /// as the original together with the untouched replacement.
    pub fn and_then(&self, next: MergeFunction) -> MergeFunction {
        let first = self.clone();
        MergeFunction::from_fn("chained", move |original, replacement| {
            let merged = first.merge(original, replacement)?;
            next.merge(Some(&merged), replacement)
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for MergeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MergeFunction({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{Key, ResourceKey};
    use crate::value::ImmutableValue;
    use proptest::prelude::*;

    fn level(v: u32) -> SharedValue {
        let key: Key<u32> = Key::of(ResourceKey::lodestone("level"));
        ImmutableValue::new(&key, v).into_shared()
    }

    #[test]
    fn test_canonical_policies() {
        let a = level(1);
        let b = level(2);

        let replacement = MergeFunction::replacement_preferred();
        assert!(replacement.merge(Some(&a), None).unwrap().value_eq(a.as_ref()));
        assert!(replacement.merge(None, Some(&b)).unwrap().value_eq(b.as_ref()));
        assert!(replacement.merge(Some(&a), Some(&b)).unwrap().value_eq(b.as_ref()));
        assert_eq!(replacement.merge(None, None).unwrap_err(), DataError::NothingToMerge);

        let original = MergeFunction::original_preferred();
        assert!(original.merge(Some(&a), None).unwrap().value_eq(a.as_ref()));
        assert!(original.merge(None, Some(&b)).unwrap().value_eq(b.as_ref()));
        assert!(original.merge(Some(&a), Some(&b)).unwrap().value_eq(a.as_ref()));
        assert!(original.merge(None, None).is_err());
    }

    #[test]
    fn test_custom_policy_cannot_see_double_absent() {
        let f = MergeFunction::from_fn("always_seven", |_, _| Ok(level(7)));
        assert!(f.merge(None, None).is_err());
        assert!(f.merge(None, Some(&level(1))).unwrap().value_eq(level(7).as_ref()));
    }

    #[test]
    fn test_and_then_feeds_result_and_replacement() {
        let doubling = MergeFunction::from_fn("double", |original, _| {
            let original = original.ok_or(DataError::NothingToMerge)?;
            let typed = ImmutableValue::<u32>::from_shared(original).ok_or(DataError::NothingToMerge)?;
            Ok(typed.transform(|v| v * 2).into_shared())
        });
        let sum = MergeFunction::from_fn("sum", |original, replacement| {
            let get = |v: Option<&SharedValue>| {
                v.and_then(|v| ImmutableValue::<u32>::from_shared(v).map(|t| *t.get()))
                    .unwrap_or(0)
            };
            Ok(level(get(original) + get(replacement)))
        });

        // double(3) = 6, then sum(6, 10) = 16
        let chained = doubling.and_then(sum);
        let merged = chained.merge(Some(&level(3)), Some(&level(10))).unwrap();
        assert!(merged.value_eq(level(16).as_ref()));
        assert_eq!(chained.name(), "chained");
    }

    proptest! {
        #[test]
        fn prop_policies_mirror_each_other(a in any::<u32>(), b in any::<u32>()) {
            let (a, b) = (level(a), level(b));
            let r = MergeFunction::replacement_preferred().merge(Some(&a), Some(&b)).unwrap();
            let o = MergeFunction::original_preferred().merge(Some(&b), Some(&a)).unwrap();
            prop_assert!(r.value_eq(o.as_ref()));
        }
    }
}

//! Error types for the data layer.

use crate::key::ResourceKey;
use crate::transaction::DataTransactionType;

/// Errors that can occur while reading, offering or merging values.
///
/// Every variant describes a local, synchronous failure. Nothing in the data
/// layer performs I/O, so there is no retry or recovery path: callers either
/// handle the error or propagate it with `?`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// A required value was absent from the container
    #[error("Could not retrieve value for key '{key}'")]
    NoSuchValue {
        /// The key that was looked up
        key: ResourceKey,
    },
    /// The container does not support the requested key at all
    #[error("Key not supported: {key}")]
    UnsupportedKey {
        /// The unsupported key
        key: ResourceKey,
    },
    /// An offer transaction did not succeed
    #[error("Failed offer transaction for key '{key}'")]
    OfferRejected {
        /// The key whose offer failed
        key: ResourceKey,
    },
    /// A transaction without rejected data did not succeed
    #[error("Transaction ended as {0:?} without rejected data")]
    TransactionFailed(DataTransactionType),
    /// A value fell outside the bounds declared by its key
    #[error("Value for key '{key}' is out of bounds")]
    OutOfBounds {
        /// The bounded key
        key: ResourceKey,
    },
    /// A stored value's element type differs from the one requested or offered
    #[error("Key '{key}' holds {found} values, not {expected}")]
    TypeMismatch {
        /// The key id both values share
        key: ResourceKey,
        /// Element type requested or offered
        expected: &'static str,
        /// Element type already held
        found: &'static str,
    },
    /// A merge function was handed neither an original nor a replacement
    #[error("Cannot merge two absent values")]
    NothingToMerge,
    /// A transaction builder was built without a result type
    #[error("Transaction result type was never set")]
    IncompleteResult,
    /// A resource key string could not be parsed
    #[error("Malformed resource key: {0}")]
    MalformedKey(String),
    /// A key id was registered twice with different element types
    #[error("Key '{key}' is already registered with element type {existing}, not {attempted}")]
    KeyConflict {
        /// The conflicting key id
        key: ResourceKey,
        /// Element type of the registered key
        existing: &'static str,
        /// Element type of the rejected key
        attempted: &'static str,
    },
}

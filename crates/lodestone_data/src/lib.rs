//! # Lodestone Data
//!
//! The typed key/value layer used to read and change properties of game
//! objects without static knowledge of their concrete types.
//!
//! ## Core Features
//!
//! - **Typed Keys**: a [`Key<E>`] can only ever produce an `E`, no casting at call sites
//! - **Value Pairs**: [`ImmutableValue`] and [`MutableValue`] mirror each other and convert losslessly
//! - **Collection Values**: list, set, map, optional and weighted helpers on the same two types
//! - **Transactions**: every store mutation reports a [`DataTransactionResult`]
//! - **Merge Policies**: [`MergeFunction`] resolves conflicts when containers are combined
//! - **Key Registry**: one id, one element type, enforced at registration
//!
//! ## Quick Start Example
//!
//! ```rust
//! use lodestone_data::*;
//!
//! let level: Key<u32> = Key::builder(ResourceKey::lodestone("level"))
//!     .default_value(1)
//!     .build();
//!
//! let mut store = ValueStore::new();
//! assert_eq!(store.get(&level), Some(1));
//!
//! let result = store.offer(&level, 5);
//! assert!(result.is_successful());
//!
//! store.undo(&result);
//! assert_eq!(store.get(&level), Some(1));
//! ```

pub mod collections;
pub mod container;
pub mod error;
pub mod key;
pub mod merge;
pub mod registry;
pub mod store;
pub mod transaction;
pub mod value;

pub use collections::*;
pub use container::{ImmutableValueStore, MutableValueStore, ValueContainer};
pub use error::DataError;
pub use key::{Bounds, Key, KeyBuilder, KeyDescriptor, ResourceKey, DEFAULT_NAMESPACE};
pub use merge::MergeFunction;
pub use registry::{KeyRegistry, ValueFactory};
pub use store::{FrozenValueStore, ValueStore};
pub use transaction::{DataTransactionBuilder, DataTransactionResult, DataTransactionType};
pub use value::{AnyValue, Element, ImmutableValue, MutableValue, SharedValue};

//! # Built-in Events
//!
//! Concrete events fired by the server and by value stores. Each event has a
//! plain constructor; there is no generated factory.
//!
//! | Event | Cancellable |
//! |---|---|
//! | [`ChangeValueEvent`] | yes |
//! | [`DamageEntityEvent`] | yes |
//! | [`HealEntityEvent`] | yes |
//! | [`SpawnEntityEvent`] | yes |
//! | [`ExecuteCommandEvent`] | yes |
//! | [`ServerLifecycleEvent`] | no |

pub mod command;
pub mod damage;
pub mod data;
pub mod entity;
pub mod lifecycle;

pub use command::ExecuteCommandEvent;
pub use damage::{damage_modifier_types, DamageEntityEvent, DamageFunction, DamageModifier, DamageModifierType};
pub use data::ChangeValueEvent;
pub use entity::{HealEntityEvent, SpawnEntityEvent};
pub use lifecycle::{ServerLifecycleEvent, ServerLifecyclePhase};

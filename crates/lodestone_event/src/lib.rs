//! # Lodestone Events
//!
//! Provenance-carrying events and ordered, cancellation-aware dispatch.
//!
//! ## Core Features
//!
//! - **Causes**: every event records the ordered chain of objects that led to it ([`Cause`])
//! - **Typed Context**: [`EventContext`] entries are looked up through typed [`EventContextKey`]s
//! - **Cause Stacks**: [`CauseStackManager`] builds causes for one execution flow, with strict frame nesting
//! - **Ordered Dispatch**: [`EventManager`] runs listeners by [`Order`] slot and honours cancellation
//! - **Composite Events**: [`CompositeEvent`] cancels its children as a group
//! - **Built-in Events**: damage, healing, spawning, commands, value changes and lifecycle
//!
//! ## Quick Start Example
//!
//! ```rust
//! use lodestone_event::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let events = EventManager::new();
//! let plugin = PluginContainer::new("no_pvp", "1.0.0");
//!
//! events
//!     .register_listener(&plugin, Order::Early, |event: &mut DamageEntityEvent| {
//!         if event.cause().contains_type::<uuid::Uuid>() {
//!             event.set_cancelled(true)?;
//!         }
//!         Ok(())
//!     })
//!     .await;
//!
//! let mut stack = CauseStackManager::new();
//! stack.push_cause(uuid::Uuid::new_v4());
//!
//! let mut event = DamageEntityEvent::new(stack.current_cause()?, uuid::Uuid::new_v4(), Vec::new(), 4.0)?;
//! assert!(events.post(&mut event).await);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod cause;
pub mod cause_stack;
pub mod composite;
pub mod context;
pub mod error;
pub mod event;
pub mod manager;
pub mod order;
pub mod plugin;

pub use catalog::*;
pub use cause::{downcast_ref, Cause, CauseBuilder, CauseObject, SharedCause};
pub use cause_stack::{CauseStackManager, FrameHandle, StackFrame};
pub use composite::CompositeEvent;
pub use context::{event_context_keys, EventContext, EventContextBuilder, EventContextKey, Location};
pub use error::{CauseError, CauseStackError, ContextError, EventError};
pub use event::{CancelFlag, Cancellable, Event};
pub use manager::{
    EventListener, EventListenerRegistration, EventListenerRegistrationBuilder, EventManager,
    EventManagerSettings, EventManagerStats, ListenerHandle, ListenerRegistrar, ListenerSet,
};
pub use order::Order;
pub use plugin::PluginContainer;

// Re-export commonly used external types
pub use async_trait::async_trait;

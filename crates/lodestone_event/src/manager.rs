//! # Event Manager
//!
//! The [`EventManager`] routes posted events to the listeners registered for
//! their concrete type, in [`Order`] slots.
//!
//! ## Dispatch rules
//!
//! - Listeners registered with `before_modifications` run in a first pass,
//!   every other listener in a second pass.
//! - Within a pass, listeners run by ascending [`Order::index`], with
//!   registration order breaking ties.
//! - Once the event is cancelled, only listeners in `*IgnoreCancelled` slots
//!   run. A listener there may un-cancel the event, re-enabling the rest.
//! - A failing listener is logged and counted; dispatch continues.
//!
//! ## Ownership
//!
//! Every registration returns a [`ListenerHandle`]. Listeners contributed by
//! one [`ListenerSet`] share a single handle, so they are removed together.
//! [`EventManager::unregister_plugin_listeners`] removes everything a plugin
//! registered regardless of handle.

use crate::error::EventError;
use crate::event::Event;
use crate::order::Order;
use crate::plugin::PluginContainer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

// ============================================================================
// Listeners
// ============================================================================

/// Handles events of one concrete type.
///
/// Closures `Fn(&mut E) -> Result<(), EventError>` implement this trait
/// directly; implement it by hand for listeners that need to await.
#[async_trait]
pub trait EventListener<E: Event>: Send + Sync {
    async fn handle(&self, event: &mut E) -> Result<(), EventError>;
}

#[async_trait]
impl<E, F> EventListener<E> for F
where
    E: Event,
    F: Fn(&mut E) -> Result<(), EventError> + Send + Sync,
{
    async fn handle(&self, event: &mut E) -> Result<(), EventError> {
        (self)(event)
    }
}

/// Type-erased listener stored in the dispatch table.
#[async_trait]
trait ErasedListener: Send + Sync {
    async fn handle_erased(&self, event: &mut dyn Event) -> Result<(), EventError>;
}

struct TypedListener<E: Event> {
    listener: Arc<dyn EventListener<E>>,
    _event: PhantomData<fn(E)>,
}

#[async_trait]
impl<E: Event> ErasedListener for TypedListener<E> {
    async fn handle_erased(&self, event: &mut dyn Event) -> Result<(), EventError> {
        let name = event.event_name();
        match event.as_any_mut().downcast_mut::<E>() {
            Some(typed) => self.listener.handle(typed).await,
            None => Err(EventError::Listener(format!(
                "listener for {} received {}",
                std::any::type_name::<E>(),
                name
            ))),
        }
    }
}

struct AnyListener<F> {
    listener: F,
}

#[async_trait]
impl<F> ErasedListener for AnyListener<F>
where
    F: Fn(&mut dyn Event) -> Result<(), EventError> + Send + Sync,
{
    async fn handle_erased(&self, event: &mut dyn Event) -> Result<(), EventError> {
        (self.listener)(event)
    }
}

/// Identifies the owner of one or more registered listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerHandle(Uuid);

impl ListenerHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct RegisteredListener {
    seq: u64,
    owner: ListenerHandle,
    plugin: PluginContainer,
    order: Order,
    before_modifications: bool,
    name: String,
    listener: Arc<dyn ErasedListener>,
}

impl fmt::Debug for RegisteredListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredListener")
            .field("name", &self.name)
            .field("plugin", &self.plugin.id)
            .field("order", &self.order)
            .field("before_modifications", &self.before_modifications)
            .field("owner", &self.owner)
            .finish()
    }
}

/// A listener waiting to be added to the dispatch table.
struct PendingListener {
    type_id: Option<TypeId>,
    order: Order,
    before_modifications: bool,
    name: String,
    listener: Arc<dyn ErasedListener>,
}

impl PendingListener {
    fn typed<E: Event>(
        plugin: &PluginContainer,
        order: Order,
        before_modifications: bool,
        listener: Arc<dyn EventListener<E>>,
    ) -> Self {
        Self {
            type_id: Some(TypeId::of::<E>()),
            order,
            before_modifications,
            name: format!("{}::{}", plugin.id, std::any::type_name::<E>()),
            listener: Arc::new(TypedListener {
                listener,
                _event: PhantomData,
            }),
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// A fully described listener registration.
pub struct EventListenerRegistration<E: Event> {
    plugin: PluginContainer,
    order: Order,
    before_modifications: bool,
    listener: Arc<dyn EventListener<E>>,
}

impl<E: Event> EventListenerRegistration<E> {
    pub fn builder() -> EventListenerRegistrationBuilder<E> {
        EventListenerRegistrationBuilder::default()
    }

    pub fn plugin(&self) -> &PluginContainer {
        &self.plugin
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn before_modifications(&self) -> bool {
        self.before_modifications
    }
}

impl<E: Event> fmt::Debug for EventListenerRegistration<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListenerRegistration")
            .field("event", &std::any::type_name::<E>())
            .field("plugin", &self.plugin.id)
            .field("order", &self.order)
            .field("before_modifications", &self.before_modifications)
            .finish()
    }
}

/// Builder for [`EventListenerRegistration`].
///
/// The order defaults to [`Order::Default`] and `before_modifications` to
/// `false`. A plugin and a listener are required.
pub struct EventListenerRegistrationBuilder<E: Event> {
    plugin: Option<PluginContainer>,
    order: Order,
    before_modifications: bool,
    listener: Option<Arc<dyn EventListener<E>>>,
}

impl<E: Event> Default for EventListenerRegistrationBuilder<E> {
    fn default() -> Self {
        Self {
            plugin: None,
            order: Order::Default,
            before_modifications: false,
            listener: None,
        }
    }
}

impl<E: Event> EventListenerRegistrationBuilder<E> {
    pub fn plugin(mut self, plugin: PluginContainer) -> Self {
        self.plugin = Some(plugin);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn before_modifications(mut self, before_modifications: bool) -> Self {
        self.before_modifications = before_modifications;
        self
    }

    pub fn listener<L: EventListener<E> + 'static>(mut self, listener: L) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn shared_listener(mut self, listener: Arc<dyn EventListener<E>>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Result<EventListenerRegistration<E>, EventError> {
        let plugin = self
            .plugin
            .ok_or_else(|| EventError::Registration("a plugin is required".to_string()))?;
        let listener = self
            .listener
            .ok_or_else(|| EventError::Registration("a listener is required".to_string()))?;
        Ok(EventListenerRegistration {
            plugin,
            order: self.order,
            before_modifications: self.before_modifications,
            listener,
        })
    }
}

/// An object contributing several listeners under one owner.
///
/// ```rust
/// use lodestone_event::*;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// #[derive(Default)]
/// struct Announcer {
///     announcements: AtomicU64,
/// }
///
/// impl ListenerSet for Announcer {
///     fn register_listeners(self: Arc<Self>, registrar: &mut ListenerRegistrar) {
///         let this = self.clone();
///         registrar.listen(Order::Post, move |_: &mut ServerLifecycleEvent| {
///             this.announcements.fetch_add(1, Ordering::Relaxed);
///             Ok(())
///         });
///     }
/// }
/// ```
pub trait ListenerSet: Send + Sync + 'static {
    fn register_listeners(self: Arc<Self>, registrar: &mut ListenerRegistrar);
}

/// Collects the listeners of a [`ListenerSet`].
pub struct ListenerRegistrar {
    plugin: PluginContainer,
    pending: Vec<PendingListener>,
}

impl ListenerRegistrar {
    fn new(plugin: PluginContainer) -> Self {
        Self {
            plugin,
            pending: Vec::new(),
        }
    }

    pub fn plugin(&self) -> &PluginContainer {
        &self.plugin
    }

    pub fn listen<E, F>(&mut self, order: Order, listener: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut E) -> Result<(), EventError> + Send + Sync + 'static,
    {
        self.listen_with(order, false, listener)
    }

    pub fn listen_with<E, L>(&mut self, order: Order, before_modifications: bool, listener: L) -> &mut Self
    where
        E: Event,
        L: EventListener<E> + 'static,
    {
        let listener: Arc<dyn EventListener<E>> = Arc::new(listener);
        self.pending.push(PendingListener::typed(
            &self.plugin,
            order,
            before_modifications,
            listener,
        ));
        self
    }
}

// ============================================================================
// Event Manager
// ============================================================================

/// Dispatch behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventManagerSettings {
    /// Warn when an event is posted with no listeners
    pub warn_on_unhandled: bool,
    /// Log listener failures at error level
    pub log_listener_failures: bool,
}

impl Default for EventManagerSettings {
    fn default() -> Self {
        Self {
            warn_on_unhandled: true,
            log_listener_failures: true,
        }
    }
}

/// Statistics about listeners and dispatched events.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventManagerStats {
    /// Number of registered listeners
    pub total_listeners: usize,
    /// Number of events posted since creation
    pub events_posted: u64,
    /// Number of posted events that ended cancelled
    pub events_cancelled: u64,
    /// Number of listener invocations that returned an error
    pub listener_failures: u64,
}

#[derive(Debug, Default)]
struct ListenerTable {
    by_type: HashMap<TypeId, SmallVec<[Arc<RegisteredListener>; 4]>>,
    any: SmallVec<[Arc<RegisteredListener>; 4]>,
    next_seq: u64,
}

impl ListenerTable {
    fn insert(&mut self, plugin: &PluginContainer, owner: ListenerHandle, pending: PendingListener) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let registered = Arc::new(RegisteredListener {
            seq,
            owner,
            plugin: plugin.clone(),
            order: pending.order,
            before_modifications: pending.before_modifications,
            name: pending.name,
            listener: pending.listener,
        });
        match pending.type_id {
            Some(type_id) => self.by_type.entry(type_id).or_default().push(registered),
            None => self.any.push(registered),
        }
    }

    fn retain(&mut self, keep: impl Fn(&RegisteredListener) -> bool) -> usize {
        let before = self.len();
        for listeners in self.by_type.values_mut() {
            listeners.retain(|l| keep(l));
        }
        self.by_type.retain(|_, listeners| !listeners.is_empty());
        self.any.retain(|l| keep(l));
        before - self.len()
    }

    fn len(&self) -> usize {
        self.by_type.values().map(|l| l.len()).sum::<usize>() + self.any.len()
    }
}

/// Registers listeners and posts events to them.
///
/// The manager is explicitly constructed and shared as `Arc<EventManager>`.
///
/// # Examples
///
/// ```rust
/// use lodestone_event::*;
///
/// # #[tokio::main]
/// # async fn main() {
/// let events = EventManager::new();
/// let plugin = PluginContainer::new("greeter", "1.0.0");
///
/// events
///     .register_listener(&plugin, Order::Default, |event: &mut ExecuteCommandEvent| {
///         if event.command() == "stop" {
///             event.set_cancelled(true)?;
///         }
///         Ok(())
///     })
///     .await;
///
/// let cause = Cause::of(EventContext::empty(), "console");
/// let mut event = ExecuteCommandEvent::new(cause, "stop", "");
/// assert!(events.post(&mut event).await);
/// # }
/// ```
#[derive(Debug)]
pub struct EventManager {
    listeners: RwLock<ListenerTable>,
    stats: RwLock<EventManagerStats>,
    settings: EventManagerSettings,
}

impl EventManager {
    pub fn new() -> Self {
        Self::with_settings(EventManagerSettings::default())
    }

    pub fn with_settings(settings: EventManagerSettings) -> Self {
        Self {
            listeners: RwLock::new(ListenerTable::default()),
            stats: RwLock::new(EventManagerStats::default()),
            settings,
        }
    }

    pub fn settings(&self) -> &EventManagerSettings {
        &self.settings
    }

    /// Registers a closure for events of type `E`.
    ///
    /// # Returns
    ///
    /// A fresh handle owning just this listener.
    pub async fn register_listener<E, F>(&self, plugin: &PluginContainer, order: Order, listener: F) -> ListenerHandle
    where
        E: Event,
        F: Fn(&mut E) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let listener: Arc<dyn EventListener<E>> = Arc::new(listener);
        let pending = PendingListener::typed(plugin, order, false, listener);
        self.insert(plugin, vec![pending]).await
    }

    /// Registers a fully described listener.
    pub async fn register<E: Event>(&self, registration: EventListenerRegistration<E>) -> ListenerHandle {
        let EventListenerRegistration {
            plugin,
            order,
            before_modifications,
            listener,
        } = registration;
        let pending = PendingListener::typed(&plugin, order, before_modifications, listener);
        self.insert(&plugin, vec![pending]).await
    }

    /// Registers a listener receiving every posted event, whatever its type.
    pub async fn register_any<F>(&self, plugin: &PluginContainer, order: Order, listener: F) -> ListenerHandle
    where
        F: Fn(&mut dyn Event) -> Result<(), EventError> + Send + Sync + 'static,
    {
        let pending = PendingListener {
            type_id: None,
            order,
            before_modifications: false,
            name: format!("{}::*", plugin.id),
            listener: Arc::new(AnyListener { listener }),
        };
        self.insert(plugin, vec![pending]).await
    }

    /// Registers every listener a [`ListenerSet`] contributes under one handle.
    pub async fn register_listeners(&self, plugin: &PluginContainer, set: Arc<dyn ListenerSet>) -> ListenerHandle {
        let mut registrar = ListenerRegistrar::new(plugin.clone());
        set.register_listeners(&mut registrar);
        if registrar.pending.is_empty() {
            warn!("⚠️ Listener set of plugin {} registered no listeners", plugin.id);
        }
        self.insert(plugin, registrar.pending).await
    }

    async fn insert(&self, plugin: &PluginContainer, pending: Vec<PendingListener>) -> ListenerHandle {
        let owner = ListenerHandle::new();
        let count = pending.len();

        let mut table = self.listeners.write().await;
        for listener in pending {
            debug!("📝 Registered listener {} at {}", listener.name, listener.order);
            table.insert(plugin, owner, listener);
        }
        let total = table.len();
        drop(table);

        let mut stats = self.stats.write().await;
        stats.total_listeners = total;
        drop(stats);

        debug!("📝 Plugin {} registered {} listener(s) as {}", plugin.id, count, owner);
        owner
    }

    /// Removes every listener registered under `owner`.
    ///
    /// # Returns
    ///
    /// The number of listeners removed.
    pub async fn unregister_listeners(&self, owner: &ListenerHandle) -> usize {
        let removed = self.remove_where(|l| l.owner != *owner).await;
        info!("🗑️ Unregistered {} listener(s) owned by {}", removed, owner);
        removed
    }

    /// Removes every listener of `plugin`, whatever handle registered it.
    pub async fn unregister_plugin_listeners(&self, plugin: &PluginContainer) -> usize {
        let removed = self.remove_where(|l| l.plugin != *plugin).await;
        info!("🗑️ Unregistered {} listener(s) of plugin {}", removed, plugin.id);
        removed
    }

    async fn remove_where(&self, keep: impl Fn(&RegisteredListener) -> bool) -> usize {
        let mut table = self.listeners.write().await;
        let removed = table.retain(keep);
        let total = table.len();
        drop(table);

        let mut stats = self.stats.write().await;
        stats.total_listeners = total;
        removed
    }

    /// Posts an event to its listeners.
    ///
    /// # Returns
    ///
    /// Whether the event ended cancelled. Always `false` for events without
    /// the cancellation capability.
    pub async fn post(&self, event: &mut dyn Event) -> bool {
        let type_id = event.as_any().type_id();
        let mut listeners: Vec<Arc<RegisteredListener>> = {
            let table = self.listeners.read().await;
            let matching = table
                .by_type
                .get(&type_id)
                .into_iter()
                .flatten()
                .chain(table.any.iter())
                .cloned()
                .collect();
            matching
        };

        if listeners.is_empty() && self.settings.warn_on_unhandled {
            warn!("⚠️ No listeners for event: {}", event.event_name());
        }

        listeners.sort_by_key(|l| (!l.before_modifications, l.order.index(), l.seq));
        debug!("📤 Posting {} to {} listeners", event.event_name(), listeners.len());

        let mut failures = 0u64;
        for listener in &listeners {
            if event.is_cancelled() && !listener.order.ignores_cancelled() {
                continue;
            }
            if let Err(e) = listener.listener.handle_erased(event).await {
                failures += 1;
                if self.settings.log_listener_failures {
                    error!("❌ Listener {} failed: {}", listener.name, e);
                }
            }
        }

        let cancelled = event.is_cancelled();
        let mut stats = self.stats.write().await;
        stats.events_posted += 1;
        stats.listener_failures += failures;
        if cancelled {
            stats.events_cancelled += 1;
        }
        cancelled
    }

    /// Returns a snapshot of the manager statistics.
    pub async fn stats(&self) -> EventManagerStats {
        let stats = self.stats.read().await;
        stats.clone()
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cause::Cause;
    use crate::context::EventContext;
    use crate::event::CancelFlag;
    use crate::{impl_cancellable_event, impl_event};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Chat {
        cause: Cause,
        cancelled: CancelFlag,
        message: String,
    }

    impl_cancellable_event!(Chat);

    #[derive(Debug)]
    struct Tick {
        cause: Cause,
    }

    impl_event!(Tick);

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn chat() -> Chat {
        Chat {
            cause: Cause::of(EventContext::empty(), "player"),
            cancelled: CancelFlag::default(),
            message: "hello".to_string(),
        }
    }

    fn tick() -> Tick {
        Tick {
            cause: Cause::of(EventContext::empty(), "scheduler"),
        }
    }

    fn plugin() -> PluginContainer {
        PluginContainer::new("test_plugin", "1.0.0")
    }

    fn record(log: &Log, tag: &'static str) -> impl Fn(&mut Chat) -> Result<(), EventError> + Send + Sync + 'static {
        let log = log.clone();
        move |_: &mut Chat| {
            log.lock().unwrap().push(tag);
            Ok(())
        }
    }

    fn entries(log: &Log) -> Vec<&'static str> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_listeners_run_in_slot_order() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events.register_listener::<Chat, _>(&plugin, Order::Post, record(&log, "post")).await;
        events.register_listener::<Chat, _>(&plugin, Order::Late, record(&log, "late")).await;
        events.register_listener::<Chat, _>(&plugin, Order::Default, record(&log, "default_a")).await;
        events.register_listener::<Chat, _>(&plugin, Order::Pre, record(&log, "pre")).await;
        events.register_listener::<Chat, _>(&plugin, Order::Default, record(&log, "default_b")).await;
        events.register_listener::<Chat, _>(&plugin, Order::First, record(&log, "first")).await;

        let cancelled = events.post(&mut chat()).await;

        assert!(!cancelled);
        assert_eq!(
            entries(&log),
            vec!["pre", "first", "default_a", "default_b", "late", "post"]
        );
    }

    #[tokio::test]
    async fn test_cancelled_event_only_reaches_ignore_cancelled_slots() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events
            .register_listener(&plugin, Order::First, |event: &mut Chat| event.set_cancelled(true))
            .await;
        events.register_listener::<Chat, _>(&plugin, Order::Early, record(&log, "early")).await;
        events
            .register_listener::<Chat, _>(&plugin, Order::DefaultIgnoreCancelled, record(&log, "default_ic"))
            .await;
        events.register_listener::<Chat, _>(&plugin, Order::Last, record(&log, "last")).await;
        events.register_listener::<Chat, _>(&plugin, Order::Post, record(&log, "post")).await;

        let mut event = chat();
        assert!(events.post(&mut event).await);
        assert!(event.is_cancelled());
        assert_eq!(entries(&log), vec!["default_ic"]);
        assert_eq!(events.stats().await.events_cancelled, 1);
    }

    #[tokio::test]
    async fn test_uncancelling_reenables_later_listeners() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events
            .register_listener(&plugin, Order::Early, |event: &mut Chat| event.set_cancelled(true))
            .await;
        events.register_listener::<Chat, _>(&plugin, Order::Default, record(&log, "default")).await;
        events
            .register_listener(&plugin, Order::LateIgnoreCancelled, |event: &mut Chat| {
                event.set_cancelled(false)
            })
            .await;
        events.register_listener::<Chat, _>(&plugin, Order::Last, record(&log, "last")).await;

        assert!(!events.post(&mut chat()).await);
        assert_eq!(entries(&log), vec!["last"]);
    }

    #[tokio::test]
    async fn test_before_modifications_pass_runs_first() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events.register_listener::<Chat, _>(&plugin, Order::Pre, record(&log, "pre")).await;
        let registration = EventListenerRegistration::<Chat>::builder()
            .plugin(plugin.clone())
            .order(Order::Post)
            .before_modifications(true)
            .listener(record(&log, "observer"))
            .build()
            .unwrap();
        assert!(registration.before_modifications());
        events.register(registration).await;

        events.post(&mut chat()).await;
        assert_eq!(entries(&log), vec!["observer", "pre"]);
    }

    #[tokio::test]
    async fn test_failing_listener_does_not_stop_dispatch() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events
            .register_listener(&plugin, Order::Early, |_: &mut Chat| {
                Err(EventError::Listener("boom".to_string()))
            })
            .await;
        events.register_listener::<Chat, _>(&plugin, Order::Late, record(&log, "late")).await;

        events.post(&mut chat()).await;
        assert_eq!(entries(&log), vec!["late"]);

        let stats = events.stats().await;
        assert_eq!(stats.listener_failures, 1);
        assert_eq!(stats.events_posted, 1);
    }

    #[tokio::test]
    async fn test_listeners_can_modify_the_event() {
        let events = EventManager::new();
        let plugin = plugin();

        events
            .register_listener(&plugin, Order::Default, |event: &mut Chat| {
                event.message.push_str(", world");
                Ok(())
            })
            .await;

        let mut event = chat();
        events.post(&mut event).await;
        assert_eq!(event.message, "hello, world");
    }

    #[tokio::test]
    async fn test_non_cancellable_event_reaches_every_listener() {
        let events = EventManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let plugin = plugin();

        let counter = calls.clone();
        events
            .register_listener(&plugin, Order::First, move |event: &mut Tick| {
                counter.fetch_add(1, Ordering::SeqCst);
                event.set_cancelled(true)
            })
            .await;
        let counter = calls.clone();
        events
            .register_listener(&plugin, Order::Last, move |_: &mut Tick| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(!events.post(&mut tick()).await);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(events.stats().await.listener_failures, 1);
    }

    #[tokio::test]
    async fn test_listeners_only_receive_their_event_type() {
        let events = EventManager::new();
        let log = Log::default();
        let plugin = plugin();

        events.register_listener::<Chat, _>(&plugin, Order::Default, record(&log, "chat")).await;
        let any_log = log.clone();
        events
            .register_any(&plugin, Order::Default, move |event: &mut dyn Event| {
                any_log.lock().unwrap().push(event.event_name());
                Ok(())
            })
            .await;

        events.post(&mut tick()).await;
        events.post(&mut chat()).await;
        assert_eq!(entries(&log), vec!["Tick", "chat", "Chat"]);
    }

    #[tokio::test]
    async fn test_unregister_by_handle_and_plugin() {
        let events = EventManager::new();
        let log = Log::default();
        let first = plugin();
        let second = PluginContainer::new("other_plugin", "0.1.0");

        let handle = events.register_listener::<Chat, _>(&first, Order::Default, record(&log, "a")).await;
        events.register_listener::<Chat, _>(&first, Order::Default, record(&log, "b")).await;
        events.register_listener::<Chat, _>(&second, Order::Default, record(&log, "c")).await;
        assert_eq!(events.listener_count().await, 3);

        assert_eq!(events.unregister_listeners(&handle).await, 1);
        events.post(&mut chat()).await;
        assert_eq!(entries(&log), vec!["b", "c"]);

        assert_eq!(events.unregister_plugin_listeners(&first).await, 1);
        assert_eq!(events.unregister_plugin_listeners(&first).await, 0);
        assert_eq!(events.listener_count().await, 1);
        assert_eq!(events.stats().await.total_listeners, 1);
    }

    struct ChatFilter {
        blocked: &'static str,
        seen: AtomicUsize,
    }

    impl ListenerSet for ChatFilter {
        fn register_listeners(self: Arc<Self>, registrar: &mut ListenerRegistrar) {
            let this = self.clone();
            registrar.listen(Order::Early, move |event: &mut Chat| {
                this.seen.fetch_add(1, Ordering::SeqCst);
                if event.message.contains(this.blocked) {
                    event.set_cancelled(true)?;
                }
                Ok(())
            });
            let this = self.clone();
            registrar.listen(Order::Default, move |_: &mut Tick| {
                this.seen.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
    }

    #[tokio::test]
    async fn test_listener_set_shares_one_handle() {
        let events = EventManager::new();
        let filter = Arc::new(ChatFilter {
            blocked: "spam",
            seen: AtomicUsize::new(0),
        });

        let handle = events.register_listeners(&plugin(), filter.clone()).await;
        assert_eq!(events.listener_count().await, 2);

        let mut spam = chat();
        spam.message = "buy spam".to_string();
        assert!(events.post(&mut spam).await);
        assert!(!events.post(&mut chat()).await);
        events.post(&mut tick()).await;
        assert_eq!(filter.seen.load(Ordering::SeqCst), 3);

        assert_eq!(events.unregister_listeners(&handle).await, 2);
        assert_eq!(events.listener_count().await, 0);
    }

    #[tokio::test]
    async fn test_posting_without_listeners() {
        let events = EventManager::with_settings(EventManagerSettings {
            warn_on_unhandled: false,
            log_listener_failures: true,
        });
        assert!(!events.post(&mut chat()).await);
        assert_eq!(events.stats().await.events_posted, 1);
    }

    #[test]
    fn test_registration_requires_plugin_and_listener() {
        let missing_plugin = EventListenerRegistration::<Chat>::builder()
            .listener(|_: &mut Chat| Ok(()))
            .build();
        assert!(matches!(missing_plugin, Err(EventError::Registration(_))));

        let missing_listener = EventListenerRegistration::<Chat>::builder()
            .plugin(plugin())
            .build();
        assert!(matches!(missing_listener, Err(EventError::Registration(_))));

        let registration = EventListenerRegistration::<Chat>::builder()
            .plugin(plugin())
            .listener(|_: &mut Chat| Ok(()))
            .build()
            .unwrap();
        assert_eq!(registration.order(), Order::Default);
        assert!(!registration.before_modifications());
    }
}

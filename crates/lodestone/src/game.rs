//! # Game handle
//!
//! [`Game`] is the root every service is reached from: the event manager,
//! the key registry and the value factory built on it, and the loaded
//! configuration. It is created once at startup and passed to whatever needs
//! it; there is no global instance.

use crate::config::{load_config, GameConfig};
use crate::error::GameError;
use lodestone_data::{
    DataTransactionResult, Element, Key, KeyRegistry, MutableValueStore, ValueFactory,
};
use lodestone_event::{
    event_context_keys, Cause, CauseStackManager, ChangeValueEvent, Event, EventContext,
    EventManager, PluginContainer, ServerLifecycleEvent, ServerLifecyclePhase,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runtime handle bundling the shared services.
///
/// Cloning is cheap and shares every service.
///
/// # Examples
///
/// ```rust
/// use lodestone::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), GameError> {
/// let game = Game::new(GameConfig::default());
///
/// let health: Key<f64> = Key::builder(ResourceKey::lodestone("health"))
///     .default_value(20.0)
///     .min(0.0)
///     .max(20.0)
///     .build();
/// game.register_key(&health)?;
///
/// let value = game.value_factory().immutable_of(&health, 12.5)?;
/// assert_eq!(*value.get(), 12.5);
///
/// let mut stack = game.new_cause_stack();
/// stack.push_cause("console");
/// let mut event = ExecuteCommandEvent::new(stack.current_cause()?, "list", "");
/// assert!(!game.post_event(&mut event).await);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    events: Arc<EventManager>,
    keys: Arc<KeyRegistry>,
    values: ValueFactory,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> GameBuilder {
        GameBuilder::default()
    }

    /// Loads the configuration at `path`, writing the default one if the file
    /// is missing, and builds a game from it.
    pub async fn from_config_file(path: &Path) -> Result<Self, GameError> {
        let config = load_config(path)
            .await
            .map_err(|e| GameError::Config(e.to_string()))?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn event_manager(&self) -> &Arc<EventManager> {
        &self.events
    }

    pub fn key_registry(&self) -> &Arc<KeyRegistry> {
        &self.keys
    }

    pub fn value_factory(&self) -> &ValueFactory {
        &self.values
    }

    /// Registers `key` so the value factory accepts it.
    pub fn register_key<E: Element>(&self, key: &Key<E>) -> Result<(), GameError> {
        self.keys.register(key)?;
        Ok(())
    }

    /// Creates the cause stack for one execution flow, limited by the
    /// `[cause_stack]` configuration.
    pub fn new_cause_stack(&self) -> CauseStackManager {
        CauseStackManager::with_max_frame_depth(self.config.cause_stack.max_frame_depth)
    }

    /// Posts `event` to its listeners.
    ///
    /// # Returns
    ///
    /// Whether the event ended cancelled.
    pub async fn post_event(&self, event: &mut dyn Event) -> bool {
        self.events.post(event).await
    }

    /// Posts a [`ServerLifecycleEvent`] caused by the game itself.
    pub async fn post_lifecycle(&self, phase: ServerLifecyclePhase) -> Result<(), GameError> {
        let plugin = Self::runtime_plugin();
        let context = EventContext::builder()
            .add(&event_context_keys::PLUGIN, plugin.clone())?
            .build();
        let mut event = ServerLifecycleEvent::new(Cause::of(context, plugin), phase);
        info!("🚀 Server lifecycle: {}", phase);
        self.post_event(&mut event).await;
        Ok(())
    }

    /// Offers a value to `store` and lets listeners veto or rewrite the
    /// change through a [`ChangeValueEvent`].
    ///
    /// A cancelled event undoes the change and yields the cancelled result. A
    /// listener proposing other changes gets the original change undone and
    /// the proposed values offered instead.
    pub async fn offer_with_event<S, E>(
        &self,
        cause: Cause,
        holder: Uuid,
        store: &mut S,
        key: &Key<E>,
        value: E,
    ) -> DataTransactionResult
    where
        S: MutableValueStore + Send,
        E: Element,
    {
        let result = store.offer(key, value);
        if !result.is_successful() {
            return result;
        }

        let mut event = ChangeValueEvent::new(cause, holder, result.clone());
        if self.post_event(&mut event).await {
            Self::undo_logged(store, &result, holder);
            debug!("↩️ Change of {} on {} cancelled", key.id(), holder);
            return event.end_result();
        }
        if !event.has_proposed_changes() {
            return result;
        }

        Self::undo_logged(store, &result, holder);
        let mut applied = DataTransactionResult::builder();
        for proposed in event.proposed_changes().successful_data() {
            applied = applied.absorb_result(&store.offer_shared(proposed.clone()));
        }
        applied
            .build()
            .unwrap_or_else(|_| DataTransactionResult::success_no_data())
    }

    fn undo_logged<S: MutableValueStore>(store: &mut S, result: &DataTransactionResult, holder: Uuid) {
        let undone = store.undo(result);
        if !undone.is_successful() {
            warn!(
                "⚠️ Undo on {} ended as {:?}, {} value(s) rejected",
                holder,
                undone.result_type(),
                undone.rejected_data().len()
            );
        }
    }

    fn runtime_plugin() -> PluginContainer {
        PluginContainer::new("lodestone", env!("CARGO_PKG_VERSION"))
            .with_name("Lodestone")
            .with_description("The game runtime")
    }
}

/// Builder for [`Game`].
///
/// Services not provided are created fresh, the event manager using the
/// `[events]` settings of the configuration.
#[derive(Debug, Default)]
pub struct GameBuilder {
    config: Option<GameConfig>,
    key_registry: Option<Arc<KeyRegistry>>,
    event_manager: Option<Arc<EventManager>>,
}

impl GameBuilder {
    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn key_registry(mut self, key_registry: Arc<KeyRegistry>) -> Self {
        self.key_registry = Some(key_registry);
        self
    }

    pub fn event_manager(mut self, event_manager: Arc<EventManager>) -> Self {
        self.event_manager = Some(event_manager);
        self
    }

    pub fn build(self) -> Game {
        let config = self.config.unwrap_or_default();
        let events = self
            .event_manager
            .unwrap_or_else(|| Arc::new(EventManager::with_settings(config.events.clone())));
        let keys = self.key_registry.unwrap_or_default();
        let values = ValueFactory::new(keys.clone());
        Game {
            config,
            events,
            keys,
            values,
        }
    }
}

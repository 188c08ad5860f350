//! # Lodestone
//!
//! Runtime side of a game-server modding API. Plugins read and change game
//! object properties through typed keys and values, and observe or veto what
//! happens through events that record their causes.
//!
//! ## Crates
//!
//! - [`lodestone_data`]: keys, values, value stores and transaction results
//! - [`lodestone_event`]: causes, cause stacks, events and the event manager
//! - this crate: the [`Game`] handle, configuration and logging setup
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use lodestone::*;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let game = Game::from_config_file(Path::new("lodestone.toml")).await?;
//!     try_setup_logging(&game.config().logging)?;
//!
//!     let plugin = PluginContainer::new("motd", "1.0.0");
//!     game.event_manager()
//!         .register_listener(&plugin, Order::Post, |event: &mut ServerLifecycleEvent| {
//!             if event.phase() == ServerLifecyclePhase::Started {
//!                 tracing::info!("Welcome!");
//!             }
//!             Ok(())
//!         })
//!         .await;
//!
//!     game.post_lifecycle(ServerLifecyclePhase::Started).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod logging;

pub use config::{load_config, CauseStackSettings, GameConfig, LoggingSettings};
pub use error::GameError;
pub use game::{Game, GameBuilder};
pub use logging::{setup_logging, try_setup_logging};

// Re-export the data and event APIs
pub use lodestone_data::*;
pub use lodestone_event::*;

//! Plugin metadata used for listener ownership and cause attribution.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a loaded plugin.
///
/// Plugins are compared by id. The container is cheap to clone and is what
/// listener registrations and the [`PLUGIN`](crate::event_context_keys::PLUGIN)
/// context entry refer to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginContainer {
    /// Unique plugin id, e.g. `guilds`
    pub id: CompactString,
    /// Human readable name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: Option<String>,
}

impl PluginContainer {
    /// Create new plugin metadata
    pub fn new(id: &str, version: &str) -> Self {
        Self {
            id: CompactString::new(id),
            name: id.to_string(),
            version: version.to_string(),
            description: None,
        }
    }

    /// Set display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl PartialEq for PluginContainer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PluginContainer {}

impl std::hash::Hash for PluginContainer {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

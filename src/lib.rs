//! Project Notes
//!
//! Threaded comments on project resources with:
//! - Loading of a target's notes, grouped into discussions for merge requests
//! - Creation of notes on targets and on diff lines
//! - Author-or-admin gated update, delete and attachment removal
//! - CommonMark rendering for previews and updated bodies
//! - Cache invalidation signals after destructive changes

pub mod access;
pub mod attachments;
pub mod error;
pub mod events;
pub mod markup;
pub mod notes;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

pub use error::{ErrorKind, NoteError, NoteResult, Violation};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub attachments: AttachmentsYamlConfig,
    pub markup: markup::MarkupConfig,
    pub notes: NotesYamlConfig,
    pub access: AccessYamlConfig,
    pub events: EventsYamlConfig,
}

/// Attachment storage section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttachmentsYamlConfig {
    pub root: String,
}

impl Default for AttachmentsYamlConfig {
    fn default() -> Self {
        Self {
            root: "./uploads".to_string(),
        }
    }
}

/// Note validation section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotesYamlConfig {
    pub max_body_chars: usize,
}

impl Default for NotesYamlConfig {
    fn default() -> Self {
        Self {
            max_body_chars: notes::DEFAULT_MAX_BODY_CHARS,
        }
    }
}

/// Access section: actors allowed to administer every note
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AccessYamlConfig {
    pub admins: Vec<Uuid>,
}

/// Cache invalidation section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventsYamlConfig {
    pub capacity: usize,
}

impl Default for EventsYamlConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub attachments_root: PathBuf,
    pub markup: markup::MarkupConfig,
    pub max_body_chars: usize,
    pub admins: Vec<Uuid>,
    pub events_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "notes.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        // 1. Load YAML config (or defaults if file not found)
        let yaml = Self::load_yaml(yaml_path);

        // 2. Build Config with env var overrides
        let admins = match std::env::var("NOTES_ADMINS") {
            Ok(list) => parse_admins(&list)?,
            Err(_) => yaml.access.admins,
        };

        Ok(Self {
            attachments_root: std::env::var("NOTES_ATTACHMENTS_ROOT")
                .unwrap_or(yaml.attachments.root)
                .into(),
            markup: yaml.markup,
            max_body_chars: std::env::var("NOTES_MAX_BODY_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.notes.max_body_chars),
            admins,
            events_capacity: yaml.events.capacity,
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("notes.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

/// Parse a comma-separated list of actor UUIDs
fn parse_admins(list: &str) -> Result<Vec<Uuid>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s)
                .map_err(|e| anyhow::anyhow!("Invalid admin id '{}' in NOTES_ADMINS: {}", s, e))
        })
        .collect()
}

/// Shared application state
#[derive(Clone)]
pub struct NotesState {
    pub manager: Arc<notes::NoteManager>,
    pub store: Arc<store::MemoryNoteStore>,
    pub bus: events::InvalidationBus,
    pub config: Arc<Config>,
}

impl NotesState {
    /// Create state over an empty in-memory store
    pub fn from_config(config: Config) -> Self {
        Self::with_store(config, Arc::new(store::MemoryNoteStore::new()))
    }

    /// Create state over an existing in-memory store
    pub fn with_store(config: Config, store: Arc<store::MemoryNoteStore>) -> Self {
        let bus = events::InvalidationBus::new(config.events_capacity);

        let manager = notes::NoteManager::new(notes::NoteBackends {
            store: store.clone(),
            targets: store.clone(),
            gate: Arc::new(access::AuthorOrAdminGate::new(config.admins.iter().copied())),
            attachments: Arc::new(attachments::FsAttachmentStore::new(
                config.attachments_root.clone(),
            )),
            renderer: Arc::new(markup::CommonMarkRenderer::new(config.markup)),
        })
        .with_cache_invalidator(Arc::new(bus.clone()))
        .with_max_body_chars(config.max_body_chars);

        tracing::debug!(
            attachments_root = %config.attachments_root.display(),
            admins = config.admins.len(),
            "Notes state initialized"
        );

        Self {
            manager: Arc::new(manager),
            store,
            bus,
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

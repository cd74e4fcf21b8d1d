//! Application configuration management.
//!
//! Settings are merged with `figment`, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. The platform config file (`config.toml` in the project config dir)
//! 3. An explicit `--config` file
//! 4. `MAILDUPE_`-prefixed environment variables (`__` separates nested keys)
//! 5. Command-line overrides
//!
//! # Example
//!
//! ```toml
//! key_fields = ["message_class", "subject", "sender_email", "delivery_time", "body"]
//! hash_algorithm = "blake3"
//! message_classes = ["IPM.Note"]
//! delete_mode = "flag"
//! layout = "nested"
//! dry_run = false
//! skip_folders = ["Drafts", "Junk", "Outbox", "Sent", "Spam", "Trash"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::DeleteMode;
use crate::duplicates::DedupOptions;
use crate::scanner::{HashAlgorithm, KeyPolicy, PolicyError};
use crate::store::maildir::{FolderLayout, MaildirOptions};
use crate::store::FieldId;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "MAILDUPE_";

/// Folders left alone unless configured otherwise. Matched case-insensitively
/// against folder names at any depth.
pub const DEFAULT_SKIP_FOLDERS: &[&str] = &["Drafts", "Junk", "Outbox", "Sent", "Spam", "Trash"];

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fields that identify a message, in hashing order.
    pub key_fields: Vec<FieldId>,
    /// Fingerprint digest.
    pub hash_algorithm: HashAlgorithm,
    /// Only deduplicate messages of these classes (empty means all).
    pub message_classes: Vec<String>,
    /// How the Maildir store deletes duplicates.
    pub delete_mode: DeleteMode,
    /// Maildir folder layout.
    pub layout: FolderLayout,
    /// Report candidates without deleting them.
    pub dry_run: bool,
    /// Folder names whose subtrees are never deduplicated.
    pub skip_folders: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            key_fields: KeyPolicy::default().fields().to_vec(),
            hash_algorithm: HashAlgorithm::default(),
            message_classes: Vec::new(),
            delete_mode: DeleteMode::default(),
            layout: FolderLayout::default(),
            dry_run: false,
            skip_folders: DEFAULT_SKIP_FOLDERS.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_fields: Option<Vec<FieldId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_algorithm: Option<HashAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_classes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_mode: Option<DeleteMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<FolderLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_folders: Option<Vec<String>>,
}

impl Config {
    /// Build the layered figment without command-line overrides.
    ///
    /// # Arguments
    ///
    /// * `explicit` - A config file named on the command line
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` does not exist.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if let Ok(path) = Self::config_path() {
            if path.exists() {
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        if let Some(path) = explicit {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            log::debug!("Loading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load the configuration, applying command-line overrides last.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is missing or any layer holds an
    /// invalid value.
    pub fn load(explicit: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        Self::figment(explicit)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .context("Invalid configuration")
    }

    /// Save the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default platform-specific configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "maildupe", "maildupe")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("config.toml"))
    }

    /// The key policy named by `key_fields`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Empty`] if no field is configured.
    pub fn key_policy(&self) -> Result<KeyPolicy, PolicyError> {
        KeyPolicy::new(self.key_fields.iter().copied())
    }

    /// Options for the folder deduplicator.
    #[must_use]
    pub fn dedup_options(&self) -> DedupOptions {
        DedupOptions::default()
            .dry_run(self.dry_run)
            .message_classes(self.message_classes.clone())
            .algorithm(self.hash_algorithm)
            .skip_folders(self.skip_folders.clone())
    }

    /// Options for the Maildir store.
    #[must_use]
    pub fn maildir_options(&self) -> MaildirOptions {
        MaildirOptions {
            delete_mode: self.delete_mode,
            layout: self.layout,
            ..MaildirOptions::default()
        }
    }
}

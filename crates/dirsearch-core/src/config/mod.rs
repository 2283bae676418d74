//! Configuration management with file persistence

use crate::domain::search::{OrderDirection, RequestDefaults, SearchOptions};
use crate::storage::database::{DEFAULT_MAX_CONNECTIONS, DatabaseConfig, default_database_path};
use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "DIRSEARCH_CONFIG_DIR";

const KEYS: &[&str] = &[
    "database.path",
    "database.max_connections",
    "search.default_page_size",
    "search.default_order_by",
    "search.default_order_direction",
    "search.restrict_attribute_sort",
    "search.default_realm",
];

/// Dirsearch configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub search: SearchSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database file; the platform data directory when unset
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub default_page_size: u32,
    pub default_order_by: String,
    pub default_order_direction: String,
    /// Join only the sorted attribute's rows when ordering by an attribute
    pub restrict_attribute_sort: bool,
    /// Realm used when a command does not name one
    pub default_realm: Option<String>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl Default for SearchSection {
    fn default() -> Self {
        let defaults = RequestDefaults::default();
        Self {
            default_page_size: defaults.page_size,
            default_order_by: defaults.order_by,
            default_order_direction: defaults.direction.to_string().to_lowercase(),
            restrict_attribute_sort: SearchOptions::default().restrict_attribute_sort,
            default_realm: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("dirsearch")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Render the configuration as it is written to disk
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            return Err(anyhow!("database.max_connections must be at least 1"));
        }
        if self.search.default_page_size == 0 {
            return Err(anyhow!("search.default_page_size must be at least 1"));
        }
        if self.search.default_order_by.is_empty() {
            return Err(anyhow!("search.default_order_by must not be empty"));
        }
        self.order_direction()?;
        Ok(())
    }

    fn order_direction(&self) -> anyhow::Result<OrderDirection> {
        self.search
            .default_order_direction
            .parse()
            .map_err(|e| anyhow!("search.default_order_direction: {}", e))
    }

    /// Database file in effect
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Connection settings for `Database::new`
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::with_path(self.database_path())
            .max_connections(self.database.max_connections)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            restrict_attribute_sort: self.search.restrict_attribute_sort,
        }
    }

    /// Fallbacks for reserved request parameters
    pub fn request_defaults(&self) -> anyhow::Result<RequestDefaults> {
        Ok(RequestDefaults {
            page_size: self.search.default_page_size,
            order_by: self.search.default_order_by.clone(),
            direction: self.order_direction()?,
        })
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "database.path" => Ok(self.database_path().display().to_string()),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),
            "search.default_page_size" => Ok(self.search.default_page_size.to_string()),
            "search.default_order_by" => Ok(self.search.default_order_by.clone()),
            "search.default_order_direction" => Ok(self.search.default_order_direction.clone()),
            "search.restrict_attribute_sort" => {
                Ok(self.search.restrict_attribute_sort.to_string())
            }
            "search.default_realm" => Ok(self
                .search
                .default_realm
                .clone()
                .unwrap_or_else(|| "(not set)".to_string())),
            _ => Err(unknown_key(key)),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "database.path" => {
                self.database.path = non_empty(value).map(PathBuf::from);
            }
            "database.max_connections" => {
                let max: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid max_connections value: {}", value))?;
                if max == 0 {
                    return Err(anyhow!("max_connections must be at least 1"));
                }
                self.database.max_connections = max;
            }
            "search.default_page_size" => {
                let size: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid default_page_size value: {}", value))?;
                if size == 0 {
                    return Err(anyhow!("default_page_size must be at least 1"));
                }
                self.search.default_page_size = size;
            }
            "search.default_order_by" => {
                if value.is_empty() {
                    return Err(anyhow!("default_order_by must not be empty"));
                }
                self.search.default_order_by = value.to_string();
            }
            "search.default_order_direction" => {
                let direction: OrderDirection = value
                    .parse()
                    .map_err(|e| anyhow!("Invalid default_order_direction: {}", e))?;
                self.search.default_order_direction = direction.to_string().to_lowercase();
            }
            "search.restrict_attribute_sort" => {
                self.search.restrict_attribute_sort = value
                    .parse()
                    .with_context(|| format!("Expected true or false, got: {}", value))?;
            }
            "search.default_realm" => {
                self.search.default_realm = non_empty(value).map(str::to_string);
            }
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

fn unknown_key(key: &str) -> anyhow::Error {
    anyhow!(
        "Unknown configuration key: {}. Use `dirsearch config list` to see available keys.",
        key
    )
}

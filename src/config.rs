//! Server configuration module
//!
//! Handles loading and parsing of server configuration from files and environment variables.

use std::env;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TownServerError};

use crate::game::area::{BoundingBox, PetArea};
use crate::game::followers::FollowerSettings;
use crate::game::town::{TownSettings, DEFAULT_TOWN_CAPACITY};

/// Environment variable naming the configuration file
pub const CONFIG_PATH_ENV: &str = "TOWN_SERVER_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the configuration file
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Server name used in logs
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Maximum players per town (followers excluded)
    #[serde(default = "default_town_capacity")]
    pub town_capacity: usize,

    /// Follower chain settings
    #[serde(default)]
    pub followers: FollowerSettings,

    /// Town created at startup, if any
    #[serde(default)]
    pub default_town: Option<DefaultTownConfig>,

    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,
}

/// Town created when the server starts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultTownConfig {
    /// Friendly name of the town
    #[serde(default = "default_town_name")]
    pub friendly_name: String,

    /// Whether the town appears in public listings
    #[serde(default = "default_true")]
    pub is_publicly_listed: bool,

    /// Pet areas registered in the town
    #[serde(default)]
    pub pet_areas: Vec<PetAreaConfig>,
}

/// Pet area definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetAreaConfig {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PetAreaConfig {
    /// Build the pet area described by this entry
    pub fn to_pet_area(&self) -> PetArea {
        PetArea::new(
            self.label.clone(),
            BoundingBox::new(self.x, self.y, self.width, self.height),
        )
    }
}

// Default value functions
fn default_server_name() -> String {
    "Town Server".to_string()
}

fn default_town_capacity() -> usize {
    DEFAULT_TOWN_CAPACITY
}

fn default_town_name() -> String {
    "Town Square".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DefaultTownConfig {
    fn default() -> Self {
        Self {
            friendly_name: default_town_name(),
            is_publicly_listed: default_true(),
            pet_areas: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            server_name: default_server_name(),
            town_capacity: default_town_capacity(),
            followers: FollowerSettings::default(),
            default_town: None,
            debug: false,
            log_json: false,
        }
    }
}

impl ServerConfig {
    /// Load the configuration named by `TOWN_SERVER_CONFIG`, then apply
    /// `TOWN_*` overrides and validate the result
    pub async fn load() -> Result<Self> {
        let config_path = env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::read(config_path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Read one configuration file; a missing file yields the defaults
    ///
    /// The environment is not consulted and nothing is validated.
    pub async fn read(config_path: PathBuf) -> Result<Self> {
        let mut config = match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => toml::from_str::<Self>(&content).map_err(|e| {
                TownServerError::Config(format!("{}: {e}", config_path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %config_path.display(), "No config file, running with defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.config_path = config_path;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TownServerError::Config(e.to_string()))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("TOWN_SERVER_NAME") {
            self.server_name = val;
        }
        if let Ok(val) = env::var("TOWN_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.town_capacity = capacity;
            }
        }
        if let Ok(val) = env::var("TOWN_MAX_FOLLOWERS") {
            if let Ok(depth) = val.parse() {
                self.followers.max_depth = depth;
            }
        }
        if let Ok(val) = env::var("TOWN_FOLLOWER_NAME") {
            self.followers.display_name = val;
        }
        if let Ok(val) = env::var("TOWN_DEBUG") {
            self.debug = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("TOWN_LOG_JSON") {
            self.log_json = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.town_capacity == 0 || self.town_capacity > 10000 {
            return Err(invalid("Town capacity must be between 1 and 10000"));
        }

        if self.followers.display_name.trim().is_empty() {
            return Err(invalid("Follower display name must not be empty"));
        }

        if let Some(town) = &self.default_town {
            for area in &town.pet_areas {
                if !area.to_pet_area().bounding_box.is_valid() {
                    return Err(invalid(format!(
                        "Pet area {} has an invalid bounding box",
                        area.label
                    )));
                }
            }
        }

        Ok(())
    }

    /// Settings applied to every town
    pub fn town_settings(&self) -> TownSettings {
        TownSettings {
            capacity: self.town_capacity,
            followers: self.followers.clone(),
        }
    }
}

fn invalid(reason: impl Into<String>) -> TownServerError {
    TownServerError::Config(reason.into())
}

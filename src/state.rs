//! Application state module
//!
//! Contains the shared state used by the server and its request handlers.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{Result, TownServerError};
use crate::game::store::{TownHandle, TownsStore};

/// Application state shared across all request handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Directory of running towns
    pub towns: Arc<TownsStore>,
    /// Town created from configuration at startup
    pub default_town: Option<TownHandle>,
    /// Shutdown signal sender
    pub shutdown_tx: broadcast::Sender<()>,
}

impl AppState {
    /// Create the application state, including the configured default town
    pub fn new(config: ServerConfig, shutdown_tx: broadcast::Sender<()>) -> Result<Self> {
        let towns = Arc::new(TownsStore::new(config.town_settings()));

        let default_town = match &config.default_town {
            Some(town_config) => {
                let handle =
                    towns.create_town(&town_config.friendly_name, town_config.is_publicly_listed);
                let town = towns.get(&handle.town_id).ok_or_else(|| {
                    TownServerError::Internal("default town vanished after creation".to_string())
                })?;

                let mut town = town.lock();
                for area in &town_config.pet_areas {
                    town.add_pet_area(area.to_pet_area())?;
                }

                info!(
                    town_id = %handle.town_id,
                    friendly_name = %town_config.friendly_name,
                    pet_areas = town_config.pet_areas.len(),
                    "Default town ready"
                );
                Some(handle)
            }
            None => None,
        };

        Ok(Self {
            config,
            towns,
            default_town,
            shutdown_tx,
        })
    }

    /// Disconnect every town
    pub fn shutdown(&self) {
        self.towns.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DefaultTownConfig, PetAreaConfig};

    #[test]
    fn test_state_without_default_town() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = AppState::new(ServerConfig::default(), shutdown_tx).unwrap();
        assert!(state.default_town.is_none());
        assert_eq!(state.towns.count(), 0);
    }

    #[test]
    fn test_default_town_has_pet_areas() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let config = ServerConfig {
            default_town: Some(DefaultTownConfig {
                pet_areas: vec![PetAreaConfig {
                    label: "meadow".to_string(),
                    x: 400.0,
                    y: 400.0,
                    width: 200.0,
                    height: 200.0,
                }],
                ..Default::default()
            }),
            ..Default::default()
        };

        let state = AppState::new(config, shutdown_tx).unwrap();
        let handle = state.default_town.as_ref().unwrap();
        let town = state.towns.get(&handle.town_id).unwrap();
        assert!(town.lock().pet_areas().contains_point(400.0, 400.0));

        state.shutdown();
        assert_eq!(state.towns.count(), 0);
    }
}

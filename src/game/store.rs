//! Towns store
//!
//! Directory of every running town. Each town sits behind its own mutex, so
//! all requests for one town are processed one at a time while separate
//! towns never share mutable state.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::error::{GameError, Result};
use crate::game::town::{TownController, TownSettings};

/// Shared handle to a town
pub type SharedTown = Arc<Mutex<TownController>>;

/// Credentials returned when a town is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TownHandle {
    pub town_id: String,
    pub update_password: String,
}

/// Public listing entry for a town
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TownListing {
    #[serde(rename = "coveyTownID")]
    pub town_id: String,
    pub friendly_name: String,
    pub current_occupancy: usize,
    pub maximum_occupancy: usize,
}

/// Process-wide directory of towns
#[derive(Default)]
pub struct TownsStore {
    towns: DashMap<String, SharedTown>,
    settings: TownSettings,
}

impl TownsStore {
    /// Create a store whose towns use `settings`
    pub fn new(settings: TownSettings) -> Self {
        Self {
            towns: DashMap::new(),
            settings,
        }
    }

    /// Create a new town
    pub fn create_town(&self, friendly_name: &str, is_publicly_listed: bool) -> TownHandle {
        let town = TownController::new(friendly_name, is_publicly_listed, self.settings.clone());
        let handle = TownHandle {
            town_id: town.town_id().to_string(),
            update_password: town.update_password().to_string(),
        };
        self.towns
            .insert(handle.town_id.clone(), Arc::new(Mutex::new(town)));
        handle
    }

    /// Get a town by ID
    pub fn get(&self, town_id: &str) -> Option<SharedTown> {
        self.towns.get(town_id).map(|t| t.clone())
    }

    /// Number of towns
    pub fn count(&self) -> usize {
        self.towns.len()
    }

    /// List publicly listed towns
    pub fn list_public(&self) -> Vec<TownListing> {
        let mut listings: Vec<TownListing> = self
            .towns
            .iter()
            .filter_map(|entry| {
                let town = entry.value().lock();
                if !town.is_publicly_listed() {
                    return None;
                }
                Some(TownListing {
                    town_id: town.town_id().to_string(),
                    friendly_name: town.friendly_name().to_string(),
                    current_occupancy: town.occupancy(),
                    maximum_occupancy: town.capacity(),
                })
            })
            .collect();
        listings.sort_by(|a, b| a.friendly_name.cmp(&b.friendly_name));
        listings
    }

    /// Rename a town or change its visibility
    pub fn update_town(
        &self,
        town_id: &str,
        update_password: &str,
        friendly_name: Option<&str>,
        is_publicly_listed: Option<bool>,
    ) -> Result<()> {
        let town = self.authorized(town_id, update_password)?;
        let mut town = town.lock();

        if let Some(name) = friendly_name.filter(|n| !n.is_empty()) {
            town.set_friendly_name(name);
        }
        if let Some(listed) = is_publicly_listed {
            town.set_publicly_listed(listed);
        }

        info!(
            town_id = %town_id,
            friendly_name = %town.friendly_name(),
            is_publicly_listed = town.is_publicly_listed(),
            "Town updated"
        );

        Ok(())
    }

    /// Delete a town, disconnecting everybody in it
    pub fn delete_town(&self, town_id: &str, update_password: &str) -> Result<()> {
        let town = self.authorized(town_id, update_password)?;
        self.towns.remove(town_id);
        town.lock().disconnect_all_players();

        info!(town_id = %town_id, "Town deleted");
        Ok(())
    }

    /// Disconnect every town
    pub fn shutdown(&self) {
        let towns: Vec<SharedTown> = self.towns.iter().map(|t| t.value().clone()).collect();
        self.towns.clear();
        for town in towns {
            town.lock().disconnect_all_players();
        }
        info!("All towns shut down");
    }

    fn authorized(&self, town_id: &str, update_password: &str) -> Result<SharedTown> {
        let town = self
            .get(town_id)
            .ok_or_else(|| GameError::TownNotFound(town_id.to_string()))?;
        if town.lock().update_password() != update_password {
            return Err(GameError::InvalidPassword.into());
        }
        Ok(town)
    }
}

impl std::fmt::Debug for TownsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TownsStore")
            .field("towns", &self.count())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TownServerError;

    #[test]
    fn test_create_and_get() {
        let store = TownsStore::default();
        let handle = store.create_town("main street", true);

        let town = store.get(&handle.town_id).unwrap();
        assert_eq!(town.lock().friendly_name(), "main street");
        assert_eq!(town.lock().update_password(), handle.update_password);
        assert_eq!(store.count(), 1);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_list_public() {
        let store = TownsStore::default();
        store.create_town("b town", true);
        store.create_town("hidden", false);
        let a = store.create_town("a town", true);
        store
            .get(&a.town_id)
            .unwrap()
            .lock()
            .add_player("alice")
            .unwrap();

        let listings = store.list_public();
        let names: Vec<&str> = listings.iter().map(|l| l.friendly_name.as_str()).collect();
        assert_eq!(names, vec!["a town", "b town"]);
        assert_eq!(listings[0].current_occupancy, 1);
        assert_eq!(listings[0].maximum_occupancy, 50);
    }

    #[test]
    fn test_update_town() {
        let store = TownsStore::default();
        let handle = store.create_town("old", true);

        assert!(matches!(
            store.update_town(&handle.town_id, "wrong", Some("new"), None),
            Err(TownServerError::Game(GameError::InvalidPassword))
        ));

        store
            .update_town(&handle.town_id, &handle.update_password, Some("new"), Some(false))
            .unwrap();
        let town = store.get(&handle.town_id).unwrap();
        assert_eq!(town.lock().friendly_name(), "new");
        assert!(!town.lock().is_publicly_listed());

        // Empty names are ignored
        store
            .update_town(&handle.town_id, &handle.update_password, Some(""), None)
            .unwrap();
        assert_eq!(town.lock().friendly_name(), "new");
    }

    #[test]
    fn test_delete_town() {
        let store = TownsStore::default();
        let handle = store.create_town("doomed", true);
        let town = store.get(&handle.town_id).unwrap();
        town.lock().add_player("alice").unwrap();

        assert!(matches!(
            store.delete_town("missing", &handle.update_password),
            Err(TownServerError::Game(GameError::TownNotFound(_)))
        ));
        store
            .delete_town(&handle.town_id, &handle.update_password)
            .unwrap();

        assert!(store.get(&handle.town_id).is_none());
        assert_eq!(town.lock().occupancy(), 0);
    }

    #[test]
    fn test_towns_are_isolated() {
        let store = TownsStore::default();
        let a = store.get(&store.create_town("a", true).town_id).unwrap();
        let b = store.get(&store.create_town("b", true).town_id).unwrap();

        a.lock().add_player("alice").unwrap();
        assert_eq!(a.lock().occupancy(), 1);
        assert_eq!(b.lock().occupancy(), 0);
    }

    #[test]
    fn test_shutdown() {
        let store = TownsStore::default();
        let handle = store.create_town("a", true);
        let town = store.get(&handle.town_id).unwrap();
        town.lock().add_player("alice").unwrap();

        store.shutdown();
        assert_eq!(store.count(), 0);
        assert_eq!(town.lock().occupancy(), 0);
    }
}

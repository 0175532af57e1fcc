//! Town module
//!
//! A town is one independent session of the virtual space. The controller
//! exclusively owns the town's state:
//! - Entity registry (players and their pet followers)
//! - Player sessions
//! - Conversation areas and their occupants
//! - Pet areas and their occupants
//! - Listeners notified of every visible change

use std::collections::HashMap;
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{GameError, Result};
use crate::game::area::{ConversationArea, PetArea, ZoneRegistry};
use crate::game::entity::{Entity, EntityId, PlayerSnapshot, SpriteKind, UserLocation};
use crate::game::followers::{self, FollowerChainManager, FollowerOutcome, FollowerSettings};
use crate::game::registry::EntityRegistry;

/// Default maximum number of players per town
pub const DEFAULT_TOWN_CAPACITY: usize = 50;

/// Length of generated town IDs
pub const TOWN_ID_LENGTH: usize = 8;

/// Length of generated town update passwords
pub const UPDATE_PASSWORD_LENGTH: usize = 24;

/// Receives notifications about changes in a town
///
/// Every hook defaults to doing nothing.
pub trait TownListener: Send + Sync {
    /// A player or follower became visible in the town
    fn on_player_joined(&self, _player: &Entity) {}

    /// An entity's location was replaced
    fn on_player_moved(&self, _player: &Entity) {}

    /// An entity was removed from the town
    fn on_player_disconnected(&self, _player: &Entity) {}

    /// The town is being torn down
    fn on_town_destroyed(&self) {}

    /// A conversation area was created or its occupants changed
    fn on_conversation_area_updated(&self, _area: &ConversationArea) {}

    /// A conversation area lost its last occupant
    fn on_conversation_area_destroyed(&self, _area: &ConversationArea) {}

    /// A player stepped into a pet area
    fn on_pet_area_entered(&self, _player: &Entity, _area: &PetArea) {}

    /// A player stepped out of a pet area
    fn on_pet_area_left(&self, _player: &Entity, _area: &PetArea) {}
}

/// Per-town settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TownSettings {
    /// Maximum number of players (followers excluded)
    pub capacity: usize,
    /// Follower chain settings
    pub followers: FollowerSettings,
}

impl Default for TownSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TOWN_CAPACITY,
            followers: FollowerSettings::default(),
        }
    }
}

/// A connected player's session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSession {
    /// Token identifying the session to the transport layer
    pub session_token: String,
    /// The player controlled through this session
    pub player: EntityId,
}

/// Generate a random alphanumeric token
pub(crate) fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Controller owning one town's state
pub struct TownController {
    town_id: String,
    friendly_name: String,
    is_publicly_listed: bool,
    update_password: String,
    capacity: usize,
    entities: EntityRegistry,
    pet_areas: ZoneRegistry,
    conversation_areas: Vec<ConversationArea>,
    /// Conversation area label per player
    active_conversations: HashMap<EntityId, String>,
    sessions: HashMap<String, PlayerSession>,
    listeners: Vec<Arc<dyn TownListener>>,
    followers: FollowerChainManager,
}

impl TownController {
    /// Create a new, empty town
    pub fn new(
        friendly_name: impl Into<String>,
        is_publicly_listed: bool,
        settings: TownSettings,
    ) -> Self {
        let town = Self {
            town_id: random_token(TOWN_ID_LENGTH),
            friendly_name: friendly_name.into(),
            is_publicly_listed,
            update_password: random_token(UPDATE_PASSWORD_LENGTH),
            capacity: settings.capacity,
            entities: EntityRegistry::new(),
            pet_areas: ZoneRegistry::new(),
            conversation_areas: Vec::new(),
            active_conversations: HashMap::new(),
            sessions: HashMap::new(),
            listeners: Vec::new(),
            followers: FollowerChainManager::new(settings.followers),
        };

        info!(
            town_id = %town.town_id,
            friendly_name = %town.friendly_name,
            capacity = town.capacity,
            "Town created"
        );

        town
    }

    pub fn town_id(&self) -> &str {
        &self.town_id
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn set_friendly_name(&mut self, name: impl Into<String>) {
        self.friendly_name = name.into();
    }

    pub fn is_publicly_listed(&self) -> bool {
        self.is_publicly_listed
    }

    pub fn set_publicly_listed(&mut self, listed: bool) {
        self.is_publicly_listed = listed;
    }

    pub fn update_password(&self) -> &str {
        &self.update_password
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of players in the town, followers excluded
    pub fn occupancy(&self) -> usize {
        self.entities.iter().filter(|e| !e.is_pet()).count()
    }

    /// All entities, followers included, in join order
    pub fn players(&self) -> &EntityRegistry {
        &self.entities
    }

    /// Client view of every entity, followers included, in join order
    ///
    /// This is the player list a newly joined client draws the town from.
    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.entities.iter().map(Entity::snapshot).collect()
    }

    /// Get an entity by ID
    pub fn player(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Get a session by token
    pub fn session(&self, token: &str) -> Option<&PlayerSession> {
        self.sessions.get(token)
    }

    pub fn pet_areas(&self) -> &ZoneRegistry {
        &self.pet_areas
    }

    pub fn conversation_areas(&self) -> &[ConversationArea] {
        &self.conversation_areas
    }

    /// Label of the conversation area a player is part of
    pub fn active_conversation(&self, id: &EntityId) -> Option<&str> {
        self.active_conversations.get(id).map(String::as_str)
    }

    /// IDs of the followers owned by `player`, nearest first
    pub fn followers_of(&self, player: &EntityId) -> Vec<EntityId> {
        followers::followers_of(&self.entities, player)
    }

    /// Register a listener
    pub fn add_listener(&mut self, listener: Arc<dyn TownListener>) {
        self.listeners.push(listener);
    }

    /// Unregister a listener previously added
    pub fn remove_listener(&mut self, listener: &Arc<dyn TownListener>) {
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Add a new player to the town and open a session for it
    pub fn add_player(&mut self, display_name: impl Into<String>) -> Result<PlayerSession> {
        if self.occupancy() >= self.capacity {
            return Err(GameError::TownFull {
                capacity: self.capacity,
            }
            .into());
        }

        let player = Entity::new(
            EntityId::new(),
            display_name,
            UserLocation::default(),
            SpriteKind::Player,
        );
        let session = PlayerSession {
            session_token: Uuid::new_v4().to_string(),
            player: player.id(),
        };

        info!(
            town_id = %self.town_id,
            player = %player.id(),
            display_name = %player.display_name(),
            "Player joined town"
        );

        for listener in &self.listeners {
            listener.on_player_joined(&player);
        }
        self.entities.insert(player);
        self.sessions
            .insert(session.session_token.clone(), session.clone());

        Ok(session)
    }

    /// Replace a player's location and update area membership
    pub fn update_player_location(&mut self, id: &EntityId, location: UserLocation) -> Result<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.to_string()))?;
        entity.set_location(location.clone());

        if !entity.is_pet() {
            self.update_conversation_membership(id, location.conversation_label.as_deref());
            self.update_pet_area_membership(id, &location);
        }

        if let Some(entity) = self.entities.get(id) {
            for listener in &self.listeners {
                listener.on_player_moved(entity);
            }
        }

        Ok(())
    }

    /// Try to give `player` one more pet follower
    pub fn add_follower(&mut self, player: &EntityId) -> FollowerOutcome {
        let outcome = self
            .followers
            .add_follower(&mut self.entities, &self.pet_areas, player);

        if let Some(follower) = outcome.follower().and_then(|id| self.entities.get(&id)) {
            for listener in &self.listeners {
                listener.on_player_joined(follower);
            }
        }

        outcome
    }

    /// Close a session, removing its player and followers
    pub fn destroy_session(&mut self, token: &str) -> Result<Vec<EntityId>> {
        let session = self
            .sessions
            .get(token)
            .cloned()
            .ok_or(GameError::InvalidSession)?;
        self.remove_player(&session.player)
    }

    /// Remove an entity together with its follower chain
    ///
    /// Returns the removed entity IDs, the entity itself first.
    pub fn remove_player(&mut self, id: &EntityId) -> Result<Vec<EntityId>> {
        if !self.entities.contains(id) {
            return Err(GameError::PlayerNotFound(id.to_string()).into());
        }

        let removed = self.entities.remove_with_chain(id);
        for entity in &removed {
            let entity_id = entity.id();
            if let Some(label) = self.active_conversations.get(&entity_id).cloned() {
                self.leave_conversation_area(&entity_id, &label);
            }
            for area in self.pet_areas.iter_mut() {
                area.occupants.retain(|o| *o != entity_id);
            }
            self.sessions.retain(|_, s| s.player != entity_id);
            for listener in &self.listeners {
                listener.on_player_disconnected(entity);
            }
        }

        info!(
            town_id = %self.town_id,
            player = %id,
            removed = removed.len(),
            "Player left town"
        );

        Ok(removed.iter().map(|e| e.id()).collect())
    }

    /// Create a conversation area and pull in players already inside it
    pub fn add_conversation_area(&mut self, area: ConversationArea) -> Result<()> {
        if area.topic.is_empty() {
            return Err(GameError::InvalidArea("conversation topic is empty".to_string()).into());
        }
        if !area.bounding_box.is_valid() {
            return Err(GameError::InvalidArea(format!(
                "conversation area {} has an invalid bounding box",
                area.label
            ))
            .into());
        }
        if self.conversation_areas.iter().any(|a| a.label == area.label) {
            return Err(GameError::InvalidArea(format!(
                "conversation label {} already in use",
                area.label
            ))
            .into());
        }
        if self
            .conversation_areas
            .iter()
            .any(|a| a.bounding_box.overlaps(&area.bounding_box))
        {
            return Err(GameError::InvalidArea(format!(
                "conversation area {} overlaps an existing area",
                area.label
            ))
            .into());
        }

        let mut area = ConversationArea::new(area.label, area.topic, area.bounding_box);
        let inside: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| !e.is_pet())
            .filter(|e| area.bounding_box.contains(e.location().x, e.location().y))
            .map(|e| e.id())
            .collect();

        for id in &inside {
            if let Some(previous) = self.active_conversations.get(id).cloned() {
                self.leave_conversation_area(id, &previous);
            }
            self.active_conversations.insert(*id, area.label.clone());
        }
        area.occupants = inside;

        info!(
            town_id = %self.town_id,
            label = %area.label,
            occupants = area.occupants.len(),
            "Conversation area created"
        );

        for listener in &self.listeners {
            listener.on_conversation_area_updated(&area);
        }
        self.conversation_areas.push(area);

        Ok(())
    }

    /// Register a pet area and pull in players already inside it
    pub fn add_pet_area(&mut self, area: PetArea) -> Result<()> {
        let mut area = PetArea::new(area.label, area.bounding_box);
        let inside: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|e| !e.is_pet())
            .filter(|e| area.contains(e.location().x, e.location().y))
            .map(|e| e.id())
            .collect();
        area.occupants = inside;

        let label = area.label.clone();
        self.pet_areas.add(area)?;

        info!(town_id = %self.town_id, label = %label, "Pet area added");

        if let Some(area) = self.pet_areas.get(&label) {
            for id in &area.occupants {
                if let Some(player) = self.entities.get(id) {
                    for listener in &self.listeners {
                        listener.on_pet_area_entered(player, area);
                    }
                }
            }
        }

        Ok(())
    }

    /// Remove a pet area; its occupants are notified that they left it
    pub fn remove_pet_area(&mut self, label: &str) -> Option<PetArea> {
        let area = self.pet_areas.remove(label)?;

        info!(town_id = %self.town_id, label = %label, "Pet area removed");

        for id in &area.occupants {
            if let Some(player) = self.entities.get(id) {
                for listener in &self.listeners {
                    listener.on_pet_area_left(player, &area);
                }
            }
        }

        Some(area)
    }

    /// Tear the town down: notify listeners and drop every player
    pub fn disconnect_all_players(&mut self) {
        info!(
            town_id = %self.town_id,
            players = self.occupancy(),
            "Disconnecting all players"
        );

        for listener in &self.listeners {
            listener.on_town_destroyed();
        }

        self.sessions.clear();
        self.active_conversations.clear();
        self.conversation_areas.clear();
        for area in self.pet_areas.iter_mut() {
            area.occupants.clear();
        }
        self.entities = EntityRegistry::new();
    }

    fn update_conversation_membership(&mut self, id: &EntityId, label: Option<&str>) {
        let next = label
            .filter(|l| self.conversation_areas.iter().any(|a| a.label == *l))
            .map(str::to_string);
        let previous = self.active_conversations.get(id).cloned();
        if next == previous {
            return;
        }

        if let Some(previous) = previous {
            self.leave_conversation_area(id, &previous);
        }

        if let Some(next) = next {
            if let Some(area) = self.conversation_areas.iter_mut().find(|a| a.label == next) {
                area.occupants.push(*id);
                debug!(player = %id, label = %next, "Player joined conversation area");
                for listener in &self.listeners {
                    listener.on_conversation_area_updated(area);
                }
            }
            self.active_conversations.insert(*id, next);
        }
    }

    fn leave_conversation_area(&mut self, id: &EntityId, label: &str) {
        self.active_conversations.remove(id);

        let Some(index) = self.conversation_areas.iter().position(|a| a.label == label) else {
            return;
        };
        let empty = {
            let area = &mut self.conversation_areas[index];
            area.occupants.retain(|o| o != id);
            area.occupants.is_empty()
        };

        if empty {
            let area = self.conversation_areas.remove(index);
            info!(
                town_id = %self.town_id,
                label = %area.label,
                "Conversation area destroyed"
            );
            for listener in &self.listeners {
                listener.on_conversation_area_destroyed(&area);
            }
        } else {
            let area = &self.conversation_areas[index];
            for listener in &self.listeners {
                listener.on_conversation_area_updated(area);
            }
        }
    }

    fn update_pet_area_membership(&mut self, id: &EntityId, location: &UserLocation) {
        let mut entered = Vec::new();
        let mut left = Vec::new();

        for area in self.pet_areas.iter_mut() {
            let inside = area.contains(location.x, location.y);
            let was_inside = area.occupants.contains(id);
            if inside && !was_inside {
                area.occupants.push(*id);
                entered.push(area.label.clone());
            } else if !inside && was_inside {
                area.occupants.retain(|o| o != id);
                left.push(area.label.clone());
            }
        }

        let Some(player) = self.entities.get(id) else {
            return;
        };
        for label in &entered {
            debug!(player = %id, label = %label, "Player entered pet area");
            if let Some(area) = self.pet_areas.get(label) {
                for listener in &self.listeners {
                    listener.on_pet_area_entered(player, area);
                }
            }
        }
        for label in &left {
            debug!(player = %id, label = %label, "Player left pet area");
            if let Some(area) = self.pet_areas.get(label) {
                for listener in &self.listeners {
                    listener.on_pet_area_left(player, area);
                }
            }
        }
    }
}

impl std::fmt::Debug for TownController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TownController")
            .field("town_id", &self.town_id)
            .field("friendly_name", &self.friendly_name)
            .field("is_publicly_listed", &self.is_publicly_listed)
            .field("capacity", &self.capacity)
            .field("entities", &self.entities.len())
            .field("pet_areas", &self.pet_areas.len())
            .field("conversation_areas", &self.conversation_areas.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

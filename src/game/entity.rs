//! Entity module
//!
//! A single representation for every occupant of a town:
//! - Human-controlled players
//! - Pet followers attached to a player's follower chain
//!
//! Entities do not validate anything themselves. Their location is replaced
//! by the movement handler and their follower link is set by the follower
//! chain manager.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique, immutable entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Facing direction of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Front,
    Back,
    Left,
    Right,
}

/// Location record of an entity, replaced wholesale on each movement update
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Facing direction
    pub rotation: Direction,
    /// Whether the entity is currently walking
    pub moving: bool,
    /// Conversation area the entity is standing in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_label: Option<String>,
}

impl UserLocation {
    /// Create a stationary, front-facing location
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    /// Set the facing direction
    pub fn with_rotation(mut self, rotation: Direction) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the moving flag
    pub fn with_moving(mut self, moving: bool) -> Self {
        self.moving = moving;
        self
    }

    /// Set the conversation label
    pub fn with_conversation_label(mut self, label: impl Into<String>) -> Self {
        self.conversation_label = Some(label.into());
        self
    }
}

impl std::fmt::Display for UserLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Rendering variant of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpriteKind {
    /// Default player sprite atlas
    #[default]
    #[serde(rename = "atlas")]
    Player,
    /// Pet follower sprite
    #[serde(rename = "pet")]
    Pet,
}

/// A player or follower in a town
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    display_name: String,
    location: UserLocation,
    /// Head of this entity's follower chain
    follower: Option<EntityId>,
    sprite_kind: SpriteKind,
}

impl Entity {
    /// Create a new entity with no follower
    pub fn new(
        id: EntityId,
        display_name: impl Into<String>,
        location: UserLocation,
        sprite_kind: SpriteKind,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            location,
            follower: None,
            sprite_kind,
        }
    }

    /// Get the entity's identifier
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Get the entity's display name
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Get the entity's sprite kind
    pub fn sprite_kind(&self) -> SpriteKind {
        self.sprite_kind
    }

    /// Check if this entity is a pet follower
    pub fn is_pet(&self) -> bool {
        self.sprite_kind == SpriteKind::Pet
    }

    /// Get the entity's current location
    pub fn location(&self) -> &UserLocation {
        &self.location
    }

    /// Replace the entity's location
    pub fn set_location(&mut self, location: UserLocation) {
        self.location = location;
    }

    /// Get the identifier of this entity's direct follower
    pub fn follower(&self) -> Option<EntityId> {
        self.follower
    }

    /// Set or clear this entity's direct follower
    pub fn set_follower(&mut self, follower: Option<EntityId>) {
        self.follower = follower;
    }

    /// Build the client-facing snapshot of this entity
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            user_name: self.display_name.clone(),
            location: self.location.clone(),
            sprite_type: self.sprite_kind,
        }
    }
}

/// Client-facing view of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(rename = "_userName")]
    pub user_name: String,
    pub location: UserLocation,
    #[serde(rename = "spriteType")]
    pub sprite_type: SpriteKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_has_no_follower() {
        let player = Entity::new(
            EntityId::new(),
            "test player",
            UserLocation::new(400.0, 400.0),
            SpriteKind::Player,
        );
        assert_eq!(player.follower(), None);
        assert_eq!(player.display_name(), "test player");
        assert!(!player.is_pet());
    }

    #[test]
    fn test_location_replaced_wholesale() {
        let mut player = Entity::new(
            EntityId::new(),
            "mover",
            UserLocation::new(0.0, 0.0).with_conversation_label("lobby"),
            SpriteKind::Player,
        );

        let next = UserLocation::new(10.0, 20.0)
            .with_rotation(Direction::Left)
            .with_moving(true);
        player.set_location(next.clone());

        assert_eq!(player.location(), &next);
        assert_eq!(player.location().conversation_label, None);
    }

    #[test]
    fn test_entity_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let pet = Entity::new(
            EntityId::new(),
            "Pet",
            UserLocation::new(1.0, 2.0).with_rotation(Direction::Back),
            SpriteKind::Pet,
        );

        let json = serde_json::to_value(pet.snapshot()).unwrap();
        assert_eq!(json["_id"], pet.id().to_string());
        assert_eq!(json["_userName"], "Pet");
        assert_eq!(json["spriteType"], "pet");
        assert_eq!(json["location"]["rotation"], "back");
        assert_eq!(json["location"]["moving"], false);
        assert!(json["location"].get("conversationLabel").is_none());
    }

    #[test]
    fn test_location_from_client_json() {
        let json = r#"{"x":400,"y":400,"rotation":"front","moving":false,"conversationLabel":"lobby"}"#;
        let location: UserLocation = serde_json::from_str(json).unwrap();

        assert_eq!(location.x, 400.0);
        assert_eq!(location.rotation, Direction::Front);
        assert_eq!(location.conversation_label.as_deref(), Some("lobby"));
    }
}

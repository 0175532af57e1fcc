//! Follower chain module
//!
//! Decides whether a player may gain a pet follower and appends it to the
//! tail of the player's follower chain:
//! - Eligibility: the player must stand inside a registered pet area
//! - Depth cap: a chain holds at most `max_depth` followers
//! - Growth: one new follower per granted call, always at the tail
//!
//! Rejections are ordinary outcomes reported through [`FollowerOutcome`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::area::ZoneRegistry;
use crate::game::entity::{Entity, EntityId, SpriteKind};
use crate::game::registry::EntityRegistry;

/// Default maximum number of followers in one chain
pub const DEFAULT_MAX_FOLLOWERS: usize = 7;

/// Default display name given to new followers
pub const DEFAULT_FOLLOWER_NAME: &str = "Pet";

/// Follower chain settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerSettings {
    /// Maximum followers per chain
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Display name of created followers
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_FOLLOWERS
}

fn default_display_name() -> String {
    DEFAULT_FOLLOWER_NAME.to_string()
}

impl Default for FollowerSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            display_name: default_display_name(),
        }
    }
}

/// Result of a follower request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerOutcome {
    /// A follower was created and linked at `depth` (1 = direct follower)
    Appended { follower: EntityId, depth: usize },
    /// The player is not inside any pet area
    OutsidePetArea,
    /// The chain already holds the maximum number of followers
    ChainFull,
}

impl FollowerOutcome {
    /// Check if a follower was added
    pub fn is_appended(&self) -> bool {
        matches!(self, FollowerOutcome::Appended { .. })
    }

    /// Get the new follower's ID, if one was added
    pub fn follower(&self) -> Option<EntityId> {
        match self {
            FollowerOutcome::Appended { follower, .. } => Some(*follower),
            _ => None,
        }
    }
}

/// Grows follower chains inside a town's entity registry
#[derive(Debug, Clone, Default)]
pub struct FollowerChainManager {
    settings: FollowerSettings,
}

impl FollowerChainManager {
    /// Create a chain manager with the given settings
    pub fn new(settings: FollowerSettings) -> Self {
        Self { settings }
    }

    /// Get the manager's settings
    pub fn settings(&self) -> &FollowerSettings {
        &self.settings
    }

    /// Try to append one follower to the chain owned by `player`
    ///
    /// When `player` is itself a follower the request is made on behalf of
    /// the player that owns the chain: that player's current location decides
    /// eligibility and seeds the new follower. An unregistered `player` has
    /// no location and is therefore outside every pet area.
    pub fn add_follower(
        &self,
        registry: &mut EntityRegistry,
        zones: &ZoneRegistry,
        player: &EntityId,
    ) -> FollowerOutcome {
        if !registry.contains(player) {
            debug!(player = %player, "Follower request for unknown player");
            return FollowerOutcome::OutsidePetArea;
        }

        let root = root_of(registry, player);
        let Some(owner) = registry.get(&root) else {
            panic!("chain root {root} is not registered");
        };

        let location = owner.location().clone();
        if !zones.contains_point(location.x, location.y) {
            debug!(
                player = %player,
                root = %root,
                location = %location,
                "Player not in a pet area"
            );
            return FollowerOutcome::OutsidePetArea;
        }

        let (tail, depth) = tail_of(registry, &root);
        if depth >= self.settings.max_depth {
            debug!(
                root = %root,
                depth = depth,
                max_depth = self.settings.max_depth,
                "Follower chain full"
            );
            return FollowerOutcome::ChainFull;
        }

        let follower = Entity::new(
            EntityId::new(),
            self.settings.display_name.as_str(),
            location,
            SpriteKind::Pet,
        );
        let follower_id = follower.id();
        registry.insert(follower);
        link(registry, &tail, follower_id);

        info!(
            root = %root,
            follower = %follower_id,
            depth = depth + 1,
            "Follower added"
        );

        FollowerOutcome::Appended {
            follower: follower_id,
            depth: depth + 1,
        }
    }
}

/// Walk leader links up from `id` to the entity owning the chain
///
/// # Panics
///
/// Panics if the leader links form a cycle.
pub fn root_of(registry: &EntityRegistry, id: &EntityId) -> EntityId {
    let mut current = *id;
    let mut hops = 0;
    while let Some(leader) = registry.leader_of(&current) {
        hops += 1;
        assert!(hops <= registry.len(), "follower chain cycle at {current}");
        current = leader;
    }
    current
}

/// Last entity of the chain starting at `root`, with its depth (root = 0)
fn tail_of(registry: &EntityRegistry, root: &EntityId) -> (EntityId, usize) {
    registry
        .chain(root)
        .fold((*root, 0), |(_, depth), entity| (entity.id(), depth + 1))
}

/// Make `follower` the direct follower of `tail`
///
/// # Panics
///
/// Panics if `tail` already has a follower or `follower` is already linked.
fn link(registry: &mut EntityRegistry, tail: &EntityId, follower: EntityId) {
    if let Some(leader) = registry.leader_of(&follower) {
        panic!("entity {follower} already follows {leader}");
    }
    let entity = registry
        .get_mut(tail)
        .unwrap_or_else(|| panic!("chain tail {tail} is not registered"));
    assert!(
        entity.follower().is_none(),
        "chain tail {tail} already has a follower"
    );
    entity.set_follower(Some(follower));
}

/// Number of followers in the chain owned by `root`
pub fn chain_depth(registry: &EntityRegistry, root: &EntityId) -> usize {
    registry.chain(root).count()
}

/// IDs of every follower in the chain owned by `root`, nearest first
pub fn followers_of(registry: &EntityRegistry, root: &EntityId) -> Vec<EntityId> {
    registry.chain(root).map(|e| e.id()).collect()
}

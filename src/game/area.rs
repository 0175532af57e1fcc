//! Area module
//!
//! Rectangular regions of a town map:
//! - Conversation areas (proximity-based groupings of players)
//! - Pet areas (zones inside which players may gain followers)

use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::game::entity::EntityId;

/// Axis-aligned rectangle, positioned by its centre
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Centre X coordinate
    pub x: f64,
    /// Centre Y coordinate
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if a point lies strictly inside the box
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.x - self.width / 2.0
            && x < self.x + self.width / 2.0
            && y > self.y - self.height / 2.0
            && y < self.y + self.height / 2.0
    }

    /// Check if two boxes share any interior
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        (self.x - other.x).abs() < (self.width + other.width) / 2.0
            && (self.y - other.y).abs() < (self.height + other.height) / 2.0
    }

    /// Check that the box has a positive, finite size
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Conversation area: players inside are grouped under its label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationArea {
    pub label: String,
    pub topic: String,
    pub bounding_box: BoundingBox,
    #[serde(rename = "occupantsByID", default)]
    pub occupants: Vec<EntityId>,
}

impl ConversationArea {
    /// Create an unoccupied conversation area
    pub fn new(label: impl Into<String>, topic: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            topic: topic.into(),
            bounding_box,
            occupants: Vec::new(),
        }
    }
}

/// Pet-enabling zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetArea {
    pub label: String,
    pub bounding_box: BoundingBox,
    #[serde(rename = "occupantsByID", default)]
    pub occupants: Vec<EntityId>,
}

impl PetArea {
    /// Create an unoccupied pet area
    pub fn new(label: impl Into<String>, bounding_box: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bounding_box,
            occupants: Vec::new(),
        }
    }

    /// Check if a point lies inside this area
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.bounding_box.contains(x, y)
    }
}

/// Set of pet areas registered with a town
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    areas: Vec<PetArea>,
}

impl ZoneRegistry {
    /// Create an empty zone registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pet area
    pub fn add(&mut self, area: PetArea) -> std::result::Result<(), GameError> {
        if area.label.is_empty() {
            return Err(GameError::InvalidArea("pet area label is empty".to_string()));
        }
        if !area.bounding_box.is_valid() {
            return Err(GameError::InvalidArea(format!(
                "pet area {} has an invalid bounding box",
                area.label
            )));
        }
        if self.get(&area.label).is_some() {
            return Err(GameError::InvalidArea(format!(
                "pet area label {} already in use",
                area.label
            )));
        }
        self.areas.push(area);
        Ok(())
    }

    /// Remove a pet area by label
    pub fn remove(&mut self, label: &str) -> Option<PetArea> {
        let index = self.areas.iter().position(|a| a.label == label)?;
        Some(self.areas.remove(index))
    }

    /// Get a pet area by label
    pub fn get(&self, label: &str) -> Option<&PetArea> {
        self.areas.iter().find(|a| a.label == label)
    }

    /// Check if any registered area contains the point
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.areas.iter().any(|a| a.contains(x, y))
    }

    /// Labels of every area containing the point
    pub fn areas_containing(&self, x: f64, y: f64) -> Vec<String> {
        self.areas
            .iter()
            .filter(|a| a.contains(x, y))
            .map(|a| a.label.clone())
            .collect()
    }

    /// Iterate over all areas
    pub fn iter(&self) -> impl Iterator<Item = &PetArea> {
        self.areas.iter()
    }

    /// Iterate mutably over all areas
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PetArea> {
        self.areas.iter_mut()
    }

    /// Number of registered areas
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Check if no areas are registered
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(400.0, 400.0, 200.0, 200.0);
        assert!(bbox.contains(400.0, 400.0));
        assert!(bbox.contains(301.0, 499.0));
        assert!(!bbox.contains(800.0, 800.0));
        // Edges are outside
        assert!(!bbox.contains(300.0, 400.0));
        assert!(!bbox.contains(400.0, 500.0));
    }

    #[test]
    fn test_bounding_box_overlaps() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(8.0, 8.0, 10.0, 10.0);
        let c = BoundingBox::new(10.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        // Touching edges do not overlap
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_bounding_box_validity() {
        assert!(BoundingBox::new(1.0, 1.0, 2.0, 2.0).is_valid());
        assert!(!BoundingBox::new(1.0, 1.0, 0.0, 2.0).is_valid());
        assert!(!BoundingBox::new(f64::NAN, 1.0, 2.0, 2.0).is_valid());
    }

    #[test]
    fn test_zone_registry_lookup() {
        let mut zones = ZoneRegistry::new();
        assert!(!zones.contains_point(400.0, 400.0));

        zones
            .add(PetArea::new("meadow", BoundingBox::new(400.0, 400.0, 200.0, 200.0)))
            .unwrap();
        zones
            .add(PetArea::new("pond", BoundingBox::new(450.0, 450.0, 100.0, 100.0)))
            .unwrap();

        assert!(zones.contains_point(400.0, 400.0));
        assert!(!zones.contains_point(800.0, 800.0));
        assert_eq!(zones.areas_containing(450.0, 450.0), vec!["meadow", "pond"]);
    }

    #[test]
    fn test_zone_registry_rejects_bad_areas() {
        let mut zones = ZoneRegistry::new();
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);

        zones.add(PetArea::new("meadow", bbox)).unwrap();
        assert!(zones.add(PetArea::new("meadow", bbox)).is_err());
        assert!(zones.add(PetArea::new("", bbox)).is_err());
        assert!(zones
            .add(PetArea::new("flat", BoundingBox::new(0.0, 0.0, 10.0, 0.0)))
            .is_err());
        assert_eq!(zones.len(), 1);
    }

    #[test]
    fn test_zone_registry_remove() {
        let mut zones = ZoneRegistry::new();
        zones
            .add(PetArea::new("meadow", BoundingBox::new(0.0, 0.0, 10.0, 10.0)))
            .unwrap();

        assert!(zones.remove("missing").is_none());
        assert_eq!(zones.remove("meadow").map(|a| a.label), Some("meadow".to_string()));
        assert!(zones.is_empty());
        assert!(!zones.contains_point(0.0, 0.0));
    }
}

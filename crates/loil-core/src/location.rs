use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::{LocationId, ObjectId};
use crate::layers::TileLayer;
use crate::object::WorldObject;

/// Which end of a lane an entity reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Tile 0.
    Left,
    /// The last tile.
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Key of a transition: lane side combined with the vertical sub-direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKey {
    /// Left end, going up.
    LeftUp,
    /// Left end, going down.
    LeftDown,
    /// Right end, going up.
    RightUp,
    /// Right end, going down.
    RightDown,
}

impl TransitionKey {
    /// The key for leaving through `side` with the given vertical intent.
    ///
    /// Returns `None` when `vertical` is 0: without an up/down intent there
    /// is no transition at a lane boundary.
    pub fn at_boundary(side: Side, vertical: i8) -> Option<Self> {
        match (side, vertical.signum()) {
            (Side::Left, 1) => Some(Self::LeftUp),
            (Side::Left, -1) => Some(Self::LeftDown),
            (Side::Right, 1) => Some(Self::RightUp),
            (Side::Right, -1) => Some(Self::RightDown),
            _ => None,
        }
    }

    /// The lane end this key belongs to.
    pub fn side(self) -> Side {
        match self {
            Self::LeftUp | Self::LeftDown => Side::Left,
            Self::RightUp | Self::RightDown => Side::Right,
        }
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LeftUp => write!(f, "left_up"),
            Self::LeftDown => write!(f, "left_down"),
            Self::RightUp => write!(f, "right_up"),
            Self::RightDown => write!(f, "right_down"),
        }
    }
}

/// A directed link from a lane boundary to another location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Where the transition leads.
    pub location_id: LocationId,
    /// Free-form crossing type ("stairs", "door", ...).
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// One location of the world: a lane of tiles described by four layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique location ID.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Object IDs placed in the foreground, 0 for empty tiles.
    pub foreground: TileLayer,
    /// Road type codes, [`crate::layers::IMPASSABLE`] for blocked tiles.
    pub road: TileLayer,
    /// Ground type codes.
    pub ground: TileLayer,
    /// Object type codes of background decorations, 0 for none.
    pub background: TileLayer,
    /// Legacy per-location object list, merged into the world on load.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub objects: BTreeMap<ObjectId, WorldObject>,
    /// Links to neighboring locations.
    #[serde(default)]
    pub transitions: BTreeMap<TransitionKey, Transition>,
}

impl Location {
    /// A location of `width` tiles with an open road (type 0) and empty layers.
    pub fn new(id: LocationId, name: impl Into<String>, width: usize) -> Self {
        Self {
            id,
            name: name.into(),
            foreground: TileLayer::filled(width, 0),
            road: TileLayer::filled(width, 0),
            ground: TileLayer::filled(width, 0),
            background: TileLayer::filled(width, 0),
            objects: BTreeMap::new(),
            transitions: BTreeMap::new(),
        }
    }

    /// Lane width, taken from the road layer.
    pub fn width(&self) -> usize {
        self.road.len()
    }

    /// Add a transition, replacing any existing one under the same key.
    pub fn with_transition(mut self, key: TransitionKey, target: LocationId) -> Self {
        self.transitions.insert(
            key,
            Transition {
                location_id: target,
                kind: String::new(),
            },
        );
        self
    }

    /// The transition under `key`, if any.
    pub fn transition(&self, key: TransitionKey) -> Option<&Transition> {
        self.transitions.get(&key)
    }

    /// Check that all four layers share the lane width.
    pub fn validate(&self) -> CoreResult<()> {
        let expected = self.road.len();
        let layers = [
            ("foreground", &self.foreground),
            ("ground", &self.ground),
            ("background", &self.background),
        ];
        for (layer, tiles) in layers {
            if tiles.len() != expected {
                return Err(CoreError::LayerMismatch {
                    location: self.id,
                    layer,
                    expected,
                    actual: tiles.len(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_keys_follow_vertical_intent() {
        assert_eq!(
            TransitionKey::at_boundary(Side::Right, 1),
            Some(TransitionKey::RightUp)
        );
        assert_eq!(
            TransitionKey::at_boundary(Side::Left, -1),
            Some(TransitionKey::LeftDown)
        );
        assert_eq!(TransitionKey::at_boundary(Side::Left, 0), None);
    }

    #[test]
    fn transitions_deserialize_from_snake_case_keys() {
        let json = r#"{
            "id": 1, "name": "Meadow",
            "foreground": "0 0 0", "road": "1 1 1", "ground": "1 1 1", "background": "0 0 0",
            "transitions": { "right_up": { "location_id": 2, "type": "path" } }
        }"#;
        let loc: Location = serde_json::from_str(json).unwrap();
        let t = loc.transition(TransitionKey::RightUp).unwrap();
        assert_eq!(t.location_id, LocationId(2));
        assert_eq!(t.kind, "path");
        assert!(loc.transition(TransitionKey::LeftUp).is_none());
    }

    #[test]
    fn validate_catches_short_layer() {
        let mut loc = Location::new(LocationId(3), "Cave", 5);
        loc.ground = TileLayer::filled(4, 0);
        match loc.validate() {
            Err(CoreError::LayerMismatch {
                layer,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(layer, "ground");
                assert_eq!(expected, 5);
                assert_eq!(actual, 4);
            }
            other => panic!("expected layer mismatch, got {other:?}"),
        }
    }
}

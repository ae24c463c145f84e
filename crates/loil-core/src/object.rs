use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{LocationId, ObjectId};

/// An object placed on a tile: a tree, a rock, a bush of berries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Taken from the map key in world files.
    #[serde(default)]
    pub id: ObjectId,
    /// Object type code, see [`crate::catalog::ObjectType`].
    pub type_id: i32,
    /// Tile position inside the owning location.
    pub x: i32,
    /// Owning location.
    #[serde(default)]
    pub location_id: LocationId,
    /// Uses left before the object wears out.
    #[serde(default)]
    pub durability: i32,
    /// Growth stage, 0..=100.
    #[serde(default)]
    pub growth_stage: i32,
    /// Stored items: item type code to count.
    #[serde(default)]
    pub storage: BTreeMap<i32, u32>,
}

impl WorldObject {
    /// A freshly placed object with no growth and empty storage.
    pub fn new(id: ObjectId, type_id: i32, location_id: LocationId, x: i32, durability: i32) -> Self {
        Self {
            id,
            type_id,
            x,
            location_id,
            durability,
            growth_stage: 0,
            storage: BTreeMap::new(),
        }
    }
}

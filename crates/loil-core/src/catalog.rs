use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// One item produced by an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionYield {
    /// Item type ID.
    pub item_id: i32,
    /// How many of the item.
    pub count: u32,
}

/// A (tool, effect) pair attached to an object type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    /// Action name: pick, chop, mine, harvest, collect, dig.
    #[serde(rename = "type")]
    pub kind: String,
    /// Required tool: "hand", "axe", "pickaxe", ...
    pub tool: String,
    /// Nominal duration in seconds. Interactions currently complete at once.
    pub time: u32,
    /// Items granted on success.
    pub results: Vec<InteractionYield>,
    /// Durability cost; 0 or less means 1.
    pub reduce_durability: i32,
    /// Object type the object becomes when worn out; 0 for none.
    pub transform_to: i32,
    /// Destroy the object after this interaction regardless of durability.
    pub destroy_on_complete: bool,
}

impl Interaction {
    /// Durability consumed per use; never less than 1.
    pub fn durability_cost(&self) -> i32 {
        if self.reduce_durability <= 0 {
            1
        } else {
            self.reduce_durability
        }
    }

    /// Object type to turn into when worn out, if any.
    pub fn transform_target(&self) -> Option<i32> {
        (self.transform_to != 0).then_some(self.transform_to)
    }
}

/// Static definition of an object type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectType {
    /// Unique object type ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Free text shown to players.
    pub description: String,
    /// Occupies the foreground layer.
    pub foreground: bool,
    /// Sits on the road layer.
    pub road_level: bool,
    /// Drawn in the background layer.
    pub background: bool,
    /// Width in tiles.
    pub size: u32,
    /// Durability of a fresh object.
    pub max_durability: i32,
    /// Seconds to grow; 0 for objects that do not grow.
    pub growth_time: u32,
    /// Ways characters can work this object.
    pub interactions: Vec<Interaction>,
}

/// Static definition of a road type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadType {
    /// Unique road type ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Free text shown to players.
    pub description: String,
    /// Wear a road can take.
    pub durability: i32,
    /// Multiplier on the base walking speed.
    pub speed_mod: f64,
}

/// Static definition of a ground type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundType {
    /// Unique ground type ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Free text shown to players.
    pub description: String,
    /// Characters and creatures may stand here.
    pub walkable: bool,
    /// Objects may be placed here.
    pub buildable: bool,
    /// Item yielded by digging; 0 for none.
    pub resource_id: i32,
}

/// Static definition of an item type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemType {
    /// Unique item type ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Free text shown to players.
    pub description: String,
    /// food, resource, tool, seed
    #[serde(rename = "type")]
    pub kind: String,
    /// Largest stack in one inventory slot.
    pub stack_size: u32,
    /// Weight of one unit.
    pub weight: f64,
}

/// Static definition of a creature type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatureType {
    /// Unique creature type ID.
    pub id: i32,
    /// Display name.
    pub name: String,
    /// Free text shown to players.
    pub description: String,
    /// humanoid, animal
    #[serde(rename = "type")]
    pub kind: String,
    /// Width in tiles.
    pub size: u32,
    /// Starting and maximum health.
    pub health: i32,
    /// Damage per hit.
    pub damage: i32,
    /// Tiles per second.
    pub speed: f64,
    /// Object type codes this creature eats.
    pub favorite_foods: Vec<i32>,
    /// Behavior names this creature may choose from.
    pub behaviors: Vec<String>,
    /// Behavior used when nothing else applies.
    pub default_behavior: String,
}

/// The five type catalogs, keyed by their file keys.
///
/// File keys are free-form strings; records are identified by their `id`
/// field. See [`crate::Registry`] for the ID-indexed view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Object types by file key.
    pub object_types: BTreeMap<String, ObjectType>,
    /// Road types by file key.
    pub road_types: BTreeMap<String, RoadType>,
    /// Ground types by file key.
    pub ground_types: BTreeMap<String, GroundType>,
    /// Item types by file key.
    pub item_types: BTreeMap<String, ItemType>,
    /// Creature types by file key.
    pub creature_types: BTreeMap<String, CreatureType>,
}

impl Catalog {
    /// File name of the object type catalog.
    pub const OBJECT_TYPES_FILE: &'static str = "object_types.json";
    /// File name of the road type catalog.
    pub const ROAD_TYPES_FILE: &'static str = "road_types.json";
    /// File name of the ground type catalog.
    pub const GROUND_TYPES_FILE: &'static str = "ground_types.json";
    /// File name of the item type catalog.
    pub const ITEM_TYPES_FILE: &'static str = "item_types.json";
    /// File name of the creature type catalog.
    pub const CREATURE_TYPES_FILE: &'static str = "creature_types.json";

    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every catalog file from `dir`.
    ///
    /// Object, road and ground types are required. Item and creature types
    /// are optional and default to empty when their file is absent.
    pub fn load_dir(dir: &Path) -> CoreResult<Self> {
        Ok(Self {
            object_types: load_required(&dir.join(Self::OBJECT_TYPES_FILE))?,
            road_types: load_required(&dir.join(Self::ROAD_TYPES_FILE))?,
            ground_types: load_required(&dir.join(Self::GROUND_TYPES_FILE))?,
            item_types: load_optional(&dir.join(Self::ITEM_TYPES_FILE))?,
            creature_types: load_optional(&dir.join(Self::CREATURE_TYPES_FILE))?,
        })
    }

    /// Add an object type under `key`.
    pub fn with_object_type(mut self, key: impl Into<String>, ty: ObjectType) -> Self {
        self.object_types.insert(key.into(), ty);
        self
    }

    /// Add a road type under `key`.
    pub fn with_road_type(mut self, key: impl Into<String>, ty: RoadType) -> Self {
        self.road_types.insert(key.into(), ty);
        self
    }

    /// Add a ground type under `key`.
    pub fn with_ground_type(mut self, key: impl Into<String>, ty: GroundType) -> Self {
        self.ground_types.insert(key.into(), ty);
        self
    }

    /// Add an item type under `key`.
    pub fn with_item_type(mut self, key: impl Into<String>, ty: ItemType) -> Self {
        self.item_types.insert(key.into(), ty);
        self
    }

    /// Add a creature type under `key`.
    pub fn with_creature_type(mut self, key: impl Into<String>, ty: CreatureType) -> Self {
        self.creature_types.insert(key.into(), ty);
        self
    }
}

fn load_required<T: DeserializeOwned>(path: &Path) -> CoreResult<BTreeMap<String, T>> {
    let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CoreError::Json {
        what: path.display().to_string(),
        source,
    })
}

fn load_optional<T: DeserializeOwned>(path: &Path) -> CoreResult<BTreeMap<String, T>> {
    if path.exists() {
        load_required(path)
    } else {
        tracing::debug!(path = %path.display(), "optional catalog missing, using empty");
        Ok(BTreeMap::new())
    }
}

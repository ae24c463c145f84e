use std::collections::HashMap;

use crate::catalog::{Catalog, CreatureType, GroundType, ItemType, ObjectType, RoadType};
use crate::error::{CoreError, CoreResult};

/// Immutable ID-indexed view of a [`Catalog`].
///
/// Built once at startup and shared by reference (usually as
/// `Arc<Registry>`). The `*_or_default` style helpers degrade lookup misses
/// to neutral values so a missing config entry never stops the simulation.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    objects: HashMap<i32, ObjectType>,
    roads: HashMap<i32, RoadType>,
    grounds: HashMap<i32, GroundType>,
    items: HashMap<i32, ItemType>,
    creatures: HashMap<i32, CreatureType>,
}

macro_rules! index {
    ($records:expr, $kind:literal) => {{
        let mut map = HashMap::new();
        for record in $records.values() {
            if map.insert(record.id, record.clone()).is_some() {
                return Err(CoreError::DuplicateId {
                    kind: $kind,
                    id: record.id,
                });
            }
        }
        map
    }};
}

impl Registry {
    /// Index every catalog by record ID. Two records sharing an ID within
    /// one catalog are an error.
    pub fn from_catalog(catalog: &Catalog) -> CoreResult<Self> {
        Ok(Self {
            objects: index!(catalog.object_types, "object type"),
            roads: index!(catalog.road_types, "road type"),
            grounds: index!(catalog.ground_types, "ground type"),
            items: index!(catalog.item_types, "item type"),
            creatures: index!(catalog.creature_types, "creature type"),
        })
    }

    /// Object type by ID.
    pub fn object(&self, id: i32) -> Option<&ObjectType> {
        self.objects.get(&id)
    }

    /// Road type by ID.
    pub fn road(&self, id: i32) -> Option<&RoadType> {
        self.roads.get(&id)
    }

    /// Ground type by ID.
    pub fn ground(&self, id: i32) -> Option<&GroundType> {
        self.grounds.get(&id)
    }

    /// Item type by ID.
    pub fn item(&self, id: i32) -> Option<&ItemType> {
        self.items.get(&id)
    }

    /// Creature type by ID.
    pub fn creature(&self, id: i32) -> Option<&CreatureType> {
        self.creatures.get(&id)
    }

    /// Speed multiplier of a road type; 1.0 when unknown.
    pub fn road_speed_modifier(&self, road: i32) -> f64 {
        self.road(road).map_or(1.0, |r| r.speed_mod)
    }

    /// Whether a ground type can be walked on; unknown ground is walkable.
    pub fn is_walkable(&self, ground: i32) -> bool {
        self.ground(ground).is_none_or(|g| g.walkable)
    }

    /// Stack limit of an item type, at least 1.
    pub fn stack_size(&self, item: i32) -> u32 {
        self.item(item).map_or(1, |i| i.stack_size.max(1))
    }

    /// Maximum durability of an object type, at least 1.
    pub fn max_durability(&self, object_type: i32) -> i32 {
        self.object(object_type)
            .map_or(1, |o| o.max_durability.max(1))
    }

    /// Walking speed of a creature type in tiles per second; 1.0 when
    /// unknown or unset.
    pub fn creature_speed(&self, creature_type: i32) -> f64 {
        match self.creature(creature_type) {
            Some(c) if c.speed > 0.0 => c.speed,
            _ => 1.0,
        }
    }

    /// How many records each catalog holds.
    pub fn counts(&self) -> RegistryCounts {
        RegistryCounts {
            objects: self.objects.len(),
            roads: self.roads.len(),
            grounds: self.grounds.len(),
            items: self.items.len(),
            creatures: self.creatures.len(),
        }
    }
}

/// Number of records per catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryCounts {
    /// Object types.
    pub objects: usize,
    /// Road types.
    pub roads: usize,
    /// Ground types.
    pub grounds: usize,
    /// Item types.
    pub items: usize,
    /// Creature types.
    pub creatures: usize,
}

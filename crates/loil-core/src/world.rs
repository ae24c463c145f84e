use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::creature::Creature;
use crate::error::{CoreError, CoreResult};
use crate::ids::{CharacterId, CreatureId, LocationId, ObjectId, PlayerId};
use crate::location::Location;
use crate::object::WorldObject;

/// On-disk layout of a world file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorldFile {
    #[serde(default)]
    player_id: PlayerId,
    #[serde(default)]
    characters: Vec<Character>,
    #[serde(default)]
    locations: Vec<Location>,
    #[serde(default)]
    objects: BTreeMap<ObjectId, WorldObject>,
    #[serde(default)]
    creatures: Vec<Creature>,
}

/// The world model: every location, character, creature and object, by ID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    /// Local player of the world file; unused by the server itself.
    pub player_id: PlayerId,
    locations: BTreeMap<LocationId, Location>,
    characters: BTreeMap<CharacterId, Character>,
    creatures: BTreeMap<CreatureId, Creature>,
    objects: BTreeMap<ObjectId, WorldObject>,
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Read and validate a world file.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let world = Self::parse(&text, &path.display().to_string())?;
        tracing::info!(
            path = %path.display(),
            locations = world.locations.len(),
            characters = world.characters.len(),
            creatures = world.creatures.len(),
            objects = world.objects.len(),
            "world loaded"
        );
        Ok(world)
    }

    /// Parse and validate a world from JSON text.
    pub fn from_json_str(text: &str) -> CoreResult<Self> {
        Self::parse(text, "world")
    }

    fn parse(text: &str, what: &str) -> CoreResult<Self> {
        let file: WorldFile = serde_json::from_str(text).map_err(|source| CoreError::Json {
            what: what.to_string(),
            source,
        })?;
        Self::from_file(file)
    }

    fn from_file(file: WorldFile) -> CoreResult<Self> {
        let mut world = World {
            player_id: file.player_id,
            ..Default::default()
        };

        for mut location in file.locations {
            location.validate()?;
            // Legacy per-location objects join the world index.
            for (id, mut object) in std::mem::take(&mut location.objects) {
                object.id = id;
                object.location_id = location.id;
                world.objects.insert(id, object);
            }
            let id = location.id;
            if world.locations.insert(id, location).is_some() {
                return Err(CoreError::DuplicateId {
                    kind: "location",
                    id: id.get(),
                });
            }
        }

        for (id, mut object) in file.objects {
            object.id = id;
            world.add_object(object)?;
        }
        for character in file.characters {
            world.add_character(character)?;
        }
        for creature in file.creatures {
            world.add_creature(creature)?;
        }
        Ok(world)
    }

    /// Write the world as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> CoreResult<()> {
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "world saved");
        Ok(())
    }

    /// Serialize to the pretty-printed world file format.
    pub fn to_json_string(&self) -> CoreResult<String> {
        let file = WorldFile {
            player_id: self.player_id,
            characters: self.characters.values().cloned().collect(),
            locations: self.locations.values().cloned().collect(),
            objects: self.objects.clone(),
            creatures: self.creatures.values().cloned().collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|source| CoreError::Json {
            what: "world".to_string(),
            source,
        })
    }

    // -----------------------------------------------------------------------
    // Locations
    // -----------------------------------------------------------------------

    /// Add a location. Fails on a duplicate ID or mismatched layer widths.
    pub fn add_location(&mut self, location: Location) -> CoreResult<LocationId> {
        location.validate()?;
        let id = location.id;
        if self.locations.contains_key(&id) {
            return Err(CoreError::DuplicateId {
                kind: "location",
                id: id.get(),
            });
        }
        self.locations.insert(id, location);
        Ok(id)
    }

    /// Location by ID.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(&id)
    }

    /// Mutable location by ID.
    pub fn location_mut(&mut self, id: LocationId) -> Option<&mut Location> {
        self.locations.get_mut(&id)
    }

    /// All locations in ID order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    fn require_location(&self, owner: String, location: LocationId) -> CoreResult<()> {
        if self.locations.contains_key(&location) {
            Ok(())
        } else {
            Err(CoreError::UnknownLocation { owner, location })
        }
    }

    // -----------------------------------------------------------------------
    // Characters
    // -----------------------------------------------------------------------

    /// Add a character to an existing location. Fails on a duplicate ID.
    pub fn add_character(&mut self, character: Character) -> CoreResult<CharacterId> {
        self.require_location(format!("character {}", character.id), character.location)?;
        let id = character.id;
        if self.characters.contains_key(&id) {
            return Err(CoreError::DuplicateId {
                kind: "character",
                id: id.get(),
            });
        }
        self.characters.insert(id, character);
        Ok(id)
    }

    /// Character by ID.
    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    /// Mutable character by ID.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    /// All characters in ID order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Mutable access to every character.
    pub fn characters_mut(&mut self) -> impl Iterator<Item = &mut Character> {
        self.characters.values_mut()
    }

    /// The lowest-ID character controlled by `player`.
    pub fn character_for_player(&self, player: PlayerId) -> Option<&Character> {
        if player.is_none() {
            return None;
        }
        self.characters.values().find(|c| c.controlled == player)
    }

    // -----------------------------------------------------------------------
    // Creatures
    // -----------------------------------------------------------------------

    /// Add a creature to an existing location. Fails on a duplicate ID.
    pub fn add_creature(&mut self, creature: Creature) -> CoreResult<CreatureId> {
        self.require_location(format!("creature {}", creature.id), creature.location)?;
        let id = creature.id;
        if self.creatures.contains_key(&id) {
            return Err(CoreError::DuplicateId {
                kind: "creature",
                id: id.get(),
            });
        }
        self.creatures.insert(id, creature);
        Ok(id)
    }

    /// Creature by ID.
    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        self.creatures.get(&id)
    }

    /// Mutable creature by ID.
    pub fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.creatures.get_mut(&id)
    }

    /// All creatures in ID order.
    pub fn creatures(&self) -> impl Iterator<Item = &Creature> {
        self.creatures.values()
    }

    /// Mutable access to every creature.
    pub fn creatures_mut(&mut self) -> impl Iterator<Item = &mut Creature> {
        self.creatures.values_mut()
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Add an object to an existing location. Fails on a duplicate ID.
    pub fn add_object(&mut self, object: WorldObject) -> CoreResult<ObjectId> {
        self.require_location(format!("object {}", object.id), object.location_id)?;
        let id = object.id;
        if self.objects.contains_key(&id) {
            return Err(CoreError::DuplicateId {
                kind: "object",
                id: id.get(),
            });
        }
        self.objects.insert(id, object);
        Ok(id)
    }

    /// Object by ID.
    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    /// Mutable object by ID.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut WorldObject> {
        self.objects.get_mut(&id)
    }

    /// All objects in ID order.
    pub fn objects(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values()
    }

    /// Take an object out of the world.
    pub fn remove_object(&mut self, id: ObjectId) -> CoreResult<WorldObject> {
        self.objects.remove(&id).ok_or(CoreError::ObjectNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creature::{BehaviorKind, CreatureBehavior};
    use crate::layers::TileLayer;
    use crate::location::TransitionKey;

    const SAMPLE: &str = r#"{
        "player_id": 1,
        "locations": [
            {
                "id": 1, "name": "Meadow",
                "foreground": "0 0 10 0 0", "road": "1 1 1 -1 1",
                "ground": "1 1 1 1 1", "background": "0 5 0 0 0",
                "objects": { "10": { "id": 10, "type_id": 3, "x": 2, "durability": 4 } },
                "transitions": { "right_up": { "location_id": 2, "type": "path" } }
            },
            {
                "id": 2, "name": "Forest",
                "foreground": "0 0 0", "road": "1 1 1", "ground": "1 1 1", "background": "0 0 0"
            }
        ],
        "characters": [
            { "id": 1, "name": "Ann", "location": 1, "x": 1.5, "speed": 0.7,
              "direction": 1, "controlled": 7, "hands_free": true,
              "inventory": { "0": { "item_id": 3, "count": 2 } }, "equipped": { "axe": 11 } }
        ],
        "creatures": [
            { "id": 4, "type_id": 1, "name": "Rabbit", "location": 2, "x": 0.0,
              "health": 5, "max_health": 5, "hunger": 20.5, "thirst": 3,
              "behavior": { "type": "rest", "target_pos": -1, "started_at": 0.0, "duration": 4.0 } }
        ],
        "objects": {}
    }"#;

    #[test]
    fn legacy_location_objects_are_merged() {
        let world = World::from_json_str(SAMPLE).unwrap();
        let obj = world.object(ObjectId(10)).unwrap();
        assert_eq!(obj.location_id, LocationId(1));
        assert_eq!(obj.x, 2);
        assert!(world.location(LocationId(1)).unwrap().objects.is_empty());
    }

    #[test]
    fn reload_reproduces_layers_and_entities() {
        let world = World::from_json_str(SAMPLE).unwrap();
        let text = world.to_json_string().unwrap();
        let again = World::from_json_str(&text).unwrap();
        assert_eq!(world, again);
        assert_eq!(
            again.location(LocationId(1)).unwrap().road.as_slice(),
            &[1, 1, 1, -1, 1]
        );
        let ch = again.character(CharacterId(1)).unwrap();
        assert_eq!(ch.x, 1.5);
        assert_eq!(ch.equipped["axe"], 11);
        let cr = again.creature(CreatureId(4)).unwrap();
        assert_eq!(cr.hunger, 20.5);
        assert_eq!(
            cr.behavior,
            Some(CreatureBehavior::new(BehaviorKind::Rest, 0.0, 4.0))
        );
        assert!(
            again
                .location(LocationId(1))
                .unwrap()
                .transition(TransitionKey::RightUp)
                .is_some()
        );
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        let world = World::from_json_str(SAMPLE).unwrap();
        world.save(&path).unwrap();
        assert_eq!(World::load(&path).unwrap(), world);
    }

    #[test]
    fn unknown_location_is_rejected() {
        let mut world = World::new();
        world
            .add_location(Location::new(LocationId(1), "A", 3))
            .unwrap();
        let ch = Character::new(CharacterId(1), "Bob", LocationId(9), 0.0);
        assert!(matches!(
            world.add_character(ch),
            Err(CoreError::UnknownLocation { .. })
        ));
    }

    #[test]
    fn mismatched_layers_are_fatal() {
        let mut loc = Location::new(LocationId(1), "A", 3);
        loc.background = TileLayer::filled(2, 0);
        let mut world = World::new();
        assert!(matches!(
            world.add_location(loc),
            Err(CoreError::LayerMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_character_is_rejected() {
        let mut world = World::new();
        world
            .add_location(Location::new(LocationId(1), "A", 3))
            .unwrap();
        let ch = Character::new(CharacterId(1), "Bob", LocationId(1), 0.0);
        world.add_character(ch.clone()).unwrap();
        assert!(matches!(
            world.add_character(ch),
            Err(CoreError::DuplicateId { kind: "character", id: 1 })
        ));
    }

    #[test]
    fn character_for_player_picks_lowest_id() {
        let world = World::from_json_str(SAMPLE).unwrap();
        assert_eq!(
            world.character_for_player(PlayerId(7)).map(|c| c.id),
            Some(CharacterId(1))
        );
        assert!(world.character_for_player(PlayerId(0)).is_none());
    }
}

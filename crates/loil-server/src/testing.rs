//! Small world used by the server's unit tests.
//!
//! Meadow (8 tiles): Ann (character 1, free) on tile 1, Bo (character 2,
//! player 7) on tile 3, a rabbit on tile 5 and a berry bush (object 100) on
//! tile 6. `right_up` leads to the forest (6 tiles).

use std::sync::Arc;

use loil_core::catalog::{
    Catalog, CreatureType, GroundType, Interaction, InteractionYield, ItemType, ObjectType, RoadType,
};
use loil_core::{
    Character, CharacterId, Creature, CreatureId, Location, LocationId, ObjectId, PlayerId,
    Registry, TileLayer, TransitionKey, World, WorldObject,
};
use loil_simulation::{SimConfig, Simulation};

pub const MEADOW: LocationId = LocationId(1);
pub const FOREST: LocationId = LocationId(2);
pub const BUSH: ObjectId = ObjectId(100);

pub fn registry() -> Arc<Registry> {
    let catalog = Catalog::new()
        .with_road_type(
            "dirt",
            RoadType {
                id: 1,
                name: "Dirt".into(),
                speed_mod: 1.0,
                ..Default::default()
            },
        )
        .with_ground_type(
            "grass",
            GroundType {
                id: 1,
                name: "Grass".into(),
                walkable: true,
                ..Default::default()
            },
        )
        .with_object_type(
            "berry_bush",
            ObjectType {
                id: 3,
                name: "Berry bush".into(),
                foreground: true,
                max_durability: 4,
                interactions: vec![Interaction {
                    kind: "pick".into(),
                    tool: "hand".into(),
                    results: vec![InteractionYield {
                        item_id: 11,
                        count: 2,
                    }],
                    reduce_durability: 1,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .with_item_type(
            "berry",
            ItemType {
                id: 11,
                name: "Berry".into(),
                stack_size: 20,
                ..Default::default()
            },
        )
        .with_creature_type(
            "rabbit",
            CreatureType {
                id: 1,
                name: "Rabbit".into(),
                health: 5,
                speed: 1.0,
                behaviors: vec!["rest".into()],
                ..Default::default()
            },
        );
    Arc::new(Registry::from_catalog(&catalog).unwrap())
}

pub fn world() -> World {
    let mut meadow = Location::new(MEADOW, "Meadow", 8).with_transition(TransitionKey::RightUp, FOREST);
    meadow.road = TileLayer::filled(8, 1);
    meadow.ground = TileLayer::filled(8, 1);
    let mut forest = Location::new(FOREST, "Forest", 6).with_transition(TransitionKey::LeftUp, MEADOW);
    forest.road = TileLayer::filled(6, 1);
    forest.ground = TileLayer::filled(6, 1);

    let mut world = World::new();
    world.add_location(meadow).unwrap();
    world.add_location(forest).unwrap();
    world
        .add_character(Character::new(CharacterId(1), "Ann", MEADOW, 1.0))
        .unwrap();
    let mut bo = Character::new(CharacterId(2), "Bo", MEADOW, 3.0);
    bo.controlled = PlayerId(7);
    world.add_character(bo).unwrap();
    world
        .add_creature(Creature::new(CreatureId(1), 1, MEADOW, 5.0, 5))
        .unwrap();
    world
        .add_object(WorldObject::new(BUSH, 3, MEADOW, 6, 4))
        .unwrap();
    world
}

pub fn simulation() -> Simulation {
    Simulation::new(world(), registry(), SimConfig::default())
        .unwrap()
        .with_default_systems()
}

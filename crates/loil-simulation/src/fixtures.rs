//! Shared test world: a meadow and a forest joined at both ends.
//!
//! Meadow (10 tiles): dirt road, stone road on tile 3, impassable tile 6,
//! a tree in the background at tile 4, a berry bush in the foreground at
//! tile 8. `right_up` and `left_down` lead to the forest.
//!
//! Forest (8 tiles): plain dirt road, `left_up` back to the meadow.

use std::sync::Arc;

use loil_core::catalog::{
    Catalog, CreatureType, GroundType, Interaction, InteractionYield, ItemType, ObjectType, RoadType,
};
use loil_core::{Location, LocationId, ObjectId, Registry, TileLayer, TransitionKey, World, WorldObject};

use crate::config::SimConfig;
use crate::simulation::Simulation;

pub const MEADOW: LocationId = LocationId(1);
pub const FOREST: LocationId = LocationId(2);

pub const TREE: i32 = 1;
pub const STUMP: i32 = 2;
pub const BERRY_BUSH: i32 = 3;

pub const WOOD: i32 = 10;
pub const BERRY: i32 = 11;
pub const AXE: i32 = 20;

pub const RABBIT: i32 = 1;

pub const TREE_ID: ObjectId = ObjectId(100);
pub const BUSH_ID: ObjectId = ObjectId(101);

pub fn catalog() -> Catalog {
    Catalog::new()
        .with_road_type(
            "dirt",
            RoadType {
                id: 1,
                name: "Dirt".into(),
                speed_mod: 1.0,
                ..Default::default()
            },
        )
        .with_road_type(
            "stone",
            RoadType {
                id: 2,
                name: "Stone".into(),
                speed_mod: 2.0,
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
        .with_ground_type(
            "water",
            GroundType {
                id: 2,
                name: "Water".into(),
                walkable: false,
                ..Default::default()
            },
        )
        .with_object_type(
            "tree",
            ObjectType {
                id: TREE,
                name: "Tree".into(),
                background: true,
                max_durability: 12,
                interactions: vec![Interaction {
                    kind: "chop".into(),
                    tool: "axe".into(),
                    results: vec![InteractionYield {
                        item_id: WOOD,
                        count: 2,
                    }],
                    reduce_durability: 5,
                    transform_to: STUMP,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .with_object_type(
            "stump",
            ObjectType {
                id: STUMP,
                name: "Stump".into(),
                background: true,
                max_durability: 3,
                interactions: vec![Interaction {
                    kind: "dig".into(),
                    tool: "shovel".into(),
                    destroy_on_complete: true,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .with_object_type(
            "berry_bush",
            ObjectType {
                id: BERRY_BUSH,
                name: "Berry bush".into(),
                foreground: true,
                max_durability: 2,
                interactions: vec![Interaction {
                    kind: "pick".into(),
                    tool: "hand".into(),
                    results: vec![InteractionYield {
                        item_id: BERRY,
                        count: 3,
                    }],
                    reduce_durability: 1,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )
        .with_item_type(
            "wood",
            ItemType {
                id: WOOD,
                name: "Wood".into(),
                stack_size: 5,
                ..Default::default()
            },
        )
        .with_item_type(
            "berry",
            ItemType {
                id: BERRY,
                name: "Berry".into(),
                stack_size: 20,
                ..Default::default()
            },
        )
        .with_item_type(
            "axe",
            ItemType {
                id: AXE,
                name: "Axe".into(),
                kind: "tool".into(),
                stack_size: 1,
                ..Default::default()
            },
        )
        .with_creature_type(
            "rabbit",
            CreatureType {
                id: RABBIT,
                name: "Rabbit".into(),
                health: 5,
                speed: 2.0,
                favorite_foods: vec![BERRY_BUSH],
                behaviors: vec!["wander".into(), "rest".into(), "eat".into()],
                default_behavior: "wander".into(),
                ..Default::default()
            },
        )
}

pub fn registry() -> Arc<Registry> {
    Arc::new(Registry::from_catalog(&catalog()).unwrap())
}

pub fn world() -> World {
    let mut meadow = Location::new(MEADOW, "Meadow", 10)
        .with_transition(TransitionKey::RightUp, FOREST)
        .with_transition(TransitionKey::LeftDown, FOREST);
    meadow.road = TileLayer::from(vec![1, 1, 1, 2, 1, 1, -1, 1, 1, 1]);
    meadow.ground = TileLayer::filled(10, 1);
    meadow.background = TileLayer::from(vec![0, 0, 0, 0, TREE, 0, 0, 0, 0, 0]);

    let mut forest = Location::new(FOREST, "Forest", 8).with_transition(TransitionKey::LeftUp, MEADOW);
    forest.road = TileLayer::filled(8, 1);
    forest.ground = TileLayer::filled(8, 1);

    let mut world = World::new();
    world.add_location(meadow).unwrap();
    world.add_location(forest).unwrap();
    world
        .add_object(WorldObject::new(TREE_ID, TREE, MEADOW, 4, 12))
        .unwrap();
    world
        .add_object(WorldObject::new(BUSH_ID, BERRY_BUSH, MEADOW, 8, 2))
        .unwrap();
    world
}

pub fn sim(world: World, config: SimConfig) -> Simulation {
    Simulation::new(world, registry(), config)
        .unwrap()
        .with_default_systems()
}

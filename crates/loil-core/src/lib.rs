//! Core types for LOIL: the lane world model and its static type catalogs.
//!
//! This crate holds the at-rest representation of a world (what is loaded from
//! and saved to the world file) and the immutable [`Registry`] of gameplay
//! types. It has no notion of time; the simulation crate derives its working
//! state from a [`World`] and writes it back on export.

/// Static type catalogs as loaded from the JSON config files.
pub mod catalog;
/// Player-controlled and NPC characters, inventories.
pub mod character;
/// Autonomous creatures and their behavior records.
pub mod creature;
/// Error types used throughout the crate.
pub mod error;
/// Integer identifiers for world records.
pub mod ids;
/// Tile layers and their space-separated file encoding.
pub mod layers;
/// Locations, lanes and transitions between them.
pub mod location;
/// Interactable world objects.
pub mod object;
/// Immutable ID-indexed lookup tables built from a catalog.
pub mod registry;
/// The world model that owns every entity.
pub mod world;

/// Re-export catalog types.
pub use catalog::{
    Catalog, CreatureType, GroundType, Interaction, InteractionYield, ItemType, ObjectType, RoadType,
};
/// Re-export character types.
pub use character::{Character, Inventory, ItemStack};
/// Re-export creature types.
pub use creature::{BehaviorKind, Creature, CreatureBehavior};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export identifier types.
pub use ids::{CharacterId, CreatureId, LocationId, ObjectId, PlayerId};
/// Re-export the tile layer type.
pub use layers::TileLayer;
/// Re-export location types.
pub use location::{Location, Side, Transition, TransitionKey};
/// Re-export object types.
pub use object::WorldObject;
/// Re-export the registry.
pub use registry::{Registry, RegistryCounts};
/// Re-export the world model.
pub use world::World;

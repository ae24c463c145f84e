//! Read-only projection of simulation state into wire snapshots.
//!
//! The engine captures a [`WorldSnapshot`] after every tick that changed
//! something and after every successful command. Network tasks never touch
//! the [`Simulation`]; they read the last published snapshot.

use std::collections::BTreeMap;

use loil_core::{Character, CharacterId, Creature, LocationId, PlayerId, Registry, WorldObject};
use loil_simulation::{Lane, Simulation};

use crate::protocol::{
    CharacterState, CreatureState, LocationState, LocationUpdate, ObjectState, WorldState,
};

/// Everything a client can see of one location.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSnapshot {
    /// Layers of the location.
    pub state: LocationState,
    /// Characters on the lane, by ID.
    pub characters: Vec<CharacterState>,
    /// Creatures on the lane, by ID.
    pub creatures: Vec<CreatureState>,
    /// Objects on the lane, by ID.
    pub objects: Vec<ObjectState>,
}

/// Immutable view of the whole world at a tick boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    /// Tick the snapshot was taken after.
    pub tick: u64,
    /// Capture time in unix milliseconds.
    pub server_time: i64,
    locations: BTreeMap<LocationId, LocationSnapshot>,
    character_locations: BTreeMap<CharacterId, LocationId>,
}

impl WorldSnapshot {
    /// Project the current simulation state.
    pub fn capture(sim: &Simulation) -> Self {
        let now = crate::protocol::now_ms();
        let world = sim.world();
        let registry = sim.registry();

        let mut locations = BTreeMap::new();
        let mut character_locations = BTreeMap::new();
        for lane in sim.lanes().values() {
            let name = world
                .location(lane.id())
                .map(|l| l.name.clone())
                .unwrap_or_default();

            let mut characters: Vec<CharacterState> = lane
                .characters()
                .iter()
                .filter_map(|id| world.character(*id))
                .map(|c| character_state(c, now))
                .collect();
            characters.sort_by_key(|c| c.id);
            for c in &characters {
                character_locations.insert(c.id, lane.id());
            }

            let mut creatures: Vec<CreatureState> = lane
                .creatures()
                .iter()
                .filter_map(|id| world.creature(*id))
                .map(|c| creature_state(c, now))
                .collect();
            creatures.sort_by_key(|c| c.id);

            let mut objects: Vec<ObjectState> = lane
                .objects()
                .iter()
                .filter_map(|id| world.object(*id))
                .map(|o| object_state(o, registry, now))
                .collect();
            objects.sort_by_key(|o| o.id);

            locations.insert(
                lane.id(),
                LocationSnapshot {
                    state: location_state(lane, name, now),
                    characters,
                    creatures,
                    objects,
                },
            );
        }

        Self {
            tick: sim.current_tick(),
            server_time: now,
            locations,
            character_locations,
        }
    }

    /// Snapshot of location `id`.
    pub fn location(&self, id: LocationId) -> Option<&LocationSnapshot> {
        self.locations.get(&id)
    }

    /// Every location in the snapshot, in ID order.
    pub fn location_ids(&self) -> impl Iterator<Item = LocationId> + '_ {
        self.locations.keys().copied()
    }

    /// The location a character currently stands in.
    pub fn character_location(&self, id: CharacterId) -> Option<LocationId> {
        self.character_locations.get(&id).copied()
    }

    /// Published state of a character, wherever it stands.
    pub fn character(&self, id: CharacterId) -> Option<&CharacterState> {
        let location = self.character_location(id)?;
        self.locations
            .get(&location)?
            .characters
            .iter()
            .find(|c| c.id == id)
    }

    /// Full state of `location` for a player who just joined.
    pub fn world_state(&self, player: PlayerId, location: LocationId) -> Option<WorldState> {
        let snap = self.locations.get(&location)?;
        Some(WorldState {
            player_id: player,
            location: snap.state.clone(),
            characters: snap.characters.clone(),
            creatures: snap.creatures.clone(),
            objects: snap.objects.clone(),
            server_time: self.server_time,
        })
    }

    /// Periodic entity update for everyone watching `location`.
    pub fn location_update(&self, location: LocationId) -> Option<LocationUpdate> {
        let snap = self.locations.get(&location)?;
        Some(LocationUpdate {
            location_id: location,
            characters: snap.characters.clone(),
            creatures: snap.creatures.clone(),
            objects: snap.objects.clone(),
            server_time: self.server_time,
        })
    }
}

fn location_state(lane: &Lane, name: String, now: i64) -> LocationState {
    LocationState {
        id: lane.id(),
        name,
        width: lane.width(),
        foreground: lane.foreground_codes(),
        road: lane.road().to_vec(),
        ground: lane.ground().to_vec(),
        background: lane.background().to_vec(),
        last_update: now,
    }
}

fn character_state(c: &Character, now: i64) -> CharacterState {
    CharacterState {
        id: c.id,
        name: c.name.clone(),
        location_id: c.location,
        x: c.x,
        direction: c.direction,
        vertical: c.vertical,
        speed: c.speed,
        controlled: c.controlled,
        last_update: now,
    }
}

fn creature_state(c: &Creature, now: i64) -> CreatureState {
    CreatureState {
        id: c.id,
        type_id: c.type_id,
        name: c.name.clone(),
        location_id: c.location,
        x: c.x,
        health: c.health,
        max_health: c.max_health,
        hunger: c.hunger.round() as i32,
        behavior: c.behavior_kind().map(|k| k.to_string()).unwrap_or_default(),
        last_update: c.last_update.map_or(now, |t| t.timestamp_millis()),
    }
}

fn object_state(o: &WorldObject, registry: &Registry, now: i64) -> ObjectState {
    ObjectState {
        id: o.id,
        type_id: o.type_id,
        location_id: o.location_id,
        x: o.x,
        durability: o.durability,
        max_durability: registry.object(o.type_id).map_or(0, |t| t.max_durability),
        growth_stage: o.growth_stage,
        last_update: now,
    }
}

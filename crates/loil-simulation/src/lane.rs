//! Working copy of a location used while the simulation runs.
//!
//! A [`Lane`] holds the four tile layers of a location plus the IDs of the
//! entities currently on it. The foreground layer is typed: each tile holds
//! an [`Occupant`] instead of a sign-encoded integer. Integer codes only
//! appear at the edges, when reading the at-rest [`Location`] and when
//! projecting for the wire.

use std::collections::BTreeMap;
use std::fmt;

use loil_core::layers::IMPASSABLE;
use loil_core::{
    CharacterId, CreatureId, Location, LocationId, ObjectId, Registry, TileLayer, TransitionKey,
};

use crate::config::CollisionMode;

/// What stands on a foreground tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occupant {
    /// Nothing stands here.
    #[default]
    Empty,
    /// A character.
    Character(CharacterId),
    /// A creature.
    Creature(CreatureId),
    /// A foreground object.
    Object(ObjectId),
}

impl Occupant {
    /// Integer form used by clients: characters and objects as their
    /// positive ID, creatures as the negated ID, empty as 0.
    pub fn wire_code(self) -> i32 {
        match self {
            Self::Empty => 0,
            Self::Character(id) => id.get(),
            Self::Creature(id) => -id.get(),
            Self::Object(id) => id.get(),
        }
    }

    /// Whether nothing stands on the tile.
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "nothing"),
            Self::Character(id) => write!(f, "character {id}"),
            Self::Creature(id) => write!(f, "creature {id}"),
            Self::Object(id) => write!(f, "object {id}"),
        }
    }
}

/// Why a tile refused an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// The tile lies outside the lane.
    OutOfBounds,
    /// The road is marked impassable.
    Impassable,
    /// The ground type cannot be walked on.
    Unwalkable,
    /// Another entity holds the tile.
    Occupied(Occupant),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "outside the lane"),
            Self::Impassable => write!(f, "impassable road"),
            Self::Unwalkable => write!(f, "unwalkable ground"),
            Self::Occupied(by) => write!(f, "occupied by {by}"),
        }
    }
}

/// All lanes of a world, by location.
pub type Lanes = BTreeMap<LocationId, Lane>;

/// The tile a fractional position falls on: `x` rounded half up.
pub fn tile_of(x: f64) -> i32 {
    (x + 0.5).floor() as i32
}

/// The working state of one location: tile layers, a typed foreground and
/// the IDs of the entities on it.
#[derive(Debug, Clone)]
pub struct Lane {
    id: LocationId,
    foreground: Vec<Occupant>,
    road: Vec<i32>,
    ground: Vec<i32>,
    background: Vec<i32>,
    transitions: BTreeMap<TransitionKey, LocationId>,
    characters: Vec<CharacterId>,
    creatures: Vec<CreatureId>,
    objects: Vec<ObjectId>,
}

impl Lane {
    /// Derive a lane from an at-rest location. Positive foreground codes
    /// become object occupants; everything else starts empty.
    pub fn from_location(location: &Location) -> Self {
        let foreground = location
            .foreground
            .as_slice()
            .iter()
            .map(|&code| {
                if code > 0 {
                    Occupant::Object(ObjectId(code))
                } else {
                    Occupant::Empty
                }
            })
            .collect();
        Self {
            id: location.id,
            foreground,
            road: location.road.as_slice().to_vec(),
            ground: location.ground.as_slice().to_vec(),
            background: location.background.as_slice().to_vec(),
            transitions: location
                .transitions
                .iter()
                .map(|(key, t)| (*key, t.location_id))
                .collect(),
            characters: Vec::new(),
            creatures: Vec::new(),
            objects: Vec::new(),
        }
    }

    /// The location this lane was derived from.
    pub fn id(&self) -> LocationId {
        self.id
    }

    /// Number of tiles.
    pub fn width(&self) -> usize {
        self.road.len()
    }

    /// Largest valid position on the lane.
    pub fn max_x(&self) -> f64 {
        self.width().saturating_sub(1) as f64
    }

    fn index(&self, tile: i32) -> Option<usize> {
        usize::try_from(tile).ok().filter(|&i| i < self.width())
    }

    /// Who holds `tile`; empty outside the lane.
    pub fn occupant(&self, tile: i32) -> Occupant {
        self.index(tile)
            .and_then(|i| self.foreground.get(i).copied())
            .unwrap_or_default()
    }

    /// Road code at `tile`.
    pub fn road_at(&self, tile: i32) -> Option<i32> {
        self.index(tile).map(|i| self.road[i])
    }

    /// Ground code at `tile`.
    pub fn ground_at(&self, tile: i32) -> Option<i32> {
        self.index(tile).map(|i| self.ground[i])
    }

    /// Background code at `tile`.
    pub fn background_at(&self, tile: i32) -> Option<i32> {
        self.index(tile).map(|i| self.background[i])
    }

    /// Whether terrain alone allows standing on `tile`.
    pub fn is_walkable(&self, tile: i32, registry: &Registry) -> bool {
        match (self.road_at(tile), self.ground_at(tile)) {
            (Some(road), Some(ground)) => road != IMPASSABLE && registry.is_walkable(ground),
            _ => false,
        }
    }

    /// Check whether `who` may step onto `tile`.
    ///
    /// Returns the road speed modifier of the tile on success.
    pub fn check_entry(
        &self,
        tile: i32,
        who: Occupant,
        registry: &Registry,
        collision: CollisionMode,
    ) -> Result<f64, BlockReason> {
        let i = self.index(tile).ok_or(BlockReason::OutOfBounds)?;
        let road = self.road[i];
        if road == IMPASSABLE {
            return Err(BlockReason::Impassable);
        }
        if !registry.is_walkable(self.ground[i]) {
            return Err(BlockReason::Unwalkable);
        }
        if collision == CollisionMode::Exclusive {
            let held = self.foreground[i];
            if !held.is_empty() && held != who {
                return Err(BlockReason::Occupied(held));
            }
        }
        Ok(registry.road_speed_modifier(road))
    }

    /// Put `who` on `tile` if the cell is empty. Returns whether it was placed.
    pub fn claim(&mut self, tile: i32, who: Occupant) -> bool {
        match self.index(tile) {
            Some(i) if self.foreground[i].is_empty() || self.foreground[i] == who => {
                self.foreground[i] = who;
                true
            }
            _ => false,
        }
    }

    /// Clear `tile` if `who` holds it. Cells held by someone else are left alone.
    pub fn release(&mut self, tile: i32, who: Occupant) {
        if let Some(i) = self.index(tile).filter(|&i| self.foreground[i] == who) {
            self.foreground[i] = Occupant::Empty;
        }
    }

    /// Clear every cell held by `who`.
    pub fn release_all(&mut self, who: Occupant) {
        for cell in &mut self.foreground {
            if *cell == who {
                *cell = Occupant::Empty;
            }
        }
    }

    /// Replace the background code at `tile`.
    pub fn set_background(&mut self, tile: i32, code: i32) {
        if let Some(i) = self.index(tile) {
            self.background[i] = code;
        }
    }

    /// Target of the transition under `key`.
    pub fn transition(&self, key: TransitionKey) -> Option<LocationId> {
        self.transitions.get(&key).copied()
    }

    /// Index a character as being on this lane.
    pub fn add_character(&mut self, id: CharacterId) {
        if !self.characters.contains(&id) {
            self.characters.push(id);
        }
    }

    /// Drop a character from the index.
    pub fn remove_character(&mut self, id: CharacterId) {
        self.characters.retain(|c| *c != id);
    }

    /// Index a creature as being on this lane.
    pub fn add_creature(&mut self, id: CreatureId) {
        if !self.creatures.contains(&id) {
            self.creatures.push(id);
        }
    }

    /// Index an object as being on this lane.
    pub fn add_object(&mut self, id: ObjectId) {
        if !self.objects.contains(&id) {
            self.objects.push(id);
        }
    }

    /// Drop an object from the index.
    pub fn remove_object(&mut self, id: ObjectId) {
        self.objects.retain(|o| *o != id);
    }

    /// Characters on this lane.
    pub fn characters(&self) -> &[CharacterId] {
        &self.characters
    }

    /// Creatures on this lane.
    pub fn creatures(&self) -> &[CreatureId] {
        &self.creatures
    }

    /// Objects on this lane.
    pub fn objects(&self) -> &[ObjectId] {
        &self.objects
    }

    /// Foreground occupants by tile.
    pub fn foreground(&self) -> &[Occupant] {
        &self.foreground
    }

    /// Road codes by tile.
    pub fn road(&self) -> &[i32] {
        &self.road
    }

    /// Ground codes by tile.
    pub fn ground(&self) -> &[i32] {
        &self.ground
    }

    /// Background codes by tile.
    pub fn background(&self) -> &[i32] {
        &self.background
    }

    /// Foreground in client encoding.
    pub fn foreground_codes(&self) -> Vec<i32> {
        self.foreground.iter().map(|o| o.wire_code()).collect()
    }

    /// Foreground as stored in the world file: objects only. Characters and
    /// creatures are placed again from their positions on load.
    pub fn persistent_foreground(&self) -> TileLayer {
        self.foreground
            .iter()
            .map(|o| match o {
                Occupant::Object(id) => id.get(),
                _ => 0,
            })
            .collect::<Vec<_>>()
            .into()
    }

    /// Write the working layers back into an at-rest location.
    pub fn write_back(&self, location: &mut Location) {
        location.foreground = self.persistent_foreground();
        location.road = TileLayer::from(self.road.clone());
        location.ground = TileLayer::from(self.ground.clone());
        location.background = TileLayer::from(self.background.clone());
    }
}

use loil_core::{LocationId, Registry, World};
use rand::rngs::StdRng;

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::lane::{Lanes, Occupant, tile_of};
use crate::simulation::TickReport;

/// Mutable context passed to each system during a tick.
pub struct SimContext<'a> {
    /// The world being simulated.
    pub world: &'a mut World,
    /// Working lanes by location.
    pub lanes: &'a mut Lanes,
    /// Type lookups.
    pub registry: &'a Registry,
    /// Rules for this run.
    pub config: &'a SimConfig,
    /// Simulation clock.
    pub clock: &'a SimClock,
    /// Event sink.
    pub events: &'a mut EventLog,
    /// Seeded RNG shared by all systems.
    pub rng: &'a mut StdRng,
    /// Summary of the tick in progress.
    pub report: &'a mut TickReport,
    /// Seconds covered by this tick.
    pub elapsed: f64,
}

impl SimContext<'_> {
    /// Emit a simulation event at the current tick.
    pub fn emit(&mut self, kind: SimEventKind, description: impl Into<String>) {
        self.events
            .push(SimEvent::new(self.clock.tick(), kind, description));
    }

    /// Index of the tick being run.
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Simulated seconds since the start of the run.
    pub fn now(&self) -> f64 {
        self.clock.seconds()
    }

    /// Record that published state is out of date.
    pub fn mark_changed(&mut self) {
        self.report.changed = true;
    }

    /// Hand a freed foreground cell to another entity still standing on it.
    /// Only shared collision leaves more than one entity on a tile.
    pub fn refill(&mut self, location: LocationId, tile: i32) {
        let Some(lane) = self.lanes.get_mut(&location) else {
            return;
        };
        if !lane.occupant(tile).is_empty() {
            return;
        }
        let world = &*self.world;
        let registry = self.registry;
        let standing = lane
            .characters()
            .iter()
            .filter_map(|&id| world.character(id))
            .find(|c| tile_of(c.x) == tile)
            .map(|c| Occupant::Character(c.id))
            .or_else(|| {
                lane.creatures()
                    .iter()
                    .filter_map(|&id| world.creature(id))
                    .find(|c| tile_of(c.x) == tile)
                    .map(|c| Occupant::Creature(c.id))
            })
            .or_else(|| {
                lane.objects()
                    .iter()
                    .filter_map(|&id| world.object(id))
                    .find(|o| {
                        o.x == tile && registry.object(o.type_id).is_some_and(|t| t.foreground)
                    })
                    .map(|o| Occupant::Object(o.id))
            });
        if let Some(who) = standing {
            lane.claim(tile, who);
        }
    }
}

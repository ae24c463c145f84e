use std::sync::Arc;

use loil_core::{CharacterId, LocationId, ObjectId, PlayerId, Registry, TransitionKey, World};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::behavior::CreatureSystem;
use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::{EventLog, SimEvent, SimEventKind};
use crate::interaction::{self, InteractionOutcome};
use crate::lane::{Lane, Lanes, Occupant, tile_of};
use crate::maintenance::MaintenanceSystem;
use crate::movement::MovementSystem;
use crate::system::System;

/// A character crossing recorded during one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Who crossed.
    pub character: CharacterId,
    /// Location left.
    pub from: LocationId,
    /// Location entered.
    pub to: LocationId,
    /// Transition used.
    pub key: TransitionKey,
}

/// What one tick did, as far as publishers care.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Any entity or tile changed.
    pub changed: bool,
    /// Crossings in the order they happened.
    pub transitions: Vec<TransitionRecord>,
}

/// The top-level simulation orchestrator.
///
/// Owns the world, lanes, clock, RNG, event log, and registered systems.
/// Drives the tick loop and is the only writer of entity state once
/// constructed; commands (`set_heading`, `interact`, ...) are applied
/// between ticks by the same owner.
pub struct Simulation {
    world: World,
    registry: Arc<Registry>,
    config: SimConfig,
    lanes: Lanes,
    clock: SimClock,
    rng: StdRng,
    events: EventLog,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("lanes", &self.lanes.len())
            .field("systems", &self.systems.len())
            .field("events", &self.events.len())
            .finish()
    }
}

impl Simulation {
    /// Create a simulation from a world, deriving one lane per location and
    /// placing every entity on its tile. No systems are registered; see
    /// [`Simulation::with_default_systems`].
    pub fn new(mut world: World, registry: Arc<Registry>, config: SimConfig) -> SimResult<Self> {
        let mut lanes: Lanes = world
            .locations()
            .map(|loc| (loc.id, Lane::from_location(loc)))
            .collect();

        for object in world.objects() {
            let lane = lanes
                .get_mut(&object.location_id)
                .ok_or(SimError::LocationNotFound(object.location_id))?;
            lane.add_object(object.id);
            if registry.object(object.type_id).is_some_and(|t| t.foreground) {
                lane.claim(object.x, Occupant::Object(object.id));
            }
        }

        for character in world.characters_mut() {
            let lane = lanes
                .get_mut(&character.location)
                .ok_or(SimError::LocationNotFound(character.location))?;
            character.x = clamp_x(character.x, lane.max_x());
            character.direction = character.direction.signum();
            character.vertical = character.vertical.signum();
            if character.direction != 0 && character.speed <= 0.0 {
                let modifier = lane
                    .road_at(tile_of(character.x))
                    .map_or(1.0, |road| registry.road_speed_modifier(road));
                character.speed = config.base_speed * modifier;
            }
            lane.add_character(character.id);
            let who = Occupant::Character(character.id);
            if !lane.claim(tile_of(character.x), who) {
                tracing::warn!(
                    character = %character.id,
                    location = %character.location,
                    tile = tile_of(character.x),
                    "character starts on an occupied tile"
                );
            }
        }

        for creature in world.creatures_mut() {
            let lane = lanes
                .get_mut(&creature.location)
                .ok_or(SimError::LocationNotFound(creature.location))?;
            creature.x = clamp_x(creature.x, lane.max_x());
            // Saved start times are relative to the save; the clock restarts at zero.
            if let Some(behavior) = creature.behavior.as_mut() {
                behavior.started_at = behavior.started_at.min(0.0);
            }
            lane.add_creature(creature.id);
            if !lane.claim(tile_of(creature.x), Occupant::Creature(creature.id)) {
                tracing::warn!(
                    creature = %creature.id,
                    location = %creature.location,
                    "creature starts on an occupied tile"
                );
            }
        }

        let rng = StdRng::seed_from_u64(config.seed);
        let events = EventLog::new(config.max_events);
        Ok(Self {
            world,
            registry,
            config,
            lanes,
            clock: SimClock::new(),
            rng,
            events,
            systems: Vec::new(),
            initialized: false,
        })
    }

    /// Register the standard systems: character movement, creature
    /// behavior, object maintenance, in that order.
    pub fn with_default_systems(mut self) -> Self {
        self.add_system(MovementSystem::new());
        self.add_system(CreatureSystem::new());
        self.add_system(MaintenanceSystem::new());
        self
    }

    /// Register a system. Systems are ticked in registration order.
    pub fn add_system<S: System + 'static>(&mut self, system: S) {
        self.systems.push(Box::new(system));
    }

    /// Initialize all registered systems.
    pub fn init(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        let mut report = TickReport::default();
        for system in &mut self.systems {
            let mut ctx = SimContext {
                world: &mut self.world,
                lanes: &mut self.lanes,
                registry: &self.registry,
                config: &self.config,
                clock: &self.clock,
                events: &mut self.events,
                rng: &mut self.rng,
                report: &mut report,
                elapsed: 0.0,
            };
            system.init(&mut ctx)?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Advance the simulation by one tick covering `elapsed` seconds.
    pub fn tick(&mut self, elapsed: f64) -> SimResult<TickReport> {
        if !self.initialized {
            self.init()?;
        }

        let elapsed = if elapsed.is_finite() {
            elapsed.max(0.0)
        } else {
            0.0
        };
        self.clock.advance(elapsed);

        let mut report = TickReport::default();
        for system in &mut self.systems {
            let mut ctx = SimContext {
                world: &mut self.world,
                lanes: &mut self.lanes,
                registry: &self.registry,
                config: &self.config,
                clock: &self.clock,
                events: &mut self.events,
                rng: &mut self.rng,
                report: &mut report,
                elapsed,
            };
            system.tick(&mut ctx)?;
        }
        Ok(report)
    }

    /// Advance the simulation by `n` ticks of `dt` seconds each.
    pub fn run(&mut self, n: u64, dt: f64) -> SimResult<()> {
        for _ in 0..n {
            self.tick(dt)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Set a character's walking intent. A zero `direction` clears both
    /// fields; otherwise both are taken as given (reduced to -1, 0 or 1).
    pub fn set_heading(
        &mut self,
        character: CharacterId,
        direction: i8,
        vertical: i8,
    ) -> SimResult<()> {
        let ch = self
            .world
            .character_mut(character)
            .ok_or(SimError::CharacterNotFound(character))?;
        if direction == 0 {
            ch.direction = 0;
            ch.vertical = 0;
            return Ok(());
        }
        ch.direction = direction.signum();
        ch.vertical = vertical.signum();
        if ch.speed <= 0.0 {
            let modifier = self
                .lanes
                .get(&ch.location)
                .and_then(|lane| lane.road_at(tile_of(ch.x)))
                .map_or(1.0, |road| self.registry.road_speed_modifier(road));
            ch.speed = self.config.base_speed * modifier;
        }
        Ok(())
    }

    /// Stop a character: zero direction and vertical intent.
    pub fn stop(&mut self, character: CharacterId) -> SimResult<()> {
        self.set_heading(character, 0, 0)
    }

    /// Run interaction `index` of `object` on behalf of `character`.
    pub fn interact(
        &mut self,
        character: CharacterId,
        object: ObjectId,
        index: usize,
    ) -> SimResult<InteractionOutcome> {
        let mut report = TickReport::default();
        let mut ctx = SimContext {
            world: &mut self.world,
            lanes: &mut self.lanes,
            registry: &self.registry,
            config: &self.config,
            clock: &self.clock,
            events: &mut self.events,
            rng: &mut self.rng,
            report: &mut report,
            elapsed: 0.0,
        };
        interaction::perform(&mut ctx, character, object, index)
    }

    /// Bind `player` to a character in `location`.
    ///
    /// With `character` given, that character must be free or already
    /// controlled by this player; any other character the player held is
    /// released and stopped, so a player controls at most one character.
    /// Without it, the character the player already controls is used.
    pub fn bind_player(
        &mut self,
        player: PlayerId,
        character: Option<CharacterId>,
        location: LocationId,
    ) -> SimResult<CharacterId> {
        if !self.lanes.contains_key(&location) {
            return Err(SimError::LocationNotFound(location));
        }
        let id = match character {
            Some(id) => {
                let ch = self
                    .world
                    .character(id)
                    .ok_or(SimError::CharacterNotFound(id))?;
                if !ch.controlled.is_none() && ch.controlled != player {
                    return Err(SimError::CharacterTaken {
                        character: id,
                        owner: ch.controlled,
                    });
                }
                for other in self.world.characters_mut() {
                    if other.id == id {
                        other.controlled = player;
                    } else if other.controlled == player {
                        tracing::debug!(player = %player, character = %other.id, "character released");
                        other.controlled = PlayerId(0);
                        other.direction = 0;
                        other.vertical = 0;
                    }
                }
                id
            }
            None => self
                .world
                .character_for_player(player)
                .map(|c| c.id)
                .ok_or(SimError::NoCharacter(player))?,
        };
        tracing::info!(player = %player, character = %id, "player joined");
        self.events.push(SimEvent::new(
            self.clock.tick(),
            SimEventKind::PlayerJoined {
                player,
                character: id,
            },
            format!("player {player} controls character {id}"),
        ));
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The live world. Lane layers are only written back by [`Self::export_world`].
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The shared type registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Rules for this run.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Recorded events.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// All lanes.
    pub fn lanes(&self) -> &Lanes {
        &self.lanes
    }

    /// The lane of location `id`.
    pub fn lane(&self, id: LocationId) -> Option<&Lane> {
        self.lanes.get(&id)
    }

    /// Ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The world with working layers written back into the at-rest form.
    ///
    /// Behavior start times are stored relative to the current clock, so a
    /// reloaded creature keeps the remaining time of its behavior.
    pub fn export_world(&self) -> World {
        let mut world = self.world.clone();
        for lane in self.lanes.values() {
            if let Some(location) = world.location_mut(lane.id()) {
                lane.write_back(location);
            }
        }
        let now = self.clock.seconds();
        for creature in world.creatures_mut() {
            if let Some(behavior) = creature.behavior.as_mut() {
                behavior.started_at -= now;
            }
        }
        world
    }
}

fn clamp_x(x: f64, max_x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, max_x) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use loil_core::{Character, Creature, CreatureId};

    fn with_rabbits(seed: u64) -> Simulation {
        let mut world = fixtures::world();
        for (id, x) in [(1, 1.0), (2, 5.0)] {
            world
                .add_creature(Creature::new(
                    CreatureId(id),
                    fixtures::RABBIT,
                    fixtures::MEADOW,
                    x,
                    5,
                ))
                .unwrap();
        }
        fixtures::sim(world, SimConfig::default().with_seed(seed))
    }

    fn positions(sim: &Simulation) -> Vec<(CreatureId, f64)> {
        sim.world().creatures().map(|c| (c.id, c.x)).collect()
    }

    #[test]
    fn new_clamps_entities_into_their_lane() {
        let mut world = fixtures::world();
        let mut ch = Character::new(CharacterId(1), "Ann", fixtures::FOREST, 42.0);
        ch.direction = 5;
        world.add_character(ch).unwrap();
        let sim = fixtures::sim(world, SimConfig::default());

        let ch = sim.world().character(CharacterId(1)).unwrap();
        assert_eq!(ch.x, 7.0);
        assert_eq!(ch.direction, 1);
        let lane = sim.lane(fixtures::FOREST).unwrap();
        assert_eq!(lane.occupant(7), Occupant::Character(CharacterId(1)));
        assert_eq!(lane.characters(), &[CharacterId(1)]);
    }

    #[test]
    fn foreground_objects_claim_their_tile() {
        let sim = fixtures::sim(fixtures::world(), SimConfig::default());
        let lane = sim.lane(fixtures::MEADOW).unwrap();
        assert_eq!(lane.occupant(8), Occupant::Object(fixtures::BUSH_ID));
        // Trees live in the background and leave the tile free.
        assert!(lane.occupant(4).is_empty());
    }

    #[test]
    fn same_seed_same_run() {
        let mut a = with_rabbits(7);
        let mut b = with_rabbits(7);
        a.run(200, 0.1).unwrap();
        b.run(200, 0.1).unwrap();
        assert_eq!(positions(&a), positions(&b));
        assert_eq!(a.current_tick(), 200);
        assert_eq!(a.events().len(), b.events().len());
    }

    #[test]
    fn tick_ignores_bad_elapsed() {
        let mut sim = fixtures::sim(fixtures::world(), SimConfig::default());
        sim.tick(f64::NAN).unwrap();
        sim.tick(-3.0).unwrap();
        assert_eq!(sim.current_tick(), 2);
        assert_eq!(sim.clock().seconds(), 0.0);
    }

    #[test]
    fn set_heading_starts_at_road_speed() {
        let mut world = fixtures::world();
        world
            .add_character(Character::new(CharacterId(1), "Ann", fixtures::MEADOW, 3.0))
            .unwrap();
        let mut sim = fixtures::sim(world, SimConfig::default());

        sim.set_heading(CharacterId(1), -4, 1).unwrap();
        let ch = sim.world().character(CharacterId(1)).unwrap();
        assert_eq!((ch.direction, ch.vertical), (-1, 1));
        assert!((ch.speed - 1.4).abs() < 1e-9);

        sim.set_heading(CharacterId(1), 0, 1).unwrap();
        let ch = sim.world().character(CharacterId(1)).unwrap();
        assert_eq!((ch.direction, ch.vertical), (0, 0));

        assert!(matches!(
            sim.stop(CharacterId(9)),
            Err(SimError::CharacterNotFound(_))
        ));
    }

    #[test]
    fn bind_player_claims_free_character() {
        let mut world = fixtures::world();
        world
            .add_character(Character::new(CharacterId(1), "Ann", fixtures::MEADOW, 0.0))
            .unwrap();
        let mut sim = fixtures::sim(world, SimConfig::default());

        let id = sim
            .bind_player(PlayerId(5), Some(CharacterId(1)), fixtures::MEADOW)
            .unwrap();
        assert_eq!(id, CharacterId(1));
        assert_eq!(
            sim.world().character(id).unwrap().controlled,
            PlayerId(5)
        );
        // Rejoining without naming a character finds the same one.
        assert_eq!(
            sim.bind_player(PlayerId(5), None, fixtures::MEADOW).unwrap(),
            id
        );
        assert!(matches!(
            sim.bind_player(PlayerId(6), Some(id), fixtures::MEADOW),
            Err(SimError::CharacterTaken { owner: PlayerId(5), .. })
        ));
        assert!(matches!(
            sim.bind_player(PlayerId(6), None, fixtures::MEADOW),
            Err(SimError::NoCharacter(PlayerId(6)))
        ));
        assert!(matches!(
            sim.bind_player(PlayerId(5), None, LocationId(99)),
            Err(SimError::LocationNotFound(_))
        ));
        assert!(
            sim.events()
                .events()
                .iter()
                .any(|e| matches!(e.kind, SimEventKind::PlayerJoined { .. }))
        );
    }

    #[test]
    fn joining_another_character_releases_the_previous_one() {
        let mut world = fixtures::world();
        for (id, x) in [(2, 1.0), (3, 6.0)] {
            world
                .add_character(Character::new(CharacterId(id), "Walker", fixtures::MEADOW, x))
                .unwrap();
        }
        let mut sim = fixtures::sim(world, SimConfig::default());
        sim.bind_player(PlayerId(7), Some(CharacterId(2)), fixtures::MEADOW)
            .unwrap();
        sim.set_heading(CharacterId(2), 1, 0).unwrap();

        sim.bind_player(PlayerId(7), Some(CharacterId(3)), fixtures::MEADOW)
            .unwrap();
        let old = sim.world().character(CharacterId(2)).unwrap();
        assert!(old.is_npc());
        assert_eq!(old.direction, 0);
        assert_eq!(
            sim.world().character_for_player(PlayerId(7)).map(|c| c.id),
            Some(CharacterId(3))
        );
        assert_eq!(
            sim.bind_player(PlayerId(7), None, fixtures::MEADOW).unwrap(),
            CharacterId(3)
        );
    }

    #[test]
    fn export_keeps_objects_and_drops_mobiles_from_foreground() {
        let mut world = fixtures::world();
        let mut ch = Character::new(CharacterId(1), "Ann", fixtures::MEADOW, 3.0);
        ch.equipped.insert("axe".into(), fixtures::AXE);
        world.add_character(ch).unwrap();
        let mut sim = fixtures::sim(world, SimConfig::default());
        for _ in 0..3 {
            sim.interact(CharacterId(1), fixtures::TREE_ID, 0).unwrap();
        }

        let exported = sim.export_world();
        let meadow = exported.location(fixtures::MEADOW).unwrap();
        assert_eq!(meadow.background.get(4), Some(fixtures::STUMP));
        assert_eq!(meadow.foreground.get(3), Some(0));
        assert_eq!(meadow.foreground.get(8), Some(fixtures::BUSH_ID.get()));

        let json = exported.to_json_string().unwrap();
        let reloaded = World::from_json_str(&json).unwrap();
        let again = fixtures::sim(reloaded, SimConfig::default());
        assert_eq!(
            again.world().object(fixtures::TREE_ID).unwrap().type_id,
            fixtures::STUMP
        );
        assert_eq!(
            again.lane(fixtures::MEADOW).unwrap().occupant(3),
            Occupant::Character(CharacterId(1))
        );
    }

    #[test]
    fn reload_keeps_remaining_behavior_time() {
        let mut sim = with_rabbits(9);
        sim.run(25, 0.1).unwrap();
        let now = sim.clock().seconds();

        let exported = sim.export_world();
        for (live, saved) in sim.world().creatures().zip(exported.creatures()) {
            let live = live.behavior.as_ref().unwrap();
            let saved = saved.behavior.as_ref().unwrap();
            assert!((saved.started_at - (live.started_at - now)).abs() < 1e-9);
            assert!(saved.started_at <= 0.0);
        }

        let json = exported.to_json_string().unwrap();
        let again = fixtures::sim(World::from_json_str(&json).unwrap(), SimConfig::default());
        for (saved, loaded) in exported.creatures().zip(again.world().creatures()) {
            assert_eq!(saved.behavior, loaded.behavior);
            assert_eq!(saved.hunger, loaded.hunger);
            assert_eq!(saved.x, loaded.x);
        }
    }

    #[test]
    fn debug_shows_summary() {
        let sim = fixtures::sim(fixtures::world(), SimConfig::default());
        let text = format!("{sim:?}");
        assert!(text.contains("lanes: 2"));
        assert!(text.contains("systems: 3"));
    }
}

//! Creature behavior state machine.
//!
//! Every creature runs exactly one [`CreatureBehavior`] at a time. When it
//! runs out (or when a creature has none yet) a new one is chosen from the
//! creature type's allowed set. Moving behaviors walk toward a target tile,
//! `rest` heals, `eat` forages nearby food, `attack` stands still.

use chrono::Utc;
use loil_core::creature::{MAX_NEED, NO_TARGET};
use loil_core::{BehaviorKind, CreatureBehavior, CreatureId, CreatureType, ObjectId, Registry, World};
use rand::Rng;

use crate::config::{ForagingMode, SimConfig};
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::interaction;
use crate::lane::{Lane, Occupant, tile_of};
use crate::system::System;

/// Seconds a freshly chosen behavior lasts.
pub fn behavior_duration<R: Rng + ?Sized>(kind: BehaviorKind, rng: &mut R) -> f64 {
    let (lo, hi) = match kind {
        BehaviorKind::Wander => (3.0, 8.0),
        BehaviorKind::Walk => (4.0, 10.0),
        BehaviorKind::Rest => (5.0, 12.0),
        BehaviorKind::Eat => (2.0, 5.0),
        BehaviorKind::Attack => (1.0, 3.0),
        BehaviorKind::Flee => (2.0, 5.0),
    };
    rng.random_range(lo..hi)
}

/// Behaviors a creature of type `ty` may pick from.
///
/// The type's `behaviors` list wins; failing that its `default_behavior`;
/// failing that wander and rest. Incidental foraging removes `eat`.
pub fn allowed_behaviors(ty: Option<&CreatureType>, foraging: ForagingMode) -> Vec<BehaviorKind> {
    let mut kinds: Vec<BehaviorKind> = Vec::new();
    if let Some(ty) = ty {
        for name in &ty.behaviors {
            match name.parse::<BehaviorKind>() {
                Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Ok(_) => {}
                Err(e) => tracing::warn!(creature_type = ty.id, "{e}"),
            }
        }
        if kinds.is_empty() {
            if let Ok(kind) = ty.default_behavior.parse::<BehaviorKind>() {
                kinds.push(kind);
            }
        }
    }
    if foraging == ForagingMode::Incidental {
        kinds.retain(|k| *k != BehaviorKind::Eat);
    }
    if kinds.is_empty() {
        kinds = vec![BehaviorKind::Wander, BehaviorKind::Rest];
    }
    kinds
}

/// Pick the next behavior and its duration.
///
/// A starving creature rests for twice as long when it is allowed to rest;
/// otherwise the choice is uniform over `allowed`.
pub fn choose_behavior<R: Rng + ?Sized>(
    allowed: &[BehaviorKind],
    hunger: f64,
    config: &SimConfig,
    rng: &mut R,
) -> (BehaviorKind, f64) {
    if hunger > config.starving_threshold && allowed.contains(&BehaviorKind::Rest) {
        return (
            BehaviorKind::Rest,
            2.0 * behavior_duration(BehaviorKind::Rest, rng),
        );
    }
    let kind = match allowed.len() {
        0 => BehaviorKind::Rest,
        n => allowed[rng.random_range(0..n)],
    };
    (kind, behavior_duration(kind, rng))
}

/// Pick a walkable tile `1..=radius` tiles away in `direction` (random when
/// `None`). When the first choice is not walkable, closer tiles are tried.
/// Returns [`NO_TARGET`] when nothing in that direction is walkable.
pub fn pick_target<R: Rng + ?Sized>(
    lane: &Lane,
    from: i32,
    radius: i32,
    direction: Option<i32>,
    registry: &Registry,
    rng: &mut R,
) -> i32 {
    let dir = direction.unwrap_or_else(|| if rng.random_bool(0.5) { 1 } else { -1 });
    let distance = rng.random_range(1..=radius.max(1));
    (1..=distance)
        .rev()
        .map(|d| from + dir * d)
        .find(|&tile| lane.is_walkable(tile, registry))
        .unwrap_or(NO_TARGET)
}

/// Nearest favorite food on `lane` within `radius` tiles of `tile`.
pub fn find_food(
    world: &World,
    lane: &Lane,
    tile: i32,
    radius: i32,
    favorites: &[i32],
) -> Option<ObjectId> {
    lane.objects()
        .iter()
        .filter_map(|id| world.object(*id))
        .filter(|o| favorites.contains(&o.type_id) && (o.x - tile).abs() <= radius)
        .min_by_key(|o| ((o.x - tile).abs(), o.id))
        .map(|o| o.id)
}

/// Drives every creature's behavior, needs and movement.
#[derive(Debug, Default)]
pub struct CreatureSystem;

impl CreatureSystem {
    /// A creature system.
    pub fn new() -> Self {
        Self
    }
}

impl System for CreatureSystem {
    fn name(&self) -> &str {
        "creatures"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let ids: Vec<CreatureId> = ctx.world.creatures().map(|c| c.id).collect();
        for id in ids {
            apply_needs(ctx, id);

            let now = ctx.now();
            let expired = ctx
                .world
                .creature(id)
                .is_some_and(|c| c.behavior.as_ref().is_none_or(|b| b.is_finished(now)));
            if expired {
                start_behavior(ctx, id);
            }

            match ctx.world.creature(id).and_then(|c| c.behavior_kind()) {
                Some(BehaviorKind::Wander | BehaviorKind::Walk) => walk(ctx, id, 1.0)?,
                Some(BehaviorKind::Flee) => walk(ctx, id, 2.0)?,
                Some(BehaviorKind::Rest) => rest(ctx, id),
                Some(BehaviorKind::Eat) => forage(ctx, id)?,
                Some(BehaviorKind::Attack) | None => {}
            }
        }
        Ok(())
    }
}

/// Hunger and thirst grow every tick; resting slows hunger.
fn apply_needs(ctx: &mut SimContext<'_>, id: CreatureId) {
    let config = ctx.config;
    let dt = ctx.elapsed;
    let Some(creature) = ctx.world.creature_mut(id) else {
        return;
    };
    let factor = if creature.behavior_kind() == Some(BehaviorKind::Rest) {
        config.rest_hunger_factor
    } else {
        1.0
    };
    creature.hunger = (creature.hunger + config.hunger_rate * factor * dt).min(MAX_NEED);
    creature.thirst = (creature.thirst + config.thirst_rate * dt).min(MAX_NEED);
    creature.last_update = Some(Utc::now());
    if dt > 0.0 {
        ctx.mark_changed();
    }
}

fn start_behavior(ctx: &mut SimContext<'_>, id: CreatureId) {
    let Some((type_id, location, tile, x, hunger, previous)) = ctx.world.creature(id).map(|c| {
        (
            c.type_id,
            c.location,
            tile_of(c.x),
            c.x,
            c.hunger,
            c.behavior_kind(),
        )
    }) else {
        return;
    };

    let allowed = allowed_behaviors(ctx.registry.creature(type_id), ctx.config.foraging);
    let (kind, duration) = choose_behavior(&allowed, hunger, ctx.config, &mut *ctx.rng);
    let mut behavior = CreatureBehavior::new(kind, ctx.now(), duration);

    if kind.is_moving() {
        if let Some(lane) = ctx.lanes.get(&location) {
            let direction = if kind == BehaviorKind::Flee {
                Some(flee_direction(ctx.world, lane, x))
            } else {
                None
            };
            behavior.target_pos = pick_target(
                lane,
                tile,
                ctx.config.wander_radius,
                direction,
                ctx.registry,
                &mut *ctx.rng,
            );
        }
    }

    tracing::debug!(creature = %id, %kind, duration, target = behavior.target_pos, "behavior changed");
    if let Some(creature) = ctx.world.creature_mut(id) {
        creature.behavior = Some(behavior);
    }
    ctx.mark_changed();
    ctx.emit(
        SimEventKind::BehaviorChanged {
            creature: id,
            from: previous,
            to: kind,
        },
        format!("creature {id} starts to {kind}"),
    );
}

/// Direction pointing away from the nearest character on the lane.
fn flee_direction(world: &World, lane: &Lane, x: f64) -> i32 {
    let nearest = lane
        .characters()
        .iter()
        .filter_map(|id| world.character(*id))
        .map(|c| c.x)
        .min_by(|a, b| (a - x).abs().total_cmp(&(b - x).abs()));
    match nearest {
        Some(cx) if cx > x => -1,
        Some(_) => 1,
        // Alone on the lane: run whichever way.
        None => {
            if x < lane.max_x() / 2.0 {
                1
            } else {
                -1
            }
        }
    }
}

/// Step toward the behavior's target; stand and maybe eat once there.
fn walk(ctx: &mut SimContext<'_>, id: CreatureId, speed_factor: f64) -> SimResult<()> {
    let registry = ctx.registry;
    let config = ctx.config;
    let dt = ctx.elapsed;
    let Some(creature) = ctx.world.creature_mut(id) else {
        return Ok(());
    };
    let location = creature.location;
    let Some(lane) = ctx.lanes.get_mut(&location) else {
        return Ok(());
    };
    let Some(behavior) = creature.behavior.as_mut() else {
        return Ok(());
    };

    if !behavior.has_target() {
        return eat_incidentally(ctx, id);
    }

    let who = Occupant::Creature(id);
    let target = f64::from(behavior.target_pos).clamp(0.0, lane.max_x());
    let step = registry.creature_speed(creature.type_id) * speed_factor * dt;
    let old_tile = tile_of(creature.x);
    let next_x = if (target - creature.x).abs() <= step {
        target
    } else {
        creature.x + step.copysign(target - creature.x)
    };

    let new_tile = tile_of(next_x);
    if new_tile != old_tile {
        if let Err(reason) = lane.check_entry(new_tile, who, registry, config.collision) {
            creature.x = f64::from(old_tile);
            behavior.target_pos = NO_TARGET;
            tracing::debug!(creature = %id, tile = new_tile, %reason, "creature step rejected");
            ctx.mark_changed();
            ctx.emit(
                SimEventKind::Blocked {
                    subject: who,
                    location,
                    tile: new_tile,
                    reason,
                },
                format!("creature {id} cannot enter tile {new_tile}: {reason}"),
            );
            return Ok(());
        }
        lane.release(old_tile, who);
        lane.claim(new_tile, who);
    }

    creature.x = next_x;
    if next_x == target {
        // Arrived: stand still for the rest of the behavior.
        behavior.target_pos = NO_TARGET;
        behavior.ate_at_current_stop = false;
    }
    ctx.mark_changed();
    if new_tile != old_tile {
        ctx.refill(location, old_tile);
    }
    Ok(())
}

/// In incidental mode a standing creature eats favorite food lying on its
/// own tile, once per stop.
fn eat_incidentally(ctx: &mut SimContext<'_>, id: CreatureId) -> SimResult<()> {
    if ctx.config.foraging != ForagingMode::Incidental {
        return Ok(());
    }
    let Some(creature) = ctx.world.creature(id) else {
        return Ok(());
    };
    if creature
        .behavior
        .as_ref()
        .is_none_or(|b| b.ate_at_current_stop)
    {
        return Ok(());
    }
    let favorites = favorite_foods(ctx.registry, creature.type_id);
    let food = ctx
        .lanes
        .get(&creature.location)
        .and_then(|lane| find_food(ctx.world, lane, tile_of(creature.x), 0, &favorites));
    if let Some(object) = food {
        eat(ctx, id, object)?;
    }
    Ok(())
}

/// Explicit foraging: look around for favorite food, eat once per behavior.
fn forage(ctx: &mut SimContext<'_>, id: CreatureId) -> SimResult<()> {
    let Some(creature) = ctx.world.creature(id) else {
        return Ok(());
    };
    if ctx.config.foraging == ForagingMode::Incidental {
        // An `eat` behavior carried over from a world file: just stand.
        return eat_incidentally(ctx, id);
    }
    if creature
        .behavior
        .as_ref()
        .is_none_or(|b| b.ate_at_current_stop)
    {
        return Ok(());
    }
    let favorites = favorite_foods(ctx.registry, creature.type_id);
    let food = ctx.lanes.get(&creature.location).and_then(|lane| {
        find_food(
            ctx.world,
            lane,
            tile_of(creature.x),
            ctx.config.forage_radius,
            &favorites,
        )
    });
    if let Some(object) = food {
        eat(ctx, id, object)?;
    }
    Ok(())
}

fn favorite_foods(registry: &Registry, type_id: i32) -> Vec<i32> {
    registry
        .creature(type_id)
        .map(|t| t.favorite_foods.clone())
        .unwrap_or_default()
}

/// One bite: less hunger, less durability, the object gone at zero.
fn eat(ctx: &mut SimContext<'_>, id: CreatureId, object: ObjectId) -> SimResult<()> {
    let food_value = ctx.config.food_value;
    if let Some(creature) = ctx.world.creature_mut(id) {
        creature.hunger = (creature.hunger - food_value).max(0.0);
        if let Some(behavior) = creature.behavior.as_mut() {
            behavior.ate_at_current_stop = true;
        }
    }
    let worn_out = match ctx.world.object_mut(object) {
        Some(food) => {
            food.durability -= 1;
            food.durability <= 0
        }
        None => false,
    };
    ctx.mark_changed();
    ctx.emit(
        SimEventKind::CreatureAte {
            creature: id,
            object,
        },
        format!("creature {id} ate from object {object}"),
    );
    if worn_out {
        interaction::destroy_object(ctx, object)?;
    }
    Ok(())
}

fn rest(ctx: &mut SimContext<'_>, id: CreatureId) {
    let heal = ctx.config.rest_heal;
    if let Some(creature) = ctx.world.creature_mut(id) {
        if creature.health < creature.max_health {
            creature.health = (creature.health + heal).min(creature.max_health);
            ctx.mark_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollisionMode;
    use crate::fixtures;
    use crate::simulation::Simulation;
    use loil_core::{Character, CharacterId, Creature};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rabbit(id: i32, x: f64, behavior: Option<CreatureBehavior>) -> Creature {
        let mut c = Creature::new(CreatureId(id), fixtures::RABBIT, fixtures::MEADOW, x, 5);
        c.behavior = behavior;
        c
    }

    fn endless(kind: BehaviorKind, target: i32) -> CreatureBehavior {
        let mut b = CreatureBehavior::new(kind, 0.0, 1000.0);
        b.target_pos = target;
        b
    }

    fn sim_with(creature: Creature, config: SimConfig) -> Simulation {
        let mut world = fixtures::world();
        world.add_creature(creature).unwrap();
        fixtures::sim(world, config)
    }

    #[test]
    fn durations_stay_in_range_and_are_reproducible() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for kind in BehaviorKind::ALL {
            let d = behavior_duration(kind, &mut a);
            assert!(d >= 1.0 && d < 12.0, "{kind}: {d}");
            assert_eq!(d, behavior_duration(kind, &mut b));
        }
    }

    #[test]
    fn allowed_falls_back_to_default_then_wander_rest() {
        let mut ty = CreatureType {
            default_behavior: "walk".into(),
            ..Default::default()
        };
        assert_eq!(
            allowed_behaviors(Some(&ty), ForagingMode::Explicit),
            vec![BehaviorKind::Walk]
        );
        ty.default_behavior = "eat".into();
        assert_eq!(
            allowed_behaviors(Some(&ty), ForagingMode::Incidental),
            vec![BehaviorKind::Wander, BehaviorKind::Rest]
        );
        assert_eq!(
            allowed_behaviors(None, ForagingMode::Explicit),
            vec![BehaviorKind::Wander, BehaviorKind::Rest]
        );
    }

    #[test]
    fn starving_creature_rests_twice_as_long() {
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let allowed = [BehaviorKind::Wander, BehaviorKind::Rest];
        for _ in 0..20 {
            let (kind, duration) = choose_behavior(&allowed, 95.0, &config, &mut rng);
            assert_eq!(kind, BehaviorKind::Rest);
            assert!(duration >= 10.0);
        }
        // Without rest on the list hunger changes nothing.
        let (kind, _) = choose_behavior(&[BehaviorKind::Walk], 95.0, &config, &mut rng);
        assert_eq!(kind, BehaviorKind::Walk);
    }

    #[test]
    fn targets_avoid_unwalkable_tiles() {
        let world = fixtures::world();
        let lane = Lane::from_location(world.location(fixtures::MEADOW).unwrap());
        let registry = fixtures::registry();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let t = pick_target(&lane, 5, 10, None, &registry, &mut rng);
            assert_ne!(t, 6, "impassable tile chosen");
            assert!(t == NO_TARGET || (0..10).contains(&t));
        }
    }

    #[test]
    fn new_creature_gets_a_behavior_on_first_tick() {
        let mut sim = sim_with(rabbit(1, 1.0, None), SimConfig::default());
        sim.tick(0.016).unwrap();
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert!(c.behavior.is_some());
        assert!(c.last_update.is_some());
    }

    #[test]
    fn hunger_rises_every_tick_until_the_cap() {
        let mut c = rabbit(1, 1.0, Some(endless(BehaviorKind::Attack, NO_TARGET)));
        c.hunger = 99.0;
        let mut sim = sim_with(c, SimConfig::default().with_need_rates(10.0, 1.0));
        let first = {
            sim.tick(0.05).unwrap();
            sim.world().creature(CreatureId(1)).unwrap().hunger
        };
        assert!(first > 99.0);
        sim.run(10, 0.05).unwrap();
        assert_eq!(sim.world().creature(CreatureId(1)).unwrap().hunger, 100.0);
    }

    #[test]
    fn resting_heals_and_slows_hunger() {
        let mut c = rabbit(1, 1.0, Some(endless(BehaviorKind::Rest, NO_TARGET)));
        c.health = 1;
        let mut sim = sim_with(c, SimConfig::default().with_need_rates(4.0, 0.0));
        sim.run(2, 1.0).unwrap();
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert_eq!(c.health, 3);
        assert!((c.hunger - 2.0).abs() < 1e-9);
        sim.run(10, 1.0).unwrap();
        assert_eq!(sim.world().creature(CreatureId(1)).unwrap().health, 5);
    }

    #[test]
    fn walking_creature_moves_at_type_speed_and_stops_at_target() {
        let c = rabbit(1, 0.0, Some(endless(BehaviorKind::Walk, 3)));
        let mut sim = sim_with(c, SimConfig::default());

        sim.tick(0.2).unwrap(); // 2 tiles/s
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert!((c.x - 0.4).abs() < 1e-9);

        sim.run(10, 0.2).unwrap();
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert_eq!(c.x, 3.0);
        assert!(!c.behavior.as_ref().unwrap().has_target());
        assert_eq!(
            sim.lane(fixtures::MEADOW).unwrap().occupant(3),
            Occupant::Creature(CreatureId(1))
        );
    }

    #[test]
    fn blocked_creature_abandons_target() {
        // Tile 6 is impassable.
        let c = rabbit(1, 5.0, Some(endless(BehaviorKind::Wander, 7)));
        let mut sim = sim_with(c, SimConfig::default());
        sim.tick(0.5).unwrap();
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert_eq!(c.x, 5.0);
        assert!(!c.behavior.as_ref().unwrap().has_target());
    }

    #[test]
    fn exclusive_mode_blocks_creatures_at_characters() {
        let mut world = fixtures::world();
        world
            .add_character(Character::new(CharacterId(1), "Ann", fixtures::MEADOW, 1.0))
            .unwrap();
        world
            .add_creature(rabbit(1, 0.0, Some(endless(BehaviorKind::Walk, 2))))
            .unwrap();
        let mut sim = fixtures::sim(
            world,
            SimConfig::default().with_collision(CollisionMode::Exclusive),
        );
        sim.tick(0.5).unwrap();
        assert_eq!(sim.world().creature(CreatureId(1)).unwrap().x, 0.0);
    }

    #[test]
    fn explicit_forage_eats_nearby_food_once() {
        // The bush sits on tile 8 with durability 2.
        let mut c = rabbit(1, 9.0, Some(endless(BehaviorKind::Eat, NO_TARGET)));
        c.hunger = 50.0;
        let mut sim = sim_with(c, SimConfig::default().with_need_rates(0.0, 0.0));

        sim.run(5, 0.1).unwrap();
        let c = sim.world().creature(CreatureId(1)).unwrap();
        assert!((c.hunger - 20.0).abs() < 1e-9);
        let bush = sim.world().object(fixtures::BUSH_ID).unwrap();
        assert_eq!(bush.durability, 1);
    }

    #[test]
    fn eating_the_last_bite_destroys_the_food() {
        let mut world = fixtures::world();
        world.object_mut(fixtures::BUSH_ID).unwrap().durability = 1;
        world
            .add_creature(rabbit(1, 9.0, Some(endless(BehaviorKind::Eat, NO_TARGET))))
            .unwrap();
        let mut sim = fixtures::sim(world, SimConfig::default());

        sim.tick(0.1).unwrap();
        assert!(sim.world().object(fixtures::BUSH_ID).is_none());
        let lane = sim.lane(fixtures::MEADOW).unwrap();
        assert!(lane.occupant(8).is_empty());
        assert!(!lane.objects().contains(&fixtures::BUSH_ID));
    }

    #[test]
    fn incidental_mode_never_picks_eat() {
        let mut sim = sim_with(
            rabbit(1, 1.0, None),
            SimConfig::default().with_foraging(ForagingMode::Incidental),
        );
        for _ in 0..500 {
            sim.tick(1.0).unwrap();
            let kind = sim.world().creature(CreatureId(1)).unwrap().behavior_kind();
            assert_ne!(kind, Some(BehaviorKind::Eat));
        }
    }

    #[test]
    fn incidental_mode_eats_under_a_stopped_creature() {
        let mut world = fixtures::world();
        // Shared tiles so the rabbit can stand on the bush.
        world
            .add_creature(rabbit(1, 8.0, Some(endless(BehaviorKind::Wander, NO_TARGET))))
            .unwrap();
        let mut sim = fixtures::sim(
            world,
            SimConfig::default()
                .with_foraging(ForagingMode::Incidental)
                .with_collision(CollisionMode::Shared),
        );
        sim.run(3, 0.1).unwrap();
        let bush = sim.world().object(fixtures::BUSH_ID).unwrap();
        assert_eq!(bush.durability, 1, "only one bite per stop");
    }

    #[test]
    fn fleeing_runs_away_from_the_nearest_character() {
        let mut world = fixtures::world();
        world
            .add_character(Character::new(CharacterId(1), "Ann", fixtures::FOREST, 1.0))
            .unwrap();
        let mut lane = Lane::from_location(world.location(fixtures::FOREST).unwrap());
        lane.add_character(CharacterId(1));
        assert_eq!(flee_direction(&world, &lane, 3.0), 1);
        assert_eq!(flee_direction(&world, &lane, 0.0), -1);
    }
}

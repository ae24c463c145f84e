use loil_core::{Character, CharacterId, LocationId, Registry, Side, TransitionKey};

use crate::config::{CollisionMode, SimConfig};
use crate::context::SimContext;
use crate::error::SimResult;
use crate::event::SimEventKind;
use crate::lane::{BlockReason, Lane, Occupant, tile_of};
use crate::simulation::TransitionRecord;
use crate::system::System;

/// Result of advancing one character along its lane.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    /// Position did not change.
    Idle,
    /// Position changed, possibly onto a new tile.
    Moved,
    /// The destination tile refused the character; it is back on `from`.
    Blocked { tile: i32, reason: BlockReason },
    /// The character is at a lane end and wants to leave through it.
    Boundary(Side),
}

/// Moves characters along their lanes and across location transitions.
#[derive(Debug, Default)]
pub struct MovementSystem;

impl MovementSystem {
    /// A movement system.
    pub fn new() -> Self {
        Self
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn tick(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let walking: Vec<CharacterId> = ctx
            .world
            .characters()
            .filter(|c| c.direction != 0)
            .map(|c| c.id)
            .collect();

        for id in walking {
            let Some(ch) = ctx.world.character_mut(id) else {
                continue;
            };
            let location = ch.location;
            let old_tile = tile_of(ch.x);
            let Some(lane) = ctx.lanes.get_mut(&location) else {
                tracing::warn!(character = %id, location = %location, "character on unknown lane, stopping");
                ch.direction = 0;
                continue;
            };

            match advance(ch, lane, ctx.registry, ctx.config, ctx.elapsed) {
                Step::Idle => {}
                Step::Moved => ctx.mark_changed(),
                Step::Blocked { tile, reason } => {
                    tracing::debug!(character = %id, tile, %reason, "move rejected");
                    ctx.mark_changed();
                    ctx.emit(
                        SimEventKind::Blocked {
                            subject: Occupant::Character(id),
                            location,
                            tile,
                            reason,
                        },
                        format!("character {id} cannot enter tile {tile}: {reason}"),
                    );
                }
                Step::Boundary(side) => {
                    ctx.mark_changed();
                    try_transition(ctx, id, side);
                }
            }
            ctx.refill(location, old_tile);
        }
        Ok(())
    }
}

/// Move `ch` by one tick of its heading and validate the tile it lands on.
fn advance(
    ch: &mut Character,
    lane: &mut Lane,
    registry: &Registry,
    config: &SimConfig,
    elapsed: f64,
) -> Step {
    if lane.width() == 0 {
        return Step::Idle;
    }
    let who = Occupant::Character(ch.id);
    let before = ch.x;
    let old_tile = tile_of(before);
    let max_x = lane.max_x();

    ch.x += f64::from(ch.direction) * ch.speed * elapsed;
    let boundary = if ch.direction > 0 && ch.x >= max_x {
        ch.x = max_x;
        Some(Side::Right)
    } else if ch.direction < 0 && ch.x <= 0.0 {
        ch.x = 0.0;
        Some(Side::Left)
    } else {
        None
    };

    let new_tile = tile_of(ch.x);
    if new_tile != old_tile {
        match lane.check_entry(new_tile, who, registry, config.collision) {
            Ok(modifier) => {
                lane.release(old_tile, who);
                lane.claim(new_tile, who);
                ch.speed = config.base_speed * modifier;
            }
            Err(reason) => {
                ch.x = f64::from(old_tile);
                return Step::Blocked {
                    tile: new_tile,
                    reason,
                };
            }
        }
    }

    match boundary {
        Some(side) => Step::Boundary(side),
        None if ch.x != before => Step::Moved,
        None => Step::Idle,
    }
}

/// Stop a character that reached a lane end without a usable transition.
fn stall(ctx: &mut SimContext<'_>, id: CharacterId, location: LocationId, side: Side) {
    if let Some(ch) = ctx.world.character_mut(id) {
        ch.direction = 0;
    }
    tracing::debug!(character = %id, location = %location, %side, "reached lane end, no transition");
    ctx.emit(
        SimEventKind::EdgeStall {
            character: id,
            location,
            side,
        },
        format!("character {id} stopped at the {side} end of location {location}"),
    );
}

/// Resolve the transition at `side` for a character standing on a lane end.
fn try_transition(ctx: &mut SimContext<'_>, id: CharacterId, side: Side) {
    let Some((from, vertical, tile)) = ctx
        .world
        .character(id)
        .map(|c| (c.location, c.vertical, tile_of(c.x)))
    else {
        return;
    };

    let Some(key) = TransitionKey::at_boundary(side, vertical) else {
        stall(ctx, id, from, side);
        return;
    };
    let Some(to) = ctx.lanes.get(&from).and_then(|lane| lane.transition(key)) else {
        stall(ctx, id, from, side);
        return;
    };

    let who = Occupant::Character(id);
    let arrival = match ctx.lanes.get(&to) {
        Some(target) if target.width() > 0 => {
            let x = match side {
                Side::Left => target.max_x(),
                Side::Right => 0.0,
            };
            let held = target.occupant(tile_of(x));
            if ctx.config.collision == CollisionMode::Exclusive && !held.is_empty() {
                Err((tile_of(x), BlockReason::Occupied(held)))
            } else {
                Ok(x)
            }
        }
        _ => Err((0, BlockReason::OutOfBounds)),
    };

    let x = match arrival {
        Ok(x) => x,
        Err((arrival_tile, reason)) => {
            if let Some(ch) = ctx.world.character_mut(id) {
                ch.direction = 0;
            }
            tracing::debug!(character = %id, %key, to = %to, %reason, "transition blocked");
            ctx.emit(
                SimEventKind::Blocked {
                    subject: who,
                    location: to,
                    tile: arrival_tile,
                    reason,
                },
                format!("character {id} cannot enter location {to}: {reason}"),
            );
            return;
        }
    };

    if let Some(lane) = ctx.lanes.get_mut(&from) {
        lane.release(tile, who);
        lane.remove_character(id);
    }
    if let Some(lane) = ctx.lanes.get_mut(&to) {
        lane.claim(tile_of(x), who);
        lane.add_character(id);
    }
    let base_speed = ctx.config.base_speed;
    if let Some(ch) = ctx.world.character_mut(id) {
        ch.location = to;
        ch.x = x;
        ch.direction = 0;
        ch.vertical = 0;
        ch.speed = base_speed;
    }

    ctx.refill(from, tile);

    tracing::info!(character = %id, from = %from, to = %to, %key, "character changed location");
    ctx.report.transitions.push(TransitionRecord {
        character: id,
        from,
        to,
        key,
    });
    ctx.emit(
        SimEventKind::Transitioned {
            character: id,
            from,
            to,
            key,
        },
        format!("character {id} moved from location {from} to {to} via {key}"),
    );
}

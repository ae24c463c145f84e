//! Tool interactions between characters and world objects.

use loil_core::character::HAND_TOOL;
use loil_core::{CharacterId, ObjectId};

use crate::context::SimContext;
use crate::error::{SimError, SimResult};
use crate::event::SimEventKind;
use crate::lane::Occupant;

/// Items a character received from an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemGain {
    /// Item type ID.
    pub item_id: i32,
    /// How many were stored.
    pub count: u32,
    /// Item type name, or `item <id>` when the type is unknown.
    pub name: String,
}

/// What happened to the target object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectFate {
    /// Still there, possibly with less durability.
    Intact,
    /// Worn out and turned into another type.
    Transformed {
        /// Type before the change.
        from: i32,
        /// Type after the change.
        to: i32,
    },
    /// Removed from the world.
    Destroyed,
}

/// Result of one interaction attempt.
///
/// A rejected attempt (`success == false`) leaves the world untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOutcome {
    /// Whether the interaction took place.
    pub success: bool,
    /// The target object.
    pub object_id: ObjectId,
    /// Human-readable summary for the client.
    pub message: String,
    /// Items added to the character's inventory.
    pub items: Vec<ItemGain>,
    /// What became of the object.
    pub fate: ObjectFate,
}

impl InteractionOutcome {
    fn rejected(object_id: ObjectId, message: impl Into<String>) -> Self {
        Self {
            success: false,
            object_id,
            message: message.into(),
            items: Vec::new(),
            fate: ObjectFate::Intact,
        }
    }
}

/// Perform interaction `index` of `object` by `character`.
///
/// Unknown character, object, object type or interaction index are errors.
/// A wrong location or a missing tool is a rejected outcome. Items are
/// added before durability is applied; what does not fit is dropped.
pub fn perform(
    ctx: &mut SimContext<'_>,
    character: CharacterId,
    object: ObjectId,
    index: usize,
) -> SimResult<InteractionOutcome> {
    let registry = ctx.registry;
    let ch = ctx
        .world
        .character(character)
        .ok_or(SimError::CharacterNotFound(character))?;
    let obj = ctx
        .world
        .object(object)
        .ok_or(SimError::ObjectNotFound(object))?;
    let object_type = registry
        .object(obj.type_id)
        .ok_or(SimError::UnknownObjectType {
            object,
            type_id: obj.type_id,
        })?;
    let interaction = object_type
        .interactions
        .get(index)
        .ok_or(SimError::InteractionOutOfRange {
            object,
            index,
            available: object_type.interactions.len(),
        })?;

    let rejection = if obj.location_id != ch.location {
        Some("object is not here".to_string())
    } else if interaction.tool.is_empty() || interaction.tool == HAND_TOOL {
        (!ch.hands_free).then(|| "hands are busy".to_string())
    } else {
        match ch.equipped.get(&interaction.tool) {
            None => Some(format!("requires {}", interaction.tool)),
            Some(item) if registry.item(*item).is_none() => {
                Some(format!("equipped {} is not a known item", interaction.tool))
            }
            Some(_) => None,
        }
    };
    if let Some(reason) = rejection {
        tracing::debug!(character = %character, object = %object, %reason, "interaction rejected");
        ctx.emit(
            SimEventKind::Interacted {
                character,
                object,
                success: false,
            },
            format!("character {character} could not {} object {object}: {reason}", interaction.kind),
        );
        return Ok(InteractionOutcome::rejected(object, reason));
    }

    let action = interaction.kind.clone();
    let object_name = object_type.name.clone();
    let results = interaction.results.clone();
    let cost = interaction.durability_cost();
    let transform = interaction.transform_target();
    let destroy_on_complete = interaction.destroy_on_complete;

    let mut items = Vec::new();
    let mut dropped = 0;
    if let Some(ch) = ctx.world.character_mut(character) {
        for result in &results {
            let added = ch
                .inventory
                .add(result.item_id, result.count, registry.stack_size(result.item_id));
            dropped += result.count - added;
            if added > 0 {
                items.push(ItemGain {
                    item_id: result.item_id,
                    count: added,
                    name: registry
                        .item(result.item_id)
                        .map_or_else(|| format!("item {}", result.item_id), |i| i.name.clone()),
                });
            }
        }
    }

    let remaining = match ctx.world.object_mut(object) {
        Some(obj) => {
            obj.durability -= cost;
            obj.durability
        }
        None => 0,
    };

    let fate = if destroy_on_complete {
        destroy_object(ctx, object)?;
        ObjectFate::Destroyed
    } else if remaining <= 0 {
        match transform {
            Some(to) => transform_object(ctx, object, to)?,
            None => {
                destroy_object(ctx, object)?;
                ObjectFate::Destroyed
            }
        }
    } else {
        ObjectFate::Intact
    };

    let mut message = format!("{action} {object_name}");
    if !items.is_empty() {
        let got: Vec<String> = items
            .iter()
            .map(|i| format!("{} x{}", i.name, i.count))
            .collect();
        message.push_str(&format!(": got {}", got.join(", ")));
    }
    if dropped > 0 {
        message.push_str(&format!("; inventory full, {dropped} dropped"));
    }

    tracing::debug!(character = %character, object = %object, ?fate, "interaction done");
    ctx.mark_changed();
    ctx.emit(
        SimEventKind::Interacted {
            character,
            object,
            success: true,
        },
        message.clone(),
    );

    Ok(InteractionOutcome {
        success: true,
        object_id: object,
        message,
        items,
        fate,
    })
}

/// Turn a worn-out object into type `to` with fresh durability.
fn transform_object(ctx: &mut SimContext<'_>, object: ObjectId, to: i32) -> SimResult<ObjectFate> {
    let registry = ctx.registry;
    let obj = ctx
        .world
        .object_mut(object)
        .ok_or(SimError::ObjectNotFound(object))?;
    let from = obj.type_id;
    let (location, x) = (obj.location_id, obj.x);
    obj.type_id = to;
    obj.durability = registry.max_durability(to);

    let new_type = registry.object(to);
    let in_foreground = new_type.is_some_and(|t| t.foreground);
    let in_background = new_type.is_some_and(|t| t.background);
    if let Some(lane) = ctx.lanes.get_mut(&location) {
        let who = Occupant::Object(object);
        if in_foreground {
            lane.claim(x, who);
        } else {
            lane.release_all(who);
        }
        match lane.background_at(x) {
            Some(code) if code == from => lane.set_background(x, if in_background { to } else { 0 }),
            Some(0) if in_background => lane.set_background(x, to),
            _ => {}
        }
    }

    if !in_foreground {
        ctx.refill(location, x);
    }

    tracing::info!(object = %object, from, to, "object transformed");
    ctx.mark_changed();
    ctx.emit(
        SimEventKind::ObjectTransformed {
            object,
            from_type: from,
            to_type: to,
        },
        format!("object {object} turned from type {from} into {to}"),
    );
    Ok(ObjectFate::Transformed { from, to })
}

/// Remove an object from the world, its lane index and its tile layers.
pub(crate) fn destroy_object(ctx: &mut SimContext<'_>, object: ObjectId) -> SimResult<()> {
    let obj = ctx.world.remove_object(object)?;
    let object_type = ctx.registry.object(obj.type_id);
    if let Some(lane) = ctx.lanes.get_mut(&obj.location_id) {
        lane.remove_object(object);
        lane.release_all(Occupant::Object(object));
        let in_background = object_type.is_none_or(|t| t.background);
        if in_background && lane.background_at(obj.x) == Some(obj.type_id) {
            lane.set_background(obj.x, 0);
        }
    }

    ctx.refill(obj.location_id, obj.x);

    tracing::info!(object = %object, location = %obj.location_id, "object destroyed");
    ctx.mark_changed();
    ctx.emit(
        SimEventKind::ObjectDestroyed {
            object,
            location: obj.location_id,
        },
        format!("object {object} destroyed"),
    );
    Ok(())
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, LocationId, PlayerId};

/// Number of inventory slots a character or creature has.
pub const INVENTORY_SLOTS: u32 = 20;

/// Tool name that needs free hands instead of an equipped item.
pub const HAND_TOOL: &str = "hand";

/// A stack of identical items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Item type ID.
    pub item_id: i32,
    /// Items in the stack.
    pub count: u32,
}

/// Slot-indexed item storage with per-item stack limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Inventory {
    slots: BTreeMap<u32, ItemStack>,
}

impl Inventory {
    /// An empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store up to `count` items of `item_id`, returning how many fit.
    ///
    /// Existing stacks of the same item are topped up to `stack_size` first,
    /// then free slots are used in ascending order. Whatever does not fit is
    /// left to the caller.
    pub fn add(&mut self, item_id: i32, count: u32, stack_size: u32) -> u32 {
        let stack_size = stack_size.max(1);
        let mut remaining = count;

        for stack in self.slots.values_mut() {
            if remaining == 0 {
                break;
            }
            if stack.item_id == item_id && stack.count < stack_size {
                let moved = remaining.min(stack_size - stack.count);
                stack.count += moved;
                remaining -= moved;
            }
        }

        let mut slot = 0;
        while remaining > 0 && slot < INVENTORY_SLOTS {
            if !self.slots.contains_key(&slot) {
                let moved = remaining.min(stack_size);
                self.slots.insert(
                    slot,
                    ItemStack {
                        item_id,
                        count: moved,
                    },
                );
                remaining -= moved;
            }
            slot += 1;
        }

        count - remaining
    }

    /// Total number of `item_id` across all slots.
    pub fn count_of(&self, item_id: i32) -> u32 {
        self.slots
            .values()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.count)
            .sum()
    }

    /// The stack in `slot`, if any.
    pub fn slot(&self, slot: u32) -> Option<&ItemStack> {
        self.slots.get(&slot)
    }

    /// Occupied slots in ascending order.
    pub fn slots(&self) -> impl Iterator<Item = (u32, &ItemStack)> {
        self.slots.iter().map(|(k, v)| (*k, v))
    }

    /// Number of occupied slots.
    pub fn used_slots(&self) -> usize {
        self.slots.len()
    }
}

/// A character walking a lane, controlled by a player or by nobody.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique character ID.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Location the character stands in.
    pub location: LocationId,
    /// Fractional position along the lane, `0.0..=width-1`.
    pub x: f64,
    /// Tiles per second, including the road modifier.
    #[serde(default)]
    pub speed: f64,
    /// Horizontal intent: -1 left, 0 still, 1 right.
    #[serde(default)]
    pub direction: i8,
    /// Up/down intent used when reaching a lane boundary.
    #[serde(default)]
    pub vertical: i8,
    /// Controlling player, `PlayerId(0)` for NPCs.
    #[serde(default)]
    pub controlled: PlayerId,
    /// Carried items.
    #[serde(default)]
    pub inventory: Inventory,
    /// Equipped tools: tool kind ("axe") to item type code.
    #[serde(default)]
    pub equipped: BTreeMap<String, i32>,
    /// Whether hand interactions are possible.
    #[serde(default = "free")]
    pub hands_free: bool,
}

fn free() -> bool {
    true
}

impl Character {
    /// A still, uncontrolled character at `x`.
    pub fn new(id: CharacterId, name: impl Into<String>, location: LocationId, x: f64) -> Self {
        Self {
            id,
            name: name.into(),
            location,
            x,
            speed: 0.0,
            direction: 0,
            vertical: 0,
            controlled: PlayerId(0),
            inventory: Inventory::new(),
            equipped: BTreeMap::new(),
            hands_free: true,
        }
    }

    /// The tile this character occupies: `x` rounded half up.
    pub fn tile(&self) -> i32 {
        (self.x + 0.5).floor() as i32
    }

    /// Whether no player controls this character.
    pub fn is_npc(&self) -> bool {
        self.controlled.is_none()
    }
}

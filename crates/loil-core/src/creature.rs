use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::character::Inventory;
use crate::ids::{CreatureId, LocationId};

/// Upper bound of hunger and thirst.
pub const MAX_NEED: f64 = 100.0;

/// Target tile value meaning "no target".
pub const NO_TARGET: i32 = -1;

/// What a creature is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorKind {
    /// Roam to random nearby tiles.
    Wander,
    /// Walk to a chosen tile.
    Walk,
    /// Stand still and recover.
    Rest,
    /// Look for favorite food and eat it.
    Eat,
    /// Fight a nearby target.
    Attack,
    /// Run away from a threat.
    Flee,
}

impl BehaviorKind {
    /// Every behavior, in declaration order.
    pub const ALL: [BehaviorKind; 6] = [
        Self::Wander,
        Self::Walk,
        Self::Rest,
        Self::Eat,
        Self::Attack,
        Self::Flee,
    ];

    /// Whether this behavior moves the creature toward a target tile.
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Wander | Self::Walk | Self::Flee)
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wander => write!(f, "wander"),
            Self::Walk => write!(f, "walk"),
            Self::Rest => write!(f, "rest"),
            Self::Eat => write!(f, "eat"),
            Self::Attack => write!(f, "attack"),
            Self::Flee => write!(f, "flee"),
        }
    }
}

impl FromStr for BehaviorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wander" => Ok(Self::Wander),
            "walk" => Ok(Self::Walk),
            "rest" => Ok(Self::Rest),
            "eat" => Ok(Self::Eat),
            "attack" => Ok(Self::Attack),
            "flee" => Ok(Self::Flee),
            other => Err(format!("unknown behavior '{other}'")),
        }
    }
}

/// The single active behavior of a creature.
///
/// Times are simulation seconds, not wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureBehavior {
    /// Which behavior this is.
    #[serde(rename = "type")]
    pub kind: BehaviorKind,
    /// Target tile, [`NO_TARGET`] when stationary.
    #[serde(default = "no_target")]
    pub target_pos: i32,
    /// Simulation second the behavior began.
    #[serde(default)]
    pub started_at: f64,
    /// Seconds the behavior lasts.
    #[serde(default)]
    pub duration: f64,
    /// Set once the creature has eaten during the current stop.
    #[serde(default)]
    pub ate_at_current_stop: bool,
}

fn no_target() -> i32 {
    NO_TARGET
}

impl CreatureBehavior {
    /// A stationary behavior starting at `started_at`.
    pub fn new(kind: BehaviorKind, started_at: f64, duration: f64) -> Self {
        Self {
            kind,
            target_pos: NO_TARGET,
            started_at,
            duration,
            ate_at_current_stop: false,
        }
    }

    /// Whether the behavior is heading somewhere.
    pub fn has_target(&self) -> bool {
        self.target_pos != NO_TARGET
    }

    /// Whether the behavior has run for its full duration at time `now`.
    pub fn is_finished(&self, now: f64) -> bool {
        now - self.started_at >= self.duration
    }
}

/// An autonomous creature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Creature {
    /// Unique creature ID.
    pub id: CreatureId,
    /// Creature type code, see [`crate::catalog::CreatureType`].
    pub type_id: i32,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Location the creature is in.
    pub location: LocationId,
    /// Fractional position along the lane.
    pub x: f64,
    /// Current health.
    pub health: i32,
    /// Health when fully healed.
    pub max_health: i32,
    /// 0 (sated) ..= 100 (starving).
    #[serde(default)]
    pub hunger: f64,
    /// 0 ..= 100.
    #[serde(default)]
    pub thirst: f64,
    /// Active behavior, if any.
    #[serde(rename = "behavior", default)]
    pub behavior: Option<CreatureBehavior>,
    /// Carried items.
    #[serde(default)]
    pub inventory: Inventory,
    /// Wall-clock time of the last change, for clients.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
}

impl Creature {
    /// A healthy, idle creature of `type_id` at `x`.
    pub fn new(id: CreatureId, type_id: i32, location: LocationId, x: f64, max_health: i32) -> Self {
        Self {
            id,
            type_id,
            name: String::new(),
            location,
            x,
            health: max_health,
            max_health,
            hunger: 0.0,
            thirst: 0.0,
            behavior: None,
            inventory: Inventory::new(),
            last_update: None,
        }
    }

    /// The tile this creature occupies.
    pub fn tile(&self) -> i32 {
        (self.x + 0.5).floor() as i32
    }

    /// Kind of the active behavior, if any.
    pub fn behavior_kind(&self) -> Option<BehaviorKind> {
        self.behavior.as_ref().map(|b| b.kind)
    }
}

use std::fmt;
use std::str::FromStr;

/// How entities share foreground tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionMode {
    /// A tile holds at most one occupant; moves onto a held tile are rejected.
    #[default]
    Exclusive,
    /// Entities may stand on the same tile; only terrain blocks movement.
    /// The foreground records one of them and passes the cell on when it leaves.
    Shared,
}

/// How creatures find food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForagingMode {
    /// The `eat` behavior searches nearby tiles for favorite food.
    #[default]
    Explicit,
    /// No `eat` behavior; creatures eat what lies under them when they stop.
    Incidental,
}

impl fmt::Display for CollisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => write!(f, "exclusive"),
            Self::Shared => write!(f, "shared"),
        }
    }
}

impl FromStr for CollisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclusive" => Ok(Self::Exclusive),
            "shared" => Ok(Self::Shared),
            other => Err(format!(
                "unknown collision mode '{other}' (expected exclusive or shared)"
            )),
        }
    }
}

impl fmt::Display for ForagingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Incidental => write!(f, "incidental"),
        }
    }
}

impl FromStr for ForagingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "explicit" => Ok(Self::Explicit),
            "incidental" => Ok(Self::Incidental),
            other => Err(format!(
                "unknown foraging mode '{other}' (expected explicit or incidental)"
            )),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for deterministic simulation.
    pub seed: u64,
    /// Maximum event log size (oldest events dropped when exceeded). 0 = unlimited.
    pub max_events: usize,
    /// Whether entities may share tiles.
    pub collision: CollisionMode,
    /// How creatures find food.
    pub foraging: ForagingMode,
    /// Walking speed of characters in tiles per second, before road modifiers.
    pub base_speed: f64,
    /// Hunger gained per second.
    pub hunger_rate: f64,
    /// Thirst gained per second.
    pub thirst_rate: f64,
    /// Fraction of the hunger rate that applies while resting.
    pub rest_hunger_factor: f64,
    /// Hunger above which a creature prefers to rest.
    pub starving_threshold: f64,
    /// Health regained per tick while resting.
    pub rest_heal: i32,
    /// Farthest tile distance a wander or walk target is picked at.
    pub wander_radius: i32,
    /// Tiles searched on either side when foraging.
    pub forage_radius: i32,
    /// Hunger removed by one bite.
    pub food_value: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_events: 10_000,
            collision: CollisionMode::Exclusive,
            foraging: ForagingMode::Explicit,
            base_speed: 0.7,
            hunger_rate: 0.5,
            thirst_rate: 0.3,
            rest_hunger_factor: 0.25,
            starving_threshold: 90.0,
            rest_heal: 1,
            wander_radius: 10,
            forage_radius: 3,
            food_value: 30.0,
        }
    }
}

impl SimConfig {
    /// Set the RNG seed for deterministic simulation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the maximum event log size (0 = unlimited).
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set the collision mode.
    pub fn with_collision(mut self, mode: CollisionMode) -> Self {
        self.collision = mode;
        self
    }

    /// Set the foraging mode.
    pub fn with_foraging(mut self, mode: ForagingMode) -> Self {
        self.foraging = mode;
        self
    }

    /// Set hunger and thirst gain per second.
    pub fn with_need_rates(mut self, hunger: f64, thirst: f64) -> Self {
        self.hunger_rate = hunger;
        self.thirst_rate = thirst;
        self
    }

    /// Set the hunger removed per bite.
    pub fn with_food_value(mut self, value: f64) -> Self {
        self.food_value = value;
        self
    }
}

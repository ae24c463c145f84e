use loil_core::{
    BehaviorKind, CharacterId, CreatureId, LocationId, ObjectId, PlayerId, Side, TransitionKey,
};

use crate::lane::{BlockReason, Occupant};

/// What kind of simulation event occurred.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEventKind {
    // Movement
    /// A step onto a tile was refused and the mover snapped back.
    Blocked {
        /// The entity that tried to move.
        subject: Occupant,
        /// The lane it was moving on.
        location: LocationId,
        /// The tile it tried to enter.
        tile: i32,
        /// Why the tile was refused.
        reason: BlockReason,
    },
    /// A character crossed into another location.
    Transitioned {
        /// The character that crossed.
        character: CharacterId,
        /// The location it left.
        from: LocationId,
        /// The location it entered.
        to: LocationId,
        /// The transition used.
        key: TransitionKey,
    },
    /// A character reached a lane end with nowhere to go and stopped.
    EdgeStall {
        /// The character that stopped.
        character: CharacterId,
        /// The lane it stopped on.
        location: LocationId,
        /// The end it reached.
        side: Side,
    },

    // Creatures
    /// A creature started a new behavior.
    BehaviorChanged {
        /// The creature.
        creature: CreatureId,
        /// The previous behavior, if any.
        from: Option<BehaviorKind>,
        /// The new behavior.
        to: BehaviorKind,
    },
    /// A creature ate from an object.
    CreatureAte {
        /// The creature that ate.
        creature: CreatureId,
        /// The food object.
        object: ObjectId,
    },

    // Objects and interactions
    /// A character performed an interaction.
    Interacted {
        /// The acting character.
        character: CharacterId,
        /// The target object.
        object: ObjectId,
        /// Whether the interaction went through.
        success: bool,
    },
    /// An object changed type after wearing out.
    ObjectTransformed {
        /// The object.
        object: ObjectId,
        /// Its previous type.
        from_type: i32,
        /// Its new type.
        to_type: i32,
    },
    /// An object was removed from the world.
    ObjectDestroyed {
        /// The removed object.
        object: ObjectId,
        /// The lane it was on.
        location: LocationId,
    },

    // Players
    /// A player took control of a character.
    PlayerJoined {
        /// The player.
        player: PlayerId,
        /// The character now controlled.
        character: CharacterId,
    },
}

impl SimEventKind {
    /// Check whether a given entity is involved in this event.
    pub fn involves(&self, who: Occupant) -> bool {
        match self {
            Self::Blocked { subject, .. } => *subject == who,
            Self::Transitioned { character, .. }
            | Self::EdgeStall { character, .. }
            | Self::PlayerJoined { character, .. } => who == Occupant::Character(*character),
            Self::BehaviorChanged { creature, .. } => who == Occupant::Creature(*creature),
            Self::CreatureAte { creature, object } => {
                who == Occupant::Creature(*creature) || who == Occupant::Object(*object)
            }
            Self::Interacted {
                character, object, ..
            } => who == Occupant::Character(*character) || who == Occupant::Object(*object),
            Self::ObjectTransformed { object, .. } | Self::ObjectDestroyed { object, .. } => {
                who == Occupant::Object(*object)
            }
        }
    }
}

/// A record of something that happened during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    /// The simulation tick when this event occurred.
    pub tick: u64,
    /// The specific kind of event that occurred.
    pub kind: SimEventKind,
    /// A human-readable description of the event.
    pub description: String,
}

impl SimEvent {
    /// Create a new simulation event with the given tick, kind, and description.
    pub fn new(tick: u64, kind: SimEventKind, description: impl Into<String>) -> Self {
        Self {
            tick,
            kind,
            description: description.into(),
        }
    }
}

/// Accumulates events during a simulation run.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<SimEvent>,
    max_events: usize,
}

impl EventLog {
    /// Create a new event log with the given maximum capacity (0 = unlimited).
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Vec::new(),
            max_events,
        }
    }

    /// Append an event, dropping the oldest events if the log exceeds its capacity.
    pub fn push(&mut self, event: SimEvent) {
        self.events.push(event);
        if self.max_events > 0 && self.events.len() > self.max_events {
            let drain_count = self.events.len() - self.max_events;
            self.events.drain(..drain_count);
        }
    }

    /// Return a slice of all recorded events.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Return all events that occurred at the given tick.
    pub fn events_at_tick(&self, tick: u64) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.tick == tick).collect()
    }

    /// Return all events involving the given entity.
    pub fn events_for(&self, who: Occupant) -> Vec<&SimEvent> {
        self.events.iter().filter(|e| e.kind.involves(who)).collect()
    }

    /// Return the number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Return `true` if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stall(tick: u64, id: i32) -> SimEvent {
        SimEvent::new(
            tick,
            SimEventKind::EdgeStall {
                character: CharacterId(id),
                location: LocationId(1),
                side: Side::Right,
            },
            "stall",
        )
    }

    #[test]
    fn event_log_push_and_query() {
        let mut log = EventLog::new(0);
        log.push(stall(1, 1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.events_at_tick(1).len(), 1);
        assert_eq!(log.events_for(Occupant::Character(CharacterId(1))).len(), 1);
        assert!(log.events_for(Occupant::Creature(CreatureId(1))).is_empty());
    }

    #[test]
    fn event_log_max_events_trims() {
        let mut log = EventLog::new(2);
        for i in 0..5 {
            log.push(stall(i, 1));
        }
        assert_eq!(log.len(), 2);
        // Oldest events were dropped, newest remain
        assert_eq!(log.events()[0].tick, 3);
        assert_eq!(log.events()[1].tick, 4);
    }

    #[test]
    fn event_kind_involves_both_parties() {
        let kind = SimEventKind::CreatureAte {
            creature: CreatureId(2),
            object: ObjectId(9),
        };
        assert!(kind.involves(Occupant::Creature(CreatureId(2))));
        assert!(kind.involves(Occupant::Object(ObjectId(9))));
        // Same raw ID, different kind of entity.
        assert!(!kind.involves(Occupant::Character(CharacterId(2))));
    }

    #[test]
    fn event_log_clear() {
        let mut log = EventLog::new(0);
        log.push(stall(1, 1));
        assert!(!log.is_empty());
        log.clear();
        assert!(log.is_empty());
    }
}

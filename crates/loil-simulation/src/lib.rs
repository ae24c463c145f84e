//! Tick-based lane simulation for LOIL.
//!
//! A [`Simulation`] takes a [`loil_core::World`] and derives one [`Lane`] per
//! location: the working tile layers plus an occupancy grid and entity index.
//! Registered systems advance characters, creatures and objects each tick.
//! Player commands are applied between ticks by the same owner, and
//! [`Simulation::export_world`] writes the working state back into the
//! at-rest world model.

/// Creature behavior state machine.
pub mod behavior;
/// Simulation clock for tracking ticks and simulated seconds.
pub mod clock;
/// Configuration and rule modes for simulation runs.
pub mod config;
/// Mutable context passed to systems each tick.
pub mod context;
/// Error types for the simulation crate.
pub mod error;
/// Simulation event types and the event log.
pub mod event;
/// Character interactions with world objects.
pub mod interaction;
/// Per-location working state and tile occupancy.
pub mod lane;
/// Object growth and decay.
pub mod maintenance;
/// Character movement and lane transitions.
pub mod movement;
/// Top-level simulation orchestrator.
pub mod simulation;
/// The trait that all simulation systems implement.
pub mod system;

#[cfg(test)]
mod fixtures;

/// Re-export of [`behavior::CreatureSystem`].
pub use behavior::CreatureSystem;
/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-exports of the configuration types.
pub use config::{CollisionMode, ForagingMode, SimConfig};
/// Re-export of [`context::SimContext`].
pub use context::SimContext;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-exports of [`event::EventLog`], [`event::SimEvent`], and [`event::SimEventKind`].
pub use event::{EventLog, SimEvent, SimEventKind};
/// Re-exports of the interaction result types.
pub use interaction::{InteractionOutcome, ItemGain, ObjectFate};
/// Re-exports of lane types.
pub use lane::{BlockReason, Lane, Lanes, Occupant, tile_of};
/// Re-export of [`maintenance::MaintenanceSystem`].
pub use maintenance::MaintenanceSystem;
/// Re-export of [`movement::MovementSystem`].
pub use movement::MovementSystem;
/// Re-exports of the orchestrator and its tick report.
pub use simulation::{Simulation, TickReport, TransitionRecord};
/// Re-export of [`system::System`].
pub use system::System;
